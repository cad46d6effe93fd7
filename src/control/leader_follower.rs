//! Leader/follower: the follower mirrors the leader's displacement.

use embedded_hal::delay::DelayNs;
use tracing::{debug, info};

use crate::demo::Demo;
use crate::device::{ControlMode, DeviceHandle, DevicePair};
use crate::error::Result;
use crate::params::{GainSet, ParamType, ParameterSchema, ParameterSet};
use crate::telemetry::TelemetryRecorder;

use super::tick::{LoopContext, LoopSummary, SessionOutcome, TickPeriod};
use super::PairedLoop;

const PERIOD: TickPeriod = TickPeriod::from_millis(50);

/// Leader gains: zero-current hold that can be back-driven by hand.
pub const DEFAULT_LEADER_GAINS: GainSet = GainSet::new(40, 400, 0, 0, 0, 128);

/// Follower gains: stiff position control.
pub const DEFAULT_FOLLOWER_GAINS: GainSet = GainSet::new(100, 1, 0, 0, 0, 0);

/// Follower position for the leader's current angle.
#[inline]
pub fn follower_target(leader_initial: i32, leader_angle: i32, follower_initial: i32) -> f64 {
    f64::from(follower_initial) + (f64::from(leader_angle) - f64::from(leader_initial))
}

/// The follower tracks the leader's displacement since the start.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderFollower {
    /// Ticks to run.
    pub loop_count: u32,
    /// Leader gains.
    pub leader_gains: GainSet,
    /// Follower gains.
    pub follower_gains: GainSet,
}

impl Demo for LeaderFollower {
    const NAME: &'static str = "leader_follower";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
        ("run_time", ParamType::Integer),
    ]);

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        let run_time = params.positive_integer("run_time")?;
        Ok(Self {
            loop_count: PERIOD.ticks_in(run_time as f64),
            leader_gains: params
                .optional_gains("leader_gains")?
                .unwrap_or(DEFAULT_LEADER_GAINS),
            follower_gains: params
                .optional_gains("follower_gains")?
                .unwrap_or(DEFAULT_FOLLOWER_GAINS),
        })
    }
}

impl PairedLoop for LeaderFollower {
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        pair: &mut DevicePair<H>,
        ctx: &mut LoopContext<'_, D>,
        leader_log: &mut TelemetryRecorder,
        follower_log: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        let leader_initial = pair.leader.initial_position();
        let follower_initial = pair.follower.initial_position();

        pair.leader.setup_gains(&self.leader_gains)?;
        pair.leader.setup_command(ControlMode::Current, 0.0)?;
        pair.follower.setup_gains(&self.follower_gains)?;
        pair.follower
            .setup_command(ControlMode::Position, f64::from(follower_initial))?;
        info!(
            leader = pair.leader.port(),
            follower = pair.follower.port(),
            leader_initial,
            follower_initial,
            "following"
        );

        let mut ticker = ctx.ticker(PERIOD);
        let mut target = f64::from(follower_initial);
        for _ in 0..self.loop_count {
            if ticker.should_stop() {
                break;
            }
            ticker.wait();
            let leader = ticker.sample(&mut pair.leader)?;
            let follower = ticker.sample(&mut pair.follower)?;

            // without a fresh leader reading the follower keeps its last target
            if let Some(leader) = leader {
                target = follower_target(leader_initial, leader.motor_angle, follower_initial);
                ticker.command(&mut pair.follower, ControlMode::Position, target)?;
                leader_log.record(leader.time, 0.0, f64::from(leader.motor_current));
            }

            if let Some(follower) = follower {
                let measured = f64::from(follower.motor_angle);
                debug!(
                    leader_angle = ?leader.map(|s| s.motor_angle),
                    target,
                    measured,
                    "follow"
                );
                follower_log.record(follower.time, target, measured);
            }
        }

        Ok(ticker.finish(SessionOutcome::Completed))
    }
}
