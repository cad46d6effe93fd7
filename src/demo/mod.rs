//! Demo module for actuator-demos.
//!
//! Provides the demo registry, the runner that sequences
//! validate → acquire → run → release, and the maintenance demos
//! (bootloader activation, pole finding).

mod bootloader;
mod find_poles;
mod operator;
mod report;
mod runner;

pub use bootloader::Bootloader;
pub use find_poles::FindPoles;
pub use operator::{AutoConfirm, Operator};
pub use report::{DemoReport, SessionReport};
pub use runner::{DemoRunner, DeviceParams};

#[cfg(feature = "std")]
pub use operator::StdinOperator;

use core::fmt;
use core::str::FromStr;

use crate::control::{
    CurrentControl, DualPosition, HighSpeed, ImpedanceControl, LeaderFollower, OpenControl,
    PositionControl, ReadOnly, TwoPositionControl,
};
use crate::error::{bounded, Error, Result, ValidationError};
use crate::params::{ParameterSchema, ParameterSet};

/// A demo built from a validated parameter set.
pub trait Demo: Sized {
    /// Name used on the command line and in reports.
    const NAME: &'static str;

    /// Parameters the demo requires.
    const SCHEMA: ParameterSchema;

    /// Build the typed demo from parameters already validated by `SCHEMA`.
    fn from_parameters(params: &ParameterSet) -> Result<Self>;
}

/// Every available demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoKind {
    /// Periodic readout.
    ReadOnly,
    /// Held current with ramp-down.
    CurrentControl,
    /// Open-loop voltage ramps.
    OpenControl,
    /// Position hold.
    PositionControl,
    /// Impedance with a stiffness schedule.
    ImpedanceControl,
    /// Alternation between two positions.
    TwoPositionControl,
    /// Follower mirrors a leader.
    LeaderFollower,
    /// Two devices holding position.
    TwoDevicesPositionControl,
    /// High-rate table streaming.
    HighSpeed,
    /// Bootloader activation.
    Bootloader,
    /// Pole finding.
    FindPoles,
}

impl DemoKind {
    /// Every demo, in listing order.
    pub const ALL: [DemoKind; 11] = [
        DemoKind::ReadOnly,
        DemoKind::CurrentControl,
        DemoKind::OpenControl,
        DemoKind::PositionControl,
        DemoKind::ImpedanceControl,
        DemoKind::TwoPositionControl,
        DemoKind::LeaderFollower,
        DemoKind::TwoDevicesPositionControl,
        DemoKind::HighSpeed,
        DemoKind::Bootloader,
        DemoKind::FindPoles,
    ];

    /// Demo name.
    pub fn name(self) -> &'static str {
        match self {
            DemoKind::ReadOnly => ReadOnly::NAME,
            DemoKind::CurrentControl => CurrentControl::NAME,
            DemoKind::OpenControl => OpenControl::NAME,
            DemoKind::PositionControl => PositionControl::NAME,
            DemoKind::ImpedanceControl => ImpedanceControl::NAME,
            DemoKind::TwoPositionControl => TwoPositionControl::NAME,
            DemoKind::LeaderFollower => LeaderFollower::NAME,
            DemoKind::TwoDevicesPositionControl => DualPosition::NAME,
            DemoKind::HighSpeed => HighSpeed::NAME,
            DemoKind::Bootloader => Bootloader::NAME,
            DemoKind::FindPoles => FindPoles::NAME,
        }
    }

    /// Required parameters.
    pub fn schema(self) -> ParameterSchema {
        match self {
            DemoKind::ReadOnly => ReadOnly::SCHEMA,
            DemoKind::CurrentControl => CurrentControl::SCHEMA,
            DemoKind::OpenControl => OpenControl::SCHEMA,
            DemoKind::PositionControl => PositionControl::SCHEMA,
            DemoKind::ImpedanceControl => ImpedanceControl::SCHEMA,
            DemoKind::TwoPositionControl => TwoPositionControl::SCHEMA,
            DemoKind::LeaderFollower => LeaderFollower::SCHEMA,
            DemoKind::TwoDevicesPositionControl => DualPosition::SCHEMA,
            DemoKind::HighSpeed => HighSpeed::SCHEMA,
            DemoKind::Bootloader => Bootloader::SCHEMA,
            DemoKind::FindPoles => FindPoles::SCHEMA,
        }
    }

    /// Number of devices the demo drives at once.
    pub fn devices_per_run(self) -> usize {
        match self {
            DemoKind::LeaderFollower | DemoKind::TwoDevicesPositionControl => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for DemoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DemoKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DemoKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                ValidationError::InvalidParameter {
                    name: bounded(s),
                    reason: "unknown demo",
                }
                .into()
            })
    }
}
