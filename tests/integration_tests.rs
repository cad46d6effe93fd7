//! Integration tests for actuator-demos.
//!
//! These tests drive complete demos against a scripted device double and
//! check what the devices were asked to do.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;

use actuator_demos::control::ImpedanceControl;
use actuator_demos::demo::Demo;
use actuator_demos::error::{Error, TransportError, UnsupportedError, ValidationError};
use actuator_demos::{
    generate, parse_parameters, ControlLoop, ControlMode, DemoKind, DemoRunner, DeviceSession, LoopContext,
    LoopState, Operator, SessionOutcome, TelemetryRecorder,
};
use embedded_hal_mock::eh1::delay::NoopDelay;

use common::{run_demo, PortScript, ScriptedBus};

// =============================================================================
// Parameter files
// =============================================================================

const POSITION_ONE_PORT: &str = r#"
ports = ["A"]
baud_rate = 230400
run_time = 1
gains = { kp = 50, ki = 3, kd = 0, K = 0, B = 0, ff = 0 }
"#;

const CURRENT_TWO_PORTS: &str = r#"
ports = ["A", "B"]
baud_rate = 230400
run_time = 1
hold_current = 100
ramp_down_steps = 4
gains = { kp = 40, ki = 400, kd = 0, K = 0, B = 0, ff = 128 }
"#;

const LEADER_FOLLOWER: &str = r#"
ports = ["A", "B"]
baud_rate = 230400
run_time = 1
"#;

const IMPEDANCE: &str = r#"
ports = ["A"]
baud_rate = 230400
run_time = 1
transition_time = 0.2
delta = 500
b_increments = 25
gains = { kp = 40, ki = 400, kd = 0, K = 300, B = 1600, ff = 0 }
"#;

// =============================================================================
// Leader / follower
// =============================================================================

#[test]
fn test_follower_mirrors_leader_displacement() {
    let mut bus = ScriptedBus::new()
        .with_port("A", PortScript::angles(&[1000, 1050]))
        .with_port("B", PortScript::angles(&[500]));

    let report = run_demo(&mut bus, DemoKind::LeaderFollower, LEADER_FOLLOWER).unwrap();

    let journal = bus.journal.borrow();
    let follower = journal.commands_for("B");
    assert_eq!(follower[0], (ControlMode::Position, 500.0));
    assert_eq!(follower[1], (ControlMode::Position, 550.0));
    assert_eq!(journal.commands_for("A")[0], (ControlMode::Current, 0.0));

    assert_eq!(report.sessions.len(), 2);
    assert_eq!(report.sessions[1].telemetry.len(), 20);
    assert!(report.sessions[1].telemetry.requests.iter().all(|r| *r == 550.0));
    assert!(report.all_closed());
}

#[test]
fn test_follower_logged_when_leader_read_fails() {
    // read 0 is the open read, read 2 is the second tick
    let mut bus = ScriptedBus::new()
        .with_port(
            "A",
            PortScript {
                angles: vec![1000, 1050],
                failing_reads: vec![2],
                ..PortScript::default()
            },
        )
        .with_port("B", PortScript::angles(&[500]));

    let report = run_demo(&mut bus, DemoKind::LeaderFollower, LEADER_FOLLOWER).unwrap();

    let leader = &report.sessions[0];
    let follower = &report.sessions[1];
    assert_eq!(leader.summary.skipped, 1);
    assert_eq!(leader.telemetry.len(), 19);
    assert_eq!(follower.telemetry.len(), 20);
    assert!(follower.telemetry.requests.iter().all(|r| *r == 550.0));

    let journal = bus.journal.borrow();
    let positions = journal
        .commands_for("B")
        .iter()
        .filter(|(m, _)| *m == ControlMode::Position)
        .count();
    // setup command plus one per tick with a leader reading
    assert_eq!(positions, 20);
}

#[test]
fn test_pair_shutdown_order() {
    let mut bus = ScriptedBus::new()
        .with_port("A", PortScript::angles(&[1000]))
        .with_port("B", PortScript::angles(&[2000]));

    run_demo(&mut bus, DemoKind::TwoDevicesPositionControl, LEADER_FOLLOWER).unwrap();

    let journal = bus.journal.borrow();
    let tail: Vec<&str> = journal
        .events
        .iter()
        .rev()
        .take(6)
        .rev()
        .map(String::as_str)
        .collect();
    assert_eq!(
        tail,
        vec![
            "gains A 0",
            "command A none",
            "close A",
            "gains B 0",
            "command B none",
            "close B",
        ]
    );
    assert_eq!(journal.close_count("A"), 1);
    assert_eq!(journal.close_count("B"), 1);
}

#[test]
fn test_two_device_demo_rejects_port_count_before_opening() {
    for ports in [r#"["A"]"#, r#"["A", "B", "C"]"#] {
        let params = format!("ports = {}\nbaud_rate = 230400\nrun_time = 1\n", ports);
        let mut bus = ScriptedBus::new();

        let err = run_demo(&mut bus, DemoKind::LeaderFollower, &params).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::WrongDeviceCount { expected: 2, .. })
        ));
        assert!(bus.journal.borrow().opened.is_empty());
    }
}

#[test]
fn test_failed_second_open_closes_first() {
    let mut bus = ScriptedBus::new()
        .with_port("A", PortScript::angles(&[1000]))
        .with_port(
            "B",
            PortScript {
                fail_open: true,
                ..PortScript::default()
            },
        );

    let err = run_demo(&mut bus, DemoKind::LeaderFollower, LEADER_FOLLOWER).unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Open { .. })));

    let journal = bus.journal.borrow();
    assert_eq!(journal.opened, vec!["A".to_string()]);
    assert_eq!(journal.close_count("A"), 1);
}

// =============================================================================
// Impedance
// =============================================================================

#[test]
fn test_impedance_transitions() {
    // open read, setup read, then every tick reads 1200
    let mut bus = ScriptedBus::new().with_port("A", PortScript::angles(&[1000, 1000, 1200]));
    let params = ImpedanceControl::SCHEMA
        .validate(parse_parameters(IMPEDANCE).unwrap())
        .unwrap();
    let mut demo = ImpedanceControl::from_parameters(&params).unwrap();
    assert_eq!(demo.transition_steps, 10);

    let mut session = DeviceSession::open(&mut bus, "A", 230_400).unwrap();
    let mut delay = NoopDelay::new();
    let mut ctx = LoopContext::new(&mut delay);
    let mut recorder = TelemetryRecorder::new();
    let summary = demo.run(&mut session, &mut ctx, &mut recorder).unwrap();
    session.close().unwrap();

    assert_eq!(summary.ticks, 50);
    let state = demo.last_state().unwrap();
    assert_eq!(state.transitions, 5);
    assert_eq!(state.gains.stiffness, 425);
    // last transition left 1000 with the motor at 1200
    assert_eq!(state.delta, 200.0);
    assert_eq!(state.target(), 1500.0);

    let journal = bus.journal.borrow();
    let stiffness: Vec<i32> = journal.gains_for("A").iter().map(|g| g.stiffness).collect();
    assert_eq!(stiffness, vec![300, 325, 350, 375, 400, 425]);

    let commands = journal.commands_for("A");
    assert_eq!(
        commands,
        vec![
            (ControlMode::Impedance, 1000.0),
            (ControlMode::Impedance, 1500.0),
            (ControlMode::Impedance, 1000.0),
            (ControlMode::Impedance, 1500.0),
            (ControlMode::Impedance, 1000.0),
            (ControlMode::Impedance, 1500.0),
            (ControlMode::Voltage, 0.0),
        ]
    );
    assert_eq!(journal.close_count("A"), 1);
}

// =============================================================================
// Single-device sequences
// =============================================================================

#[test]
fn test_current_ramp_down_and_per_session_reset() {
    let mut bus = ScriptedBus::new();
    let report = run_demo(&mut bus, DemoKind::CurrentControl, CURRENT_TWO_PORTS).unwrap();

    let journal = bus.journal.borrow();
    let currents: Vec<f64> = journal
        .commands_for("A")
        .iter()
        .filter(|(m, _)| *m == ControlMode::Current)
        .map(|(_, v)| *v)
        .collect();
    let mut expected = vec![100.0; 10];
    expected.extend([75.0, 50.0, 25.0, 0.0]);
    assert_eq!(currents, expected);
    assert_eq!(
        journal.commands_for("A").last(),
        Some(&(ControlMode::None, 0.0))
    );

    for session in &report.sessions {
        assert_eq!(session.telemetry.len(), 14);
        assert_eq!(session.final_state, LoopState::Closed);
    }
    assert_eq!(journal.close_count("A"), 1);
    assert_eq!(journal.close_count("B"), 1);
}

#[test]
fn test_open_control_plan() {
    let params = r#"
ports = ["A"]
baud_rate = 230400
run_time = 2
n_cycles = 2
max_voltage = 100
"#;
    let mut bus = ScriptedBus::new();
    let report = run_demo(&mut bus, DemoKind::OpenControl, params).unwrap();

    let journal = bus.journal.borrow();
    let volts: Vec<f64> = journal
        .commands_for("A")
        .iter()
        .filter(|(m, _)| *m == ControlMode::Voltage)
        .map(|(_, v)| *v)
        .collect();
    let up = [0.0, -20.0, -40.0, -60.0, -80.0];
    assert_eq!(volts[0], 0.0);
    assert_eq!(&volts[1..6], &up);
    let down: Vec<f64> = up.iter().rev().copied().collect();
    assert_eq!(&volts[6..11], down.as_slice());
    assert_eq!(volts.len(), 1 + 20);
    assert_eq!(report.sessions[0].telemetry.cycle_marks.len(), 2);
}

#[test]
fn test_transient_failures_skip_ticks() {
    // reads 0 and 1 are the open and setup reads
    let mut bus = ScriptedBus::new().with_port(
        "A",
        PortScript {
            angles: vec![1000],
            failing_reads: vec![4, 5],
            ..PortScript::default()
        },
    );

    let report = run_demo(&mut bus, DemoKind::PositionControl, POSITION_ONE_PORT).unwrap();
    let session = &report.sessions[0];
    assert_eq!(session.summary.skipped, 2);
    assert_eq!(session.summary.ticks, 10);
    assert_eq!(session.telemetry.len(), 8);
    assert_eq!(session.summary.outcome, SessionOutcome::Completed);
}

// =============================================================================
// Two-position and high-speed streaming
// =============================================================================

#[test]
fn test_two_position_alternates_fixed_targets() {
    let params = r#"
ports = ["A"]
baud_rate = 230400
run_time = 1
transition_time = 0.3
delta = 500
gains = { kp = 50, ki = 0, kd = 0, K = 0, B = 0, ff = 0 }
"#;
    // measured position lags at 1200; the stored targets must not follow it
    let mut bus = ScriptedBus::new().with_port("A", PortScript::angles(&[1000, 1000, 1200]));
    let report = run_demo(&mut bus, DemoKind::TwoPositionControl, params).unwrap();

    let journal = bus.journal.borrow();
    let stiff: Vec<i32> = journal.gains_for("A").iter().map(|g| g.proportional).collect();
    assert_eq!(stiff, vec![50]);
    assert_eq!(
        journal.commands_for("A"),
        vec![
            (ControlMode::Position, 1000.0),
            (ControlMode::Position, 1500.0),
            (ControlMode::Position, 1000.0),
            (ControlMode::Position, 1500.0),
            (ControlMode::Position, 1000.0),
            (ControlMode::Voltage, 0.0),
        ]
    );

    let telemetry = &report.sessions[0].telemetry;
    assert_eq!(telemetry.len(), 10);
    let mut expected = vec![1500.0; 3];
    expected.extend([1000.0; 3]);
    expected.extend([1500.0; 3]);
    expected.push(1000.0);
    assert_eq!(telemetry.requests, expected);
    assert!(telemetry.measurements.iter().all(|m| *m == 1200.0));
}

fn high_speed_params(signal: &str) -> String {
    format!(
        r#"
ports = ["A"]
baud_rate = 230400
controller_type = "position"
signal_type = "{}"
signal_amplitude = 100
signal_freq = 1
cmd_freq = 5
request_jitter = false
jitter = 0
n_loops = 2
cycle_delay = 0.4
"#,
        signal
    )
}

#[test]
fn test_high_speed_position_offsets_commands_only() {
    // open read, offset read, then every tick reads 1040
    let mut bus = ScriptedBus::new().with_port("A", PortScript::angles(&[1000, 1000, 1040]));
    let report = run_demo(&mut bus, DemoKind::HighSpeed, &high_speed_params("sine")).unwrap();
    let table = generate("sine", 100.0, 1.0, 5.0, false, 0.0).unwrap();
    assert_eq!(table.len(), 5);

    let journal = bus.journal.borrow();
    let mut expected: Vec<(ControlMode, f64)> = Vec::new();
    for _ in 0..2 {
        expected.extend(table.iter().map(|v| (ControlMode::Position, v + 1000.0)));
    }
    expected.push((ControlMode::None, 0.0));
    assert_eq!(journal.commands_for("A"), expected);

    let session = &report.sessions[0];
    // 5 streamed ticks and 2 idle ticks per repetition
    assert_eq!(session.summary.ticks, 14);
    let telemetry = &session.telemetry;
    assert_eq!(telemetry.len(), 14);
    let mut requests = table.clone();
    requests.extend([table[4], table[4]]);
    assert_eq!(&telemetry.requests[..7], requests.as_slice());
    assert_eq!(&telemetry.requests[7..], requests.as_slice());
    assert!(telemetry.measurements.iter().all(|m| *m == 40.0));

    assert_eq!(telemetry.cycle_marks.len(), 2);
    assert!((telemetry.cycle_marks[0] - 1.4).abs() < 1e-9);
    assert!((telemetry.cycle_marks[1] - 2.8).abs() < 1e-9);
}

#[test]
fn test_high_speed_line_has_no_idle_gap() {
    let mut bus = ScriptedBus::new().with_port("A", PortScript::angles(&[1000, 1000, 1040]));
    let report = run_demo(&mut bus, DemoKind::HighSpeed, &high_speed_params("line")).unwrap();

    let session = &report.sessions[0];
    assert_eq!(session.summary.ticks, 10);
    assert_eq!(session.telemetry.len(), 10);
    assert_eq!(session.telemetry.cycle_marks.len(), 2);
    assert!((session.telemetry.cycle_marks[1] - 2.0).abs() < 1e-9);
}

// =============================================================================
// Cleanup on every exit path
// =============================================================================

#[test]
fn test_persistent_failure_aborts_and_closes_once() {
    let mut bus = ScriptedBus::new().with_port(
        "A",
        PortScript {
            angles: vec![1000],
            fail_reads_from: Some(2),
            ..PortScript::default()
        },
    );

    let err = run_demo(&mut bus, DemoKind::PositionControl, POSITION_ONE_PORT).unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Persistent { failures: 6, .. })
    ));

    let journal = bus.journal.borrow();
    assert_eq!(journal.close_count("A"), 1);
    assert_eq!(
        journal.commands_for("A").last(),
        Some(&(ControlMode::None, 0.0))
    );
}

#[test]
fn test_failing_reads_abort_despite_working_commands() {
    // current control commands every tick; only the reads fail
    let params = CURRENT_TWO_PORTS.replace(r#"["A", "B"]"#, r#"["A"]"#);
    let mut bus = ScriptedBus::new().with_port(
        "A",
        PortScript {
            fail_reads_from: Some(1),
            ..PortScript::default()
        },
    );

    let err = run_demo(&mut bus, DemoKind::CurrentControl, &params).unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Persistent { failures: 6, .. })
    ));

    let journal = bus.journal.borrow();
    let currents = journal
        .commands_for("A")
        .iter()
        .filter(|(m, _)| *m == ControlMode::Current)
        .count();
    assert_eq!(currents, 6);
    assert_eq!(journal.close_count("A"), 1);
    assert_eq!(
        journal.commands_for("A").last(),
        Some(&(ControlMode::None, 0.0))
    );
}

#[test]
fn test_long_port_name_rejected_before_opening() {
    let port = format!("/dev/serial/by-id/usb-Dephy_Inc_ActPack_Controller_{}", "0123456789".repeat(10));
    let params = format!(
        "ports = [\"{}\"]\nbaud_rate = 230400\nrun_time = 1\n",
        port
    );
    let mut bus = ScriptedBus::new();

    let err = run_demo(&mut bus, DemoKind::ReadOnly, &params).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidParameter { reason: "port name too long", .. })
    ));
    assert!(bus.journal.borrow().opened.is_empty());
}

#[test]
fn test_error_budget_is_configurable() {
    let params = format!("{}max_consecutive_errors = 1\n", POSITION_ONE_PORT);
    let mut bus = ScriptedBus::new().with_port(
        "A",
        PortScript {
            angles: vec![1000],
            fail_reads_from: Some(2),
            ..PortScript::default()
        },
    );

    let err = run_demo(&mut bus, DemoKind::PositionControl, &params).unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Persistent { failures: 2, .. })
    ));
}

#[test]
fn test_setup_failure_closes_once() {
    let mut bus = ScriptedBus::new().with_port(
        "A",
        PortScript {
            fail_gains: true,
            ..PortScript::default()
        },
    );

    let err = run_demo(&mut bus, DemoKind::PositionControl, POSITION_ONE_PORT).unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Setup { .. })));

    let journal = bus.journal.borrow();
    assert_eq!(journal.close_count("A"), 1);
    assert!(journal.commands_for("A").is_empty());
}

#[test]
fn test_panic_in_loop_still_closes() {
    let mut bus = ScriptedBus::new().with_port(
        "A",
        PortScript {
            angles: vec![1000],
            panic_on_read: Some(4),
            ..PortScript::default()
        },
    );

    let result = catch_unwind(AssertUnwindSafe(|| {
        run_demo(&mut bus, DemoKind::PositionControl, POSITION_ONE_PORT)
    }));
    assert!(result.is_err());

    let journal = bus.journal.borrow();
    assert_eq!(journal.close_count("A"), 1);
    assert_eq!(
        journal.commands_for("A").last(),
        Some(&(ControlMode::None, 0.0))
    );
}

#[test]
fn test_unsupported_app_type_closes() {
    let mut bus = ScriptedBus::new().with_port(
        "A",
        PortScript {
            app_type: 3,
            ..PortScript::default()
        },
    );

    let err = run_demo(&mut bus, DemoKind::ReadOnly, POSITION_ONE_PORT).unwrap_err();
    assert_eq!(err, Error::Unsupported(UnsupportedError::AppType(3)));
    assert_eq!(bus.journal.borrow().close_count("A"), 1);
}

#[test]
fn test_schema_failure_opens_nothing() {
    let missing = r#"
ports = ["A"]
baud_rate = 230400
run_time = 1
ramp_down_steps = 4
gains = { kp = 40, ki = 400, kd = 0, K = 0, B = 0, ff = 128 }
"#;
    let mut bus = ScriptedBus::new();
    let err = run_demo(&mut bus, DemoKind::CurrentControl, missing).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingParameter(ref name)) if name.as_str() == "hold_current"
    ));

    let mistyped = POSITION_ONE_PORT.replace("run_time = 1", "run_time = 1.0");
    let err = run_demo(&mut bus, DemoKind::PositionControl, &mistyped).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::TypeMismatch { .. })
    ));

    assert!(bus.journal.borrow().opened.is_empty());
}

// =============================================================================
// Interrupt and operator
// =============================================================================

static INTERRUPT: AtomicBool = AtomicBool::new(false);

#[test]
fn test_interrupt_stops_loop_and_remaining_ports() {
    let mut bus = ScriptedBus::new().with_port(
        "A",
        PortScript {
            angles: vec![1000],
            interrupt_on_read: Some((5, &INTERRUPT)),
            ..PortScript::default()
        },
    );
    let params = parse_parameters(&POSITION_ONE_PORT.replace(r#"["A"]"#, r#"["A", "B"]"#))
        .unwrap();

    let mut delay = NoopDelay::new();
    let mut operator = actuator_demos::AutoConfirm;
    let report = DemoRunner::new(&mut bus, &mut delay, &mut operator)
        .with_interrupt(&INTERRUPT)
        .run(DemoKind::PositionControl, params)
        .unwrap();

    assert_eq!(report.sessions.len(), 1);
    assert_eq!(report.sessions[0].summary.outcome, SessionOutcome::Interrupted);
    assert!(report.sessions[0].summary.ticks < 10);
    assert!(report.interrupted());

    let journal = bus.journal.borrow();
    assert_eq!(journal.opened, vec!["A".to_string()]);
    assert_eq!(journal.close_count("A"), 1);
}

struct DeclinePort(&'static str);

impl Operator for DeclinePort {
    fn confirm(&mut self, port: &str) -> bool {
        port != self.0
    }
}

#[test]
fn test_operator_can_skip_a_port() {
    let params = parse_parameters(&POSITION_ONE_PORT.replace(r#"["A"]"#, r#"["A", "B"]"#))
        .unwrap();
    let mut bus = ScriptedBus::new();
    let mut delay = NoopDelay::new();
    let mut operator = DeclinePort("A");

    let report = DemoRunner::new(&mut bus, &mut delay, &mut operator)
        .run(DemoKind::ReadOnly, params)
        .unwrap();

    assert_eq!(report.sessions.len(), 1);
    assert_eq!(report.sessions[0].port.as_str(), "B");
    assert_eq!(bus.journal.borrow().opened, vec!["B".to_string()]);
}

// =============================================================================
// Maintenance demos
// =============================================================================

#[test]
fn test_bootloader_times_out() {
    let params = r#"
ports = ["A"]
baud_rate = 230400
target = "Mn"
timeout = 10
"#;
    let mut bus = ScriptedBus::new().with_port(
        "A",
        PortScript {
            bootloader_after_polls: None,
            ..PortScript::default()
        },
    );

    let report = run_demo(&mut bus, DemoKind::Bootloader, params).unwrap();
    let summary = report.sessions[0].summary;
    assert_eq!(summary.outcome, SessionOutcome::BootloaderTimedOut);
    assert_eq!(summary.ticks, 10);

    let journal = bus.journal.borrow();
    // re-sent at 10 s and 5 s remaining
    assert_eq!(
        journal.activations,
        vec![("A".to_string(), 3), ("A".to_string(), 3)]
    );
    assert_eq!(journal.close_count("A"), 1);
}

#[test]
fn test_bootloader_activates() {
    let params = r#"
ports = ["A"]
baud_rate = 230400
target = "BT121"
timeout = 10
"#;
    let mut bus = ScriptedBus::new().with_port(
        "A",
        PortScript {
            bootloader_after_polls: Some(2),
            ..PortScript::default()
        },
    );

    let report = run_demo(&mut bus, DemoKind::Bootloader, params).unwrap();
    assert_eq!(
        report.sessions[0].summary.outcome,
        SessionOutcome::BootloaderActivated
    );
    assert_eq!(report.sessions[0].summary.ticks, 2);
}

#[test]
fn test_find_poles_per_port() {
    let params = r#"
ports = ["A", "B"]
baud_rate = 230400
"#;
    let mut bus = ScriptedBus::new();
    let report = run_demo(&mut bus, DemoKind::FindPoles, params).unwrap();

    assert!(report
        .sessions
        .iter()
        .all(|s| s.summary.outcome == SessionOutcome::PolesFound));
    let journal = bus.journal.borrow();
    assert!(journal.events.contains(&"find_poles A".to_string()));
    assert!(journal.events.contains(&"find_poles B".to_string()));
    assert_eq!(journal.closed, vec!["A".to_string(), "B".to_string()]);
}
