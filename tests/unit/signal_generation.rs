//! Command table and ramp generation.

use actuator_demos::error::{Error, UnsupportedError};
use actuator_demos::signal::{generate, ramp_down_currents, ramp_voltages};
use proptest::prelude::*;

#[test]
fn test_sine_table_reference() {
    let table = generate("sine", 100.0, 1.0, 5.0, false, 0.0).unwrap();
    let expected = [0.0, -100.0, 0.0, 100.0, 0.0];
    assert_eq!(table.len(), expected.len());
    for (got, want) in table.iter().zip(expected) {
        assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
    }
}

#[test]
fn test_line_ignores_requested_frequency() {
    let a = generate("line", 50.0, 3.0, 40.0, false, 0.0).unwrap();
    let b = generate("line", 50.0, 9.0, 40.0, false, 0.0).unwrap();
    assert_eq!(a.len(), 40);
    assert_eq!(a, b);
}

#[test]
fn test_jittered_tables_repeat() {
    let first = generate("sine", 500.0, 1.0, 100.0, true, 20.0).unwrap();
    let second = generate("sine", 500.0, 1.0, 100.0, true, 20.0).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unknown_signal() {
    assert!(matches!(
        generate("triangle", 1.0, 1.0, 10.0, false, 0.0),
        Err(Error::Unsupported(UnsupportedError::Signal(ref s))) if s.as_str() == "triangle"
    ));
}

#[test]
fn test_voltage_ramp_reference() {
    assert_eq!(
        ramp_voltages(2.0, 2, 100.0).unwrap(),
        vec![0.0, -20.0, -40.0, -60.0, -80.0]
    );
}

proptest! {
    #[test]
    fn prop_sine_stays_within_amplitude(
        amplitude in 0.0f64..5000.0,
        signal_freq in 1u32..20,
        sample_freq in 20u32..1000,
    ) {
        let table = generate("sine", amplitude, f64::from(signal_freq), f64::from(sample_freq), false, 0.0).unwrap();
        prop_assert_eq!(table.len(), (sample_freq / signal_freq) as usize);
        prop_assert!(table.iter().all(|v| v.abs() <= amplitude + 1e-9));
    }

    #[test]
    fn prop_voltage_ramp_starts_at_zero_and_falls(
        run_time in 1u32..60,
        cycles in 1i64..5,
        max_voltage in 1.0f64..10000.0,
    ) {
        if let Ok(ramp) = ramp_voltages(f64::from(run_time), cycles, max_voltage) {
            prop_assert_eq!(ramp[0], 0.0);
            prop_assert!(ramp.windows(2).all(|w| w[1] < w[0]));
            prop_assert!(ramp.iter().all(|v| *v > -max_voltage));
        }
    }

    #[test]
    fn prop_current_ramp_ends_at_zero(hold in -5000.0f64..5000.0, steps in 1u32..50) {
        let ramp = ramp_down_currents(hold, steps);
        prop_assert_eq!(ramp.len(), steps as usize);
        prop_assert_eq!(*ramp.last().unwrap(), 0.0);
        prop_assert!(ramp.iter().all(|v| v.abs() <= hold.abs()));
    }
}
