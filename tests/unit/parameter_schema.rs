//! Schema validation properties over every demo schema.

use std::collections::BTreeMap;

use actuator_demos::error::{Error, ValidationError};
use actuator_demos::{DemoKind, ParamType, ParamValue, ParameterSet};
use proptest::prelude::*;

/// A value of `ty`.
fn value_of(ty: ParamType) -> ParamValue {
    match ty {
        ParamType::String => ParamValue::from("sine"),
        ParamType::Integer => ParamValue::from(3i64),
        ParamType::Float => ParamValue::from(0.5f64),
        ParamType::Boolean => ParamValue::from(false),
        ParamType::Sequence => ParamValue::from(vec![ParamValue::from("/dev/ttyACM0")]),
        ParamType::Mapping => ParamValue::from(BTreeMap::<String, ParamValue>::new()),
    }
}

/// A value that is not of `ty`.
fn value_not_of(ty: ParamType) -> ParamValue {
    match ty {
        ParamType::Integer => ParamValue::from(3.0f64),
        ParamType::Float => ParamValue::from(3i64),
        _ => ParamValue::from(7i64),
    }
}

fn complete_set(kind: DemoKind) -> ParameterSet {
    let mut set = ParameterSet::new();
    for (name, ty) in kind.schema().entries() {
        set.insert(name, value_of(*ty));
    }
    set
}

fn any_kind() -> impl Strategy<Value = DemoKind> {
    (0..DemoKind::ALL.len()).prop_map(|i| DemoKind::ALL[i])
}

#[test]
fn test_complete_sets_pass_unchanged() {
    for kind in DemoKind::ALL {
        let set = complete_set(kind).with("unrelated", true);
        assert_eq!(kind.schema().validate(set.clone()).unwrap(), set);
    }
}

#[test]
fn test_integer_never_satisfies_float() {
    let schema = DemoKind::TwoPositionControl.schema();
    let set = complete_set(DemoKind::TwoPositionControl).with("transition_time", 1i64);
    let err = schema.validate(set).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::TypeMismatch {
            expected: ParamType::Float,
            found: ParamType::Integer,
            ..
        })
    ));
}

proptest! {
    #[test]
    fn prop_dropping_any_declared_name_fails(kind in any_kind(), pick in any::<prop::sample::Index>()) {
        let schema = kind.schema();
        let (name, _) = schema.entries()[pick.index(schema.entries().len())];
        let mut set = complete_set(kind);
        set.remove(name);

        let violations = schema.violations(&set);
        prop_assert_eq!(violations.len(), 1);
        prop_assert!(
            matches!(&violations[0], ValidationError::MissingParameter(n) if n.as_str() == name),
            "unexpected violation"
        );
        prop_assert!(schema.validate(set).is_err());
    }

    #[test]
    fn prop_wrong_type_is_reported(kind in any_kind(), pick in any::<prop::sample::Index>()) {
        let schema = kind.schema();
        let (name, ty) = schema.entries()[pick.index(schema.entries().len())];
        let set = complete_set(kind).with(name, value_not_of(ty));

        let violations = schema.violations(&set);
        prop_assert_eq!(violations.len(), 1);
        prop_assert!(
            matches!(
                &violations[0],
                ValidationError::TypeMismatch { name: n, expected, .. }
                    if n.as_str() == name && *expected == ty
            ),
            "unexpected violation"
        );
    }

    #[test]
    fn prop_every_violation_is_collected(kind in any_kind(), mask in any::<u16>()) {
        let schema = kind.schema();
        let mut set = complete_set(kind);
        let mut dropped = 0;
        for (i, (name, _)) in schema.entries().iter().enumerate() {
            if mask & (1 << i) != 0 {
                set.remove(name);
                dropped += 1;
            }
        }
        prop_assert_eq!(schema.violations(&set).len(), dropped);
        prop_assert_eq!(schema.validate(set).is_ok(), dropped == 0);
    }
}
