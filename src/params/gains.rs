//! Controller gain sets.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::error::{bounded, Result, ValidationError};

use super::value::{invalid, mismatch, ParamType, ParamValue};

/// Feedback controller coefficients applied to one device.
///
/// In parameter files a gain set is a mapping with the keys
/// `kp`, `ki`, `kd`, `K`, `B` and `ff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GainSet {
    /// Proportional gain (`kp`).
    pub proportional: i32,
    /// Integral gain (`ki`).
    pub integral: i32,
    /// Derivative gain (`kd`).
    pub derivative: i32,
    /// Impedance stiffness (`K`).
    pub stiffness: i32,
    /// Impedance damping (`B`).
    pub damping: i32,
    /// Feed-forward term (`ff`).
    pub feedforward: i32,
}

impl GainSet {
    /// All gains zero. Used to release a device.
    pub const ZERO: GainSet = GainSet::new(0, 0, 0, 0, 0, 0);

    /// Create a gain set in device order: kp, ki, kd, K, B, ff.
    pub const fn new(
        proportional: i32,
        integral: i32,
        derivative: i32,
        stiffness: i32,
        damping: i32,
        feedforward: i32,
    ) -> Self {
        Self {
            proportional,
            integral,
            derivative,
            stiffness,
            damping,
            feedforward,
        }
    }

    /// Build from a parameter-file mapping.
    ///
    /// All six keys are required and must be integers that fit in an `i32`.
    pub fn from_mapping(name: &str, map: &BTreeMap<String, ParamValue>) -> Result<Self> {
        let field = |key: &str| -> Result<i32> {
            let mut full: heapless::String<32> = bounded(name);
            let _ = full.push('.');
            let _ = full.push_str(key);
            match map.get(key) {
                None => Err(ValidationError::MissingParameter(full).into()),
                Some(ParamValue::Integer(v)) => {
                    i32::try_from(*v).map_err(|_| invalid(full.as_str(), "gain out of range"))
                }
                Some(other) => Err(mismatch(full.as_str(), ParamType::Integer, other)),
            }
        };

        Ok(Self {
            proportional: field("kp")?,
            integral: field("ki")?,
            derivative: field("kd")?,
            stiffness: field("K")?,
            damping: field("B")?,
            feedforward: field("ff")?,
        })
    }

    /// Return a copy with the stiffness raised by `step`.
    #[inline]
    pub fn with_stiffness_step(self, step: i32) -> Self {
        Self {
            stiffness: self.stiffness.saturating_add(step),
            ..self
        }
    }
}
