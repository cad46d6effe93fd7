//! Parameter values and the validated parameter bag.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::Deserialize;

use crate::error::{bounded, PortName, Result, ValidationError};

use super::gains::GainSet;

/// Type tag of a parameter value, as declared by a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// UTF-8 string
    String,
    /// Signed integer
    Integer,
    /// Floating-point number
    Float,
    /// Boolean flag
    Boolean,
    /// Ordered sequence of values
    Sequence,
    /// Nested name/value mapping
    Mapping,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::Boolean => "boolean",
            ParamType::Sequence => "sequence",
            ParamType::Mapping => "mapping",
        };
        f.write_str(name)
    }
}

/// A single parameter value as read from a parameter file.
///
/// Values are never coerced: an integer does not satisfy a float slot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag
    Boolean(bool),
    /// Signed integer
    Integer(i64),
    /// Floating-point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered sequence
    Sequence(Vec<ParamValue>),
    /// Nested mapping
    Mapping(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Type tag of this value.
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Boolean(_) => ParamType::Boolean,
            ParamValue::Integer(_) => ParamType::Integer,
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::String(_) => ParamType::String,
            ParamValue::Sequence(_) => ParamType::Sequence,
            ParamValue::Mapping(_) => ParamType::Mapping,
        }
    }

    /// Check whether this value is an instance of `ty`.
    #[inline]
    pub fn is(&self, ty: ParamType) -> bool {
        self.param_type() == ty
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Boolean(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(String::from(v))
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(v: Vec<ParamValue>) -> Self {
        ParamValue::Sequence(v)
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(v: BTreeMap<String, ParamValue>) -> Self {
        ParamValue::Mapping(v)
    }
}

/// Mapping from parameter name to value.
///
/// Produced once from the parameter file, checked against a
/// [`ParameterSchema`](super::ParameterSchema), then only read.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.values.insert(String::from(name), value.into());
    }

    /// Remove a value.
    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }

    /// Get a raw value by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Check if a parameter is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn require(&self, name: &str) -> Result<&ParamValue> {
        self.get(name)
            .ok_or_else(|| ValidationError::MissingParameter(bounded(name)).into())
    }

    /// Get an integer parameter.
    pub fn integer(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            ParamValue::Integer(v) => Ok(*v),
            other => Err(mismatch(name, ParamType::Integer, other)),
        }
    }

    /// Get a float parameter.
    pub fn float(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            ParamValue::Float(v) => Ok(*v),
            other => Err(mismatch(name, ParamType::Float, other)),
        }
    }

    /// Get a string parameter.
    pub fn string(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            ParamValue::String(v) => Ok(v.as_str()),
            other => Err(mismatch(name, ParamType::String, other)),
        }
    }

    /// Get a boolean parameter.
    pub fn boolean(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            ParamValue::Boolean(v) => Ok(*v),
            other => Err(mismatch(name, ParamType::Boolean, other)),
        }
    }

    /// Get a sequence parameter.
    pub fn sequence(&self, name: &str) -> Result<&[ParamValue]> {
        match self.require(name)? {
            ParamValue::Sequence(v) => Ok(v.as_slice()),
            other => Err(mismatch(name, ParamType::Sequence, other)),
        }
    }

    /// Get a mapping parameter.
    pub fn mapping(&self, name: &str) -> Result<&BTreeMap<String, ParamValue>> {
        match self.require(name)? {
            ParamValue::Mapping(v) => Ok(v),
            other => Err(mismatch(name, ParamType::Mapping, other)),
        }
    }

    /// Get an optional integer parameter.
    pub fn optional_integer(&self, name: &str) -> Result<Option<i64>> {
        if self.contains(name) {
            self.integer(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Get an optional float parameter.
    pub fn optional_float(&self, name: &str) -> Result<Option<f64>> {
        if self.contains(name) {
            self.float(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Get an optional gain mapping.
    pub fn optional_gains(&self, name: &str) -> Result<Option<GainSet>> {
        if self.contains(name) {
            self.gains(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Get an integer that must be strictly positive.
    pub fn positive_integer(&self, name: &str) -> Result<i64> {
        let v = self.integer(name)?;
        if v <= 0 {
            return Err(invalid(name, "must be greater than zero"));
        }
        Ok(v)
    }

    /// Get a strictly positive integer as a count.
    pub fn positive_count(&self, name: &str) -> Result<u32> {
        let v = self.positive_integer(name)?;
        u32::try_from(v).map_err(|_| invalid(name, "out of range"))
    }

    /// Get a float that must be strictly positive.
    pub fn positive_float(&self, name: &str) -> Result<f64> {
        let v = self.float(name)?;
        if v.is_nan() || v <= 0.0 {
            return Err(invalid(name, "must be greater than zero"));
        }
        Ok(v)
    }

    /// Get the `ports` list.
    ///
    /// Every entry must be a string that fits a [`PortName`] and at least
    /// one port is required. Names are never shortened.
    pub fn ports(&self) -> Result<Vec<PortName>> {
        let raw = self.sequence("ports")?;
        if raw.is_empty() {
            return Err(invalid("ports", "at least one port is required"));
        }
        raw.iter()
            .map(|p| match p {
                ParamValue::String(s) => PortName::try_from(s.as_str())
                    .map_err(|_| invalid("ports", "port name too long")),
                other => Err(mismatch("ports", ParamType::String, other)),
            })
            .collect()
    }

    /// Get the `baud_rate` as an unsigned rate.
    pub fn baud_rate(&self) -> Result<u32> {
        let v = self.positive_integer("baud_rate")?;
        u32::try_from(v).map_err(|_| invalid("baud_rate", "out of range"))
    }

    /// Get a gain mapping.
    pub fn gains(&self, name: &str) -> Result<GainSet> {
        GainSet::from_mapping(name, self.mapping(name)?)
    }
}

pub(crate) fn mismatch(name: &str, expected: ParamType, found: &ParamValue) -> crate::Error {
    ValidationError::TypeMismatch {
        name: bounded(name),
        expected,
        found: found.param_type(),
    }
    .into()
}

pub(crate) fn invalid(name: &str, reason: &'static str) -> crate::Error {
    ValidationError::InvalidParameter {
        name: bounded(name),
        reason,
    }
    .into()
}
