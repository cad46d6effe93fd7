//! Parameter schemas and validation.

use alloc::vec::Vec;

use crate::error::{bounded, Error, Result, ValidationError};

use super::value::{ParamType, ParameterSet};

/// Parameters every demo needs.
pub const COMMON_PARAMETERS: &[(&str, ParamType)] = &[
    ("ports", ParamType::Sequence),
    ("baud_rate", ParamType::Integer),
];

/// Names and types of the parameters a demo requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSchema {
    entries: &'static [(&'static str, ParamType)],
}

impl ParameterSchema {
    /// Create a schema from `(name, type)` pairs.
    pub const fn new(entries: &'static [(&'static str, ParamType)]) -> Self {
        Self { entries }
    }

    /// Declared `(name, type)` pairs in declaration order.
    pub fn entries(&self) -> &'static [(&'static str, ParamType)] {
        self.entries
    }

    /// Check whether `name` is declared.
    pub fn declares(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| *n == name)
    }

    /// Collect every violation, in declaration order.
    ///
    /// Does not stop at the first failure.
    pub fn violations(&self, data: &ParameterSet) -> Vec<ValidationError> {
        self.entries
            .iter()
            .filter_map(|(name, ty)| match data.get(name) {
                None => Some(ValidationError::MissingParameter(bounded(name))),
                Some(value) if !value.is(*ty) => Some(ValidationError::TypeMismatch {
                    name: bounded(name),
                    expected: *ty,
                    found: value.param_type(),
                }),
                Some(_) => None,
            })
            .collect()
    }

    /// Validate `data`, returning it unchanged on success.
    ///
    /// # Errors
    ///
    /// Returns the first violation in declaration order.
    pub fn validate(&self, data: ParameterSet) -> Result<ParameterSet> {
        match self.violations(&data).into_iter().next() {
            Some(violation) => Err(Error::Validation(violation)),
            None => Ok(data),
        }
    }
}

/// Validate a parameter set against a schema.
///
/// Checks:
/// - Every declared name is present
/// - Every declared value has the declared type (no coercion)
pub fn validate(schema: &ParameterSchema, data: ParameterSet) -> Result<ParameterSet> {
    schema.validate(data)
}
