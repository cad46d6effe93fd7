//! Parameter module for actuator-demos.
//!
//! Provides the untyped parameter bag read from a parameter file, the
//! per-demo schemas that validate it, and the typed views the control
//! loops consume.

mod gains;
#[cfg(feature = "std")]
mod loader;
mod schema;
pub(crate) mod value;

pub use gains::GainSet;
pub use schema::{validate, ParameterSchema, COMMON_PARAMETERS};
pub use value::{ParamType, ParamValue, ParameterSet};

#[cfg(feature = "std")]
pub use loader::{load_parameters, parse_parameters};
