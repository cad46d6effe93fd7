//! Unit test harness for actuator-demos.
//!
//! Organizes the black-box tests of the public building blocks.

mod parameter_schema;
mod signal_generation;
