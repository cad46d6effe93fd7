//! Operator confirmation before a device is driven.

/// Asked before each port of a single-device demo is opened.
pub trait Operator {
    /// Return `false` to skip `port`.
    fn confirm(&mut self, port: &str) -> bool;
}

/// Confirms every port without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Operator for AutoConfirm {
    fn confirm(&mut self, _port: &str) -> bool {
        true
    }
}

/// Waits for ENTER on standard input. End of input skips the port.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinOperator;

#[cfg(feature = "std")]
impl Operator for StdinOperator {
    fn confirm(&mut self, port: &str) -> bool {
        use std::io::{BufRead, Write};

        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "Press 'ENTER' to continue with {}...", port);
        let _ = stdout.flush();

        let mut line = std::string::String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(n) => n > 0,
            Err(e) => {
                tracing::warn!(error = %e, "could not read operator input");
                false
            }
        }
    }
}
