//! Reporting of operation outcomes.
//!
//! This module defines the `StatusReporter` trait and provides a console
//! implementation. The controller never prints; callers hand its results
//! to a reporter.

mod console_reporter;

pub use console_reporter::ConsoleReporter;

use std::fmt;

use crate::domain::MacAddress;
use crate::error::MacError;

/// Caller-facing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Generate,
    Inspect,
    SetCustom,
    Apply,
    Reset,
    Saved,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Generate => write!(f, "generate"),
            Operation::Inspect => write!(f, "inspect"),
            Operation::SetCustom => write!(f, "set"),
            Operation::Apply => write!(f, "apply"),
            Operation::Reset => write!(f, "reset"),
            Operation::Saved => write!(f, "saved"),
        }
    }
}

/// Trait for reporting operation results (Interface Segregation Principle).
pub trait StatusReporter {
    /// An operation succeeded with `mac` as its result.
    fn report_address(&self, op: Operation, mac: MacAddress);

    /// An operation failed.
    fn report_error(&self, op: Operation, err: &MacError);

    /// Free-form informational line.
    fn report_info(&self, message: &str);
}
