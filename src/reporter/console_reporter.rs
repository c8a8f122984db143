//! Console-based status reporter.

use std::io::{self, Write};

use crate::domain::MacAddress;
use crate::error::MacError;
use crate::reporter::{Operation, StatusReporter};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

/// Reports results to the terminal.
///
/// Results go to stdout, failures to stderr.
pub struct ConsoleReporter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Print only the bare address on success
    quiet: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter.
    pub fn new() -> Self {
        Self {
            use_colors: true,
            quiet: false,
        }
    }

    /// Enable or disable colored output.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Print only addresses, for scripts.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn paint(&self, color: &str, text: String) -> String {
        if self.use_colors {
            format!("{}{}{}", color, text, RESET)
        } else {
            text
        }
    }

    fn format_address(&self, op: Operation, mac: MacAddress) -> String {
        if self.quiet {
            return mac.to_string();
        }

        match op {
            Operation::Generate => self.paint(BLUE, format!("Generated new MAC: {}", mac)),
            Operation::Inspect => self.paint(BLUE, format!("Current MAC: {}", mac)),
            Operation::SetCustom => self.paint(GREEN, format!("Custom MAC set: {}", mac)),
            Operation::Apply => self.paint(GREEN, format!("Applied MAC: {}", mac)),
            Operation::Reset => self.paint(GREEN, format!("Reset MAC to {}", mac)),
            Operation::Saved => self.paint(BLUE, format!("Saved MAC: {}", mac)),
        }
    }

    fn format_error(&self, op: Operation, err: &MacError) -> String {
        let mut output = self.paint(RED, format!("{} failed [{}]: {}", op, err.kind(), err));

        // Point at the likely fix for the recoverable kinds
        match err {
            MacError::Permission { .. } => {
                output.push_str("\n  hint: re-run as root/Administrator or pass --sudo");
            }
            MacError::Apply { step, .. } if step.follows_disable() => {
                output.push_str("\n  hint: the interface may have been left disabled");
            }
            MacError::NoCandidate => {
                output.push_str("\n  hint: run generate, inspect or set first");
            }
            _ => {}
        }

        output
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for ConsoleReporter {
    fn report_address(&self, op: Operation, mac: MacAddress) {
        let output = self.format_address(op, mac);
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", output);
    }

    fn report_error(&self, op: Operation, err: &MacError) {
        let output = self.format_error(op, err);
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{}", output);
    }

    fn report_info(&self, message: &str) {
        if !self.quiet {
            println!("{}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApplyStep;

    fn mac() -> MacAddress {
        MacAddress::new([0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee])
    }

    #[test]
    fn test_format_address_plain() {
        let reporter = ConsoleReporter::new().with_colors(false);
        assert_eq!(
            reporter.format_address(Operation::Apply, mac()),
            "Applied MAC: 02:AA:BB:CC:DD:EE"
        );
        assert_eq!(
            reporter.format_address(Operation::Reset, mac()),
            "Reset MAC to 02:AA:BB:CC:DD:EE"
        );
    }

    #[test]
    fn test_format_address_colored() {
        let reporter = ConsoleReporter::new();
        let output = reporter.format_address(Operation::SetCustom, mac());
        assert!(output.starts_with(GREEN));
        assert!(output.ends_with(RESET));
    }

    #[test]
    fn test_quiet_prints_bare_address() {
        let reporter = ConsoleReporter::new().with_quiet(true);
        assert_eq!(
            reporter.format_address(Operation::Generate, mac()),
            "02:AA:BB:CC:DD:EE"
        );
    }

    #[test]
    fn test_format_error_hints() {
        let reporter = ConsoleReporter::new().with_colors(false);

        let denied = MacError::Permission {
            step: ApplyStep::LinkDown,
            detail: "Operation not permitted".to_string(),
        };
        let output = reporter.format_error(Operation::Apply, &denied);
        assert!(output.starts_with("apply failed [PermissionError]"));
        assert!(output.contains("--sudo"));

        let partial = MacError::Apply {
            step: ApplyStep::WriteAddress,
            command: "reg add".to_string(),
            status: Some(1),
            stderr: String::new(),
        };
        assert!(reporter
            .format_error(Operation::Reset, &partial)
            .contains("left disabled"));

        let format = MacError::Format("zz".to_string());
        assert!(!reporter.format_error(Operation::SetCustom, &format).contains("hint"));
    }
}
