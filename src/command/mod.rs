//! External command execution.
//!
//! Every change to network state and every readback goes through an OS
//! tool. This module defines the `CommandExecutor` trait so platform code
//! can be exercised against scripted output instead of a real adapter.

mod system;

pub use system::SystemExecutor;

use crate::error::CommandError;

/// What a finished external command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Trait for running external programs (Dependency Inversion Principle).
///
/// Implementations block until the program exits or their own time limit
/// is reached. A non-zero exit is not an error at this level; callers decide
/// what a failed status means.
pub trait CommandExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError>;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        (**self).run(program, args)
    }
}

/// Render a command line for logs and error messages.
pub fn render_command(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push('"');
            line.push_str(arg);
            line.push('"');
        } else {
            line.push_str(arg);
        }
    }
    line
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command_quotes_spaces() {
        assert_eq!(
            render_command("netsh", &["interface", "set", "interface", "Wi-Fi 2", "admin=disable"]),
            "netsh interface set interface \"Wi-Fi 2\" admin=disable"
        );
        assert_eq!(render_command("ip", &["link"]), "ip link");
    }

    #[test]
    fn test_success() {
        let ok = CommandOutput { status: Some(0), ..Default::default() };
        let failed = CommandOutput { status: Some(2), ..Default::default() };
        let killed = CommandOutput { status: None, ..Default::default() };
        assert!(ok.success());
        assert!(!failed.success());
        assert!(!killed.success());
    }
}
