//! Platform network backends.
//!
//! This module defines the `NetworkBackend` trait: resolve an interface
//! label to an OS handle, read its live MAC address, and apply a new one.
//! Windows reconfigures the adapter through its registry key; Linux, macOS
//! and the BSDs reconfigure the link by name. The backend is picked once at
//! startup by `detect` and injected into the controller.

pub mod parse;
mod posix;
mod windows;

pub use posix::{LinkTool, PosixBackend};
pub use windows::{WindowsBackend, ADAPTER_CLASS_CONTAINER, MAX_ADAPTER_SUBKEYS};

use std::fmt;

use tracing::debug;

use crate::command::{render_command, CommandExecutor, CommandOutput};
use crate::config::Config;
use crate::domain::MacAddress;
use crate::error::{ApplyStep, CommandError, MacError, MacResult};

/// OS-level identity of a network adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceHandle {
    /// Full path of the adapter's configuration key under the network
    /// adapter class container (Windows).
    RegistryKey(String),
    /// The interface name itself (Unix-like).
    Name(String),
}

impl fmt::Display for InterfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceHandle::RegistryKey(path) => write!(f, "{}", path),
            InterfaceHandle::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Trait for platform network backends (Dependency Inversion Principle).
///
/// Every tooling failure is converted to a `MacError` before it leaves the
/// backend.
pub trait NetworkBackend {
    /// Short name for logs, e.g. "windows".
    fn name(&self) -> &'static str;

    /// Map an interface label to the handle needed for mutation.
    ///
    /// Never cached; adapters can be renamed between calls.
    fn resolve(&self, label: &str) -> MacResult<InterfaceHandle>;

    /// Read the address currently in effect.
    ///
    /// `Ok(None)` means the tool ran fine but reported no address for `label`.
    fn read(&self, label: &str) -> MacResult<Option<MacAddress>>;

    /// Disable the interface, write `mac`, and re-enable it.
    ///
    /// The first failing step aborts the sequence. Earlier steps are not
    /// undone, so a failure after the disable step can leave the interface
    /// down.
    fn apply(&self, label: &str, mac: MacAddress) -> MacResult<()>;

    /// Best-effort re-enable after a failed apply.
    fn restore_link(&self, label: &str) -> MacResult<()>;
}

impl<B: NetworkBackend + ?Sized> NetworkBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resolve(&self, label: &str) -> MacResult<InterfaceHandle> {
        (**self).resolve(label)
    }

    fn read(&self, label: &str) -> MacResult<Option<MacAddress>> {
        (**self).read(label)
    }

    fn apply(&self, label: &str, mac: MacAddress) -> MacResult<()> {
        (**self).apply(label, mac)
    }

    fn restore_link(&self, label: &str) -> MacResult<()> {
        (**self).restore_link(label)
    }
}

/// Pick the backend for the platform this binary was built for.
pub fn detect<E>(config: &Config, executor: E) -> Box<dyn NetworkBackend>
where
    E: CommandExecutor + 'static,
{
    if cfg!(windows) {
        debug!("Using Windows registry backend");
        Box::new(WindowsBackend::new(executor))
    } else {
        let tool = LinkTool::for_host();
        debug!("Using {:?} link backend", tool);
        Box::new(PosixBackend::new(executor, tool).with_sudo(config.use_sudo))
    }
}

const PERMISSION_MARKERS: &[&str] = &[
    "operation not permitted",
    "permission denied",
    "access is denied",
    "requires elevation",
    "run as administrator",
    "must be root",
    "a password is required",
    "a terminal is required",
];

const MISSING_DEVICE_MARKERS: &[&str] = &[
    "does not exist",
    "no such device",
    "cannot find device",
    "no such interface",
    "not found",
];

/// The most useful text a failed command produced.
///
/// Some Windows tools (`netsh`) report errors on stdout.
pub(crate) fn failure_detail(output: &CommandOutput) -> String {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        output.stdout.trim().to_string()
    } else {
        stderr.to_string()
    }
}

pub(crate) fn is_permission_denied(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    PERMISSION_MARKERS.iter().any(|m| lower.contains(m))
}

pub(crate) fn is_missing_device(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    // "sudo: ip: command not found" is a missing tool, not a missing device
    if lower.contains("command not found") {
        return false;
    }
    MISSING_DEVICE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Run one step of an apply sequence, converting failure into the right error kind.
pub(crate) fn run_step<E: CommandExecutor>(
    executor: &E,
    label: &str,
    step: ApplyStep,
    program: &str,
    args: &[&str],
) -> MacResult<CommandOutput> {
    let command = render_command(program, args);
    debug!("{}: {}", step, command);

    let output = executor.run(program, args).map_err(|e| step_spawn_error(step, &command, e))?;

    if output.success() {
        return Ok(output);
    }

    let detail = failure_detail(&output);
    if is_permission_denied(&detail) {
        return Err(MacError::Permission { step, detail });
    }
    if is_missing_device(&detail) {
        return Err(MacError::InterfaceNotFound(label.to_string()));
    }

    Err(MacError::Apply {
        step,
        command,
        status: output.status,
        stderr: detail,
    })
}

fn step_spawn_error(step: ApplyStep, command: &str, err: CommandError) -> MacError {
    let stderr = err.to_string();
    if let CommandError::Spawn { source, .. } = &err {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return MacError::Permission { step, detail: stderr };
        }
    }
    MacError::Apply {
        step,
        command: command.to_string(),
        status: None,
        stderr,
    }
}

/// Convert a readback tool failure into `Read` or `InterfaceNotFound`.
pub(crate) fn read_failure(label: &str, output: &CommandOutput) -> MacError {
    let detail = failure_detail(output);
    if is_missing_device(&detail) {
        return MacError::InterfaceNotFound(label.to_string());
    }
    MacError::Read {
        label: label.to_string(),
        reason: format!("exit status {:?}: {}", output.status, detail),
    }
}
