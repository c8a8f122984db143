//! Elevation check.
//!
//! Only used to warn early. A missing privilege still surfaces from the
//! backend as a `Permission` error when a step is refused.

use crate::command::CommandExecutor;

/// Whether this process can reconfigure network interfaces.
///
/// On Unix this is the effective uid alone; the executor is unused and only
/// keeps the signature the same on every platform.
#[cfg(unix)]
pub fn is_elevated<E: CommandExecutor>(_executor: &E) -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

/// Whether this process can reconfigure network interfaces.
///
/// `net session` only succeeds from an elevated prompt.
#[cfg(not(unix))]
pub fn is_elevated<E: CommandExecutor>(executor: &E) -> bool {
    executor
        .run("net", &["session"])
        .map(|output| output.success())
        .unwrap_or(false)
}
