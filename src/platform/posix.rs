//! Link-layer backend for Linux, macOS and the BSDs.
//!
//! Interfaces are identified by name, so resolution is the identity.
//! Whether the name exists is discovered by the tools themselves.

use tracing::{debug, info};

use super::{parse, read_failure, run_step, InterfaceHandle, NetworkBackend};
use crate::command::CommandExecutor;
use crate::domain::MacAddress;
use crate::error::{ApplyStep, MacError, MacResult};

/// Which link configuration tool to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTool {
    /// iproute2 `ip link` (Linux).
    IpRoute2,
    /// BSD-style `ifconfig <if> <keyword> <mac>`; the keyword is `ether` on
    /// macOS and FreeBSD, `lladdr` on OpenBSD and NetBSD.
    Ifconfig { address_keyword: &'static str },
}

impl LinkTool {
    pub fn for_host() -> Self {
        if cfg!(target_os = "linux") {
            LinkTool::IpRoute2
        } else if cfg!(any(target_os = "openbsd", target_os = "netbsd")) {
            LinkTool::Ifconfig { address_keyword: "lladdr" }
        } else {
            LinkTool::Ifconfig { address_keyword: "ether" }
        }
    }

    fn program(&self) -> &'static str {
        match self {
            LinkTool::IpRoute2 => "ip",
            LinkTool::Ifconfig { .. } => "ifconfig",
        }
    }

    fn show_args<'a>(&self, label: &'a str) -> Vec<&'a str> {
        match self {
            LinkTool::IpRoute2 => vec!["link", "show", "dev", label],
            LinkTool::Ifconfig { .. } => vec![label],
        }
    }

    fn state_args<'a>(&self, label: &'a str, state: &'a str) -> Vec<&'a str> {
        match self {
            LinkTool::IpRoute2 => vec!["link", "set", "dev", label, state],
            LinkTool::Ifconfig { .. } => vec![label, state],
        }
    }

    fn address_args<'a>(&self, label: &'a str, mac: &'a str) -> Vec<&'a str> {
        match self {
            LinkTool::IpRoute2 => vec!["link", "set", "dev", label, "address", mac],
            LinkTool::Ifconfig { address_keyword } => vec![label, *address_keyword, mac],
        }
    }
}

/// Backend that reconfigures a link by name.
pub struct PosixBackend<E> {
    executor: E,
    tool: LinkTool,
    use_sudo: bool,
}

impl<E: CommandExecutor> PosixBackend<E> {
    pub fn new(executor: E, tool: LinkTool) -> Self {
        Self {
            executor,
            tool,
            use_sudo: false,
        }
    }

    /// Prefix mutating commands with non-interactive `sudo`.
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    pub fn tool(&self) -> LinkTool {
        self.tool
    }

    fn run_privileged(&self, label: &str, step: ApplyStep, args: &[&str]) -> MacResult<()> {
        let program = self.tool.program();
        if self.use_sudo {
            let mut sudo_args = vec!["-n", program];
            sudo_args.extend_from_slice(args);
            run_step(&self.executor, label, step, "sudo", &sudo_args)?;
        } else {
            run_step(&self.executor, label, step, program, args)?;
        }
        Ok(())
    }

    fn check_label(label: &str) -> MacResult<()> {
        // Refuse anything a tool would take for an option or that can't be a name
        if label.is_empty() || label.starts_with('-') || label.contains(char::is_whitespace) {
            return Err(MacError::AmbiguousOrUnsupported {
                label: label.to_string(),
                reason: "not a valid interface name".to_string(),
            });
        }
        Ok(())
    }
}

impl<E: CommandExecutor> NetworkBackend for PosixBackend<E> {
    fn name(&self) -> &'static str {
        match self.tool {
            LinkTool::IpRoute2 => "linux",
            LinkTool::Ifconfig { .. } => "bsd",
        }
    }

    fn resolve(&self, label: &str) -> MacResult<InterfaceHandle> {
        Self::check_label(label)?;
        Ok(InterfaceHandle::Name(label.to_string()))
    }

    fn read(&self, label: &str) -> MacResult<Option<MacAddress>> {
        Self::check_label(label)?;

        let program = self.tool.program();
        let output = self
            .executor
            .run(program, &self.tool.show_args(label))
            .map_err(|e| MacError::Read {
                label: label.to_string(),
                reason: e.to_string(),
            })?;

        if !output.success() {
            return Err(read_failure(label, &output));
        }

        let mac = parse::link_ether_token(&output.stdout);
        debug!("Live address of {}: {:?}", label, mac);
        Ok(mac)
    }

    fn apply(&self, label: &str, mac: MacAddress) -> MacResult<()> {
        let handle = self.resolve(label)?;
        let text = mac.to_string();
        debug!("Applying {} to {}", text, handle);

        self.run_privileged(label, ApplyStep::LinkDown, &self.tool.state_args(label, "down"))?;
        self.run_privileged(label, ApplyStep::SetAddress, &self.tool.address_args(label, &text))?;
        self.run_privileged(label, ApplyStep::LinkUp, &self.tool.state_args(label, "up"))?;

        info!("MAC address of {} changed to {}", label, text);
        Ok(())
    }

    fn restore_link(&self, label: &str) -> MacResult<()> {
        Self::check_label(label)?;
        self.run_privileged(label, ApplyStep::LinkUp, &self.tool.state_args(label, "up"))
    }
}
