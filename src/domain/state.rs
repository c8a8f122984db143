//! Controller state.

use std::fmt;

use super::MacAddress;

/// Where the controller stands with respect to its candidate address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Nothing staged yet.
    Idle,
    /// An address is staged in memory but not applied.
    Candidate(MacAddress),
    /// The last apply or reset succeeded with this address.
    Applied(MacAddress),
}

impl ControllerState {
    /// The address staged or last applied, if any.
    pub fn current(&self) -> Option<MacAddress> {
        match self {
            ControllerState::Idle => None,
            ControllerState::Candidate(mac) | ControllerState::Applied(mac) => Some(*mac),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ControllerState::Applied(_))
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Idle => write!(f, "idle"),
            ControllerState::Candidate(mac) => write!(f, "candidate {}", mac),
            ControllerState::Applied(mac) => write!(f, "applied {}", mac),
        }
    }
}

/// What has been applied to an interface during this process's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedState {
    /// The interface label every operation targets.
    pub interface: String,
    /// Last address successfully applied, including one persisted by an
    /// earlier process.
    pub last_applied: Option<MacAddress>,
    /// Address captured at startup, or the configured fallback.
    pub default_address: MacAddress,
}

impl AppliedState {
    pub fn new(interface: impl Into<String>, default_address: MacAddress) -> Self {
        Self {
            interface: interface.into(),
            last_applied: None,
            default_address,
        }
    }

    pub fn with_last_applied(mut self, last_applied: Option<MacAddress>) -> Self {
        self.last_applied = last_applied;
        self
    }
}
