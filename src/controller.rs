//! Orchestration of generate / inspect / set / apply / reset.
//!
//! One controller owns the interface's `AppliedState` for the life of the
//! process. Operations run to completion one at a time; a failed operation
//! leaves the state as it was, and the controller stays usable.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{AppliedState, ControllerState, MacAddress};
use crate::error::{MacError, MacResult};
use crate::platform::NetworkBackend;
use crate::store::PersistenceStore;

pub struct MacController<B, S> {
    backend: B,
    store: S,
    restore_link_on_failure: bool,
    state: ControllerState,
    applied: AppliedState,
}

impl<B: NetworkBackend, S: PersistenceStore> MacController<B, S> {
    /// Create a controller and capture the interface's default address.
    ///
    /// The default is whatever the interface reports right now; if that
    /// can't be read the configured fallback is used instead.
    pub fn new(config: &Config, backend: B, store: S) -> Self {
        let interface = config.interface.clone();

        let default_address = match backend.read(&interface) {
            Ok(Some(mac)) => {
                debug!("Captured default address {} for {}", mac, interface);
                mac
            }
            Ok(None) => {
                warn!(
                    "No address reported for {}, using fallback {}",
                    interface, config.fallback_default
                );
                config.fallback_default
            }
            Err(e) => {
                warn!("{}; using fallback {}", e, config.fallback_default);
                config.fallback_default
            }
        };

        Self::with_default(config, backend, store, default_address)
    }

    /// Create a controller whose default address is `default_address`,
    /// without reading the interface.
    ///
    /// Used when the live address can't stand for the original one, e.g. a
    /// one-shot reset run after an earlier process already changed it.
    pub fn with_default(config: &Config, backend: B, store: S, default_address: MacAddress) -> Self {
        let applied = AppliedState::new(config.interface.clone(), default_address)
            .with_last_applied(store.load());

        Self {
            backend,
            store,
            restore_link_on_failure: config.restore_link_on_failure,
            state: ControllerState::Idle,
            applied,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn candidate(&self) -> Option<MacAddress> {
        self.state.current()
    }

    pub fn applied_state(&self) -> &AppliedState {
        &self.applied
    }

    pub fn interface(&self) -> &str {
        &self.applied.interface
    }

    pub fn default_address(&self) -> MacAddress {
        self.applied.default_address
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The value currently persisted in the store.
    pub fn last_saved(&self) -> Option<MacAddress> {
        self.store.load()
    }

    /// Stage a fresh random address.
    pub fn generate(&mut self) -> MacAddress {
        let mac = MacAddress::generate_random();
        self.transition(ControllerState::Candidate(mac));
        mac
    }

    /// Read the live address and stage it.
    pub fn inspect(&mut self) -> MacResult<MacAddress> {
        let label = self.applied.interface.clone();
        let mac = self
            .backend
            .read(&label)?
            .ok_or_else(|| MacError::Read {
                label: label.clone(),
                reason: "no MAC address reported".to_string(),
            })?;

        self.transition(ControllerState::Candidate(mac));
        Ok(mac)
    }

    /// Normalize `raw` and stage it.
    pub fn set_custom(&mut self, raw: &str) -> MacResult<MacAddress> {
        let mac = MacAddress::normalize(raw)?;
        self.transition(ControllerState::Candidate(mac));
        Ok(mac)
    }

    /// Apply the staged address.
    pub fn apply(&mut self) -> MacResult<MacAddress> {
        let mac = self.candidate().ok_or(MacError::NoCandidate)?;
        self.apply_address(mac)
    }

    /// Apply the address captured at startup, whatever is staged.
    pub fn reset(&mut self) -> MacResult<MacAddress> {
        self.apply_address(self.applied.default_address)
    }

    fn apply_address(&mut self, mac: MacAddress) -> MacResult<MacAddress> {
        let label = self.applied.interface.clone();

        if let Err(e) = self.backend.apply(&label, mac) {
            self.recover_link(&label, &e);
            return Err(e);
        }

        self.applied.last_applied = Some(mac);
        self.transition(ControllerState::Applied(mac));
        info!("Applied {} to {}", mac, label);

        // The OS change already happened; a failed save is reported but the state stays Applied
        self.store.save(mac)?;
        Ok(mac)
    }

    fn recover_link(&self, label: &str, err: &MacError) {
        if !self.restore_link_on_failure {
            return;
        }
        let Some(step) = err.failed_step() else {
            return;
        };
        if !step.follows_disable() {
            return;
        }

        warn!("Apply failed at '{}', trying to re-enable {}", step, label);
        if let Err(e) = self.backend.restore_link(label) {
            warn!("Could not re-enable {}: {}", label, e);
        }
    }

    fn transition(&mut self, next: ControllerState) {
        debug!("State: {} -> {}", self.state, next);
        self.state = next;
    }
}
