//! Persistence of the last applied MAC address.
//!
//! This module defines the `PersistenceStore` trait and a JSON file
//! implementation. The store holds exactly one value.

mod json_store;

pub use json_store::JsonFileStore;

use crate::domain::MacAddress;
use crate::error::MacResult;

/// Trait for single-value address stores (Dependency Inversion Principle).
pub trait PersistenceStore {
    /// The saved address, or `None` if nothing usable is stored.
    fn load(&self) -> Option<MacAddress>;

    fn save(&self, mac: MacAddress) -> MacResult<()>;
}

impl<S: PersistenceStore + ?Sized> PersistenceStore for &S {
    fn load(&self) -> Option<MacAddress> {
        (**self).load()
    }

    fn save(&self, mac: MacAddress) -> MacResult<()> {
        (**self).save(mac)
    }
}
