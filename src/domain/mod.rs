//! Domain models for MAC address changing.
//!
//! This module contains the core value types that are independent
//! of any platform or storage concerns.

mod address;
mod state;

pub use address::MacAddress;
pub use state::{AppliedState, ControllerState};
