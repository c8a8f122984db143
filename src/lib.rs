//! macswap - change a network interface's MAC address.
//!
//! The library resolves an interface label to the OS handle needed to
//! reconfigure it, applies a new hardware address through the platform's
//! privileged tools, reads back the address in effect, and remembers the
//! last address it applied.
//!
//! ```no_run
//! use macswap::{detect, Config, JsonFileStore, MacController, SystemExecutor};
//!
//! let config = Config::load()?;
//! let backend = detect(&config, SystemExecutor::new(config.command_timeout));
//! let store = JsonFileStore::new(&config.state_file);
//! let mut controller = MacController::new(&config, backend, store);
//!
//! controller.generate();
//! let applied = controller.apply()?;
//! println!("{}", applied);
//! # Ok::<(), macswap::MacError>(())
//! ```

pub mod command;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod platform;
pub mod privilege;
pub mod reporter;
pub mod store;

pub use command::{CommandExecutor, CommandOutput, SystemExecutor};
pub use config::Config;
pub use controller::MacController;
pub use domain::{AppliedState, ControllerState, MacAddress};
pub use error::{ApplyStep, CommandError, ErrorKind, MacError, MacResult};
pub use platform::{detect, InterfaceHandle, NetworkBackend};
pub use reporter::{ConsoleReporter, Operation, StatusReporter};
pub use store::{JsonFileStore, PersistenceStore};
