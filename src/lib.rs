pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::{Overrides, Settings, TomlConfig};

pub use adapters::{ApiClient, FileSessionStore, LocalStorage, MemorySessionStore};
pub use core::auth::AuthFlow;
pub use core::dashboard::{Dashboard, DashboardState, DashboardView};
pub use utils::error::{DashError, Result};
