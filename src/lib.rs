pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{InstallProfile, RuntimeConfig};
pub use crate::core::installer::{Collaborators, InstallPlan, InstallSummary, Installer};
pub use domain::model::{InitSystemKind, InstallationContext};
pub use utils::error::{InstallError, Result};
