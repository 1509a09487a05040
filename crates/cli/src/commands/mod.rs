//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::HubConfig;

use crate::error::CliError;

pub use info::run_info;
pub use run::run_workload;
pub use validate::run_validate;

/// Load configuration, failing early with a clear message when the file is missing
fn load_config(path: &Path) -> Result<HubConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
