//! Startup checks.
//!
//! # Responsibilities
//! - Load and validate the configuration file
//! - Build the client whitelist
//!
//! # Design Decisions
//! - Fail fast: either error is fatal, including under `--config.check`
//! - Runs before any task is spawned or listener bound

use std::path::Path;

use crate::config::loader::ConfigError;
use crate::config::reload::reload_into;
use crate::config::store::SafeConfig;
use crate::security::whitelist::{IpWhitelist, WhitelistError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("error loading config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Whitelist(#[from] WhitelistError),
}

/// Everything the server needs that can be rejected before serving.
#[derive(Debug)]
pub struct Prepared {
    pub store: SafeConfig,
    pub whitelist: IpWhitelist,
}

pub fn prepare(config_file: &Path, whitelist: &str) -> Result<Prepared, StartupError> {
    let store = SafeConfig::default();
    reload_into(config_file, &store)?;

    let whitelist = IpWhitelist::parse(whitelist)?;
    tracing::info!(whitelist = %whitelist, "Access whitelist built");

    Ok(Prepared { store, whitelist })
}
