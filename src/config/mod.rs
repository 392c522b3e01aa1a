//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//!     → store.rs (SafeConfig, shared via ArcSwap)
//!
//! On reload trigger (SIGHUP, POST /-/reload, file watcher):
//!     reload.rs queues the request
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<Config>
//!     → next request observes new config
//!
//! Per scrape:
//!     overrides.rs merges the `config` query fragment onto a module copy
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - A failed reload keeps the previous config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod overrides;
pub mod reload;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use reload::{ReloadController, ReloadError, ReloadHandle};
pub use schema::{Config, Module, ProberKind};
pub use store::SafeConfig;
