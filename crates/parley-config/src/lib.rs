//! Parley configuration.
//!
//! TOML-based configuration for the chat session core: which server to
//! talk to, where the credential-refresh endpoint lives, and the default
//! log filter. Every section has defaults so partial files work.
//!
//! ```rust,no_run
//! use parley_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.server.ws_base());
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{AuthConfig, LoggingConfig, ParleyConfig, ServerConfig};
pub use toml_loader::{default_config_path, load_from_path};

use parley_common::ConfigError;

/// Load config from the platform default path, creating it if missing.
pub fn load_config() -> Result<ParleyConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &ParleyConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
