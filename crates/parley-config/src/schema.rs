//! Configuration schema.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Where the conversation service lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `host[:port]`, shared by the REST API and the WebSocket endpoint.
    pub host: String,
    /// Use `https://` and `wss://` instead of `http://` and `ws://`.
    pub secure: bool,
    pub request_timeout_secs: u32,
    pub connect_timeout_secs: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost:8000".into(),
            secure: false,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Base URL for REST calls, without a trailing slash.
    pub fn http_base(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}", self.host)
    }

    /// Base URL for the real-time transport, without a trailing slash.
    pub fn ws_base(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}", self.host)
    }
}

/// Credential refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Path of the credential-refresh endpoint.
    pub refresh_path: String,
    /// Any request URL containing this marker is a credential-issuance call
    /// and never triggers a refresh on 401.
    pub issuance_marker: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_path: "/auth/token/refresh/".into(),
            issuance_marker: "/token/".into(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "parley=info".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_urls_by_default() {
        let server = ServerConfig::default();
        assert_eq!(server.http_base(), "http://localhost:8000");
        assert_eq!(server.ws_base(), "ws://localhost:8000");
    }

    #[test]
    fn secure_switches_both_schemes() {
        let server = ServerConfig {
            host: "chat.example.com".into(),
            secure: true,
            ..ServerConfig::default()
        };
        assert_eq!(server.http_base(), "https://chat.example.com");
        assert_eq!(server.ws_base(), "wss://chat.example.com");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: ParleyConfig = toml::from_str(
            r#"
[server]
secure = true
"#,
        )
        .unwrap();
        assert!(config.server.secure);
        assert_eq!(config.server.host, "localhost:8000");
        assert_eq!(config.auth.issuance_marker, "/token/");
        assert_eq!(config.logging.filter, "parley=info");
    }
}
