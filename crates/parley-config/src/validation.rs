//! Configuration validation.

use crate::schema::ParleyConfig;
use parley_common::ConfigError;

/// Run all validations on a config, collecting every error.
pub fn validate(config: &ParleyConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push("server.host must not be empty".into());
    } else if host.contains("://") {
        errors.push(format!("server.host = {host} must not include a scheme"));
    } else if host.contains('/') {
        errors.push(format!("server.host = {host} must not include a path"));
    }

    validate_range(
        &mut errors,
        "server.request_timeout_secs",
        config.server.request_timeout_secs,
        1,
        600,
    );
    validate_range(
        &mut errors,
        "server.connect_timeout_secs",
        config.server.connect_timeout_secs,
        1,
        600,
    );

    let auth = &config.auth;
    if auth.issuance_marker.is_empty() {
        errors.push("auth.issuance_marker must not be empty".into());
    }
    if !auth.refresh_path.starts_with('/') {
        errors.push(format!(
            "auth.refresh_path = {} must start with '/'",
            auth.refresh_path
        ));
    }
    // A refresh URL outside the marker would itself trigger refresh on 401.
    if !auth.issuance_marker.is_empty() && !auth.refresh_path.contains(&auth.issuance_marker) {
        errors.push(format!(
            "auth.refresh_path = {} must contain auth.issuance_marker = {}",
            auth.refresh_path, auth.issuance_marker
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate(&ParleyConfig::default()).is_ok());
    }

    #[test]
    fn catches_empty_host() {
        let mut config = ParleyConfig::default();
        config.server.host = "  ".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("server.host"));
    }

    #[test]
    fn catches_host_with_scheme_or_path() {
        let mut config = ParleyConfig::default();
        config.server.host = "ws://localhost:8000".into();
        assert!(validate(&config).unwrap_err().to_string().contains("scheme"));

        config.server.host = "localhost:8000/api".into();
        assert!(validate(&config).unwrap_err().to_string().contains("path"));
    }

    #[test]
    fn catches_timeout_out_of_range() {
        let mut config = ParleyConfig::default();
        config.server.request_timeout_secs = 0;
        config.server.connect_timeout_secs = 601;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("server.request_timeout_secs"));
        assert!(err.contains("server.connect_timeout_secs"));
    }

    #[test]
    fn refresh_path_must_be_covered_by_marker() {
        let mut config = ParleyConfig::default();
        config.auth.refresh_path = "/auth/renew/".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("auth.issuance_marker"));
    }

    #[test]
    fn refresh_path_must_be_absolute() {
        let mut config = ParleyConfig::default();
        config.auth.refresh_path = "auth/token/refresh/".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("must start with '/'"));
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = ParleyConfig::default();
        config.server.host = String::new();
        config.auth.issuance_marker = String::new();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("server.host"));
        assert!(err.contains("auth.issuance_marker"));
    }
}
