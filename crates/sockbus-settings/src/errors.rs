//! Failure modes of loading and validating gateway settings. Only
//! three things can go wrong: the file named by `SOCKBUS_CONFIG` is
//! unreadable, its contents are not JSON, or the merged result fails
//! `Settings::validate()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The merged settings are inconsistent, e.g. a pong wait that
    /// does not exceed the ping interval or a zero-capacity queue.
    #[error("settings rejected: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Settings;

    #[test]
    fn validate_failure_names_the_offending_values() {
        let mut settings = Settings::default();
        settings.socket.ping_interval_ms = 30_000;
        settings.socket.pong_wait_ms = 30_000;
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
        assert!(err.to_string().contains("pong_wait_ms"));
        assert!(err.to_string().contains("30000"));
    }

    #[test]
    fn json_failure_converts_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err: SettingsError = json_err.into();
        assert!(err.to_string().starts_with("settings file is not valid JSON"));
    }
}
