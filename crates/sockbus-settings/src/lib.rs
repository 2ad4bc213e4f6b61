//! Layered configuration for the sockbus gateway.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. Compiled defaults — [`Settings::default()`]
//! 2. Optional JSON file (`SOCKBUS_CONFIG` path, deep-merged over defaults)
//! 3. Environment variables — `SOCKBUS_*` overrides (highest priority)

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_settings, load_settings_from_path};
pub use types::{BusKind, BusSettings, ServerSettings, Settings, SocketSettings};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let settings = Settings::default();
        assert_eq!(settings.bus.driver, BusKind::Memory);
    }
}
