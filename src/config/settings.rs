//! User settings for envelope-share
//!
//! Persisted as `config.json` in the base directory. Every field has a serde
//! default so older files keep loading after new settings are added.

use serde::{Deserialize, Serialize};

use super::paths::SharePaths;
use crate::error::EnvelopeError;

/// Settings for envelope-share
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Currency code used for new budget profiles
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// How long an invitation stays acceptable
    #[serde(default = "default_invitation_ttl_days")]
    pub invitation_ttl_days: u32,

    /// Tracing filter used when `ENVSHARE_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_invitation_ttl_days() -> u32 {
    7
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_currency: default_currency(),
            invitation_ttl_days: default_invitation_ttl_days(),
            log_filter: default_log_filter(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &SharePaths) -> Result<Self, EnvelopeError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Defaults are not persisted until `init` runs
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| EnvelopeError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| EnvelopeError::Config(format!("Failed to parse settings file: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &SharePaths) -> Result<(), EnvelopeError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| EnvelopeError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| EnvelopeError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.invitation_ttl_days == 0 {
            return Err(EnvelopeError::Config(
                "invitation_ttl_days must be at least 1".into(),
            ));
        }
        crate::models::profile::normalize_currency(&self.default_currency)
            .map_err(|e| EnvelopeError::Config(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.default_currency, "USD");
        assert_eq!(settings.invitation_ttl_days, 7);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SharePaths::with_base_dir(temp_dir.path().to_path_buf());

        let settings = Settings {
            default_currency: "EUR".into(),
            invitation_ttl_days: 14,
            ..Settings::default()
        };
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.default_currency, "EUR");
        assert_eq!(loaded.invitation_ttl_days, 14);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let loaded: Settings = serde_json::from_str(r#"{"default_currency":"GBP"}"#).unwrap();
        assert_eq!(loaded.default_currency, "GBP");
        assert_eq!(loaded.log_filter, "warn");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SharePaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();
        std::fs::write(paths.settings_file(), r#"{"invitation_ttl_days":0}"#).unwrap();

        assert!(matches!(
            Settings::load_or_create(&paths),
            Err(EnvelopeError::Config(_))
        ));
    }
}
