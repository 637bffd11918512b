//! Storage initialization
//!
//! Handles first-run setup and the starter envelope set

use crate::config::paths::SharePaths;
use crate::config::settings::Settings;
use crate::error::EnvelopeError;
use crate::models::envelope::DEFAULT_ENVELOPES;
use crate::models::{Envelope, Money, ProfileId};

/// Initialize storage for a fresh installation
///
/// Creates the directory layout and writes `config.json` if it is missing.
/// Returns the settings in effect.
pub fn initialize_storage(paths: &SharePaths) -> Result<Settings, EnvelopeError> {
    paths.ensure_directories()?;

    let settings = Settings::load_or_create(paths)?;
    if !paths.settings_file().exists() {
        settings.save(paths)?;
    }

    Ok(settings)
}

/// Starter envelopes for a new profile, all with a zero target
pub fn default_envelopes(profile_id: ProfileId) -> Vec<Envelope> {
    DEFAULT_ENVELOPES
        .iter()
        .map(|(name, category)| Envelope::new(profile_id, *name, *category, Money::zero()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_writes_settings() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SharePaths::with_base_dir(temp_dir.path().to_path_buf());

        assert!(!paths.is_initialized());
        let settings = initialize_storage(&paths).unwrap();
        assert!(paths.is_initialized());
        assert_eq!(settings.default_currency, "USD");
    }

    #[test]
    fn test_initialize_keeps_existing_settings() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SharePaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();

        let settings = Settings {
            default_currency: "EUR".into(),
            ..Settings::default()
        };
        settings.save(&paths).unwrap();

        let loaded = initialize_storage(&paths).unwrap();
        assert_eq!(loaded.default_currency, "EUR");
    }

    #[test]
    fn test_default_envelopes() {
        let profile_id = ProfileId::new();
        let envelopes = default_envelopes(profile_id);

        assert_eq!(envelopes.len(), DEFAULT_ENVELOPES.len());
        assert!(envelopes.iter().all(|e| e.profile_id == profile_id));
        assert!(envelopes.iter().all(|e| e.spent.is_zero()));
        assert!(envelopes.iter().any(|e| e.name == "Groceries"));
    }
}
