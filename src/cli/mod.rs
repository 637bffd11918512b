//! CLI command handlers
//!
//! This module contains the implementation of CLI commands, bridging the
//! clap argument parsing with the service layer. The caller's identity and
//! profile are resolved once here and passed to services explicitly.

pub mod envelope;
pub mod profile;
pub mod transaction;
pub mod user;

pub use envelope::{handle_envelope_command, EnvelopeCommands};
pub use profile::{
    handle_invite_command, handle_member_command, handle_profile_command, InviteCommands,
    MemberCommands, ProfileCommands,
};
pub use transaction::{handle_transaction_command, TransactionCommands};
pub use user::{handle_user_command, UserCommands};

use chrono::NaiveDate;

use crate::config::settings::Settings;
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{Money, ProfileId};
use crate::services::{AccessControl, Session};
use crate::storage::Storage;

/// Everything a command handler needs about the request
pub struct CliContext<'a> {
    pub storage: &'a Storage,
    pub settings: &'a Settings,
    user_email: Option<String>,
    profile: Option<String>,
}

impl<'a> CliContext<'a> {
    pub fn new(
        storage: &'a Storage,
        settings: &'a Settings,
        user_email: Option<String>,
        profile: Option<String>,
    ) -> Self {
        Self {
            storage,
            settings,
            user_email,
            profile,
        }
    }

    /// Session for the `--user` e-mail; anonymous when none was given
    pub fn session(&self) -> EnvelopeResult<Session> {
        let Some(email) = &self.user_email else {
            return Ok(Session::anonymous());
        };
        let user = self
            .storage
            .users
            .get_by_email(email)?
            .ok_or_else(|| EnvelopeError::user_not_found(email.clone()))?;
        Ok(Session::for_user(user.id))
    }

    /// The `--profile` id, or the caller's current profile
    pub fn profile_id(&self, session: &Session) -> EnvelopeResult<ProfileId> {
        match &self.profile {
            Some(raw) => raw
                .parse()
                .map_err(|_| EnvelopeError::Validation(format!("Invalid profile id: '{}'", raw))),
            None => AccessControl::new(self.storage).resolve_current_profile(session),
        }
    }

    /// Session and profile in one step
    pub fn scope(&self) -> EnvelopeResult<(Session, ProfileId)> {
        let session = self.session()?;
        let profile_id = self.profile_id(&session)?;
        Ok((session, profile_id))
    }
}

pub(crate) fn parse_amount(input: &str) -> EnvelopeResult<Money> {
    Money::parse(input).map_err(|e| {
        EnvelopeError::Validation(format!(
            "{}. Use a format like '12.50' or '12'",
            e
        ))
    })
}

pub(crate) fn parse_date(input: &str) -> EnvelopeResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        EnvelopeError::Validation(format!(
            "Invalid date: '{}'. Use the format YYYY-MM-DD",
            input
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::SharePaths;
    use crate::services::UserService;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SharePaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_session_resolution() {
        let (_temp_dir, storage) = create_test_storage();
        let settings = Settings::default();
        let user = UserService::new(&storage)
            .register("ana@example.com", None)
            .unwrap();

        let ctx = CliContext::new(&storage, &settings, Some("ANA@example.com".into()), None);
        assert_eq!(ctx.session().unwrap().user_id(), Some(user.id));

        let ctx = CliContext::new(&storage, &settings, None, None);
        assert_eq!(ctx.session().unwrap(), Session::anonymous());

        let ctx = CliContext::new(&storage, &settings, Some("nobody@example.com".into()), None);
        assert!(ctx.session().unwrap_err().is_not_found());
    }

    #[test]
    fn test_explicit_profile_must_parse() {
        let (_temp_dir, storage) = create_test_storage();
        let settings = Settings::default();
        let ctx = CliContext::new(&storage, &settings, None, Some("garbage".into()));

        let err = ctx.profile_id(&Session::anonymous()).unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_amount("12.5").unwrap().cents(), 1_250);
        assert!(parse_amount("twelve").unwrap_err().is_user_error());
        assert_eq!(
            parse_date("2025-02-28").unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert!(parse_date("28/02/2025").is_err());
    }
}
