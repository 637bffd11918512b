//! User service
//!
//! Local user records. Signup itself belongs to the external auth
//! collaborator; `register` is the hook it (or the CLI) calls.

use chrono::Utc;
use tracing::info;

use crate::audit::EntityType;
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{User, UserId};
use crate::storage::Storage;

use super::session::Session;

/// Service for user records
pub struct UserService<'a> {
    storage: &'a Storage,
}

impl<'a> UserService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a user record for a newly signed-up identity
    pub fn register(&self, email: &str, name: Option<String>) -> EnvelopeResult<User> {
        let user = User::new(email, name);
        user.validate()
            .map_err(|e| EnvelopeError::Validation(e.to_string()))?;

        if self.storage.users.get_by_email(&user.email)?.is_some() {
            return Err(EnvelopeError::Duplicate {
                entity_type: "User",
                identifier: user.email,
            });
        }

        self.storage.users.upsert(user.clone())?;

        self.storage.log_create(
            Some(user.id),
            EntityType::User,
            user.id.to_string(),
            Some(user.email.clone()),
            &user,
        )?;

        info!(user = %user.id, "registered user");
        Ok(user)
    }

    pub fn get(&self, id: UserId) -> EnvelopeResult<Option<User>> {
        self.storage.users.get(id)
    }

    pub fn find_by_email(&self, email: &str) -> EnvelopeResult<Option<User>> {
        self.storage.users.get_by_email(email)
    }

    /// The user behind a session
    pub fn current(&self, session: &Session) -> EnvelopeResult<User> {
        let user_id = session.require_user()?;
        self.storage
            .users
            .get(user_id)?
            .ok_or_else(|| EnvelopeError::user_not_found(user_id.to_string()))
    }

    /// Edit the caller's own display fields
    ///
    /// `None` keeps a field, `Some(None)` clears it.
    pub fn update_profile(
        &self,
        session: &Session,
        name: Option<Option<String>>,
        avatar_url: Option<Option<String>>,
    ) -> EnvelopeResult<User> {
        let mut user = self.current(session)?;
        let before = user.clone();

        if let Some(name) = name {
            user.name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        }
        if let Some(avatar_url) = avatar_url {
            user.avatar_url = avatar_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty());
        }
        user.updated_at = Utc::now();

        user.validate()
            .map_err(|e| EnvelopeError::Validation(e.to_string()))?;

        self.storage.users.upsert(user.clone())?;

        self.storage.log_update(
            Some(user.id),
            EntityType::User,
            user.id.to_string(),
            Some(user.email.clone()),
            &before,
            &user,
        )?;

        Ok(user)
    }

    pub fn list(&self) -> EnvelopeResult<Vec<User>> {
        self.storage.users.get_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::create_test_storage;

    #[test]
    fn test_register_normalizes_email() {
        let (_temp_dir, storage) = create_test_storage();
        let service = UserService::new(&storage);

        let user = service
            .register("  Ana@Example.COM ", Some("Ana".into()))
            .unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(
            service.find_by_email("ANA@example.com").unwrap().unwrap().id,
            user.id
        );
    }

    #[test]
    fn test_register_duplicate_email() {
        let (_temp_dir, storage) = create_test_storage();
        let service = UserService::new(&storage);

        service.register("ana@example.com", None).unwrap();
        let err = service.register("ANA@example.com", None).unwrap_err();
        assert!(matches!(err, EnvelopeError::Duplicate { .. }));
    }

    #[test]
    fn test_register_invalid_email() {
        let (_temp_dir, storage) = create_test_storage();
        let err = UserService::new(&storage)
            .register("not-an-email", None)
            .unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn test_update_profile() {
        let (_temp_dir, storage) = create_test_storage();
        let service = UserService::new(&storage);
        let user = service.register("ana@example.com", None).unwrap();
        let session = Session::for_user(user.id);

        let updated = service
            .update_profile(
                &session,
                Some(Some("Ana Lima".into())),
                Some(Some("https://img.example.com/a.png".into())),
            )
            .unwrap();
        assert_eq!(updated.display_name(), "Ana Lima");

        let cleared = service.update_profile(&session, Some(None), None).unwrap();
        assert_eq!(cleared.name, None);
        assert!(cleared.avatar_url.is_some());
    }

    #[test]
    fn test_current_requires_login() {
        let (_temp_dir, storage) = create_test_storage();
        let err = UserService::new(&storage)
            .current(&Session::anonymous())
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Unauthenticated));
    }
}
