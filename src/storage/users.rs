//! User repository for JSON storage
//!
//! Manages loading and saving users to users.json. Every upsert is written
//! through; a failed write leaves the in-memory map as it was.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::EnvelopeError;
use crate::models::user::normalize_email;
use crate::models::{User, UserId};

use super::file_io::{lock_error, read_json, write_json_atomic};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct UserData {
    users: Vec<User>,
}

pub struct UserRepository {
    path: PathBuf,
    data: RwLock<HashMap<UserId, User>>,
}

impl UserRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), EnvelopeError> {
        let file_data: UserData = read_json(&self.path)?;
        let mut data = self.data.write().map_err(lock_error)?;

        data.clear();
        for user in file_data.users {
            data.insert(user.id, user);
        }
        Ok(())
    }

    fn write(&self, data: &HashMap<UserId, User>) -> Result<(), EnvelopeError> {
        let mut users: Vec<_> = data.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));

        write_json_atomic(&self.path, &UserData { users })
    }

    pub fn get(&self, id: UserId) -> Result<Option<User>, EnvelopeError> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.get(&id).cloned())
    }

    /// Look up a user by e-mail (case-insensitive)
    pub fn get_by_email(&self, email: &str) -> Result<Option<User>, EnvelopeError> {
        let email = normalize_email(email);
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.values().find(|u| u.email == email).cloned())
    }

    pub fn get_all(&self) -> Result<Vec<User>, EnvelopeError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut users: Vec<_> = data.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    /// Insert or update a user, refusing to let two users share an e-mail
    pub fn upsert(&self, user: User) -> Result<(), EnvelopeError> {
        let mut data = self.data.write().map_err(lock_error)?;

        if data
            .values()
            .any(|existing| existing.email == user.email && existing.id != user.id)
        {
            return Err(EnvelopeError::Duplicate {
                entity_type: "User",
                identifier: user.email,
            });
        }

        let id = user.id;
        let previous = data.insert(id, user);
        if let Err(e) = self.write(&data) {
            match previous {
                Some(previous) => data.insert(id, previous),
                None => data.remove(&id),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn count(&self) -> Result<usize, EnvelopeError> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, UserRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = UserRepository::new(temp_dir.path().join("users.json"));
        repo.load().unwrap();
        (temp_dir, repo)
    }

    #[test]
    fn test_upsert_and_lookup_by_email() {
        let (_temp_dir, repo) = create_test_repo();
        let user = User::new("alice@example.com", None);
        let id = user.id;
        repo.upsert(user).unwrap();

        let found = repo.get_by_email("ALICE@example.com").unwrap().unwrap();
        assert_eq!(found.id, id);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (_temp_dir, repo) = create_test_repo();
        repo.upsert(User::new("alice@example.com", None)).unwrap();

        let err = repo
            .upsert(User::new("Alice@Example.com", None))
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Duplicate { .. }));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, repo) = create_test_repo();
        repo.upsert(User::new("bob@example.com", Some("Bob".into())))
            .unwrap();

        let reloaded = UserRepository::new(temp_dir.path().join("users.json"));
        reloaded.load().unwrap();
        let bob = reloaded.get_by_email("bob@example.com").unwrap().unwrap();
        assert_eq!(bob.name.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_failed_write_keeps_previous_user() {
        let (temp_dir, repo) = create_test_repo();
        let mut user = User::new("carol@example.com", Some("Carol".into()));
        repo.upsert(user.clone()).unwrap();

        std::fs::create_dir(temp_dir.path().join("users.json.tmp")).unwrap();

        user.name = Some("Caroline".into());
        assert!(repo.upsert(user.clone()).is_err());
        assert!(repo.upsert(User::new("dan@example.com", None)).is_err());

        assert_eq!(repo.count().unwrap(), 1);
        let kept = repo.get(user.id).unwrap().unwrap();
        assert_eq!(kept.name.as_deref(), Some("Carol"));
    }
}
