//! Invitation repository for JSON storage
//!
//! Mutations persist before returning and restore memory on a failed write.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::EnvelopeError;
use crate::models::user::normalize_email;
use crate::models::{Invitation, InvitationId, ProfileId};

use super::file_io::{lock_error, read_json, write_json_atomic};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct InvitationData {
    invitations: Vec<Invitation>,
}

pub struct InvitationRepository {
    path: PathBuf,
    data: RwLock<HashMap<InvitationId, Invitation>>,
}

impl InvitationRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), EnvelopeError> {
        let file_data: InvitationData = read_json(&self.path)?;
        let mut data = self.data.write().map_err(lock_error)?;

        data.clear();
        for invitation in file_data.invitations {
            data.insert(invitation.id, invitation);
        }
        Ok(())
    }

    /// Write `data` to disk, applying `undo` to it if the write fails
    fn persist(
        &self,
        data: &mut HashMap<InvitationId, Invitation>,
        undo: impl FnOnce(&mut HashMap<InvitationId, Invitation>),
    ) -> Result<(), EnvelopeError> {
        let mut invitations: Vec<_> = data.values().cloned().collect();
        invitations.sort_by_key(|i| i.created_at);

        if let Err(e) = write_json_atomic(&self.path, &InvitationData { invitations }) {
            undo(data);
            return Err(e);
        }
        Ok(())
    }

    pub fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, EnvelopeError> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.values().find(|i| i.token == token).cloned())
    }

    /// Invitations of a profile, newest first
    pub fn get_by_profile(&self, profile_id: ProfileId) -> Result<Vec<Invitation>, EnvelopeError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut invitations: Vec<_> = data
            .values()
            .filter(|i| i.profile_id == profile_id)
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    /// Pending invitation for an (e-mail, profile) pair
    pub fn find_pending(
        &self,
        email: &str,
        profile_id: ProfileId,
    ) -> Result<Option<Invitation>, EnvelopeError> {
        let email = normalize_email(email);
        let data = self.data.read().map_err(lock_error)?;
        Ok(data
            .values()
            .find(|i| i.is_pending() && i.profile_id == profile_id && i.email == email)
            .cloned())
    }

    pub fn get_all(&self) -> Result<Vec<Invitation>, EnvelopeError> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.values().cloned().collect())
    }

    pub fn upsert(&self, invitation: Invitation) -> Result<(), EnvelopeError> {
        let mut data = self.data.write().map_err(lock_error)?;
        if data
            .values()
            .any(|i| i.token == invitation.token && i.id != invitation.id)
        {
            return Err(EnvelopeError::Integrity("Invitation token collision".into()));
        }
        let id = invitation.id;
        let previous = data.insert(id, invitation);
        self.persist(&mut data, |data| match previous {
            Some(previous) => {
                data.insert(id, previous);
            }
            None => {
                data.remove(&id);
            }
        })
    }

    /// Drop every invitation of a profile, returning how many were removed
    pub fn delete_for_profile(&self, profile_id: ProfileId) -> Result<usize, EnvelopeError> {
        let mut data = self.data.write().map_err(lock_error)?;
        let removed: Vec<Invitation> = data
            .values()
            .filter(|i| i.profile_id == profile_id)
            .cloned()
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }
        data.retain(|_, i| i.profile_id != profile_id);

        let count = removed.len();
        self.persist(&mut data, |data| {
            data.extend(removed.into_iter().map(|i| (i.id, i)));
        })?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvitationStatus, Role, UserId};
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, InvitationRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = InvitationRepository::new(temp_dir.path().join("invitations.json"));
        repo.load().unwrap();
        (temp_dir, repo)
    }

    fn invitation(email: &str, profile_id: ProfileId) -> Invitation {
        Invitation::new(email, profile_id, Role::Member, UserId::new(), Duration::days(7))
    }

    #[test]
    fn test_find_pending_ignores_resolved() {
        let (_temp_dir, repo) = create_test_repo();
        let profile_id = ProfileId::new();

        let mut declined = invitation("pat@example.com", profile_id);
        declined.set_status(InvitationStatus::Declined);
        repo.upsert(declined).unwrap();
        assert!(repo
            .find_pending("pat@example.com", profile_id)
            .unwrap()
            .is_none());

        repo.upsert(invitation("Pat@Example.com", profile_id)).unwrap();
        assert!(repo
            .find_pending("pat@example.com", profile_id)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_lookup_by_token_after_reload() {
        let (temp_dir, repo) = create_test_repo();
        let inv = invitation("sam@example.com", ProfileId::new());
        let token = inv.token.clone();
        repo.upsert(inv).unwrap();

        let reloaded = InvitationRepository::new(temp_dir.path().join("invitations.json"));
        reloaded.load().unwrap();
        let found = reloaded.get_by_token(&token).unwrap().unwrap();
        assert_eq!(found.email, "sam@example.com");
    }

    #[test]
    fn test_delete_for_profile() {
        let (_temp_dir, repo) = create_test_repo();
        let keep = ProfileId::new();
        let drop = ProfileId::new();
        repo.upsert(invitation("a@example.com", keep)).unwrap();
        repo.upsert(invitation("b@example.com", drop)).unwrap();
        repo.upsert(invitation("c@example.com", drop)).unwrap();

        assert_eq!(repo.delete_for_profile(drop).unwrap(), 2);
        assert_eq!(repo.get_all().unwrap().len(), 1);
        assert_eq!(repo.get_by_profile(keep).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_persist_restores_invitation() {
        let (temp_dir, repo) = create_test_repo();
        let profile_id = ProfileId::new();
        let inv = invitation("pat@example.com", profile_id);
        repo.upsert(inv.clone()).unwrap();

        std::fs::create_dir(temp_dir.path().join("invitations.json.tmp")).unwrap();

        let mut accepted = inv.clone();
        accepted.set_status(InvitationStatus::Accepted);
        assert!(matches!(repo.upsert(accepted), Err(EnvelopeError::Storage(_))));
        assert!(repo.upsert(invitation("sam@example.com", profile_id)).is_err());
        assert!(repo.delete_for_profile(profile_id).is_err());

        let all = repo.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_pending());
    }
}
