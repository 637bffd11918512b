//! Budget profile and membership repository
//!
//! Profiles and memberships live together in profiles.json. Creating a
//! profile writes the profile and its OWNER membership in one file replace.
//! Every mutation persists before returning; a failed write restores the
//! in-memory state it changed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::EnvelopeError;
use crate::models::{BudgetProfile, Membership, MembershipId, ProfileId, Role, UserId};

use super::file_io::{lock_error, read_json, write_json_atomic};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ProfileData {
    pub profiles: Vec<BudgetProfile>,
    pub memberships: Vec<Membership>,
}

#[derive(Debug, Default)]
struct ProfileState {
    profiles: HashMap<ProfileId, BudgetProfile>,
    memberships: HashMap<MembershipId, Membership>,
}

impl ProfileState {
    fn to_data(&self) -> ProfileData {
        let mut profiles: Vec<_> = self.profiles.values().cloned().collect();
        profiles.sort_by_key(|p| p.created_at);
        let mut memberships: Vec<_> = self.memberships.values().cloned().collect();
        memberships.sort_by_key(|m| (m.profile_id, m.created_at));
        ProfileData {
            profiles,
            memberships,
        }
    }

    fn find_membership(&self, user_id: UserId, profile_id: ProfileId) -> Option<&Membership> {
        self.memberships
            .values()
            .find(|m| m.user_id == user_id && m.profile_id == profile_id)
    }
}

pub struct ProfileRepository {
    path: PathBuf,
    state: RwLock<ProfileState>,
}

impl ProfileRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: RwLock::new(ProfileState::default()),
        }
    }

    pub fn load(&self) -> Result<(), EnvelopeError> {
        let file_data: ProfileData = read_json(&self.path)?;
        let mut state = self.state.write().map_err(lock_error)?;

        state.profiles.clear();
        state.memberships.clear();
        for profile in file_data.profiles {
            state.profiles.insert(profile.id, profile);
        }
        for membership in file_data.memberships {
            state.memberships.insert(membership.id, membership);
        }
        Ok(())
    }

    /// Write `state` to disk, applying `undo` to it if the write fails
    fn persist(
        &self,
        state: &mut ProfileState,
        undo: impl FnOnce(&mut ProfileState),
    ) -> Result<(), EnvelopeError> {
        if let Err(e) = write_json_atomic(&self.path, &state.to_data()) {
            undo(state);
            return Err(e);
        }
        Ok(())
    }

    // === Profiles ===

    pub fn get_profile(&self, id: ProfileId) -> Result<Option<BudgetProfile>, EnvelopeError> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.profiles.get(&id).cloned())
    }

    /// Insert a new profile together with its OWNER membership and persist both
    ///
    /// Refuses the write if the user already owns a profile. On a failed
    /// persist, neither record stays in memory.
    pub fn create_with_owner(
        &self,
        profile: BudgetProfile,
        owner: Membership,
    ) -> Result<(), EnvelopeError> {
        let mut state = self.state.write().map_err(lock_error)?;

        if owner.role != Role::Owner
            || owner.user_id != profile.owner_id
            || owner.profile_id != profile.id
        {
            return Err(EnvelopeError::Integrity(
                "A profile must be created with its owner's OWNER membership".into(),
            ));
        }
        if state.profiles.values().any(|p| p.owner_id == profile.owner_id) {
            return Err(EnvelopeError::Duplicate {
                entity_type: "Budget profile",
                identifier: format!("owned by {}", profile.owner_id),
            });
        }

        let profile_id = profile.id;
        let membership_id = owner.id;
        state.profiles.insert(profile_id, profile);
        state.memberships.insert(membership_id, owner);

        self.persist(&mut state, |state| {
            state.profiles.remove(&profile_id);
            state.memberships.remove(&membership_id);
        })
    }

    pub fn update_profile(&self, profile: BudgetProfile) -> Result<(), EnvelopeError> {
        let mut state = self.state.write().map_err(lock_error)?;
        let id = profile.id;
        let Some(previous) = state.profiles.get(&id).cloned() else {
            return Err(EnvelopeError::profile_not_found(id.to_string()));
        };
        state.profiles.insert(id, profile);
        self.persist(&mut state, |state| {
            state.profiles.insert(id, previous);
        })
    }

    /// Remove a profile and every membership pointing at it
    pub fn delete_profile(&self, id: ProfileId) -> Result<Option<BudgetProfile>, EnvelopeError> {
        let mut state = self.state.write().map_err(lock_error)?;
        let Some(removed) = state.profiles.remove(&id) else {
            return Ok(None);
        };
        let memberships: Vec<Membership> = state
            .memberships
            .values()
            .filter(|m| m.profile_id == id)
            .cloned()
            .collect();
        state.memberships.retain(|_, m| m.profile_id != id);

        let restored = removed.clone();
        self.persist(&mut state, |state| {
            state.profiles.insert(id, restored);
            state
                .memberships
                .extend(memberships.into_iter().map(|m| (m.id, m)));
        })?;
        Ok(Some(removed))
    }

    // === Memberships ===

    /// Membership lookup by the (user, profile) compound key
    pub fn get_membership(
        &self,
        user_id: UserId,
        profile_id: ProfileId,
    ) -> Result<Option<Membership>, EnvelopeError> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.find_membership(user_id, profile_id).cloned())
    }

    /// All memberships of a user, oldest first
    pub fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>, EnvelopeError> {
        let state = self.state.read().map_err(lock_error)?;
        let mut memberships: Vec<_> = state
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        memberships.sort_by_key(|m| m.created_at);
        Ok(memberships)
    }

    /// All memberships of a profile, highest role first
    pub fn memberships_in_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Vec<Membership>, EnvelopeError> {
        let state = self.state.read().map_err(lock_error)?;
        let mut memberships: Vec<_> = state
            .memberships
            .values()
            .filter(|m| m.profile_id == profile_id)
            .cloned()
            .collect();
        memberships.sort_by(|a, b| b.role.cmp(&a.role).then(a.created_at.cmp(&b.created_at)));
        Ok(memberships)
    }

    /// Add a membership; the (user, profile) pair must be new and OWNER is
    /// only ever created through [`Self::create_with_owner`]
    pub fn insert_membership(&self, membership: Membership) -> Result<(), EnvelopeError> {
        let mut state = self.state.write().map_err(lock_error)?;

        if membership.is_owner() {
            return Err(EnvelopeError::Integrity(
                "OWNER memberships are only created with their profile".into(),
            ));
        }
        if !state.profiles.contains_key(&membership.profile_id) {
            return Err(EnvelopeError::profile_not_found(
                membership.profile_id.to_string(),
            ));
        }
        if state
            .find_membership(membership.user_id, membership.profile_id)
            .is_some()
        {
            return Err(EnvelopeError::Duplicate {
                entity_type: "Membership",
                identifier: format!("{} in {}", membership.user_id, membership.profile_id),
            });
        }

        let id = membership.id;
        state.memberships.insert(id, membership);
        self.persist(&mut state, |state| {
            state.memberships.remove(&id);
        })
    }

    pub fn update_membership(&self, membership: Membership) -> Result<(), EnvelopeError> {
        let mut state = self.state.write().map_err(lock_error)?;
        let id = membership.id;
        let Some(previous) = state.memberships.get(&id).cloned() else {
            return Err(EnvelopeError::membership_not_found(id.to_string()));
        };
        state.memberships.insert(id, membership);
        self.persist(&mut state, |state| {
            state.memberships.insert(id, previous);
        })
    }

    pub fn delete_membership(&self, id: MembershipId) -> Result<Option<Membership>, EnvelopeError> {
        let mut state = self.state.write().map_err(lock_error)?;
        let Some(removed) = state.memberships.remove(&id) else {
            return Ok(None);
        };
        let restored = removed.clone();
        self.persist(&mut state, |state| {
            state.memberships.insert(id, restored);
        })?;
        Ok(Some(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, ProfileRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = ProfileRepository::new(temp_dir.path().join("profiles.json"));
        repo.load().unwrap();
        (temp_dir, repo)
    }

    fn owned_profile(owner: UserId) -> (BudgetProfile, Membership) {
        let profile = BudgetProfile::new(owner, "Home", "USD");
        let membership = Membership::new(owner, profile.id, Role::Owner);
        (profile, membership)
    }

    #[test]
    fn test_create_with_owner_persists_both() {
        let (temp_dir, repo) = create_test_repo();
        let owner = UserId::new();
        let (profile, membership) = owned_profile(owner);
        let profile_id = profile.id;

        repo.create_with_owner(profile, membership).unwrap();

        let reloaded = ProfileRepository::new(temp_dir.path().join("profiles.json"));
        reloaded.load().unwrap();
        assert!(reloaded.get_profile(profile_id).unwrap().is_some());
        let m = reloaded.get_membership(owner, profile_id).unwrap().unwrap();
        assert_eq!(m.role, Role::Owner);
    }

    #[test]
    fn test_one_profile_per_owner() {
        let (_temp_dir, repo) = create_test_repo();
        let owner = UserId::new();
        let (p1, m1) = owned_profile(owner);
        let (p2, m2) = owned_profile(owner);

        repo.create_with_owner(p1, m1).unwrap();
        let err = repo.create_with_owner(p2, m2).unwrap_err();
        assert!(matches!(err, EnvelopeError::Duplicate { .. }));
    }

    #[test]
    fn test_mismatched_owner_membership_rejected() {
        let (_temp_dir, repo) = create_test_repo();
        let profile = BudgetProfile::new(UserId::new(), "Home", "USD");
        let membership = Membership::new(UserId::new(), profile.id, Role::Owner);

        assert!(matches!(
            repo.create_with_owner(profile, membership),
            Err(EnvelopeError::Integrity(_))
        ));
    }

    #[test]
    fn test_membership_unique_per_user_and_profile() {
        let (_temp_dir, repo) = create_test_repo();
        let (profile, owner) = owned_profile(UserId::new());
        let profile_id = profile.id;
        repo.create_with_owner(profile, owner).unwrap();

        let member = UserId::new();
        repo.insert_membership(Membership::new(member, profile_id, Role::Member))
            .unwrap();
        let err = repo
            .insert_membership(Membership::new(member, profile_id, Role::Admin))
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Duplicate { .. }));
    }

    #[test]
    fn test_second_owner_cannot_be_inserted() {
        let (_temp_dir, repo) = create_test_repo();
        let (profile, owner) = owned_profile(UserId::new());
        let profile_id = profile.id;
        repo.create_with_owner(profile, owner).unwrap();

        let err = repo
            .insert_membership(Membership::new(UserId::new(), profile_id, Role::Owner))
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Integrity(_)));
    }

    #[test]
    fn test_members_listed_by_role() {
        let (_temp_dir, repo) = create_test_repo();
        let (profile, owner) = owned_profile(UserId::new());
        let profile_id = profile.id;
        repo.create_with_owner(profile, owner).unwrap();
        repo.insert_membership(Membership::new(UserId::new(), profile_id, Role::Member))
            .unwrap();
        repo.insert_membership(Membership::new(UserId::new(), profile_id, Role::Admin))
            .unwrap();

        let roles: Vec<_> = repo
            .memberships_in_profile(profile_id)
            .unwrap()
            .into_iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, vec![Role::Owner, Role::Admin, Role::Member]);
    }

    #[test]
    fn test_delete_profile_cascades_memberships() {
        let (_temp_dir, repo) = create_test_repo();
        let owner_id = UserId::new();
        let (profile, owner) = owned_profile(owner_id);
        let profile_id = profile.id;
        repo.create_with_owner(profile, owner).unwrap();

        repo.delete_profile(profile_id).unwrap();
        assert!(repo.get_membership(owner_id, profile_id).unwrap().is_none());
        assert!(repo.memberships_for_user(owner_id).unwrap().is_empty());
    }

    #[test]
    fn test_failed_persist_restores_memberships() {
        let (temp_dir, repo) = create_test_repo();
        let owner_id = UserId::new();
        let (profile, owner) = owned_profile(owner_id);
        let profile_id = profile.id;
        repo.create_with_owner(profile, owner).unwrap();
        let member_id = UserId::new();
        repo.insert_membership(Membership::new(member_id, profile_id, Role::Member))
            .unwrap();

        std::fs::create_dir(temp_dir.path().join("profiles.json.tmp")).unwrap();

        let mut promoted = repo.get_membership(member_id, profile_id).unwrap().unwrap();
        promoted.set_role(Role::Admin);
        let membership_id = promoted.id;
        assert!(matches!(
            repo.update_membership(promoted),
            Err(EnvelopeError::Storage(_))
        ));
        assert!(repo.delete_membership(membership_id).is_err());
        assert!(repo
            .insert_membership(Membership::new(UserId::new(), profile_id, Role::Member))
            .is_err());
        assert!(repo.delete_profile(profile_id).is_err());

        let kept = repo.get_membership(member_id, profile_id).unwrap().unwrap();
        assert_eq!(kept.role, Role::Member);
        assert_eq!(repo.memberships_in_profile(profile_id).unwrap().len(), 2);
        assert!(repo.get_profile(profile_id).unwrap().is_some());
    }
}
