//! Budget profile service
//!
//! A user owns at most one profile. The profile and its OWNER membership are
//! written together; deleting a profile removes everything it owns.

use chrono::Utc;
use tracing::info;

use crate::audit::{AuditEntry, EntityType};
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::profile::normalize_currency;
use crate::models::{BudgetProfile, Membership, ProfileId, Role};
use crate::storage::{default_envelopes, Storage};

use super::access::{AccessControl, MEMBERS, OWNER};
use super::session::Session;

/// Service for budget profiles
pub struct ProfileService<'a> {
    storage: &'a Storage,
}

/// What a profile deletion removed
#[derive(Debug, Clone)]
pub struct ProfileDeletion {
    pub profile: BudgetProfile,
    pub envelopes: usize,
    pub transactions: usize,
    pub invitations: usize,
}

impl<'a> ProfileService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create the caller's profile, optionally seeded with starter envelopes
    pub fn create(
        &self,
        session: &Session,
        name: &str,
        currency: &str,
        seed_defaults: bool,
    ) -> EnvelopeResult<BudgetProfile> {
        let user_id = session.require_user()?;
        if self.storage.users.get(user_id)?.is_none() {
            return Err(EnvelopeError::user_not_found(user_id.to_string()));
        }

        let currency =
            normalize_currency(currency).map_err(|e| EnvelopeError::Validation(e.to_string()))?;
        let profile = BudgetProfile::new(user_id, name, currency);
        profile
            .validate()
            .map_err(|e| EnvelopeError::Validation(e.to_string()))?;

        let owner = Membership::new(user_id, profile.id, Role::Owner);
        self.storage
            .profiles
            .create_with_owner(profile.clone(), owner.clone())?;

        let mut entries = vec![
            AuditEntry::create(EntityType::Profile, profile.id.to_string(), &profile)
                .named(profile.name.clone())
                .by(Some(user_id)),
            AuditEntry::create(EntityType::Membership, owner.id.to_string(), &owner)
                .by(Some(user_id)),
        ];

        if seed_defaults {
            let envelopes = default_envelopes(profile.id);
            self.storage.ledger.atomic(|tx| {
                for envelope in &envelopes {
                    tx.insert_envelope(envelope.clone())?;
                }
                Ok(())
            })?;
            entries.extend(envelopes.iter().map(|e| {
                AuditEntry::create(EntityType::Envelope, e.id.to_string(), e)
                    .named(e.name.clone())
                    .by(Some(user_id))
            }));
        }

        self.storage.log_batch(&entries)?;

        info!(profile = %profile.id, owner = %user_id, seed_defaults, "created budget profile");
        Ok(profile)
    }

    pub fn get(&self, session: &Session, profile_id: ProfileId) -> EnvelopeResult<BudgetProfile> {
        AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;
        self.storage
            .profiles
            .get_profile(profile_id)?
            .ok_or_else(|| EnvelopeError::profile_not_found(profile_id.to_string()))
    }

    /// Profiles the caller belongs to, with their role in each, oldest membership first
    pub fn list_for_user(&self, session: &Session) -> EnvelopeResult<Vec<(BudgetProfile, Role)>> {
        let user_id = session.require_user()?;
        let mut profiles = Vec::new();
        for membership in self.storage.profiles.memberships_for_user(user_id)? {
            if let Some(profile) = self.storage.profiles.get_profile(membership.profile_id)? {
                profiles.push((profile, membership.role));
            }
        }
        Ok(profiles)
    }

    pub fn update(
        &self,
        session: &Session,
        profile_id: ProfileId,
        name: Option<String>,
        currency: Option<String>,
    ) -> EnvelopeResult<BudgetProfile> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, OWNER)?;
        let mut profile = self
            .storage
            .profiles
            .get_profile(profile_id)?
            .ok_or_else(|| EnvelopeError::profile_not_found(profile_id.to_string()))?;
        let before = profile.clone();

        if let Some(name) = name {
            profile.name = name.trim().to_string();
        }
        if let Some(currency) = currency {
            profile.currency = normalize_currency(&currency)
                .map_err(|e| EnvelopeError::Validation(e.to_string()))?;
        }
        profile.updated_at = Utc::now();

        profile
            .validate()
            .map_err(|e| EnvelopeError::Validation(e.to_string()))?;

        self.storage.profiles.update_profile(profile.clone())?;

        self.storage.log_update(
            Some(actor.user_id),
            EntityType::Profile,
            profile.id.to_string(),
            Some(profile.name.clone()),
            &before,
            &profile,
        )?;

        Ok(profile)
    }

    /// Delete a profile with its ledger, invitations and memberships
    pub fn delete(&self, session: &Session, profile_id: ProfileId) -> EnvelopeResult<ProfileDeletion> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, OWNER)?;

        let (envelopes, transactions) = self
            .storage
            .ledger
            .atomic(|tx| Ok(tx.purge_profile(profile_id)))?;

        let invitations = self.storage.invitations.delete_for_profile(profile_id)?;

        let profile = self
            .storage
            .profiles
            .delete_profile(profile_id)?
            .ok_or_else(|| EnvelopeError::profile_not_found(profile_id.to_string()))?;

        self.storage.log_delete(
            Some(actor.user_id),
            EntityType::Profile,
            profile.id.to_string(),
            Some(profile.name.clone()),
            &profile,
        )?;

        info!(
            profile = %profile_id,
            envelopes,
            transactions,
            invitations,
            "deleted budget profile"
        );

        Ok(ProfileDeletion {
            profile,
            envelopes,
            transactions,
            invitations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::envelope::DEFAULT_ENVELOPES;
    use crate::services::testing::{create_test_storage, join, owner_with_profile, register};

    #[test]
    fn test_create_profile_with_owner_membership() {
        let (_temp_dir, storage) = create_test_storage();
        let (user, session) = register(&storage, "owner@example.com");

        let profile = ProfileService::new(&storage)
            .create(&session, "Household", "eur", false)
            .unwrap();
        assert_eq!(profile.currency, "EUR");

        let membership = storage
            .profiles
            .get_membership(user.id, profile.id)
            .unwrap()
            .unwrap();
        assert_eq!(membership.role, Role::Owner);
    }

    #[test]
    fn test_one_profile_per_owner() {
        let (_temp_dir, storage) = create_test_storage();
        let (session, _) = owner_with_profile(&storage);

        let err = ProfileService::new(&storage)
            .create(&session, "Second", "USD", false)
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Duplicate { .. }));
    }

    #[test]
    fn test_create_seeds_default_envelopes() {
        let (_temp_dir, storage) = create_test_storage();
        let (_, session) = register(&storage, "owner@example.com");

        let profile = ProfileService::new(&storage)
            .create(&session, "Household", "USD", true)
            .unwrap();
        let envelopes = storage.ledger.envelopes_in_profile(profile.id).unwrap();
        assert_eq!(envelopes.len(), DEFAULT_ENVELOPES.len());
    }

    #[test]
    fn test_create_rejects_bad_currency() {
        let (_temp_dir, storage) = create_test_storage();
        let (_, session) = register(&storage, "owner@example.com");

        let err = ProfileService::new(&storage)
            .create(&session, "Household", "dollars", false)
            .unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn test_update_requires_owner() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);
        let admin = join(&storage, profile_id, "admin@example.com", Role::Admin);
        let service = ProfileService::new(&storage);

        let err = service
            .update(&admin, profile_id, Some("Renamed".into()), None)
            .unwrap_err();
        assert!(err.is_forbidden());

        let updated = service
            .update(&owner, profile_id, Some("Renamed".into()), Some("gbp".into()))
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.currency, "GBP");
    }

    #[test]
    fn test_list_for_user() {
        let (_temp_dir, storage) = create_test_storage();
        let (_, profile_id) = owner_with_profile(&storage);
        let member = join(&storage, profile_id, "member@example.com", Role::Member);

        let profiles = ProfileService::new(&storage).list_for_user(&member).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].0.id, profile_id);
        assert_eq!(profiles[0].1, Role::Member);
    }

    #[test]
    fn test_delete_cascades() {
        let (_temp_dir, storage) = create_test_storage();
        let (_, session) = register(&storage, "owner@example.com");
        let service = ProfileService::new(&storage);
        let profile = service.create(&session, "Household", "USD", true).unwrap();
        let member = join(&storage, profile.id, "member@example.com", Role::Member);

        let deletion = service.delete(&session, profile.id).unwrap();
        assert_eq!(deletion.envelopes, DEFAULT_ENVELOPES.len());

        assert!(storage.profiles.get_profile(profile.id).unwrap().is_none());
        assert!(storage.ledger.envelopes_in_profile(profile.id).unwrap().is_empty());
        assert!(service.get(&member, profile.id).unwrap_err().is_not_found());
    }
}
