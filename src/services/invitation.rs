//! Invitation service
//!
//! Admins invite an e-mail address into a profile with a proposed role. The
//! invitee resolves the invitation by token: accepting creates the
//! membership, declining closes it. Pending invitations past their expiry
//! are marked EXPIRED, either lazily on accept or in bulk.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::audit::{AuditEntry, EntityType};
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::user::validate_email;
use crate::models::{Invitation, InvitationStatus, Membership, ProfileId, Role, User, UserId};
use crate::storage::Storage;

use super::access::{AccessControl, ADMINS};
use super::membership::MembershipService;
use super::policy;
use super::session::Session;

const DEFAULT_TTL_DAYS: i64 = 7;

/// Service for profile invitations
pub struct InvitationService<'a> {
    storage: &'a Storage,
    ttl: Duration,
}

impl<'a> InvitationService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            ttl: Duration::days(DEFAULT_TTL_DAYS),
        }
    }

    /// Use a different validity period for new invitations
    pub fn with_ttl_days(mut self, days: u32) -> Self {
        self.ttl = Duration::days(i64::from(days));
        self
    }

    pub fn invite(
        &self,
        session: &Session,
        profile_id: ProfileId,
        email: &str,
        role: Role,
    ) -> EnvelopeResult<Invitation> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, ADMINS)?;
        policy::ensure_can_grant(&actor, role)?;

        let invitation = Invitation::new(email, profile_id, role, actor.user_id, self.ttl);
        validate_email(&invitation.email).map_err(|e| EnvelopeError::Validation(e.to_string()))?;

        if let Some(user) = self.storage.users.get_by_email(&invitation.email)? {
            if self
                .storage
                .profiles
                .get_membership(user.id, profile_id)?
                .is_some()
            {
                return Err(EnvelopeError::Duplicate {
                    entity_type: "Membership",
                    identifier: invitation.email,
                });
            }
        }

        if self
            .storage
            .invitations
            .find_pending(&invitation.email, profile_id)?
            .is_some()
        {
            return Err(EnvelopeError::Duplicate {
                entity_type: "Invitation",
                identifier: invitation.email,
            });
        }

        self.storage.invitations.upsert(invitation.clone())?;

        self.storage.log_create(
            Some(actor.user_id),
            EntityType::Invitation,
            invitation.id.to_string(),
            Some(invitation.email.clone()),
            &invitation,
        )?;

        info!(
            profile = %profile_id,
            invitation = %invitation.id,
            role = %role,
            "created invitation"
        );
        Ok(invitation)
    }

    /// Invitations of a profile, newest first
    pub fn list(&self, session: &Session, profile_id: ProfileId) -> EnvelopeResult<Vec<Invitation>> {
        AccessControl::new(self.storage).require_role(session, profile_id, ADMINS)?;
        self.storage.invitations.get_by_profile(profile_id)
    }

    /// Invitation addressed to the caller
    ///
    /// Tokens belonging to someone else are reported as not found.
    fn addressed_to(&self, user: &User, token: &str) -> EnvelopeResult<Invitation> {
        self.storage
            .invitations
            .get_by_token(token.trim())?
            .filter(|i| i.email == user.email)
            .ok_or_else(|| EnvelopeError::invitation_not_found("token"))
    }

    fn ensure_pending(invitation: &Invitation) -> EnvelopeResult<()> {
        if !invitation.is_pending() {
            return Err(EnvelopeError::Validation(format!(
                "Invitation is no longer pending ({})",
                invitation.status
            )));
        }
        Ok(())
    }

    fn set_status(
        &self,
        actor: Option<UserId>,
        invitation: &Invitation,
        status: InvitationStatus,
    ) -> EnvelopeResult<Invitation> {
        let mut updated = invitation.clone();
        updated.set_status(status);
        self.storage.invitations.upsert(updated.clone())?;

        self.storage.log_update(
            actor,
            EntityType::Invitation,
            updated.id.to_string(),
            Some(updated.email.clone()),
            invitation,
            &updated,
        )?;
        Ok(updated)
    }

    /// Accept an invitation, joining its profile with the proposed role
    pub fn accept(&self, session: &Session, token: &str) -> EnvelopeResult<Membership> {
        let user_id = session.require_user()?;
        let user = self
            .storage
            .users
            .get(user_id)?
            .ok_or_else(|| EnvelopeError::user_not_found(user_id.to_string()))?;

        let invitation = self.addressed_to(&user, token)?;
        Self::ensure_pending(&invitation)?;

        if invitation.is_stale(Utc::now()) {
            self.set_status(Some(user.id), &invitation, InvitationStatus::Expired)?;
            return Err(EnvelopeError::Validation("Invitation has expired".into()));
        }

        // Left behind by an accept whose status write did not land
        if let Some(existing) = self
            .storage
            .profiles
            .get_membership(user_id, invitation.profile_id)?
        {
            self.set_status(Some(user.id), &invitation, InvitationStatus::Accepted)?;
            info!(invitation = %invitation.id, user = %user_id, "invitation already honoured");
            return Ok(existing);
        }

        let accepted = self.set_status(Some(user.id), &invitation, InvitationStatus::Accepted)?;
        let membership = match MembershipService::new(self.storage).add_member(
            invitation.profile_id,
            user_id,
            invitation.role,
        ) {
            Ok(membership) => membership,
            Err(e) => {
                if let Err(reopen) =
                    self.set_status(Some(user.id), &accepted, InvitationStatus::Pending)
                {
                    warn!(invitation = %invitation.id, error = %reopen, "failed to reopen invitation");
                }
                return Err(e);
            }
        };

        info!(invitation = %invitation.id, user = %user_id, "accepted invitation");
        Ok(membership)
    }

    pub fn decline(&self, session: &Session, token: &str) -> EnvelopeResult<Invitation> {
        let user_id = session.require_user()?;
        let user = self
            .storage
            .users
            .get(user_id)?
            .ok_or_else(|| EnvelopeError::user_not_found(user_id.to_string()))?;

        let invitation = self.addressed_to(&user, token)?;
        Self::ensure_pending(&invitation)?;

        let declined = self.set_status(Some(user.id), &invitation, InvitationStatus::Declined)?;
        info!(invitation = %invitation.id, user = %user_id, "declined invitation");
        Ok(declined)
    }

    /// Mark every pending invitation past its expiry as EXPIRED
    ///
    /// Returns how many were expired.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> EnvelopeResult<usize> {
        let mut entries = Vec::new();
        for invitation in self.storage.invitations.get_all()? {
            if !invitation.is_stale(now) {
                continue;
            }
            let mut expired = invitation.clone();
            expired.set_status(InvitationStatus::Expired);
            if let Err(e) = self.storage.invitations.upsert(expired.clone()) {
                self.storage.log_batch(&entries)?;
                return Err(e);
            }
            entries.push(
                AuditEntry::update(
                    EntityType::Invitation,
                    expired.id.to_string(),
                    &invitation,
                    &expired,
                )
                .named(expired.email.clone()),
            );
        }

        if !entries.is_empty() {
            self.storage.log_batch(&entries)?;
            info!(count = entries.len(), "expired stale invitations");
        }
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{create_test_storage, join, owner_with_profile, register};

    #[test]
    fn test_invite_and_accept() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);
        let service = InvitationService::new(&storage);

        let invitation = service
            .invite(&owner, profile_id, "Friend@Example.com", Role::Admin)
            .unwrap();
        assert_eq!(invitation.status, InvitationStatus::Pending);

        let (friend, friend_session) = register(&storage, "friend@example.com");
        let membership = service.accept(&friend_session, &invitation.token).unwrap();
        assert_eq!(membership.role, Role::Admin);
        assert_eq!(membership.user_id, friend.id);

        let stored = storage
            .invitations
            .get_by_token(&invitation.token)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, InvitationStatus::Accepted);

        // A second accept is refused
        assert!(service
            .accept(&friend_session, &invitation.token)
            .unwrap_err()
            .is_user_error());
    }

    #[test]
    fn test_member_cannot_invite() {
        let (_temp_dir, storage) = create_test_storage();
        let (_, profile_id) = owner_with_profile(&storage);
        let member = join(&storage, profile_id, "member@example.com", Role::Member);

        let err = InvitationService::new(&storage)
            .invite(&member, profile_id, "friend@example.com", Role::Member)
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_owner_role_cannot_be_invited() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);

        let err = InvitationService::new(&storage)
            .invite(&owner, profile_id, "friend@example.com", Role::Owner)
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_duplicate_pending_invitation() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);
        let service = InvitationService::new(&storage);

        service
            .invite(&owner, profile_id, "friend@example.com", Role::Member)
            .unwrap();
        let err = service
            .invite(&owner, profile_id, "FRIEND@example.com", Role::Member)
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Duplicate { .. }));
    }

    #[test]
    fn test_existing_member_cannot_be_invited() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);
        join(&storage, profile_id, "member@example.com", Role::Member);

        let err = InvitationService::new(&storage)
            .invite(&owner, profile_id, "member@example.com", Role::Admin)
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Duplicate { .. }));
    }

    #[test]
    fn test_accept_by_wrong_user_is_not_found() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);
        let service = InvitationService::new(&storage);
        let invitation = service
            .invite(&owner, profile_id, "friend@example.com", Role::Member)
            .unwrap();

        let (_, other) = register(&storage, "other@example.com");
        assert!(service
            .accept(&other, &invitation.token)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_expired_invitation_is_marked() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);
        let service = InvitationService::new(&storage).with_ttl_days(0);
        let invitation = service
            .invite(&owner, profile_id, "friend@example.com", Role::Member)
            .unwrap();

        let (_, friend) = register(&storage, "friend@example.com");
        let err = service.accept(&friend, &invitation.token).unwrap_err();
        assert!(err.is_user_error());

        let stored = storage
            .invitations
            .get_by_token(&invitation.token)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, InvitationStatus::Expired);
        assert!(storage
            .profiles
            .memberships_in_profile(profile_id)
            .unwrap()
            .iter()
            .all(|m| m.role == Role::Owner));
    }

    #[test]
    fn test_decline() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);
        let service = InvitationService::new(&storage);
        let invitation = service
            .invite(&owner, profile_id, "friend@example.com", Role::Member)
            .unwrap();

        let (_, friend) = register(&storage, "friend@example.com");
        let declined = service.decline(&friend, &invitation.token).unwrap();
        assert_eq!(declined.status, InvitationStatus::Declined);
        assert!(service.accept(&friend, &invitation.token).is_err());
    }

    #[test]
    fn test_expire_stale() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);
        let service = InvitationService::new(&storage);
        service
            .invite(&owner, profile_id, "a@example.com", Role::Member)
            .unwrap();
        service
            .invite(&owner, profile_id, "b@example.com", Role::Member)
            .unwrap();

        assert_eq!(service.expire_stale(Utc::now()).unwrap(), 0);
        let later = Utc::now() + Duration::days(8);
        assert_eq!(service.expire_stale(later).unwrap(), 2);
        assert_eq!(service.expire_stale(later).unwrap(), 0);
    }

    #[test]
    fn test_accept_completes_after_interrupted_status_write() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);
        let service = InvitationService::new(&storage);
        let invitation = service
            .invite(&owner, profile_id, "friend@example.com", Role::Member)
            .unwrap();

        // Membership written, invitation still pending
        let (friend, friend_session) = register(&storage, "friend@example.com");
        MembershipService::new(&storage)
            .add_member(profile_id, friend.id, Role::Member)
            .unwrap();

        let membership = service.accept(&friend_session, &invitation.token).unwrap();
        assert_eq!(membership.user_id, friend.id);
        let stored = storage
            .invitations
            .get_by_token(&invitation.token)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, InvitationStatus::Accepted);
    }

    #[test]
    fn test_failed_membership_write_reopens_invitation() {
        let (_temp_dir, storage) = create_test_storage();
        let (owner, profile_id) = owner_with_profile(&storage);
        let service = InvitationService::new(&storage);
        let invitation = service
            .invite(&owner, profile_id, "friend@example.com", Role::Member)
            .unwrap();
        let (_, friend_session) = register(&storage, "friend@example.com");

        // The profile row vanishes, so the membership insert is refused
        storage.profiles.delete_profile(profile_id).unwrap();

        let err = service.accept(&friend_session, &invitation.token).unwrap_err();
        assert!(err.is_not_found());
        let stored = storage
            .invitations
            .get_by_token(&invitation.token)
            .unwrap()
            .unwrap();
        assert!(stored.is_pending());
    }
}
