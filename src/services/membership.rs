//! Membership service
//!
//! Listing, role changes and removals of profile members. Every mutation
//! goes through the role threshold first, then the membership policy.

use tracing::{info, warn};

use crate::audit::EntityType;
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{Membership, ProfileId, Role, User, UserId};
use crate::storage::Storage;

use super::access::{AccessControl, ADMINS, MEMBERS};
use super::policy;
use super::session::Session;

/// Service for profile memberships
pub struct MembershipService<'a> {
    storage: &'a Storage,
}

/// A membership joined with its user
#[derive(Debug, Clone)]
pub struct Member {
    pub membership: Membership,
    pub user: User,
}

impl<'a> MembershipService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Members of a profile, highest role first
    pub fn list_members(&self, session: &Session, profile_id: ProfileId) -> EnvelopeResult<Vec<Member>> {
        AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;

        let mut members = Vec::new();
        for membership in self.storage.profiles.memberships_in_profile(profile_id)? {
            match self.storage.users.get(membership.user_id)? {
                Some(user) => members.push(Member { membership, user }),
                None => warn!(
                    membership = %membership.id,
                    user = %membership.user_id,
                    "membership points at a missing user"
                ),
            }
        }
        Ok(members)
    }

    /// Insert a non-owner membership without any caller check
    ///
    /// Used once an invitation has been accepted.
    pub(crate) fn add_member(
        &self,
        profile_id: ProfileId,
        user_id: UserId,
        role: Role,
    ) -> EnvelopeResult<Membership> {
        policy::ensure_assignable(role)?;

        let membership = Membership::new(user_id, profile_id, role);
        self.storage.profiles.insert_membership(membership.clone())?;

        self.storage.log_create(
            Some(user_id),
            EntityType::Membership,
            membership.id.to_string(),
            None,
            &membership,
        )?;

        info!(profile = %profile_id, user = %user_id, role = %role, "added member");
        Ok(membership)
    }

    fn target_membership(&self, profile_id: ProfileId, user_id: UserId) -> EnvelopeResult<Membership> {
        self.storage
            .profiles
            .get_membership(user_id, profile_id)?
            .ok_or_else(|| EnvelopeError::membership_not_found(format!("{} in {}", user_id, profile_id)))
    }

    pub fn update_role(
        &self,
        session: &Session,
        profile_id: ProfileId,
        target_user: UserId,
        role: Role,
    ) -> EnvelopeResult<Membership> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, ADMINS)?;
        let mut target = self.target_membership(profile_id, target_user)?;

        policy::check_role_change(&actor, &target, role)?;

        if target.role == role {
            return Ok(target);
        }

        let before = target.clone();
        target.set_role(role);
        self.storage.profiles.update_membership(target.clone())?;

        self.storage.log_update(
            Some(actor.user_id),
            EntityType::Membership,
            target.id.to_string(),
            None,
            &before,
            &target,
        )?;

        info!(
            profile = %profile_id,
            user = %target_user,
            from = %before.role,
            to = %role,
            "changed member role"
        );
        Ok(target)
    }

    pub fn remove_member(
        &self,
        session: &Session,
        profile_id: ProfileId,
        target_user: UserId,
    ) -> EnvelopeResult<Membership> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, ADMINS)?;
        let target = self.target_membership(profile_id, target_user)?;

        policy::check_removal(&actor, &target)?;

        let removed = self
            .storage
            .profiles
            .delete_membership(target.id)?
            .ok_or_else(|| EnvelopeError::membership_not_found(target.id.to_string()))?;

        self.storage.log_delete(
            Some(actor.user_id),
            EntityType::Membership,
            removed.id.to_string(),
            None,
            &removed,
        )?;

        info!(profile = %profile_id, user = %target_user, "removed member");
        Ok(removed)
    }
}
