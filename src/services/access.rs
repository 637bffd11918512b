//! Access control
//!
//! Every mutating operation first asks this module for the caller's
//! membership in the target profile. The check is a threshold over the role
//! hierarchy: the caller passes when their role is at least the lowest role
//! in the allowed set.

use tracing::debug;

use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{Membership, ProfileId, Role};
use crate::storage::Storage;

use super::session::Session;

/// Any member of the profile
pub const MEMBERS: &[Role] = &[Role::Member, Role::Admin, Role::Owner];

/// Admins and the owner
pub const ADMINS: &[Role] = &[Role::Admin, Role::Owner];

/// The owner alone
pub const OWNER: &[Role] = &[Role::Owner];

/// Role checks against stored memberships
pub struct AccessControl<'a> {
    storage: &'a Storage,
}

impl<'a> AccessControl<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Profile the caller acts within when none is named explicitly
    ///
    /// With several memberships the earliest one wins.
    pub fn resolve_current_profile(&self, session: &Session) -> EnvelopeResult<ProfileId> {
        let user_id = session.require_user()?;

        let membership = self
            .storage
            .profiles
            .memberships_for_user(user_id)?
            .into_iter()
            .next()
            .ok_or_else(|| EnvelopeError::profile_not_found(format!("for user {}", user_id)))?;

        debug!(user = %user_id, profile = %membership.profile_id, "resolved current profile");
        Ok(membership.profile_id)
    }

    /// Load the caller's membership and check it meets the threshold of `allowed`
    ///
    /// A missing profile and a profile the caller does not belong to are both
    /// reported as `NotFound`. An empty `allowed` set admits nobody.
    pub fn require_role(
        &self,
        session: &Session,
        profile_id: ProfileId,
        allowed: &[Role],
    ) -> EnvelopeResult<Membership> {
        let user_id = session.require_user()?;

        let membership = self
            .storage
            .profiles
            .get_membership(user_id, profile_id)?
            .ok_or_else(|| EnvelopeError::profile_not_found(profile_id.to_string()))?;

        let Some(minimum) = Role::threshold(allowed) else {
            return Err(EnvelopeError::Forbidden(
                "No role is permitted to perform this action".into(),
            ));
        };

        if !membership.role.at_least(minimum) {
            debug!(
                user = %user_id,
                profile = %profile_id,
                role = %membership.role,
                required = %minimum,
                "role check failed"
            );
            return Err(EnvelopeError::Forbidden(format!(
                "Requires {} role or higher (you are {})",
                minimum, membership.role
            )));
        }

        Ok(membership)
    }
}
