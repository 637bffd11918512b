//! Membership policy
//!
//! Rules every membership change must satisfy, in one place. These run after
//! the role threshold check and only look at the memberships involved.

use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{Membership, Role};

/// The OWNER membership is never changed or removed through generic paths
pub fn ensure_not_owner(target: &Membership) -> EnvelopeResult<()> {
    if target.is_owner() {
        return Err(EnvelopeError::Forbidden(
            "The profile owner's membership cannot be changed or removed".into(),
        ));
    }
    Ok(())
}

/// Callers cannot change their own role or remove themselves
pub fn ensure_not_self(actor: &Membership, target: &Membership) -> EnvelopeResult<()> {
    if actor.user_id == target.user_id {
        return Err(EnvelopeError::Forbidden(
            "You cannot change your own membership".into(),
        ));
    }
    Ok(())
}

/// The actor must rank strictly above the target
///
/// An ADMIN can manage MEMBERs but not other ADMINs.
pub fn ensure_outranks(actor: &Membership, target: &Membership) -> EnvelopeResult<()> {
    if actor.role.level() <= target.role.level() {
        return Err(EnvelopeError::Forbidden(format!(
            "A {} cannot manage a {}",
            actor.role, target.role
        )));
    }
    Ok(())
}

/// OWNER is never granted through role updates or invitations
pub fn ensure_assignable(role: Role) -> EnvelopeResult<()> {
    if role == Role::Owner {
        return Err(EnvelopeError::Forbidden(
            "The OWNER role cannot be assigned".into(),
        ));
    }
    Ok(())
}

/// The actor can hand out at most their own role
pub fn ensure_can_grant(actor: &Membership, role: Role) -> EnvelopeResult<()> {
    ensure_assignable(role)?;
    if !actor.role.at_least(role) {
        return Err(EnvelopeError::Forbidden(format!(
            "A {} cannot grant the {} role",
            actor.role, role
        )));
    }
    Ok(())
}

pub fn check_role_change(
    actor: &Membership,
    target: &Membership,
    new_role: Role,
) -> EnvelopeResult<()> {
    ensure_not_self(actor, target)?;
    ensure_not_owner(target)?;
    ensure_outranks(actor, target)?;
    ensure_can_grant(actor, new_role)
}

pub fn check_removal(actor: &Membership, target: &Membership) -> EnvelopeResult<()> {
    ensure_not_self(actor, target)?;
    ensure_not_owner(target)?;
    ensure_outranks(actor, target)
}
