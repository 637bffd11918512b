//! Invitation model
//!
//! An invitation offers a role in a profile to an e-mail address. It is
//! resolved by the invitee through its token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ids::{InvitationId, ProfileId, UserId};
use super::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Declined,
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Declined => write!(f, "DECLINED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub email: String,
    pub profile_id: ProfileId,
    pub role: Role,

    /// Unique, unguessable token handed to the invitee
    pub token: String,

    pub status: InvitationStatus,
    pub invited_by: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    pub fn new(
        email: &str,
        profile_id: ProfileId,
        role: Role,
        invited_by: UserId,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InvitationId::new(),
            email: super::user::normalize_email(email),
            profile_id,
            role,
            token: generate_token(),
            status: InvitationStatus::Pending,
            invited_by,
            expires_at: now + ttl,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    /// Pending but past its expiry
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && now >= self.expires_at
    }

    pub fn set_status(&mut self, status: InvitationStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(ttl: Duration) -> Invitation {
        Invitation::new(
            "Friend@Example.com",
            ProfileId::new(),
            Role::Member,
            UserId::new(),
            ttl,
        )
    }

    #[test]
    fn test_new_invitation() {
        let inv = invite(Duration::days(7));
        assert_eq!(inv.email, "friend@example.com");
        assert!(inv.is_pending());
        assert_eq!(inv.token.len(), 64);
        assert!(!inv.is_stale(Utc::now()));
    }

    #[test]
    fn test_tokens_unique() {
        assert_ne!(invite(Duration::days(1)).token, invite(Duration::days(1)).token);
    }

    #[test]
    fn test_staleness() {
        let inv = invite(Duration::days(1));
        assert!(inv.is_stale(Utc::now() + Duration::days(2)));

        let mut declined = invite(Duration::days(1));
        declined.set_status(InvitationStatus::Declined);
        assert!(!declined.is_stale(Utc::now() + Duration::days(2)));
    }
}
