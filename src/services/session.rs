//! Caller identity
//!
//! Identity is established by an external collaborator. The library only
//! carries the resulting user id around and refuses to act without one.

use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::UserId;

/// The identity a request is made under
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<UserId>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// The caller's id, or `Unauthenticated`
    pub fn require_user(&self) -> EnvelopeResult<UserId> {
        self.user_id.ok_or(EnvelopeError::Unauthenticated)
    }
}
