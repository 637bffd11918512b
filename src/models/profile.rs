//! Budget profiles and memberships
//!
//! A budget profile is the shared container collaborators work within. Every
//! user's access to a profile is a [`Membership`] carrying a [`Role`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{MembershipId, ProfileId, UserId};
use super::role::Role;

/// A shared budget profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetProfile {
    pub id: ProfileId,

    /// The user holding the OWNER membership
    pub owner_id: UserId,

    pub name: String,

    /// Three-letter currency code, upper case
    pub currency: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BudgetProfile {
    pub fn new(owner_id: UserId, name: impl Into<String>, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProfileId::new(),
            owner_id,
            name: name.into().trim().to_string(),
            currency: currency.into().trim().to_ascii_uppercase(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        if self.name.is_empty() {
            return Err(ProfileValidationError::EmptyName);
        }
        if self.name.len() > 80 {
            return Err(ProfileValidationError::NameTooLong(self.name.len()));
        }
        normalize_currency(&self.currency)?;
        Ok(())
    }
}

impl fmt::Display for BudgetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.currency)
    }
}

/// Link between a user and a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub profile_id: ProfileId,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: UserId, profile_id: ProfileId, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: MembershipId::new(),
            user_id,
            profile_id,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
        self.updated_at = Utc::now();
    }
}

/// Upper-case a currency code and check it is three ASCII letters
pub fn normalize_currency(code: &str) -> Result<String, ProfileValidationError> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(ProfileValidationError::InvalidCurrency(code))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileValidationError {
    EmptyName,
    NameTooLong(usize),
    InvalidCurrency(String),
}

impl fmt::Display for ProfileValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Profile name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Profile name too long ({} characters, max 80)", len)
            }
            Self::InvalidCurrency(code) => {
                write!(f, "Invalid currency code '{}': expected three letters", code)
            }
        }
    }
}

impl std::error::Error for ProfileValidationError {}
