//! User model
//!
//! Identity is owned by an external auth collaborator; this record only keeps
//! what the budgeting side needs to show and match users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Unique, stored lowercased
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email: normalize_email(email),
            name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name if set, e-mail otherwise
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }

    pub fn validate(&self) -> Result<(), UserValidationError> {
        validate_email(&self.email)?;
        if let Some(name) = &self.name {
            if name.len() > 100 {
                return Err(UserValidationError::NameTooLong(name.len()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check; delivery is someone else's problem
pub fn validate_email(email: &str) -> Result<(), UserValidationError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(UserValidationError::InvalidEmail(email.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    InvalidEmail(String),
    NameTooLong(usize),
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail(email) => write!(f, "Invalid e-mail address: '{}'", email),
            Self::NameTooLong(len) => {
                write!(f, "Name too long ({} characters, max 100)", len)
            }
        }
    }
}

impl std::error::Error for UserValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalized() {
        let user = User::new("  Alice@Example.COM ", Some("Alice".into()));
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.display_name(), "Alice");
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_blank_name_dropped() {
        let user = User::new("bob@example.com", Some("   ".into()));
        assert!(user.name.is_none());
        assert_eq!(user.display_name(), "bob@example.com");
    }

    #[test]
    fn test_invalid_emails() {
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("a@example.com").is_ok());
    }
}
