//! Membership roles and their hierarchy
//!
//! MEMBER < ADMIN < OWNER is a strict total order. Authorization checks are
//! thresholds over [`Role::level`], never comparisons of role names.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Role of a user within a budget profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Member,
    Admin,
    Owner,
}

impl Role {
    /// Ordinal position in the hierarchy
    pub const fn level(self) -> u8 {
        match self {
            Role::Member => 1,
            Role::Admin => 2,
            Role::Owner => 3,
        }
    }

    /// Whether this role meets a minimum threshold
    pub fn at_least(self, minimum: Role) -> bool {
        self.level() >= minimum.level()
    }

    /// The lowest role in a set of allowed roles, `None` for an empty set
    pub fn threshold(allowed: &[Role]) -> Option<Role> {
        allowed.iter().copied().min()
    }

    /// Parse a role name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Some(Role::Member),
            "admin" => Some(Role::Admin),
            "owner" => Some(Role::Owner),
            _ => None,
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.level().cmp(&other.level())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => write!(f, "MEMBER"),
            Role::Admin => write!(f, "ADMIN"),
            Role::Owner => write!(f, "OWNER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_order() {
        assert!(Role::Member < Role::Admin);
        assert!(Role::Admin < Role::Owner);
        assert!(Role::Owner.at_least(Role::Admin));
        assert!(!Role::Member.at_least(Role::Admin));
    }

    #[test]
    fn test_threshold_is_minimum() {
        assert_eq!(Role::threshold(&[Role::Owner, Role::Admin]), Some(Role::Admin));
        assert_eq!(Role::threshold(&[Role::Owner]), Some(Role::Owner));
        assert_eq!(Role::threshold(&[]), None);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::Owner.to_string(), "OWNER");
    }

    #[test]
    fn test_serde_uses_upper_case() {
        assert_eq!(serde_json::to_string(&Role::Member).unwrap(), "\"MEMBER\"");
        let parsed: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(parsed, Role::Admin);
    }
}
