//! Envelope model
//!
//! An envelope is a budget category inside a profile. `spent` is a maintained
//! aggregate: it must always equal the signed sum of the non-transfer
//! transactions linked to the envelope. Only the ledger adjusts it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{EnvelopeId, ProfileId};
use super::money::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: EnvelopeId,
    pub profile_id: ProfileId,
    pub name: String,

    /// Free-form grouping label, e.g. "Needs"
    #[serde(default)]
    pub category: String,

    pub target_amount: Money,

    #[serde(default)]
    pub spent: Money,

    #[serde(default)]
    pub archived: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(
        profile_id: ProfileId,
        name: impl Into<String>,
        category: impl Into<String>,
        target_amount: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EnvelopeId::new(),
            profile_id,
            name: name.into().trim().to_string(),
            category: category.into().trim().to_string(),
            target_amount,
            spent: Money::zero(),
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// What is left of the target; negative when overspent
    pub fn remaining(&self) -> Money {
        self.target_amount.saturating_sub(self.spent)
    }

    pub fn is_overspent(&self) -> bool {
        self.spent > self.target_amount
    }

    /// Add `delta` to `spent`; leaves the envelope untouched on overflow
    pub fn adjust_spent(&mut self, delta: Money) -> Result<(), EnvelopeValidationError> {
        self.spent = self
            .spent
            .checked_add(delta)
            .ok_or(EnvelopeValidationError::SpentOverflow)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), EnvelopeValidationError> {
        if self.name.is_empty() {
            return Err(EnvelopeValidationError::EmptyName);
        }
        if self.name.len() > 50 {
            return Err(EnvelopeValidationError::NameTooLong(self.name.len()));
        }
        if self.target_amount.is_negative() {
            return Err(EnvelopeValidationError::NegativeTarget(self.target_amount));
        }
        Ok(())
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} of {})", self.name, self.spent, self.target_amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeValidationError {
    EmptyName,
    NameTooLong(usize),
    NegativeTarget(Money),
    SpentOverflow,
}

impl fmt::Display for EnvelopeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Envelope name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Envelope name too long ({} characters, max 50)", len)
            }
            Self::NegativeTarget(amount) => {
                write!(f, "Target amount cannot be negative: {}", amount)
            }
            Self::SpentOverflow => write!(f, "Envelope spent total is out of range"),
        }
    }
}

impl std::error::Error for EnvelopeValidationError {}

/// Starter envelopes offered when a profile is created
pub const DEFAULT_ENVELOPES: &[(&str, &str)] = &[
    ("Rent", "Bills"),
    ("Utilities", "Bills"),
    ("Groceries", "Needs"),
    ("Transportation", "Needs"),
    ("Dining Out", "Wants"),
    ("Entertainment", "Wants"),
    ("Emergency Fund", "Savings"),
];
