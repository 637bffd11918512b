//! Transaction model
//!
//! Amounts are stored as non-negative magnitudes; the sign of a transaction's
//! effect on its envelope is carried by [`TransactionType`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{EnvelopeId, ProfileId, TransactionId};
use super::money::Money;

/// Kind of transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Expense,
    Income,
    /// Reserved. No envelope-balance rule exists for transfers, so the normal
    /// mutation path refuses them.
    Transfer,
}

impl TransactionType {
    /// Contribution of `amount` to an envelope's `spent`
    ///
    /// EXPENSE adds the amount, INCOME subtracts it, TRANSFER has no defined
    /// contribution and yields `None`.
    pub fn signed_adjustment(self, amount: Money) -> Option<Money> {
        match self {
            TransactionType::Expense => Some(amount),
            TransactionType::Income => Some(-amount),
            TransactionType::Transfer => None,
        }
    }

    pub fn is_transfer(self) -> bool {
        matches!(self, TransactionType::Transfer)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expense" => Some(TransactionType::Expense),
            "income" => Some(TransactionType::Income),
            "transfer" => Some(TransactionType::Transfer),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Expense => write!(f, "EXPENSE"),
            TransactionType::Income => write!(f, "INCOME"),
            TransactionType::Transfer => write!(f, "TRANSFER"),
        }
    }
}

/// A recorded transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub profile_id: ProfileId,

    /// `None` for an unassigned transaction, which never touches any envelope
    pub envelope_id: Option<EnvelopeId>,

    pub description: String,

    /// Always a non-negative magnitude
    pub amount: Money,

    pub date: NaiveDate,

    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        profile_id: ProfileId,
        description: impl Into<String>,
        amount: Money,
        date: NaiveDate,
        transaction_type: TransactionType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            profile_id,
            envelope_id: None,
            description: description.into().trim().to_string(),
            amount,
            date,
            transaction_type,
            created_at: now,
            updated_at: now,
        }
    }

    /// Contribution of this transaction to its envelope, `None` for transfers
    pub fn contribution(&self) -> Option<Money> {
        self.transaction_type.signed_adjustment(self.amount)
    }

    pub fn is_assigned(&self) -> bool {
        self.envelope_id.is_some()
    }

    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        if self.description.is_empty() {
            return Err(TransactionValidationError::EmptyDescription);
        }
        if !self.amount.is_positive() {
            return Err(TransactionValidationError::NonPositiveAmount(self.amount));
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.date.format("%Y-%m-%d"),
            self.description,
            self.transaction_type,
            self.amount
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionValidationError {
    EmptyDescription,
    NonPositiveAmount(Money),
}

impl fmt::Display for TransactionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "Transaction description cannot be empty"),
            Self::NonPositiveAmount(amount) => {
                write!(f, "Transaction amount must be greater than zero, got {}", amount)
            }
        }
    }
}

impl std::error::Error for TransactionValidationError {}
