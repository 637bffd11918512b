//! Transaction service
//!
//! Keeps every envelope's `spent` equal to the signed sum of the non-transfer
//! transactions linked to it. Each mutation reverses the row's old effect on
//! its envelope, writes the row, then applies the new effect, all inside one
//! ledger unit of work: either every step lands or none does.
//!
//! TRANSFER rows have no balance rule and are refused on every normal
//! mutation path.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::audit::EntityType;
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{EnvelopeId, Money, ProfileId, Transaction, TransactionId, TransactionType};
use crate::storage::{LedgerTx, Storage};

use super::access::{AccessControl, MEMBERS};
use super::session::Session;

/// Service for transaction management
pub struct TransactionService<'a> {
    storage: &'a Storage,
}

/// Input for creating a new transaction
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub description: String,
    /// Positive magnitude; the type carries the direction
    pub amount: Money,
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub envelope_id: Option<EnvelopeId>,
}

/// Fields to change on a transaction; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    pub transaction_type: Option<TransactionType>,
    /// `Some(None)` unassigns, `Some(Some(id))` moves to another envelope
    pub envelope_id: Option<Option<EnvelopeId>>,
}

fn transfer_rejected(action: &str) -> EnvelopeError {
    EnvelopeError::Validation(format!(
        "Transfers cannot be {} here; use the transfer operation instead",
        action
    ))
}

/// A linked envelope must be in the same profile and not archived
fn check_target_envelope(
    tx: &LedgerTx<'_>,
    profile_id: ProfileId,
    envelope_id: EnvelopeId,
) -> EnvelopeResult<()> {
    let envelope = tx
        .envelope(envelope_id)
        .filter(|e| e.profile_id == profile_id)
        .ok_or_else(|| EnvelopeError::envelope_not_found(envelope_id.to_string()))?;
    if envelope.archived {
        return Err(EnvelopeError::Validation(format!(
            "Envelope '{}' is archived",
            envelope.name
        )));
    }
    Ok(())
}

/// Row by id, hidden when it belongs to another profile
fn load_in_profile(
    tx: &LedgerTx<'_>,
    profile_id: ProfileId,
    id: TransactionId,
) -> EnvelopeResult<Transaction> {
    tx.transaction(id)
        .filter(|t| t.profile_id == profile_id)
        .cloned()
        .ok_or_else(|| EnvelopeError::transaction_not_found(id.to_string()))
}

impl<'a> TransactionService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Record a transaction and add its contribution to the linked envelope
    pub fn create(
        &self,
        session: &Session,
        profile_id: ProfileId,
        input: CreateTransactionInput,
    ) -> EnvelopeResult<Transaction> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;

        let Some(contribution) = input.transaction_type.signed_adjustment(input.amount) else {
            return Err(transfer_rejected("created"));
        };

        let mut txn = Transaction::new(
            profile_id,
            input.description,
            input.amount,
            input.date,
            input.transaction_type,
        );
        txn.envelope_id = input.envelope_id;
        txn.validate()
            .map_err(|e| EnvelopeError::Validation(e.to_string()))?;

        self.storage.ledger.atomic(|tx| {
            if let Some(envelope_id) = txn.envelope_id {
                check_target_envelope(tx, profile_id, envelope_id)?;
            }
            tx.insert_transaction(txn.clone())?;
            if let Some(envelope_id) = txn.envelope_id {
                tx.adjust_spent(envelope_id, contribution)?;
            }
            Ok(())
        })?;

        self.storage.log_create(
            Some(actor.user_id),
            EntityType::Transaction,
            txn.id.to_string(),
            Some(txn.description.clone()),
            &txn,
        )?;

        info!(
            profile = %profile_id,
            transaction = %txn.id,
            envelope = ?txn.envelope_id,
            "created transaction"
        );
        Ok(txn)
    }

    pub fn get(
        &self,
        session: &Session,
        profile_id: ProfileId,
        id: TransactionId,
    ) -> EnvelopeResult<Transaction> {
        AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;
        self.storage
            .ledger
            .get_transaction(id)?
            .filter(|t| t.profile_id == profile_id)
            .ok_or_else(|| EnvelopeError::transaction_not_found(id.to_string()))
    }

    /// Find a transaction by full or short id
    pub fn find(
        &self,
        session: &Session,
        profile_id: ProfileId,
        identifier: &str,
    ) -> EnvelopeResult<Transaction> {
        if let Ok(id) = identifier.parse::<TransactionId>() {
            return self.get(session, profile_id, id);
        }

        let identifier = identifier.trim();
        self.list(session, profile_id, None)?
            .into_iter()
            .find(|t| t.id.short() == identifier)
            .ok_or_else(|| EnvelopeError::transaction_not_found(identifier))
    }

    /// Transactions of a profile, newest first, optionally for one envelope
    pub fn list(
        &self,
        session: &Session,
        profile_id: ProfileId,
        envelope_id: Option<EnvelopeId>,
    ) -> EnvelopeResult<Vec<Transaction>> {
        AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;
        self.storage
            .ledger
            .transactions_in_profile(profile_id, envelope_id)
    }

    /// Edit a transaction, moving its contribution between envelopes as needed
    pub fn update(
        &self,
        session: &Session,
        profile_id: ProfileId,
        id: TransactionId,
        input: UpdateTransactionInput,
    ) -> EnvelopeResult<Transaction> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;

        let (before, after) = self.storage.ledger.atomic(|tx| {
            let original = load_in_profile(tx, profile_id, id)?;

            let new_type = input.transaction_type.unwrap_or(original.transaction_type);
            if original.transaction_type.is_transfer() != new_type.is_transfer() {
                return Err(EnvelopeError::Validation(
                    "A transaction cannot be changed to or from TRANSFER; delete it and create a new one"
                        .into(),
                ));
            }

            let mut updated = original.clone();
            if let Some(description) = &input.description {
                updated.description = description.trim().to_string();
            }
            if let Some(amount) = input.amount {
                updated.amount = amount;
            }
            if let Some(date) = input.date {
                updated.date = date;
            }
            updated.transaction_type = new_type;
            if let Some(envelope_id) = input.envelope_id {
                updated.envelope_id = envelope_id;
            }
            updated.updated_at = Utc::now();

            updated
                .validate()
                .map_err(|e| EnvelopeError::Validation(e.to_string()))?;

            // Only a newly chosen envelope must be open for new activity
            if let Some(envelope_id) = updated.envelope_id {
                if Some(envelope_id) != original.envelope_id {
                    if let Some(envelope) = tx.envelope(envelope_id) {
                        if envelope.archived && envelope.profile_id == profile_id {
                            return Err(EnvelopeError::Validation(format!(
                                "Envelope '{}' is archived",
                                envelope.name
                            )));
                        }
                    }
                }
            }

            if let (Some(old_envelope), Some(old)) = (original.envelope_id, original.contribution()) {
                tx.adjust_spent(old_envelope, -old)?;
            }
            tx.update_transaction(updated.clone())?;
            if let (Some(new_envelope), Some(new)) = (updated.envelope_id, updated.contribution()) {
                tx.adjust_spent(new_envelope, new)?;
            }

            Ok((original, updated))
        })?;

        self.storage.log_update(
            Some(actor.user_id),
            EntityType::Transaction,
            after.id.to_string(),
            Some(after.description.clone()),
            &before,
            &after,
        )?;

        debug!(
            transaction = %id,
            from = ?before.envelope_id,
            to = ?after.envelope_id,
            "updated transaction"
        );
        Ok(after)
    }

    /// Delete a transaction and remove its contribution from its envelope
    pub fn delete(
        &self,
        session: &Session,
        profile_id: ProfileId,
        id: TransactionId,
    ) -> EnvelopeResult<Transaction> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;

        let txn = self.storage.ledger.atomic(|tx| {
            let txn = load_in_profile(tx, profile_id, id)?;
            let Some(contribution) = txn.contribution() else {
                return Err(transfer_rejected("deleted"));
            };

            if let Some(envelope_id) = txn.envelope_id {
                tx.adjust_spent(envelope_id, -contribution)?;
            }
            tx.delete_transaction(id)
        })?;

        self.storage.log_delete(
            Some(actor.user_id),
            EntityType::Transaction,
            txn.id.to_string(),
            Some(txn.description.clone()),
            &txn,
        )?;

        info!(profile = %profile_id, transaction = %id, "deleted transaction");
        Ok(txn)
    }
}
