//! Ledger repository: envelopes and transactions
//!
//! Envelopes and transactions are persisted together in ledger.json because
//! an envelope's `spent` aggregate and the transaction rows behind it must
//! change together. Every mutation goes through [`LedgerRepository::atomic`],
//! a unit of work that:
//!
//! - holds the ledger write lock for the whole sequence, so concurrent edits
//!   to transactions sharing an envelope serialize instead of losing updates;
//! - journals each write and rolls all of them back if any step fails;
//! - persists the committed state with one atomic file replace, rolling memory
//!   back if that write fails.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{Envelope, EnvelopeId, Money, ProfileId, Transaction, TransactionId};

use super::file_io::{lock_error, read_json, write_json_atomic};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LedgerData {
    pub envelopes: Vec<Envelope>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Default)]
struct LedgerState {
    envelopes: HashMap<EnvelopeId, Envelope>,
    transactions: HashMap<TransactionId, Transaction>,
}

impl LedgerState {
    fn to_data(&self) -> LedgerData {
        let mut envelopes: Vec<_> = self.envelopes.values().cloned().collect();
        envelopes.sort_by(|a, b| {
            a.profile_id
                .cmp(&b.profile_id)
                .then(a.category.cmp(&b.category))
                .then(a.name.cmp(&b.name))
        });
        let mut transactions: Vec<_> = self.transactions.values().cloned().collect();
        sort_newest_first(&mut transactions);
        LedgerData {
            envelopes,
            transactions,
        }
    }
}

/// Date descending, most recently created first within a day
fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
}

/// Previous value of a row touched inside a unit of work
enum Undo {
    Envelope(EnvelopeId, Option<Envelope>),
    Transaction(TransactionId, Option<Transaction>),
}

/// Handle passed to the body of a unit of work
///
/// Reads see the unit's own uncommitted writes.
pub struct LedgerTx<'a> {
    state: &'a mut LedgerState,
    journal: Vec<Undo>,
}

impl<'a> LedgerTx<'a> {
    fn new(state: &'a mut LedgerState) -> Self {
        Self {
            state,
            journal: Vec::new(),
        }
    }

    fn rollback(&mut self) {
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::Envelope(id, Some(previous)) => {
                    self.state.envelopes.insert(id, previous);
                }
                Undo::Envelope(id, None) => {
                    self.state.envelopes.remove(&id);
                }
                Undo::Transaction(id, Some(previous)) => {
                    self.state.transactions.insert(id, previous);
                }
                Undo::Transaction(id, None) => {
                    self.state.transactions.remove(&id);
                }
            }
        }
    }

    fn is_dirty(&self) -> bool {
        !self.journal.is_empty()
    }

    pub fn envelope(&self, id: EnvelopeId) -> Option<&Envelope> {
        self.state.envelopes.get(&id)
    }

    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.state.transactions.get(&id)
    }

    pub fn envelopes_in_profile(&self, profile_id: ProfileId) -> Vec<Envelope> {
        self.state
            .envelopes
            .values()
            .filter(|e| e.profile_id == profile_id)
            .cloned()
            .collect()
    }

    pub fn transactions_for_envelope(&self, envelope_id: EnvelopeId) -> Vec<Transaction> {
        self.state
            .transactions
            .values()
            .filter(|t| t.envelope_id == Some(envelope_id))
            .cloned()
            .collect()
    }

    /// Foreign-key check: a linked envelope must exist in the row's profile
    fn check_envelope_link(&self, txn: &Transaction) -> EnvelopeResult<()> {
        if let Some(envelope_id) = txn.envelope_id {
            match self.state.envelopes.get(&envelope_id) {
                Some(envelope) if envelope.profile_id == txn.profile_id => {}
                _ => return Err(EnvelopeError::envelope_not_found(envelope_id.to_string())),
            }
        }
        Ok(())
    }

    pub fn insert_transaction(&mut self, txn: Transaction) -> EnvelopeResult<()> {
        if self.state.transactions.contains_key(&txn.id) {
            return Err(EnvelopeError::Duplicate {
                entity_type: "Transaction",
                identifier: txn.id.to_string(),
            });
        }
        self.check_envelope_link(&txn)?;
        self.journal.push(Undo::Transaction(txn.id, None));
        self.state.transactions.insert(txn.id, txn);
        Ok(())
    }

    pub fn update_transaction(&mut self, txn: Transaction) -> EnvelopeResult<()> {
        if !self.state.transactions.contains_key(&txn.id) {
            return Err(EnvelopeError::transaction_not_found(txn.id.to_string()));
        }
        self.check_envelope_link(&txn)?;
        let previous = self.state.transactions.insert(txn.id, txn.clone());
        self.journal.push(Undo::Transaction(txn.id, previous));
        Ok(())
    }

    pub fn delete_transaction(&mut self, id: TransactionId) -> EnvelopeResult<Transaction> {
        let removed = self
            .state
            .transactions
            .remove(&id)
            .ok_or_else(|| EnvelopeError::transaction_not_found(id.to_string()))?;
        self.journal.push(Undo::Transaction(id, Some(removed.clone())));
        Ok(removed)
    }

    /// Add `delta` to an envelope's `spent` aggregate
    pub fn adjust_spent(&mut self, envelope_id: EnvelopeId, delta: Money) -> EnvelopeResult<()> {
        let envelope = self
            .state
            .envelopes
            .get_mut(&envelope_id)
            .ok_or_else(|| EnvelopeError::envelope_not_found(envelope_id.to_string()))?;
        let previous = envelope.clone();
        envelope
            .adjust_spent(delta)
            .map_err(|e| EnvelopeError::Validation(e.to_string()))?;
        self.journal.push(Undo::Envelope(envelope_id, Some(previous)));
        Ok(())
    }

    pub fn insert_envelope(&mut self, envelope: Envelope) -> EnvelopeResult<()> {
        if self.state.envelopes.contains_key(&envelope.id) {
            return Err(EnvelopeError::Duplicate {
                entity_type: "Envelope",
                identifier: envelope.id.to_string(),
            });
        }
        self.journal.push(Undo::Envelope(envelope.id, None));
        self.state.envelopes.insert(envelope.id, envelope);
        Ok(())
    }

    pub fn update_envelope(&mut self, envelope: Envelope) -> EnvelopeResult<()> {
        if !self.state.envelopes.contains_key(&envelope.id) {
            return Err(EnvelopeError::envelope_not_found(envelope.id.to_string()));
        }
        let previous = self.state.envelopes.insert(envelope.id, envelope.clone());
        self.journal.push(Undo::Envelope(envelope.id, previous));
        Ok(())
    }

    /// Delete an envelope; restricted while any transaction references it
    pub fn delete_envelope(&mut self, id: EnvelopeId) -> EnvelopeResult<Envelope> {
        let linked = self
            .state
            .transactions
            .values()
            .filter(|t| t.envelope_id == Some(id))
            .count();
        if linked > 0 {
            return Err(EnvelopeError::Integrity(format!(
                "Envelope {} is still referenced by {} transaction(s)",
                id, linked
            )));
        }

        let removed = self
            .state
            .envelopes
            .remove(&id)
            .ok_or_else(|| EnvelopeError::envelope_not_found(id.to_string()))?;
        self.journal.push(Undo::Envelope(id, Some(removed.clone())));
        Ok(removed)
    }

    /// Cascade delete of everything a profile owns in the ledger
    ///
    /// Returns the number of (envelopes, transactions) removed.
    pub fn purge_profile(&mut self, profile_id: ProfileId) -> (usize, usize) {
        let txn_ids: Vec<_> = self
            .state
            .transactions
            .values()
            .filter(|t| t.profile_id == profile_id)
            .map(|t| t.id)
            .collect();
        for id in &txn_ids {
            if let Some(removed) = self.state.transactions.remove(id) {
                self.journal.push(Undo::Transaction(*id, Some(removed)));
            }
        }

        let envelope_ids: Vec<_> = self
            .state
            .envelopes
            .values()
            .filter(|e| e.profile_id == profile_id)
            .map(|e| e.id)
            .collect();
        for id in &envelope_ids {
            if let Some(removed) = self.state.envelopes.remove(id) {
                self.journal.push(Undo::Envelope(*id, Some(removed)));
            }
        }

        (envelope_ids.len(), txn_ids.len())
    }
}

/// Repository for the envelope/transaction ledger
pub struct LedgerRepository {
    path: PathBuf,
    state: RwLock<LedgerState>,
}

impl LedgerRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: RwLock::new(LedgerState::default()),
        }
    }

    pub fn load(&self) -> Result<(), EnvelopeError> {
        let file_data: LedgerData = read_json(&self.path)?;
        let mut state = self.state.write().map_err(lock_error)?;

        state.envelopes.clear();
        state.transactions.clear();
        for envelope in file_data.envelopes {
            state.envelopes.insert(envelope.id, envelope);
        }
        for txn in file_data.transactions {
            state.transactions.insert(txn.id, txn);
        }
        Ok(())
    }

    /// Run `body` as one all-or-nothing unit of work
    ///
    /// If `body` returns an error, or persisting the result fails, every write
    /// made inside the unit is undone and the error is returned unchanged.
    pub fn atomic<T, F>(&self, body: F) -> EnvelopeResult<T>
    where
        F: FnOnce(&mut LedgerTx<'_>) -> EnvelopeResult<T>,
    {
        let mut state = self.state.write().map_err(lock_error)?;
        let mut tx = LedgerTx::new(&mut *state);

        let value = match body(&mut tx) {
            Ok(value) => value,
            Err(e) => {
                tx.rollback();
                return Err(e);
            }
        };

        if tx.is_dirty() {
            let data = tx.state.to_data();
            if let Err(e) = write_json_atomic(&self.path, &data) {
                tx.rollback();
                return Err(e);
            }
        }

        Ok(value)
    }

    // === Reads ===

    pub fn get_envelope(&self, id: EnvelopeId) -> Result<Option<Envelope>, EnvelopeError> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.envelopes.get(&id).cloned())
    }

    /// Envelopes of a profile ordered by category, then name
    pub fn envelopes_in_profile(&self, profile_id: ProfileId) -> Result<Vec<Envelope>, EnvelopeError> {
        let state = self.state.read().map_err(lock_error)?;
        let mut envelopes: Vec<_> = state
            .envelopes
            .values()
            .filter(|e| e.profile_id == profile_id)
            .cloned()
            .collect();
        envelopes.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
        Ok(envelopes)
    }

    /// Case-insensitive name lookup within a profile
    pub fn find_envelope_by_name(
        &self,
        profile_id: ProfileId,
        name: &str,
    ) -> Result<Option<Envelope>, EnvelopeError> {
        let state = self.state.read().map_err(lock_error)?;
        let name = name.trim().to_lowercase();
        Ok(state
            .envelopes
            .values()
            .find(|e| e.profile_id == profile_id && e.name.to_lowercase() == name)
            .cloned())
    }

    pub fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, EnvelopeError> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.transactions.get(&id).cloned())
    }

    /// Transactions of a profile, newest first, optionally for one envelope
    pub fn transactions_in_profile(
        &self,
        profile_id: ProfileId,
        envelope_id: Option<EnvelopeId>,
    ) -> Result<Vec<Transaction>, EnvelopeError> {
        let state = self.state.read().map_err(lock_error)?;
        let mut transactions: Vec<_> = state
            .transactions
            .values()
            .filter(|t| t.profile_id == profile_id)
            .filter(|t| envelope_id.is_none() || t.envelope_id == envelope_id)
            .cloned()
            .collect();
        sort_newest_first(&mut transactions);
        Ok(transactions)
    }

    pub fn transaction_count(&self) -> Result<usize, EnvelopeError> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.transactions.len())
    }
}
