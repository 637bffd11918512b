//! Envelope service
//!
//! Envelope management is restricted to admins; any member can read. The
//! `spent` aggregate is never set here directly except by
//! [`EnvelopeService::recompute_spent`], which rebuilds it from the ledger.

use chrono::Utc;
use tracing::{info, warn};

use crate::audit::{AuditEntry, EntityType};
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::models::{Envelope, EnvelopeId, Money, ProfileId};
use crate::storage::Storage;

use super::access::{AccessControl, ADMINS, MEMBERS};
use super::session::Session;

/// Service for envelope management
pub struct EnvelopeService<'a> {
    storage: &'a Storage,
}

/// Fields to change on an envelope; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct UpdateEnvelopeInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub target_amount: Option<Money>,
}

/// An envelope whose stored `spent` disagreed with its transactions
#[derive(Debug, Clone)]
pub struct SpentCorrection {
    pub envelope_id: EnvelopeId,
    pub name: String,
    pub stored: Money,
    pub recomputed: Money,
}

impl<'a> EnvelopeService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    fn ensure_unique_name(
        &self,
        profile_id: ProfileId,
        name: &str,
        exclude: Option<EnvelopeId>,
    ) -> EnvelopeResult<()> {
        if let Some(existing) = self.storage.ledger.find_envelope_by_name(profile_id, name)? {
            if Some(existing.id) != exclude {
                return Err(EnvelopeError::Duplicate {
                    entity_type: "Envelope",
                    identifier: existing.name,
                });
            }
        }
        Ok(())
    }

    /// Envelope by id, hidden when it belongs to another profile
    fn load(&self, profile_id: ProfileId, id: EnvelopeId) -> EnvelopeResult<Envelope> {
        self.storage
            .ledger
            .get_envelope(id)?
            .filter(|e| e.profile_id == profile_id)
            .ok_or_else(|| EnvelopeError::envelope_not_found(id.to_string()))
    }

    pub fn create(
        &self,
        session: &Session,
        profile_id: ProfileId,
        name: &str,
        category: &str,
        target_amount: Money,
    ) -> EnvelopeResult<Envelope> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, ADMINS)?;

        let envelope = Envelope::new(profile_id, name, category, target_amount);
        envelope
            .validate()
            .map_err(|e| EnvelopeError::Validation(e.to_string()))?;
        self.ensure_unique_name(profile_id, &envelope.name, None)?;

        self.storage
            .ledger
            .atomic(|tx| tx.insert_envelope(envelope.clone()))?;

        self.storage.log_create(
            Some(actor.user_id),
            EntityType::Envelope,
            envelope.id.to_string(),
            Some(envelope.name.clone()),
            &envelope,
        )?;

        info!(profile = %profile_id, envelope = %envelope.id, "created envelope");
        Ok(envelope)
    }

    pub fn get(
        &self,
        session: &Session,
        profile_id: ProfileId,
        id: EnvelopeId,
    ) -> EnvelopeResult<Envelope> {
        AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;
        self.load(profile_id, id)
    }

    /// Find an envelope by name, full id or short id
    pub fn find(
        &self,
        session: &Session,
        profile_id: ProfileId,
        identifier: &str,
    ) -> EnvelopeResult<Envelope> {
        AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;

        if let Some(envelope) = self
            .storage
            .ledger
            .find_envelope_by_name(profile_id, identifier)?
        {
            return Ok(envelope);
        }
        if let Ok(id) = identifier.parse::<EnvelopeId>() {
            return self.load(profile_id, id);
        }

        let identifier = identifier.trim();
        self.storage
            .ledger
            .envelopes_in_profile(profile_id)?
            .into_iter()
            .find(|e| e.id.short() == identifier)
            .ok_or_else(|| EnvelopeError::envelope_not_found(identifier))
    }

    pub fn list(
        &self,
        session: &Session,
        profile_id: ProfileId,
        include_archived: bool,
    ) -> EnvelopeResult<Vec<Envelope>> {
        AccessControl::new(self.storage).require_role(session, profile_id, MEMBERS)?;
        let mut envelopes = self.storage.ledger.envelopes_in_profile(profile_id)?;
        if !include_archived {
            envelopes.retain(|e| !e.archived);
        }
        Ok(envelopes)
    }

    pub fn update(
        &self,
        session: &Session,
        profile_id: ProfileId,
        id: EnvelopeId,
        input: UpdateEnvelopeInput,
    ) -> EnvelopeResult<Envelope> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, ADMINS)?;

        let before = self.load(profile_id, id)?;
        let mut envelope = before.clone();

        if let Some(name) = input.name {
            envelope.name = name.trim().to_string();
            self.ensure_unique_name(profile_id, &envelope.name, Some(id))?;
        }
        if let Some(category) = input.category {
            envelope.category = category.trim().to_string();
        }
        if let Some(target) = input.target_amount {
            envelope.target_amount = target;
        }
        envelope.updated_at = Utc::now();

        envelope
            .validate()
            .map_err(|e| EnvelopeError::Validation(e.to_string()))?;

        // `spent` is taken from the ledger at write time so a concurrent
        // transaction edit is not overwritten
        let envelope = self.storage.ledger.atomic(|tx| {
            let current = tx
                .envelope(id)
                .ok_or_else(|| EnvelopeError::envelope_not_found(id.to_string()))?;
            envelope.spent = current.spent;
            tx.update_envelope(envelope.clone())?;
            Ok(envelope)
        })?;

        self.storage.log_update(
            Some(actor.user_id),
            EntityType::Envelope,
            envelope.id.to_string(),
            Some(envelope.name.clone()),
            &before,
            &envelope,
        )?;

        Ok(envelope)
    }

    fn set_archived(
        &self,
        session: &Session,
        profile_id: ProfileId,
        id: EnvelopeId,
        archived: bool,
    ) -> EnvelopeResult<Envelope> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, ADMINS)?;
        self.load(profile_id, id)?;

        let (before, after) = self.storage.ledger.atomic(|tx| {
            let before = tx
                .envelope(id)
                .cloned()
                .ok_or_else(|| EnvelopeError::envelope_not_found(id.to_string()))?;
            let mut after = before.clone();
            after.archived = archived;
            after.updated_at = Utc::now();
            tx.update_envelope(after.clone())?;
            Ok((before, after))
        })?;

        self.storage.log_update(
            Some(actor.user_id),
            EntityType::Envelope,
            after.id.to_string(),
            Some(after.name.clone()),
            &before,
            &after,
        )?;

        Ok(after)
    }

    /// Hide an envelope from listings and refuse new transactions for it
    pub fn archive(
        &self,
        session: &Session,
        profile_id: ProfileId,
        id: EnvelopeId,
    ) -> EnvelopeResult<Envelope> {
        self.set_archived(session, profile_id, id, true)
    }

    pub fn unarchive(
        &self,
        session: &Session,
        profile_id: ProfileId,
        id: EnvelopeId,
    ) -> EnvelopeResult<Envelope> {
        self.set_archived(session, profile_id, id, false)
    }

    /// Delete an envelope; refused while any transaction references it
    pub fn delete(
        &self,
        session: &Session,
        profile_id: ProfileId,
        id: EnvelopeId,
    ) -> EnvelopeResult<Envelope> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, ADMINS)?;
        self.load(profile_id, id)?;

        let envelope = self.storage.ledger.atomic(|tx| tx.delete_envelope(id))?;

        self.storage.log_delete(
            Some(actor.user_id),
            EntityType::Envelope,
            envelope.id.to_string(),
            Some(envelope.name.clone()),
            &envelope,
        )?;

        info!(profile = %profile_id, envelope = %id, "deleted envelope");
        Ok(envelope)
    }

    /// Rebuild every envelope's `spent` from its linked transactions
    ///
    /// Runs as one unit and returns the envelopes that were corrected.
    pub fn recompute_spent(
        &self,
        session: &Session,
        profile_id: ProfileId,
    ) -> EnvelopeResult<Vec<SpentCorrection>> {
        let actor = AccessControl::new(self.storage).require_role(session, profile_id, ADMINS)?;

        let changes = self.storage.ledger.atomic(|tx| {
            let mut changes = Vec::new();
            for envelope in tx.envelopes_in_profile(profile_id) {
                let recomputed = tx
                    .transactions_for_envelope(envelope.id)
                    .iter()
                    .filter_map(|t| t.contribution())
                    .try_fold(Money::zero(), Money::checked_add)
                    .ok_or_else(|| {
                        EnvelopeError::Validation(format!(
                            "Spent total of '{}' is out of range",
                            envelope.name
                        ))
                    })?;
                if recomputed == envelope.spent {
                    continue;
                }

                let mut corrected = envelope.clone();
                corrected.spent = recomputed;
                corrected.updated_at = Utc::now();
                tx.update_envelope(corrected.clone())?;
                changes.push((envelope, corrected));
            }
            Ok(changes)
        })?;

        let entries: Vec<_> = changes
            .iter()
            .map(|(before, after)| {
                AuditEntry::update(EntityType::Envelope, after.id.to_string(), before, after)
                    .named(after.name.clone())
                    .by(Some(actor.user_id))
            })
            .collect();
        self.storage.log_batch(&entries)?;

        for (before, after) in &changes {
            warn!(
                envelope = %after.id,
                stored = %before.spent,
                recomputed = %after.spent,
                "corrected envelope spent"
            );
        }

        Ok(changes
            .into_iter()
            .map(|(before, after)| SpentCorrection {
                envelope_id: after.id,
                name: after.name,
                stored: before.spent,
                recomputed: after.spent,
            })
            .collect())
    }
}
