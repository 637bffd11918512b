//! Storage layer for envelope-share
//!
//! JSON file storage with atomic writes. Users, profiles (with memberships),
//! invitations and the envelope/transaction ledger each live in their own
//! file under `data/`. Every change is also appended to the audit log.

pub mod file_io;
pub mod init;
pub mod invitations;
pub mod ledger;
pub mod profiles;
pub mod users;

pub use file_io::{read_json, write_json_atomic};
pub use init::{default_envelopes, initialize_storage};
pub use invitations::InvitationRepository;
pub use ledger::{LedgerRepository, LedgerTx};
pub use profiles::ProfileRepository;
pub use users::UserRepository;

use serde::Serialize;

use crate::audit::{AuditEntry, AuditLogger, EntityType};
use crate::config::paths::SharePaths;
use crate::error::EnvelopeError;
use crate::models::UserId;

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: SharePaths,
    pub users: UserRepository,
    pub profiles: ProfileRepository,
    pub invitations: InvitationRepository,
    pub ledger: LedgerRepository,
    audit: AuditLogger,
}

impl Storage {
    pub fn new(paths: SharePaths) -> Result<Self, EnvelopeError> {
        paths.ensure_directories()?;

        Ok(Self {
            users: UserRepository::new(paths.users_file()),
            profiles: ProfileRepository::new(paths.profiles_file()),
            invitations: InvitationRepository::new(paths.invitations_file()),
            ledger: LedgerRepository::new(paths.ledger_file()),
            audit: AuditLogger::new(paths.audit_log()),
            paths,
        })
    }

    pub fn paths(&self) -> &SharePaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&mut self) -> Result<(), EnvelopeError> {
        self.users.load()?;
        self.profiles.load()?;
        self.invitations.load()?;
        self.ledger.load()?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn log_create<T: Serialize>(
        &self,
        actor: Option<UserId>,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Result<(), EnvelopeError> {
        let entry = with_name(AuditEntry::create(entity_type, entity_id, entity), entity_name);
        self.audit.log(&entry.by(actor))
    }

    pub fn log_update<T: Serialize>(
        &self,
        actor: Option<UserId>,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
    ) -> Result<(), EnvelopeError> {
        let entry = with_name(
            AuditEntry::update(entity_type, entity_id, before, after),
            entity_name,
        );
        self.audit.log(&entry.by(actor))
    }

    pub fn log_delete<T: Serialize>(
        &self,
        actor: Option<UserId>,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Result<(), EnvelopeError> {
        let entry = with_name(AuditEntry::delete(entity_type, entity_id, entity), entity_name);
        self.audit.log(&entry.by(actor))
    }

    /// Append several prepared entries in one write
    pub fn log_batch(&self, entries: &[AuditEntry]) -> Result<(), EnvelopeError> {
        self.audit.log_batch(entries)
    }
}

fn with_name(entry: AuditEntry, name: Option<String>) -> AuditEntry {
    match name {
        Some(name) => entry.named(name),
        None => entry,
    }
}
