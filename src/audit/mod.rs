//! Audit logging for envelope-share
//!
//! Every create, update and delete performed by a service is appended to
//! `audit.log` as one JSON object per line, with the acting user and
//! before/after snapshots.
//!
//! ```rust,ignore
//! use envelope_share::audit::{AuditEntry, AuditLogger, EntityType};
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! logger.log(&AuditEntry::create(EntityType::Envelope, id, &envelope).by(Some(user_id)))?;
//! ```

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
