//! Service layer for envelope-share
//!
//! Services hold the business rules on top of the storage layer. Every
//! operation takes the caller's [`Session`] and checks the caller's role in
//! the target profile through [`AccessControl`] before touching data.

pub mod access;
pub mod envelope;
pub mod import;
pub mod invitation;
pub mod membership;
pub mod policy;
pub mod profile;
pub mod session;
pub mod transaction;
pub mod user;

#[cfg(test)]
mod testing;

pub use access::AccessControl;
pub use envelope::{EnvelopeService, SpentCorrection, UpdateEnvelopeInput};
pub use import::{parse_csv, ImportResult, ImportRow, ImportService, RejectedRow};
pub use invitation::InvitationService;
pub use membership::{Member, MembershipService};
pub use profile::{ProfileDeletion, ProfileService};
pub use session::Session;
pub use transaction::{CreateTransactionInput, TransactionService, UpdateTransactionInput};
pub use user::UserService;
