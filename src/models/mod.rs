//! Core data models for envelope-share
//!
//! Users, shared budget profiles and their memberships, envelopes,
//! transactions and invitations.

pub mod envelope;
pub mod ids;
pub mod invitation;
pub mod money;
pub mod profile;
pub mod role;
pub mod transaction;
pub mod user;

pub use envelope::Envelope;
pub use ids::{EnvelopeId, InvitationId, MembershipId, ProfileId, TransactionId, UserId};
pub use invitation::{Invitation, InvitationStatus};
pub use money::Money;
pub use profile::{BudgetProfile, Membership};
pub use role::Role;
pub use transaction::{Transaction, TransactionType};
pub use user::User;
