//! Display formatting for terminal output
//!
//! Turns models into tables and detail blocks for the CLI.

pub mod envelope;
pub mod profile;
pub mod transaction;

pub use envelope::{format_corrections, format_envelope_details, format_envelope_list};
pub use profile::{
    format_invitation_list, format_member_list, format_profile_details, format_profile_list,
};
pub use transaction::{format_transaction_details, format_transaction_register};
