//! envelope-share - shared envelope budgeting
//!
//! This library provides the core of a multi-user envelope budgeting tool.
//! Users belong to shared budget profiles with a role (owner, admin, member),
//! and every expense recorded against an envelope keeps that envelope's
//! `spent` total consistent with its transactions.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (users, profiles, envelopes, transactions)
//! - `storage`: JSON file storage with atomic ledger updates
//! - `audit`: Audit logging system
//! - `services`: Business logic and role checks
//! - `display`: Terminal formatting
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use envelope_share::config::paths::SharePaths;
//! use envelope_share::services::{Session, UserService};
//! use envelope_share::storage::Storage;
//!
//! let mut storage = Storage::new(SharePaths::new()?)?;
//! storage.load_all()?;
//! let user = UserService::new(&storage).register("ana@example.com", None)?;
//! let session = Session::for_user(user.id);
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{EnvelopeError, EnvelopeResult};
