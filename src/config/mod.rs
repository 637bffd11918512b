//! Configuration module for envelope-share
//!
//! - base directory resolution (`paths`)
//! - persisted settings (`settings`)

pub mod paths;
pub mod settings;

pub use paths::SharePaths;
pub use settings::Settings;
