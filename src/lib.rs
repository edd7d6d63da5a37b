//! Xiao Liu Ren (小六壬) oracle.
//!
//! Numbers are reduced by digit-summing, mapped through a nine-entry
//! element table, and paired with the current double-hour period. Each
//! session may submit three times; an optional language-model backend
//! adds a free-text analysis.

pub mod clock;
pub mod config;
pub mod divination;
pub mod engine;
pub mod error;
pub mod net;
pub mod session;

pub use config::OracleConfig;
pub use engine::{OracleEngine, SubmissionForm};
pub use error::OracleError;
