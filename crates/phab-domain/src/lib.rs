//! phab-bridge Review Domain
//!
//! Data model for the Differential side of the bridge:
//! - `Diff`: one uploaded diff with its branch and unit/lint status codes
//! - `Revision`: the persistent review entity a diff belongs to
//! - `ConduitError`: failure signal raised when a Conduit call is rejected
//!
//! All records are serializable against the Conduit wire format, including
//! its epoch-second timestamps and camelCase field names.

pub mod error;
pub mod schema;

pub use error::ConduitError;
pub use schema::{Diff, Revision};

/// Domain crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
