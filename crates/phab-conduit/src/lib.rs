//! Conduit RPC client
//!
//! Talks to a Phabricator install over its Conduit API:
//! - `ConduitConfig`: endpoint URL and API token, loadable from the environment
//! - `ConduitClient`: issues calls, unwraps the response envelope, and turns
//!   server-side rejections into [`phab_domain::ConduitError`]
//!
//! There is no retry or backoff layer; failures propagate to the caller
//! unchanged.

pub mod client;
pub mod error;

pub use client::{ConduitClient, ConduitConfig};
pub use error::{ClientError, Result};
