//! apihost - privileged-process API host
//!
//! Dispatches named, correlated requests from an untrusted front-end to a
//! fixed set of backend operations, and keeps a disk-backed cache of remote
//! resources and saved payloads.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod paths;
pub mod settings;

pub use error::{HostError, Result};
