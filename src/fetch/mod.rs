// Remote fetch module.
// Provides the HTTP(S) client used by the resource cache.

pub mod client;
#[cfg(test)]
pub(crate) mod test_server;

pub use client::{Fetcher, parse_http_url};
