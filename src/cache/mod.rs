// Cache module for the on-disk resource cache.
// Fetches remote resources and persists payloads as flat files named by key.

pub mod payload;
pub mod store;

pub use payload::Payload;
pub use store::ResourceCache;
