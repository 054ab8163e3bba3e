//! Site key lifecycle: generation, rotation, revocation.

mod key;
mod store;

pub use key::{KeyStatus, SiteKey};
pub use store::{InMemoryKeyStore, KeyStore};
