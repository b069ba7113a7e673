//! CodeBreaker Store: persistence for rescue sessions and preferences.
//!
//! Sessions and the preferences singleton are kept as JSON values in a
//! key-value medium ([`kv::KeyValueStore`]), mirroring browser local
//! storage. The whole collection is read and rewritten on every change;
//! the expected history is small and there is a single writer.
//! Snapshots ([`snapshot::Snapshot`]) carry a BLAKE3 checksum so a
//! damaged backup is refused instead of half-imported.

pub mod kv;
pub mod session;
pub mod snapshot;
pub mod store;

pub use kv::{FileKv, KeyValueStore, KvError, MemoryKv};
pub use session::RescueSession;
pub use snapshot::Snapshot;
pub use store::{ImportSummary, SessionStore, StoreError, PREFERENCES_KEY, SESSIONS_KEY};
