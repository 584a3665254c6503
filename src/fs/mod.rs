//! Path-indexed flat store
//!
//! `store` holds the flat keyspace, `index` derives directory semantics
//! from key prefixes.

pub mod index;
pub mod store;

pub use index::PathIndex;
pub use store::{normalize_prefix, EntryIter, FlatStore, MemoryStore, StoreOp, WriteGuard};
