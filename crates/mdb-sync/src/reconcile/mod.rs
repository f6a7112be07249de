//! Change detection between a fresh extraction and the persisted state.
//!
//! A run reduces each table to three buckets: records to insert, rows to
//! update in place, and rows left alone. Identity comes from the configured
//! natural key ([`identity`]), content equality from a row fingerprint
//! ([`fingerprint`]), and the classification itself is a single linear pass
//! ([`differ`]).

pub mod differ;
pub mod fingerprint;
pub mod identity;

pub use differ::{diff, DiffResult, ExistingState, KeyDiagnostics, PersistedRow, PlannedUpdate};
pub use fingerprint::{fingerprint, Fingerprint};
pub use identity::{key_value, normalize_component, resolve_key, KeyColumns, KeyValue};
