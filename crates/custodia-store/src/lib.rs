//! Compliance-aware state container for Custodia.
//!
//! [`ComplianceStore`] wraps an application's domain state and layers
//! field-level redaction, masking, immutability checks, and a bounded
//! audit log on top of it, without the domain code knowing about any of
//! them. A configurable allow-list of state keys can be persisted through a
//! [`PersistenceAdapter`].

pub mod compliance;
pub mod container;
pub mod persist;
pub mod redact;
pub mod shared;

pub use compliance::ComplianceState;
pub use container::{ComplianceStore, ComplianceStoreBuilder, SubscriptionId, STATE_ENTITY_TYPE};
pub use persist::{
    select_persisted, JsonFileAdapter, MemoryAdapter, PersistenceAdapter, SqliteAdapter,
};
pub use redact::{MAX_REDACTION_DEPTH, TRUNCATED_MARKER};
pub use shared::SharedComplianceStore;
