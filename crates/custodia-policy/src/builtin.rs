//! Built-in permission names and reserved keys.

pub use custodia_types::{COMPLIANCE_STATE_KEY, DEFAULT_IMMUTABLE_FIELDS};

/// Permission required to view fields classified as PHI.
pub const VIEW_PHI: &str = "view_phi";

/// Permission required to view fields classified as PII.
pub const VIEW_PII: &str = "view_pii";
