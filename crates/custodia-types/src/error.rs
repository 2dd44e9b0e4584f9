//! Error types shared across all Custodia crates.

/// Errors that can occur across the Custodia runtime.
///
/// Each variant corresponds to a different subsystem: configuration,
/// persistence adapters, state serialization, or the audit ledger. Policy
/// checks and masking never produce errors; they answer with booleans and
/// transformed values instead.
#[derive(Debug, thiserror::Error)]
pub enum CustodiaError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error("state serialization error: {0}")]
    SerializationError(String),

    #[error("audit ledger error: {0}")]
    LedgerError(String),
}
