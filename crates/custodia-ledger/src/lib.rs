pub mod entry;
pub mod filter;
pub mod integrity;
pub mod middleware;
pub mod ndjson_log;
pub mod query;
pub mod store;

pub use entry::{AuditAction, AuditEntry, FieldChange, NewAuditEntry};
pub use filter::AuditFilter;
pub use integrity::IntegrityReport;
pub use middleware::AuditMiddleware;
pub use ndjson_log::{ExportMode, NdjsonSink, NdjsonWriter};
pub use store::{AuditLog, GENESIS_HASH, MAX_AUDIT_ENTRIES};
