//! Structured logging for snapsheet.
//!
//! Console + rolling NDJSON file output, and redaction of credentials that
//! may appear in upstream error bodies.

pub mod logger;
pub mod redact;

pub use logger::{LoggerGuard, init_logger};
pub use redact::redact_sensitive_data;
