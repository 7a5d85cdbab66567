use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment-level faults: malformed policy trees, failed reference loads,
/// poisoned locks. Expected evaluation failures never surface here; they are
/// carried as [`crate::Status`] values inside results.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum PdpError {
    #[error("failed to lock policy store for read/write: {0}")]
    LockError(String),

    #[error("failed to parse policy: {0}")]
    ParseError(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("invalid version match: {0}")]
    InvalidVersionMatch(String),

    #[error("failed to load referenced policy {id}: {reason}")]
    LoadError { id: String, reason: String },
}
