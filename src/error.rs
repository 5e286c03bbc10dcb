//! Error types for CertChain

use std::fmt;
use thiserror::Error;

/// Which check failed while walking a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityFault {
    /// Stored hash differs from the recomputed content hash.
    HashMismatch,
    /// `previousHash` does not equal the hash of the preceding block.
    LinkMismatch,
    /// Block index does not equal its position in the chain.
    IndexMismatch,
}

impl fmt::Display for IntegrityFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IntegrityFault::HashMismatch => write!(f, "hash mismatch"),
            IntegrityFault::LinkMismatch => write!(f, "previous hash mismatch"),
            IntegrityFault::IndexMismatch => write!(f, "index out of sequence"),
        }
    }
}

/// First broken position found by an integrity walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("block {index}: {fault}")]
pub struct IntegrityError {
    pub index: u64,
    pub fault: IntegrityFault,
}

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Invalid chain: {0}")]
    InvalidChain(String),
    #[error("Chain integrity check failed at {0}")]
    Integrity(#[from] IntegrityError),
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
