//! Error types for Starchain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Pre-append validation found blocks whose hash or linkage no longer checks out.
    #[error("Chain corrupted: invalid block(s) at height(s) {heights:?}")]
    ChainCorrupted { heights: Vec<u64> },
    #[error("Ownership message expired: {elapsed}s elapsed, window is {window}s")]
    ExpiredMessage { elapsed: i64, window: u64 },
    #[error("Signature verification failed")]
    InvalidSignature,
    #[error("Malformed ownership message: {0}")]
    MalformedMessage(String),
    #[error("Decode error: {0}")]
    DecodeError(String),
    #[error("Encode error: {0}")]
    EncodeError(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<hex::FromHexError> for ChainError {
    fn from(err: hex::FromHexError) -> Self {
        ChainError::DecodeError(format!("invalid hex: {}", err))
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::DecodeError(format!("invalid json: {}", err))
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::StorageError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
