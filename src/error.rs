//! Error types for the blocker ledger core

use thiserror::Error;

/// Failures while building key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Seed must be exactly {expected} bytes, got {got}")]
    InvalidSeedLength { expected: usize, got: usize },
    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),
}

/// Failures reported by a block, transaction or UTXO store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::Store(err.into())
    }
}

impl From<Box<bincode::ErrorKind>> for StoreError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        StoreError::Encoding(err.to_string())
    }
}

/// Rejections and faults surfaced by the chain engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Invalid block signature")]
    InvalidBlockSignature,
    #[error("Invalid previous block hash. Expected {expected}, but got {got}")]
    InvalidPrevHash { expected: String, got: String },
    #[error("Invalid signature on transaction {0}")]
    InvalidTxSignature(String),
    #[error("Insufficient balance: inputs ({inputs}) < outputs ({outputs})")]
    InsufficientFunds { inputs: u64, outputs: u64 },
    #[error("Double spend detected: UTXO {0} is already spent")]
    DoubleSpend(String),
    #[error("Unknown UTXO: {0}")]
    UnknownUtxo(String),
    #[error("UTXO {0} already exists")]
    DuplicateOutput(String),
    #[error("Stored chain starts at {got}, expected genesis {expected}")]
    GenesisMismatch { expected: String, got: String },
    #[error("Given height ({requested}) too high - height ({height})")]
    HeightTooHigh { requested: u64, height: u64 },
    #[error("Input {input} of transaction {tx} has no signature")]
    MissingSignature { tx: String, input: usize },
    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Cannot build a Merkle tree from an empty leaf list")]
    EmptyMerkleTree,
    #[error("Amount overflow while summing transaction values")]
    AmountOverflow,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Failures while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
