//! Blocker - validation and ledger core of a minimal UTXO blockchain
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Cryptography
//! - [`crypto`] - Key pairs, signatures and addresses (secp256k1)
//! - [`merkle`] - Merkle tree over transaction hashes
//!
//! ## Core Ledger
//! - [`transaction`] - Transaction types, hashing and signature checks
//! - [`blockchain`] - Headers, blocks, the header list and the chain engine
//! - [`persistence`] - Block, transaction and UTXO stores (in-memory, SQLite)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`node`] - Tracing setup and chain construction from configuration
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;
pub mod merkle;

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod persistence;
pub mod transaction;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod node;
