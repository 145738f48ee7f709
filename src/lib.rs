//! Starchain - a tamper-evident, append-only star registry
//!
//! # Architecture
//!
//! ## Ledger
//! - [`blockchain`] - Blocks, the chain, validation and the ownership protocol
//! - [`codec`] - Payload transport encoding
//! - [`persistence`] - Append-only chain storage
//!
//! ## Cryptography
//! - [`crypto`] - Bitcoin message signatures
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`logging`] - Injected logger and tracing setup
//!
//! # Example
//!
//! ```
//! use starchain::blockchain::Blockchain;
//! use starchain::crypto::{AddressKind, KeyPair, Network};
//! use serde_json::json;
//!
//! let chain = Blockchain::new()?;
//! let keypair = KeyPair::generate();
//! let address = keypair.address(AddressKind::P2pkh, Network::Mainnet)?;
//!
//! let message = chain.request_ownership_message(&address);
//! let signature = keypair.sign_message(&message, AddressKind::P2pkh)?;
//! let block = chain.submit_entry(&address, &message, &signature, json!({"ra": "16h 29m 1.0s"}))?;
//!
//! assert_eq!(block.height(), 1);
//! assert!(chain.validate_chain().is_empty());
//! # Ok::<(), starchain::error::ChainError>(())
//! ```

#![forbid(unsafe_code)]

// ============================================================================
// Ledger
// ============================================================================
pub mod blockchain;
pub mod codec;
pub mod persistence;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod logging;
