//! CertChain - a hash-linked ledger of issued certificates
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, content hashing, the chain, integrity checks
//!   and the shared [`blockchain::ChainStore`]
//!
//! ## State Management
//! - [`persistence`] - Explicit JSON snapshot export and import
//!
//! ## Integration
//! - [`api`] - REST endpoints over the store (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;

// ============================================================================
// State Management
// ============================================================================
pub mod persistence;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
