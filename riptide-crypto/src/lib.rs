// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Key material for riptide validators.
//!
//! This crate provides:
//! - **Ed25519 signatures** - the default validator key scheme
//! - **secp256k1 signatures** - ECDSA alternative for operators that need it
//! - **`PrivKey` / `PubKey`** - scheme-tagged sum types used by the rest of
//!   the workspace, with the JSON key-file representation
//!   `{"type": "<tag>", "value": "<base64>"}`
//! - **`Address`** - the 20-byte truncated SHA-256 of a public key

pub mod address;
pub mod ed25519;
pub mod keys;
pub mod secp256k1;

pub use address::{address_hash, Address, ADDRESS_SIZE};
pub use keys::{PrivKey, PubKey, Scheme};

/// Errors from key handling and signing.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Invalid private key bytes
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Invalid public key bytes
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid address string
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Signing failed
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Unknown scheme tag in a serialized key
    #[error("unknown key type tag: {0}")]
    UnknownKeyType(String),

    /// Invalid input length
    #[error("invalid input length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Result type for key operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
