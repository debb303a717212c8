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

//! Ed25519 keys, the default scheme for validator signing keys.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;

use crate::{CryptoError, Result};

/// Scheme tag for Ed25519 public keys in serialized key material.
pub const PUB_KEY_TYPE: &str = "riptide/PubKeyEd25519";
/// Scheme tag for Ed25519 private keys in serialized key material.
pub const PRIV_KEY_TYPE: &str = "riptide/PrivKeyEd25519";

/// Size of an Ed25519 seed / public key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Ed25519 private key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh key from the OS entropy source.
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct a key from its 32-byte seed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let seed: &[u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self {
            inner: SigningKey::from_bytes(seed),
        })
    }

    /// The 32-byte seed.
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        self.inner.to_bytes()
    }

    /// Sign a message. Ed25519 signing is deterministic and cannot fail.
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.inner.sign(msg).to_bytes().to_vec()
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: self.inner.verifying_key(),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.write_str("ed25519::PrivateKey(..)")
    }
}

/// Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Construct a key from its 32-byte compressed form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: &[u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        let inner = VerifyingKey::from_bytes(raw)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// The 32-byte compressed form.
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        self.inner.to_bytes()
    }

    /// Verify a signature over `msg`. Malformed signatures verify as false.
    pub fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        match Signature::from_slice(sig) {
            Ok(sig) => self.inner.verify(msg, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ed25519::PublicKey({})", hex::encode(self.to_bytes()))
    }
}
