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

//! secp256k1 (ECDSA) keys, an alternative validator key scheme.
//!
//! Signatures are 64-byte fixed encodings (r || s); public keys use the
//! 33-byte SEC1 compressed form.

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::{CryptoError, Result};

/// Scheme tag for secp256k1 public keys in serialized key material.
pub const PUB_KEY_TYPE: &str = "riptide/PubKeySecp256k1";
/// Scheme tag for secp256k1 private keys in serialized key material.
pub const PRIV_KEY_TYPE: &str = "riptide/PrivKeySecp256k1";

/// Size of a secp256k1 secret scalar in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of a compressed SEC1 public key in bytes.
pub const PUB_KEY_SIZE: usize = 33;
/// Size of a fixed (r || s) signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh key from the OS entropy source.
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Construct a key from its 32-byte secret scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// The 32-byte secret scalar.
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        self.inner.to_bytes().into()
    }

    /// Sign the SHA-256 digest of `msg`, returning the 64-byte (r || s) form.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let digest: [u8; 32] = Sha256::digest(msg).into();
        let sig: Signature = self
            .inner
            .sign_prehash(&digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        Ok(sig.normalize_s().unwrap_or(sig).to_bytes().to_vec())
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: *self.inner.verifying_key(),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.write_str("secp256k1::PrivateKey(..)")
    }
}

/// secp256k1 public key.
#[derive(Clone)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Construct a key from SEC1 bytes (compressed or uncompressed).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// The 33-byte SEC1 compressed form.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.to_encoded_point(true).as_bytes().to_vec()
    }

    /// Verify a 64-byte (r || s) signature over the SHA-256 digest of `msg`.
    /// Malformed signatures verify as false.
    pub fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        use k256::ecdsa::signature::hazmat::PrehashVerifier;
        let Ok(sig) = Signature::from_slice(sig) else {
            return false;
        };
        let digest: [u8; 32] = Sha256::digest(msg).into();
        self.inner.verify_prehash(&digest, &sig).is_ok()
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "secp256k1::PublicKey({})", hex::encode(self.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let sk = PrivateKey::generate();
        let pk = sk.public_key();
        let msg = b"riptide test message";

        let sig = sk.sign(msg).unwrap();
        assert_eq!(sig.len(), SIGNATURE_SIZE);
        assert!(pk.verify(msg, &sig));
        assert!(!pk.verify(b"different message", &sig));
    }

    #[test]
    fn test_scalar_roundtrip() {
        let sk = PrivateKey::generate();
        let restored = PrivateKey::from_bytes(&sk.to_bytes()).unwrap();
        assert_eq!(restored.public_key(), sk.public_key());
    }

    #[test]
    fn test_pubkey_roundtrip() {
        let pk = PrivateKey::generate().public_key();
        assert_eq!(pk.to_bytes().len(), PUB_KEY_SIZE);
        let restored = PublicKey::from_bytes(&pk.to_bytes()).unwrap();
        assert_eq!(restored, pk);
    }

    #[test]
    fn test_rejects_zero_scalar() {
        assert!(PrivateKey::from_bytes(&[0u8; KEY_SIZE]).is_err());
    }

    #[test]
    fn test_garbage_signature_is_false() {
        let pk = PrivateKey::generate().public_key();
        assert!(!pk.verify(b"msg", &[0u8; 12]));
        assert!(!pk.verify(b"msg", &[0u8; SIGNATURE_SIZE]));
    }
}
