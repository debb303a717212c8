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

//! Scheme-tagged key sum types.
//!
//! `PrivKey` and `PubKey` wrap one variant per supported scheme and carry
//! the scheme tag through serialization: both serialize as
//! `{"type": "<tag>", "value": "<base64>"}` so key files stay
//! self-describing.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::address::{address_hash, Address};
use crate::{ed25519, secp256k1, CryptoError, Result};

/// Supported signature schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    Ed25519,
    Secp256k1,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Ed25519 => f.write_str("ed25519"),
            Scheme::Secp256k1 => f.write_str("secp256k1"),
        }
    }
}

/// A validator private key.
#[derive(Clone)]
pub enum PrivKey {
    Ed25519(ed25519::PrivateKey),
    Secp256k1(secp256k1::PrivateKey),
}

impl PrivKey {
    /// Generate a fresh key for the given scheme.
    pub fn generate(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Ed25519 => PrivKey::Ed25519(ed25519::PrivateKey::generate()),
            Scheme::Secp256k1 => PrivKey::Secp256k1(secp256k1::PrivateKey::generate()),
        }
    }

    /// Reconstruct a key from a scheme tag and raw bytes.
    pub fn from_type_and_bytes(type_tag: &str, bytes: &[u8]) -> Result<Self> {
        match type_tag {
            ed25519::PRIV_KEY_TYPE => {
                Ok(PrivKey::Ed25519(ed25519::PrivateKey::from_bytes(bytes)?))
            }
            secp256k1::PRIV_KEY_TYPE => {
                Ok(PrivKey::Secp256k1(secp256k1::PrivateKey::from_bytes(bytes)?))
            }
            other => Err(CryptoError::UnknownKeyType(other.to_string())),
        }
    }

    /// Sign a message.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        match self {
            PrivKey::Ed25519(sk) => Ok(sk.sign(msg)),
            PrivKey::Secp256k1(sk) => sk.sign(msg),
        }
    }

    /// The corresponding public key.
    pub fn pub_key(&self) -> PubKey {
        match self {
            PrivKey::Ed25519(sk) => PubKey::Ed25519(sk.public_key()),
            PrivKey::Secp256k1(sk) => PubKey::Secp256k1(sk.public_key()),
        }
    }

    /// The scheme this key belongs to.
    pub fn scheme(&self) -> Scheme {
        match self {
            PrivKey::Ed25519(_) => Scheme::Ed25519,
            PrivKey::Secp256k1(_) => Scheme::Secp256k1,
        }
    }

    /// Scheme tag used in serialized form.
    pub fn type_tag(&self) -> &'static str {
        match self {
            PrivKey::Ed25519(_) => ed25519::PRIV_KEY_TYPE,
            PrivKey::Secp256k1(_) => secp256k1::PRIV_KEY_TYPE,
        }
    }

    /// Raw key bytes.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            PrivKey::Ed25519(sk) => sk.to_bytes().to_vec(),
            PrivKey::Secp256k1(sk) => sk.to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivKey::{}(..)", self.scheme())
    }
}

/// A validator public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubKey {
    Ed25519(ed25519::PublicKey),
    Secp256k1(secp256k1::PublicKey),
}

impl PubKey {
    /// Reconstruct a key from a scheme tag and raw bytes.
    pub fn from_type_and_bytes(type_tag: &str, bytes: &[u8]) -> Result<Self> {
        match type_tag {
            ed25519::PUB_KEY_TYPE => Ok(PubKey::Ed25519(ed25519::PublicKey::from_bytes(bytes)?)),
            secp256k1::PUB_KEY_TYPE => {
                Ok(PubKey::Secp256k1(secp256k1::PublicKey::from_bytes(bytes)?))
            }
            other => Err(CryptoError::UnknownKeyType(other.to_string())),
        }
    }

    /// Verify a signature over `msg`.
    pub fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        match self {
            PubKey::Ed25519(pk) => pk.verify(msg, sig),
            PubKey::Secp256k1(pk) => pk.verify(msg, sig),
        }
    }

    /// The address derived from this key.
    pub fn address(&self) -> Address {
        address_hash(&self.bytes())
    }

    /// The scheme this key belongs to.
    pub fn scheme(&self) -> Scheme {
        match self {
            PubKey::Ed25519(_) => Scheme::Ed25519,
            PubKey::Secp256k1(_) => Scheme::Secp256k1,
        }
    }

    /// Scheme tag used in serialized form.
    pub fn type_tag(&self) -> &'static str {
        match self {
            PubKey::Ed25519(_) => ed25519::PUB_KEY_TYPE,
            PubKey::Secp256k1(_) => secp256k1::PUB_KEY_TYPE,
        }
    }

    /// Raw key bytes.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            PubKey::Ed25519(pk) => pk.to_bytes().to_vec(),
            PubKey::Secp256k1(pk) => pk.to_bytes(),
        }
    }
}

/// Wire/file envelope shared by both key sum types.
#[derive(Serialize, Deserialize)]
struct KeyEnvelope {
    #[serde(rename = "type")]
    type_tag: String,
    value: String,
}

impl KeyEnvelope {
    fn new(type_tag: &str, bytes: &[u8]) -> Self {
        Self {
            type_tag: type_tag.to_string(),
            value: B64.encode(bytes),
        }
    }

    fn decode_value<E: serde::de::Error>(&self) -> std::result::Result<Vec<u8>, E> {
        B64.decode(&self.value).map_err(E::custom)
    }
}

impl Serialize for PrivKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        KeyEnvelope::new(self.type_tag(), &self.bytes()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PrivKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let envelope = KeyEnvelope::deserialize(deserializer)?;
        let bytes = envelope.decode_value::<D::Error>()?;
        PrivKey::from_type_and_bytes(&envelope.type_tag, &bytes).map_err(serde::de::Error::custom)
    }
}

impl Serialize for PubKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        KeyEnvelope::new(self.type_tag(), &self.bytes()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let envelope = KeyEnvelope::deserialize(deserializer)?;
        let bytes = envelope.decode_value::<D::Error>()?;
        PubKey::from_type_and_bytes(&envelope.type_tag, &bytes).map_err(serde::de::Error::custom)
    }
}
