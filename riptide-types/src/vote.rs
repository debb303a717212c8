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

//! Votes and block identifiers.

use alloy_rlp::{RlpDecodable, RlpEncodable};
use riptide_crypto::Address;
use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// The kind of message a signature covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignedMsgType {
    Prevote,
    Precommit,
    Proposal,
}

impl SignedMsgType {
    /// Byte value used in canonical encodings.
    pub fn canonical_byte(self) -> u8 {
        match self {
            SignedMsgType::Prevote => 1,
            SignedMsgType::Precommit => 2,
            SignedMsgType::Proposal => 32,
        }
    }
}

/// Header of the part set a block was split into for gossip.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct PartSetHeader {
    pub total: u32,
    pub hash: [u8; 32],
}

/// Identifies a proposed block.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct BlockId {
    pub hash: [u8; 32],
    pub part_set_header: PartSetHeader,
}

impl BlockId {
    /// A zero block id stands for "nil" in canonical encodings.
    pub fn is_zero(&self) -> bool {
        *self == BlockId::default()
    }
}

/// A consensus vote (prevote or precommit).
///
/// `extension` and `non_rp_extension` are application-defined payloads that
/// only non-nil precommits may carry; they are signed separately from the
/// vote itself and are excluded from the vote's canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub vote_type: SignedMsgType,
    pub height: i64,
    pub round: i32,
    pub block_id: Option<BlockId>,
    pub timestamp: Timestamp,
    pub validator_address: Address,
    pub validator_index: i32,
    pub signature: Vec<u8>,
    pub extension: Vec<u8>,
    pub extension_signature: Vec<u8>,
    pub non_rp_extension: Vec<u8>,
    pub non_rp_extension_signature: Vec<u8>,
}

impl Vote {
    /// True when the vote is for no block (an absent or zero block id).
    pub fn block_id_is_nil(&self) -> bool {
        self.block_id.map_or(true, |id| id.is_zero())
    }
}
