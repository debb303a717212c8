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

//! Canonical sign-bytes encodings.
//!
//! Signatures cover the RLP encoding of the canonical forms below, which
//! restrict a message to the fields that make up its consensus identity.
//! The encoding must be deterministic and decodable: the signing watermark
//! compares a new request against the previously signed bytes to detect
//! replays that differ only in their timestamp.

use alloy_rlp::{RlpDecodable, RlpEncodable};

use crate::proposal::Proposal;
use crate::vote::{BlockId, Vote};
use crate::Timestamp;

/// Sentinel both timestamps are set to when testing structural equality.
const TIMESTAMP_SENTINEL: Timestamp = 0;

/// Canonical form of a vote. Extension data is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct CanonicalVote {
    pub vote_type: u8,
    pub height: u64,
    pub round: u64,
    pub block_id: BlockId,
    pub timestamp: Timestamp,
    pub chain_id: String,
}

impl CanonicalVote {
    fn from_vote(chain_id: &str, vote: &Vote) -> Self {
        Self {
            vote_type: vote.vote_type.canonical_byte(),
            height: vote.height as u64,
            round: vote.round as u64,
            block_id: vote.block_id.unwrap_or_default(),
            timestamp: vote.timestamp,
            chain_id: chain_id.to_string(),
        }
    }
}

/// Canonical form of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct CanonicalProposal {
    pub msg_type: u8,
    pub height: u64,
    pub round: u64,
    /// Shifted by one so the -1 "no lock" sentinel stays unsigned.
    pub pol_round: u64,
    pub block_id: BlockId,
    pub timestamp: Timestamp,
    pub chain_id: String,
}

impl CanonicalProposal {
    fn from_proposal(chain_id: &str, proposal: &Proposal) -> Self {
        Self {
            msg_type: crate::vote::SignedMsgType::Proposal.canonical_byte(),
            height: proposal.height as u64,
            round: proposal.round as u64,
            pol_round: (proposal.pol_round + 1) as u64,
            block_id: proposal.block_id.unwrap_or_default(),
            timestamp: proposal.timestamp,
            chain_id: chain_id.to_string(),
        }
    }
}

/// Canonical form of a replay-protected vote extension.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct CanonicalVoteExtension {
    pub extension: Vec<u8>,
    pub height: u64,
    pub round: u64,
    pub chain_id: String,
}

/// Deterministic bytes a vote signature covers.
pub fn vote_sign_bytes(chain_id: &str, vote: &Vote) -> Vec<u8> {
    alloy_rlp::encode(CanonicalVote::from_vote(chain_id, vote))
}

/// Deterministic bytes a proposal signature covers.
pub fn proposal_sign_bytes(chain_id: &str, proposal: &Proposal) -> Vec<u8> {
    alloy_rlp::encode(CanonicalProposal::from_proposal(chain_id, proposal))
}

/// Deterministic bytes the two extension signatures of a precommit cover.
///
/// Returns the replay-protected bytes (bound to chain, height and round)
/// and the non-replay-protected bytes (the bare payload).
pub fn vote_extension_sign_bytes(chain_id: &str, vote: &Vote) -> (Vec<u8>, Vec<u8>) {
    let rp = alloy_rlp::encode(CanonicalVoteExtension {
        extension: vote.extension.clone(),
        height: vote.height as u64,
        round: vote.round as u64,
        chain_id: chain_id.to_string(),
    });
    let non_rp = alloy_rlp::encode(&vote.non_rp_extension);
    (rp, non_rp)
}

/// If the two encoded votes differ only in their timestamp, returns the
/// timestamp of `last`.
///
/// Panics when either input fails to decode: both always originate from
/// [`vote_sign_bytes`], so undecodable bytes mean a corrupted watermark.
pub fn votes_only_differ_by_timestamp(last: &[u8], new: &[u8]) -> Option<Timestamp> {
    let mut last_vote: CanonicalVote =
        alloy_rlp::decode_exact(last).expect("last sign bytes do not decode as a canonical vote");
    let mut new_vote: CanonicalVote =
        alloy_rlp::decode_exact(new).expect("new sign bytes do not decode as a canonical vote");

    let last_timestamp = last_vote.timestamp;
    last_vote.timestamp = TIMESTAMP_SENTINEL;
    new_vote.timestamp = TIMESTAMP_SENTINEL;

    (last_vote == new_vote).then_some(last_timestamp)
}

/// Proposal analogue of [`votes_only_differ_by_timestamp`].
pub fn proposals_only_differ_by_timestamp(last: &[u8], new: &[u8]) -> Option<Timestamp> {
    let mut last_proposal: CanonicalProposal = alloy_rlp::decode_exact(last)
        .expect("last sign bytes do not decode as a canonical proposal");
    let mut new_proposal: CanonicalProposal =
        alloy_rlp::decode_exact(new).expect("new sign bytes do not decode as a canonical proposal");

    let last_timestamp = last_proposal.timestamp;
    last_proposal.timestamp = TIMESTAMP_SENTINEL;
    new_proposal.timestamp = TIMESTAMP_SENTINEL;

    (last_proposal == new_proposal).then_some(last_timestamp)
}
