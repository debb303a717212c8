//! Wire protocol for remote signer communication.
//!
//! Uses a simple length-prefixed bincode format over Unix sockets. Each
//! connection carries one request and one response.

use riptide_crypto::PubKey;
use riptide_types::{Proposal, Vote};
use serde::{Deserialize, Serialize};

/// Maximum size of a single protocol frame.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// All possible messages from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// Sign a vote; the response carries the vote back with its
    /// signature fields stamped.
    SignVote {
        chain_id: String,
        vote: Vote,
        sign_extension: bool,
    },
    /// Sign a proposal.
    SignProposal {
        chain_id: String,
        proposal: Proposal,
    },
    /// Sign raw bytes with no watermark tracking.
    SignBytes { bytes: Vec<u8> },
    /// Fetch the validator public key.
    GetPubKey,
    /// Liveness check.
    Ping,
}

/// All possible messages from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    /// The signed vote.
    SignedVote(Vote),
    /// The signed proposal.
    SignedProposal(Proposal),
    /// Signature over raw bytes.
    Signature(Vec<u8>),
    /// The validator public key.
    PubKey(PubKey),
    /// The signer refused to sign (e.g. double-sign protection). Retrying
    /// the same request cannot succeed.
    Rejected { reason: String },
    /// Internal signer error.
    Error { message: String },
    /// Liveness answer.
    Pong,
}
