//! Retrying wrapper around [`SignerClient`].
//!
//! Transport failures (connection refused, broken pipe) are retried with a
//! fixed sleep between attempts. Answers produced by the signer itself -
//! rejections from double-sign protection and internal signer errors - are
//! authoritative and returned immediately; repeating the request cannot
//! change them.

use crate::server::{SignerClient, SignerError};
use riptide_crypto::PubKey;
use riptide_types::{Proposal, Vote};
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Wraps a [`SignerClient`], retrying each operation (except `ping`) with
/// a timeout between attempts.
pub struct RetrySignerClient {
    next: SignerClient,
    retries: usize,
    timeout: Duration,
}

impl RetrySignerClient {
    /// Create a retrying client. With `retries == 0` every operation is
    /// retried indefinitely.
    pub fn new(next: SignerClient, retries: usize, timeout: Duration) -> Self {
        Self {
            next,
            retries,
            timeout,
        }
    }

    fn with_retries<T>(
        &self,
        op: &'static str,
        mut call: impl FnMut() -> Result<T, SignerError>,
    ) -> Result<T, SignerError> {
        let mut attempts = 0;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                // The signer answered; don't retry.
                Err(err @ (SignerError::Rejected(_) | SignerError::Remote(_))) => return Err(err),
                Err(err) => {
                    attempts += 1;
                    if self.retries != 0 && attempts >= self.retries {
                        return Err(SignerError::Exhausted {
                            op,
                            source: Box::new(err),
                        });
                    }
                    warn!(op, attempts, error = %err, "signer unreachable, retrying");
                    thread::sleep(self.timeout);
                }
            }
        }
    }

    /// Sign a vote. See [`SignerClient::sign_vote`].
    pub fn sign_vote(
        &self,
        chain_id: &str,
        vote: &mut Vote,
        sign_extension: bool,
    ) -> Result<(), SignerError> {
        self.with_retries("sign vote", || {
            self.next.sign_vote(chain_id, vote, sign_extension)
        })
    }

    /// Sign a proposal. See [`SignerClient::sign_proposal`].
    pub fn sign_proposal(&self, chain_id: &str, proposal: &mut Proposal) -> Result<(), SignerError> {
        self.with_retries("sign proposal", || {
            self.next.sign_proposal(chain_id, proposal)
        })
    }

    /// Sign raw bytes. See [`SignerClient::sign_bytes`].
    pub fn sign_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, SignerError> {
        self.with_retries("sign bytes", || self.next.sign_bytes(bytes))
    }

    /// Fetch the validator public key.
    pub fn get_pub_key(&self) -> Result<PubKey, SignerError> {
        self.with_retries("get pubkey", || self.next.get_pub_key())
    }

    /// Ping is a liveness probe; it is never retried.
    pub fn ping(&self) -> Result<(), SignerError> {
        self.next.ping()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{ServerConfig, SignerServer};
    use riptide_crypto::Scheme;
    use riptide_privval::FilePv;
    use riptide_types::{BlockId, PartSetHeader, SignedMsgType};
    use tempfile::TempDir;

    const CHAIN_ID: &str = "riptide-test-1";

    fn test_vote(block_byte: u8) -> Vote {
        Vote {
            vote_type: SignedMsgType::Prevote,
            height: 1,
            round: 0,
            block_id: Some(BlockId {
                hash: [block_byte; 32],
                part_set_header: PartSetHeader::default(),
            }),
            timestamp: 1,
            validator_address: Default::default(),
            validator_index: 0,
            signature: vec![],
            extension: vec![],
            extension_signature: vec![],
            non_rp_extension: vec![],
            non_rp_extension_signature: vec![],
        }
    }

    #[test]
    fn test_exhausts_after_bounded_retries() {
        let dir = TempDir::new().unwrap();
        // Nothing listens here.
        let client = SignerClient::new(dir.path().join("no-such.sock"));
        let retrying = RetrySignerClient::new(client, 3, Duration::from_millis(1));

        let err = retrying.sign_bytes(b"data").unwrap_err();
        assert!(matches!(err, SignerError::Exhausted { op: "sign bytes", .. }));
    }

    #[test]
    fn test_rejection_is_not_retried() {
        let temp_dir = TempDir::new().unwrap();
        let validator = FilePv::generate(
            temp_dir.path().join("key.json"),
            temp_dir.path().join("state.json"),
            Scheme::Ed25519,
        )
        .unwrap();
        let socket_path = temp_dir.path().join("signer.sock");
        let server = SignerServer::new(ServerConfig {
            socket_path: socket_path.clone(),
            validator,
        })
        .unwrap();

        // If a rejection were retried, the server would see more than two
        // connections and the test would hang on join.
        let server_handle = std::thread::spawn(move || server.serve_connections(2));

        std::thread::sleep(Duration::from_millis(50));

        let retrying = RetrySignerClient::new(
            SignerClient::new(&socket_path),
            5,
            Duration::from_millis(1),
        );

        let mut vote = test_vote(1);
        retrying.sign_vote(CHAIN_ID, &mut vote, true).unwrap();

        let mut conflicting = test_vote(2);
        let err = retrying
            .sign_vote(CHAIN_ID, &mut conflicting, true)
            .unwrap_err();
        assert!(matches!(err, SignerError::Rejected(_)));

        server_handle.join().unwrap();
    }
}
