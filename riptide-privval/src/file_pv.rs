//! The file-backed private validator.
//!
//! [`FilePv`] owns the validator key and the last-sign watermark, both
//! persisted as JSON files that this instance holds exclusively. Signing
//! requests flow through the watermark check; see the crate docs for the
//! replay rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use riptide_crypto::{Address, PrivKey, PubKey, Scheme};
use riptide_types::{canonical, Proposal, SignedMsgType, Vote};

use crate::atomic_file::write_file_atomic;
use crate::error::PrivvalError;
use crate::state::{LastSignState, Step};

/// File mode of the persisted key file.
pub const KEY_FILE_MODE: u32 = 0o600;

/// The immutable half of a private validator: its key material.
///
/// `pub_key` and `address` are stored in the file for operator convenience
/// but are always re-derived from `priv_key` on load, so editing them on
/// disk cannot change the validator's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePvKey {
    pub address: Address,
    pub pub_key: PubKey,
    pub priv_key: PrivKey,
    #[serde(skip)]
    path: PathBuf,
}

impl FilePvKey {
    /// Persist the key record. Aborts the process on failure.
    pub fn save(&self) {
        assert!(
            !self.path.as_os_str().is_empty(),
            "cannot save validator key: no path set"
        );
        let json = serde_json::to_vec_pretty(self).expect("key record serialization cannot fail");
        if let Err(err) = write_file_atomic(&self.path, &json, KEY_FILE_MODE) {
            panic!(
                "failed to persist validator key to {}: {err}",
                self.path.display()
            );
        }
    }
}

/// A private validator backed by a key file and a state file.
///
/// The directories containing both paths must already exist. Both files
/// are owned exclusively by this instance; a second signer over the same
/// paths is undefined behavior.
pub struct FilePv {
    pub key: FilePvKey,
    pub last_sign_state: LastSignState,
}

impl FilePv {
    /// Build a validator from an existing private key. Nothing is persisted
    /// until [`save`](FilePv::save) or the first signed message.
    pub fn new(
        priv_key: PrivKey,
        key_path: impl Into<PathBuf>,
        state_path: impl Into<PathBuf>,
    ) -> Self {
        let pub_key = priv_key.pub_key();
        Self {
            key: FilePvKey {
                address: pub_key.address(),
                pub_key,
                priv_key,
                path: key_path.into(),
            },
            last_sign_state: LastSignState::new(state_path.into()),
        }
    }

    /// Generate a fresh validator key for `scheme` and persist both files.
    pub fn generate(
        key_path: impl Into<PathBuf>,
        state_path: impl Into<PathBuf>,
        scheme: Scheme,
    ) -> Result<Self, PrivvalError> {
        let pv = Self::new(PrivKey::generate(scheme), key_path, state_path);
        pv.save();
        Ok(pv)
    }

    /// Load a validator from its key and state files.
    ///
    /// Exits the process when either file is missing or malformed: signing
    /// must not proceed with an indeterminate watermark.
    pub fn load(key_path: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        Self::load_impl(key_path.into(), state_path.into(), true)
    }

    /// Load the key file but start from an empty watermark. Exits the
    /// process when the key file is missing or malformed.
    pub fn load_empty_state(key_path: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        Self::load_impl(key_path.into(), state_path.into(), false)
    }

    fn load_impl(key_path: PathBuf, state_path: PathBuf, load_state: bool) -> Self {
        let key_json = std::fs::read(&key_path)
            .unwrap_or_else(|err| exit_on_load_failure(&key_path, &err));
        let mut key: FilePvKey = serde_json::from_slice(&key_json)
            .unwrap_or_else(|err| exit_on_load_failure(&key_path, &err));

        // Re-derive the public identity; the file copies are advisory.
        key.pub_key = key.priv_key.pub_key();
        key.address = key.pub_key.address();
        key.path = key_path;

        let last_sign_state = if load_state {
            LastSignState::load(state_path.clone())
                .unwrap_or_else(|err| exit_on_load_failure(&state_path, &err))
        } else {
            LastSignState::new(state_path)
        };

        Self {
            key,
            last_sign_state,
        }
    }

    /// Load a validator if the key file exists, otherwise generate one and
    /// persist it.
    pub fn load_or_generate(
        key_path: impl Into<PathBuf>,
        state_path: impl Into<PathBuf>,
        scheme: Scheme,
    ) -> Result<Self, PrivvalError> {
        let key_path = key_path.into();
        if key_path.exists() {
            Ok(Self::load(key_path, state_path))
        } else {
            Self::generate(key_path, state_path, scheme)
        }
    }

    /// The validator's address.
    pub fn address(&self) -> Address {
        self.key.address
    }

    /// The validator's public key.
    pub fn pub_key(&self) -> PubKey {
        self.key.pub_key.clone()
    }

    /// Sign a vote, stamping `vote.signature` (and, for non-nil precommits
    /// with `sign_extension`, both extension signatures).
    ///
    /// Re-requests for the already-signed coordinate are served from the
    /// watermark: byte-identical votes get the recorded signature back, and
    /// votes differing only in their timestamp additionally get their
    /// timestamp rewritten to the recorded one. Anything else at that
    /// coordinate is [`ConflictingData`](PrivvalError::ConflictingData).
    pub fn sign_vote(
        &mut self,
        chain_id: &str,
        vote: &mut Vote,
        sign_extension: bool,
    ) -> Result<(), PrivvalError> {
        let height = vote.height;
        let round = vote.round;
        let step = Step::vote_step(vote.vote_type);

        let same_hrs = self.last_sign_state.check_hrs(height, round, step)?;

        let sign_bytes = canonical::vote_sign_bytes(chain_id, vote);

        if sign_extension {
            // Extensions are non-deterministic: the application may hand us
            // a different payload for the same precommit after a restart.
            // They are re-signed on every call and never reused from the
            // watermark; only the base signature below is replay-managed.
            let mut extension_signature = Vec::new();
            let mut non_rp_extension_signature = Vec::new();
            if vote.vote_type == SignedMsgType::Precommit && !vote.block_id_is_nil() {
                let (rp_bytes, non_rp_bytes) = canonical::vote_extension_sign_bytes(chain_id, vote);
                extension_signature = self.key.priv_key.sign(&rp_bytes)?;
                non_rp_extension_signature = self.key.priv_key.sign(&non_rp_bytes)?;
            } else if !vote.extension.is_empty() || !vote.non_rp_extension.is_empty() {
                return Err(PrivvalError::UnexpectedExtension);
            }
            vote.extension_signature = extension_signature;
            vote.non_rp_extension_signature = non_rp_extension_signature;
        }

        // A crash after signing but before the consensus WAL write makes
        // the engine re-request the same coordinate; answer from the
        // watermark rather than signing twice.
        if same_hrs {
            let last_bytes = self
                .last_sign_state
                .sign_bytes
                .as_deref()
                .expect("check_hrs returned reuse without sign bytes");
            let last_signature = self
                .last_sign_state
                .signature
                .clone()
                .expect("check_hrs returned reuse without a signature");

            if last_bytes == sign_bytes.as_slice() {
                vote.signature = last_signature;
            } else if let Some(timestamp) =
                canonical::votes_only_differ_by_timestamp(last_bytes, &sign_bytes)
            {
                vote.timestamp = timestamp;
                vote.signature = last_signature;
            } else {
                warn!(
                    height,
                    round,
                    %step,
                    "refusing to sign conflicting vote at an already-signed coordinate"
                );
                return Err(PrivvalError::ConflictingData);
            }
            return Ok(());
        }

        let signature = self.key.priv_key.sign(&sign_bytes)?;
        self.last_sign_state
            .save_signed(height, round, step, sign_bytes, signature.clone());
        vote.signature = signature;
        debug!(height, round, %step, "signed vote");
        Ok(())
    }

    /// Sign a proposal, stamping `proposal.signature`. Replay handling as
    /// in [`sign_vote`](FilePv::sign_vote).
    pub fn sign_proposal(
        &mut self,
        chain_id: &str,
        proposal: &mut Proposal,
    ) -> Result<(), PrivvalError> {
        let height = proposal.height;
        let round = proposal.round;
        let step = Step::Propose;

        let same_hrs = self.last_sign_state.check_hrs(height, round, step)?;

        let sign_bytes = canonical::proposal_sign_bytes(chain_id, proposal);

        if same_hrs {
            let last_bytes = self
                .last_sign_state
                .sign_bytes
                .as_deref()
                .expect("check_hrs returned reuse without sign bytes");
            let last_signature = self
                .last_sign_state
                .signature
                .clone()
                .expect("check_hrs returned reuse without a signature");

            if last_bytes == sign_bytes.as_slice() {
                proposal.signature = last_signature;
            } else if let Some(timestamp) =
                canonical::proposals_only_differ_by_timestamp(last_bytes, &sign_bytes)
            {
                proposal.timestamp = timestamp;
                proposal.signature = last_signature;
            } else {
                warn!(
                    height,
                    round,
                    "refusing to sign conflicting proposal at an already-signed coordinate"
                );
                return Err(PrivvalError::ConflictingData);
            }
            return Ok(());
        }

        let signature = self.key.priv_key.sign(&sign_bytes)?;
        self.last_sign_state
            .save_signed(height, round, step, sign_bytes, signature.clone());
        proposal.signature = signature;
        debug!(height, round, "signed proposal");
        Ok(())
    }

    /// Sign raw bytes with no watermark tracking. For out-of-consensus
    /// uses such as handshakes and health checks.
    pub fn sign_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, PrivvalError> {
        Ok(self.key.priv_key.sign(bytes)?)
    }

    /// Persist both files. Aborts the process on failure.
    pub fn save(&self) {
        self.key.save();
        self.last_sign_state.save();
    }

    /// Zero the watermark and persist it. Unsafe: only for operator
    /// tooling, e.g. after a coordinated chain restart from genesis.
    pub fn reset(&mut self) {
        self.last_sign_state.reset();
    }
}

impl fmt::Display for FilePv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FilePv{{{} LH:{}, LR:{}, LS:{}}}",
            self.key.address,
            self.last_sign_state.height,
            self.last_sign_state.round,
            self.last_sign_state.step,
        )
    }
}

fn exit_on_load_failure(path: &Path, err: &dyn fmt::Display) -> ! {
    // Continuing with an indeterminate watermark could double-sign; force
    // the operator to repair the files and restart clean.
    eprintln!("riptide-privval: cannot load {}: {err}", path.display());
    std::process::exit(1);
}
