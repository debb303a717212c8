//! The durable "last sign" watermark.
//!
//! [`LastSignState`] records the (height, round, step) coordinate most
//! recently signed for, together with the exact bytes and signature. It is
//! what survives a crash between signing a message and the consensus engine
//! committing that message to its write-ahead log, and is therefore the
//! only thing standing between such a crash and a double-sign.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::atomic_file::write_file_atomic;
use crate::error::PrivvalError;
use riptide_types::SignedMsgType;

/// File mode of the persisted state file.
pub const STATE_FILE_MODE: u32 = 0o600;

/// Consensus step within a (height, round).
///
/// `None` only marks a freshly initialized watermark; it is never the step
/// of a signed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Step {
    None = 0,
    Propose = 1,
    Prevote = 2,
    Precommit = 3,
}

impl Step {
    /// The step a vote signs at. Only votes are valid here.
    pub fn vote_step(vote_type: SignedMsgType) -> Step {
        match vote_type {
            SignedMsgType::Prevote => Step::Prevote,
            SignedMsgType::Precommit => Step::Precommit,
            other => panic!("unknown vote type: {other:?}"),
        }
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> u8 {
        step as u8
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Step::None),
            1 => Ok(Step::Propose),
            2 => Ok(Step::Prevote),
            3 => Ok(Step::Precommit),
            other => Err(format!("invalid step: {other}")),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The mutable half of a private validator: what was last signed, where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastSignState {
    pub height: i64,
    pub round: i32,
    pub step: Step,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_base64")]
    pub signature: Option<Vec<u8>>,
    #[serde(
        rename = "signbytes",
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_hex_upper"
    )]
    pub sign_bytes: Option<Vec<u8>>,
    #[serde(skip)]
    path: PathBuf,
}

impl LastSignState {
    /// An empty watermark bound to `path`. Equivalent to what an absent
    /// state file loads as.
    pub fn new(path: PathBuf) -> Self {
        Self {
            height: 0,
            round: 0,
            step: Step::None,
            signature: None,
            sign_bytes: None,
            path,
        }
    }

    /// Load a watermark from `path`.
    ///
    /// Panics when the file records sign bytes without a signature: that
    /// combination can only come from a corrupted write, and resuming from
    /// it could let a double-sign through.
    pub fn load(path: PathBuf) -> Result<Self, PrivvalError> {
        let bytes = std::fs::read(&path)?;
        let mut state: LastSignState = serde_json::from_slice(&bytes)?;
        if state.sign_bytes.is_some() && state.signature.is_none() {
            panic!(
                "corrupted last sign state at {}: sign bytes present but signature is nil",
                path.display()
            );
        }
        state.path = path;
        Ok(state)
    }

    /// Where this state persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check a requested (height, round, step) against the watermark.
    ///
    /// Returns an error on any regression, and `Ok(true)` when the request
    /// matches the watermark exactly and signed bytes exist - meaning the
    /// recorded signature is available for reuse. Panics when the watermark
    /// matches with sign bytes but no signature (corruption, see [`load`]).
    ///
    /// [`load`]: LastSignState::load
    pub fn check_hrs(&self, height: i64, round: i32, step: Step) -> Result<bool, PrivvalError> {
        if self.height > height {
            return Err(PrivvalError::HeightRegression {
                got: height,
                last: self.height,
            });
        }
        if self.height != height {
            return Ok(false);
        }

        if self.round > round {
            return Err(PrivvalError::RoundRegression {
                height,
                got: round,
                last: self.round,
            });
        }
        if self.round != round {
            return Ok(false);
        }

        if self.step > step {
            return Err(PrivvalError::StepRegression {
                height,
                round,
                got: step,
                last: self.step,
            });
        }
        if self.step < step {
            return Ok(false);
        }

        if self.sign_bytes.is_none() {
            return Err(PrivvalError::NoSignBytes);
        }
        if self.signature.is_none() {
            panic!("last sign state: sign bytes present but signature is nil");
        }
        Ok(true)
    }

    /// Advance the watermark to a freshly signed message and persist it.
    ///
    /// Only returns once the state is durably on disk; a persistence
    /// failure aborts the process, because handing out the signature
    /// without the watermark would permit a double-sign after restart.
    pub fn save_signed(
        &mut self,
        height: i64,
        round: i32,
        step: Step,
        sign_bytes: Vec<u8>,
        signature: Vec<u8>,
    ) {
        self.height = height;
        self.round = round;
        self.step = step;
        self.signature = Some(signature);
        self.sign_bytes = Some(sign_bytes);
        self.save();
        debug!(height, round, %step, "advanced last sign state");
    }

    /// Persist the watermark. Aborts the process on failure.
    pub fn save(&self) {
        assert!(
            !self.path.as_os_str().is_empty(),
            "cannot save last sign state: no path set"
        );
        let json =
            serde_json::to_vec_pretty(self).expect("last sign state serialization cannot fail");
        if let Err(err) = write_file_atomic(&self.path, &json, STATE_FILE_MODE) {
            error!(path = %self.path.display(), %err, "failed to persist last sign state");
            panic!(
                "failed to persist last sign state to {}: {err}",
                self.path.display()
            );
        }
    }

    /// Zero the watermark and persist. Unsafe outside operator tooling.
    pub fn reset(&mut self) {
        self.height = 0;
        self.round = 0;
        self.step = Step::None;
        self.signature = None;
        self.sign_bytes = None;
        self.save();
    }
}

mod opt_base64 {
    use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&B64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| B64.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod opt_hex_upper {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&hex::encode_upper(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
