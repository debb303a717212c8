//! Error taxonomy for the private validator.
//!
//! Everything here is returned to the caller and leaves the watermark
//! untouched. Failures the process cannot sign through - a watermark that
//! will not persist, a corrupted state file - are not represented as
//! variants; they abort, see [`crate::state`] and [`crate::file_pv`].

use riptide_crypto::CryptoError;
use thiserror::Error;

use crate::state::Step;

/// Errors from signing requests.
#[derive(Debug, Error)]
pub enum PrivvalError {
    /// The request is for a height below the watermark.
    #[error("height regression: got {got}, last height {last}")]
    HeightRegression { got: i64, last: i64 },

    /// The request is for an earlier round at the watermark height.
    #[error("round regression at height {height}: got {got}, last round {last}")]
    RoundRegression { height: i64, got: i32, last: i32 },

    /// The request is for an earlier step at the watermark height and round.
    #[error("step regression at height {height} round {round}: got {got:?}, last step {last:?}")]
    StepRegression {
        height: i64,
        round: i32,
        got: Step,
        last: Step,
    },

    /// The watermark matches the request but records no signed bytes.
    #[error("no sign bytes recorded for the requested height/round/step")]
    NoSignBytes,

    /// The request matches the watermark coordinate but carries materially
    /// different bytes. This is the double-sign guard firing.
    #[error("conflicting data")]
    ConflictingData,

    /// Extension payload on a vote that must not carry one.
    #[error("unexpected vote extension - extensions are only allowed in non-nil precommits")]
    UnexpectedExtension,

    /// Signing failed in the underlying scheme.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Filesystem error while reading key or state files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key or state file does not parse.
    #[error("failed to parse file: {0}")]
    Parse(#[from] serde_json::Error),
}
