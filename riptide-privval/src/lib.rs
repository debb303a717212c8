//! File-backed private validator for riptide.
//!
//! A validator that signs twice for the same consensus coordinate gets
//! slashed. This crate holds the validator key together with a durable
//! "last sign" watermark and refuses any request that would regress or
//! conflict with what was already signed:
//!
//! - the watermark (height, round, step) only ever moves forward;
//! - re-requesting the exact message that was last signed returns the
//!   recorded signature instead of a fresh one;
//! - a re-request that differs only in its timestamp is answered with the
//!   original timestamp and signature;
//! - anything else at an already-signed coordinate is rejected.
//!
//! The watermark is persisted with an atomic write-and-rename before any
//! signature is released to the caller, so a crash at any point leaves a
//! state file from which it is safe to resume signing.

pub mod atomic_file;
pub mod error;
pub mod file_pv;
pub mod state;

pub use error::PrivvalError;
pub use file_pv::{FilePv, FilePvKey, KEY_FILE_MODE};
pub use state::{LastSignState, Step, STATE_FILE_MODE};
