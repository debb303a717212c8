//! Remote validator signer for riptide.
//!
//! This crate provides a remote signing daemon that allows the validator
//! key and last-sign watermark to live on a separate, more secure machine.
//! The consensus engine connects to the daemon via Unix socket and drives
//! the same signing surface it would use on a local [`FilePv`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     Unix Socket     ┌─────────────────┐
//! │ Consensus Engine│ ◄─────────────────► │  Signer Daemon  │
//! │ (riptide-node)  │   Request/Response  │  (this crate)   │
//! └─────────────────┘                     └─────────────────┘
//! ```
//!
//! All anti-equivocation decisions stay inside the daemon's [`FilePv`];
//! the wire layer is a thin adapter and adds no signing policy of its own.
//! [`RetrySignerClient`] wraps the client with retries for transport
//! failures, never for signer-side rejections.
//!
//! ## Usage
//!
//! Start the signer daemon:
//! ```bash
//! riptide-signer-daemon \
//!     --socket /var/run/riptide-signer.sock \
//!     --key-file /path/to/priv_validator_key.json \
//!     --state-file /var/lib/riptide-signer/state.json
//! ```
//!
//! [`FilePv`]: riptide_privval::FilePv

pub mod protocol;
pub mod retry;
pub mod server;

pub use protocol::{Request, Response};
pub use retry::RetrySignerClient;
pub use server::{ServerConfig, SignerClient, SignerError, SignerServer};
