//! Remote signer server and client.
//!
//! The server listens on a Unix socket and forwards each request to the
//! [`FilePv`] it owns; the client connects per request. Both speak the
//! length-prefixed bincode frames from [`crate::protocol`].

use crate::protocol::{Request, Response, MAX_MESSAGE_SIZE};
use riptide_crypto::PubKey;
use riptide_privval::{FilePv, PrivvalError};
use riptide_types::{Proposal, Vote};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Server configuration.
pub struct ServerConfig {
    /// Path to Unix socket
    pub socket_path: std::path::PathBuf,
    /// The validator that performs all signing
    pub validator: FilePv,
}

/// Errors from the signer server and client.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// The signer refused the request; retrying cannot change the answer.
    #[error("signing rejected: {0}")]
    Rejected(String),

    /// The signer failed internally; retrying cannot change the answer.
    #[error("remote signer error: {0}")]
    Remote(String),

    #[error("exhausted all attempts to {op}: {source}")]
    Exhausted {
        op: &'static str,
        #[source]
        source: Box<SignerError>,
    },
}

/// Remote signer server.
pub struct SignerServer {
    listener: UnixListener,
    validator: Mutex<FilePv>,
}

impl SignerServer {
    /// Create a new signer server.
    pub fn new(config: ServerConfig) -> Result<Self, SignerError> {
        // Remove existing socket file if it exists
        if config.socket_path.exists() {
            std::fs::remove_file(&config.socket_path)?;
        }

        // Ensure parent directory exists
        if let Some(parent) = config.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&config.socket_path)?;
        info!("Signer server listening on {:?}", config.socket_path);

        // Set socket permissions (owner only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&config.socket_path, perms)?;
        }

        Ok(Self {
            listener,
            validator: Mutex::new(config.validator),
        })
    }

    /// Run the server (blocking).
    pub fn run(&self) -> Result<(), SignerError> {
        {
            let validator = self.validator.lock().unwrap();
            info!("Validator address: {}", validator.address());
            info!(
                "Validator pubkey: 0x{}",
                hex::encode(validator.pub_key().bytes())
            );
        }

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("New connection");
                    if let Err(e) = self.handle_connection(stream) {
                        error!("Error handling connection: {}", e);
                    }
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Accept and handle a fixed number of connections, then return.
    pub fn serve_connections(&self, count: usize) {
        for _ in 0..count {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if let Err(e) = self.handle_connection(stream) {
                        error!("Error handling connection: {}", e);
                    }
                }
                Err(e) => error!("Error accepting connection: {}", e),
            }
        }
    }

    /// Handle a single connection.
    fn handle_connection(&self, mut stream: UnixStream) -> Result<(), SignerError> {
        let request: Request = read_frame(&mut stream)?;
        let response = self.handle_request(request);
        write_frame(&mut stream, &response)
    }

    /// Process one request against the validator.
    fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::SignVote {
                chain_id,
                mut vote,
                sign_extension,
            } => {
                debug!(
                    %chain_id,
                    height = vote.height,
                    round = vote.round,
                    "Sign vote request"
                );
                let mut validator = self.validator.lock().unwrap();
                match validator.sign_vote(&chain_id, &mut vote, sign_extension) {
                    Ok(()) => Response::SignedVote(vote),
                    Err(err) => rejection(err),
                }
            }
            Request::SignProposal {
                chain_id,
                mut proposal,
            } => {
                debug!(
                    %chain_id,
                    height = proposal.height,
                    round = proposal.round,
                    "Sign proposal request"
                );
                let mut validator = self.validator.lock().unwrap();
                match validator.sign_proposal(&chain_id, &mut proposal) {
                    Ok(()) => Response::SignedProposal(proposal),
                    Err(err) => rejection(err),
                }
            }
            Request::SignBytes { bytes } => {
                debug!(len = bytes.len(), "Sign bytes request");
                let validator = self.validator.lock().unwrap();
                match validator.sign_bytes(&bytes) {
                    Ok(signature) => Response::Signature(signature),
                    Err(err) => rejection(err),
                }
            }
            Request::GetPubKey => {
                let validator = self.validator.lock().unwrap();
                Response::PubKey(validator.pub_key())
            }
            Request::Ping => Response::Pong,
        }
    }
}

/// Map a validator error onto the wire: refusals become `Rejected`,
/// everything else is an internal error.
fn rejection(err: PrivvalError) -> Response {
    match err {
        PrivvalError::Crypto(_) | PrivvalError::Io(_) | PrivvalError::Parse(_) => {
            error!("Signing failed: {}", err);
            Response::Error {
                message: err.to_string(),
            }
        }
        refusal => {
            warn!("Sign request rejected: {}", refusal);
            Response::Rejected {
                reason: refusal.to_string(),
            }
        }
    }
}

fn write_frame(stream: &mut UnixStream, msg: &impl Serialize) -> Result<(), SignerError> {
    let bytes = bincode::serialize(msg)?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(SignerError::Protocol("Message too large".to_string()));
    }
    stream.write_all(&(bytes.len() as u32).to_le_bytes())?;
    stream.write_all(&bytes)?;
    stream.flush()?;
    Ok(())
}

fn read_frame<T: DeserializeOwned>(stream: &mut UnixStream) -> Result<T, SignerError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf)?;
    let msg_len = u32::from_le_bytes(len_buf) as usize;

    if msg_len > MAX_MESSAGE_SIZE {
        return Err(SignerError::Protocol("Message too large".to_string()));
    }

    let mut msg_buf = vec![0u8; msg_len];
    stream.read_exact(&mut msg_buf)?;

    Ok(bincode::deserialize(&msg_buf)?)
}

/// Client for connecting to the remote signer.
pub struct SignerClient {
    socket_path: std::path::PathBuf,
}

impl SignerClient {
    /// Create a new client.
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    /// Connect to the server and send a request.
    fn send_request(&self, request: &Request) -> Result<Response, SignerError> {
        let mut stream = UnixStream::connect(&self.socket_path)?;
        write_frame(&mut stream, request)?;
        read_frame(&mut stream)
    }

    /// Sign a vote; on success the vote's signature fields are stamped.
    pub fn sign_vote(
        &self,
        chain_id: &str,
        vote: &mut Vote,
        sign_extension: bool,
    ) -> Result<(), SignerError> {
        let response = self.send_request(&Request::SignVote {
            chain_id: chain_id.to_string(),
            vote: vote.clone(),
            sign_extension,
        })?;

        match response {
            Response::SignedVote(signed) => {
                *vote = signed;
                Ok(())
            }
            Response::Rejected { reason } => Err(SignerError::Rejected(reason)),
            Response::Error { message } => Err(SignerError::Remote(message)),
            _ => Err(SignerError::Protocol("Unexpected response".to_string())),
        }
    }

    /// Sign a proposal; on success the proposal's signature is stamped.
    pub fn sign_proposal(&self, chain_id: &str, proposal: &mut Proposal) -> Result<(), SignerError> {
        let response = self.send_request(&Request::SignProposal {
            chain_id: chain_id.to_string(),
            proposal: proposal.clone(),
        })?;

        match response {
            Response::SignedProposal(signed) => {
                *proposal = signed;
                Ok(())
            }
            Response::Rejected { reason } => Err(SignerError::Rejected(reason)),
            Response::Error { message } => Err(SignerError::Remote(message)),
            _ => Err(SignerError::Protocol("Unexpected response".to_string())),
        }
    }

    /// Sign raw bytes.
    pub fn sign_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, SignerError> {
        let response = self.send_request(&Request::SignBytes {
            bytes: bytes.to_vec(),
        })?;

        match response {
            Response::Signature(signature) => Ok(signature),
            Response::Rejected { reason } => Err(SignerError::Rejected(reason)),
            Response::Error { message } => Err(SignerError::Remote(message)),
            _ => Err(SignerError::Protocol("Unexpected response".to_string())),
        }
    }

    /// Get the validator public key.
    pub fn get_pub_key(&self) -> Result<PubKey, SignerError> {
        let response = self.send_request(&Request::GetPubKey)?;

        match response {
            Response::PubKey(pub_key) => Ok(pub_key),
            _ => Err(SignerError::Protocol("Unexpected response".to_string())),
        }
    }

    /// Ping the server.
    pub fn ping(&self) -> Result<(), SignerError> {
        let response = self.send_request(&Request::Ping)?;

        match response {
            Response::Pong => Ok(()),
            _ => Err(SignerError::Protocol("Unexpected response".to_string())),
        }
    }
}
