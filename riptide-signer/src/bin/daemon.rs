//! Remote signer daemon binary.
//!
//! This binary runs as a standalone process that handles signing requests
//! from the consensus engine via Unix socket. The validator key file must
//! already exist; an absent state file starts from an empty watermark.

use clap::Parser;
use riptide_privval::FilePv;
use riptide_signer::{ServerConfig, SignerServer};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Remote validator signer daemon for riptide.
#[derive(Parser, Debug)]
#[command(name = "riptide-signer-daemon")]
#[command(about = "Remote signing daemon for riptide validators")]
#[command(version)]
struct Args {
    /// Path to Unix socket for client connections
    #[arg(long, default_value = "/var/run/riptide-signer.sock")]
    socket: PathBuf,

    /// Path to the validator key file (JSON)
    #[arg(long)]
    key_file: PathBuf,

    /// Path to the last-sign state file
    #[arg(long, default_value = "/var/lib/riptide-signer/state.json")]
    state_file: PathBuf,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Starting riptide-signer-daemon");
    info!("Socket path: {:?}", args.socket);
    info!("Key file: {:?}", args.key_file);
    info!("State file: {:?}", args.state_file);

    // Load the validator; exits the process when the key file is missing
    // or either file is malformed.
    let validator = if args.state_file.exists() {
        FilePv::load(&args.key_file, &args.state_file)
    } else {
        info!("No state file yet, starting from an empty watermark");
        FilePv::load_empty_state(&args.key_file, &args.state_file)
    };

    info!("Loaded validator {}", validator);

    let config = ServerConfig {
        socket_path: args.socket,
        validator,
    };

    let server = match SignerServer::new(config) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create server: {}", e);
            std::process::exit(1);
        }
    };

    info!("Signer daemon ready, waiting for connections...");

    if let Err(e) = server.run() {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
