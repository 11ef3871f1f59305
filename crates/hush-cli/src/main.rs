//! Hush command-line binary.
//!
//! # Usage
//!
//! ```bash
//! # Create the local identity and publish the printed key
//! hush init
//!
//! # Seal a message for two recipients
//! hush seal --to alice=MIIBIjAN... --to bob=MIIBIjAN... --message "hi"
//!
//! # Open an envelope addressed to us
//! hush open --as alice --envelope envelope.json
//! ```

mod commands;
mod error;

use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use hush_keystore::{KeyPairStore, RedbStorage};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliError;

/// Hush end-to-end encryption
#[derive(Parser, Debug)]
#[command(name = "hush")]
#[command(about = "End-to-end encrypted messages from the command line")]
#[command(version)]
struct Args {
    /// Path to the local identity database
    #[arg(long, default_value = "hush-identity.redb")]
    store: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate and persist the local identity, printing its public key
    Init {
        /// Replace an existing identity. Messages sealed to it become unreadable
        #[arg(long)]
        force: bool,
    },

    /// Print the local public key, or its fingerprint
    PublicKey {
        /// Print the SHA-256 fingerprint instead of the key
        #[arg(long)]
        fingerprint: bool,
    },

    /// Seal a message, printing the envelope JSON on stdout and coverage on stderr
    Seal {
        /// Recipient and their published key, as `id=<base64>`
        #[arg(long = "to", value_parser = parse_recipient)]
        to: Vec<(String, String)>,

        /// Recipient without a published key
        #[arg(long = "missing")]
        missing: Vec<String>,

        /// Message text. Read from stdin when absent
        #[arg(long)]
        message: Option<String>,
    },

    /// Open an envelope addressed to the local identity
    Open {
        /// Identity the envelope is addressed to
        #[arg(long = "as")]
        self_id: String,

        /// Envelope JSON file. Read from stdin when absent
        #[arg(long)]
        envelope: Option<PathBuf>,
    },

    /// Delete the local identity
    Wipe,
}

fn parse_recipient(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((id, key)) if !id.is_empty() && !key.is_empty() => {
            Ok((id.to_string(), key.to_string()))
        },
        _ => Err(format!("expected `id=<base64 key>`, got `{arg}`")),
    }
}

fn read_stdin() -> io::Result<String> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;

    if input.ends_with('\n') {
        input.pop();
        if input.ends_with('\r') {
            input.pop();
        }
    }
    Ok(input)
}

fn open_store(args: &Args) -> Result<KeyPairStore<RedbStorage>, CliError> {
    Ok(KeyPairStore::new(RedbStorage::open(&args.store)?))
}

fn run(args: &Args) -> Result<ExitCode, CliError> {
    let mut out = io::stdout().lock();

    match &args.command {
        Command::Init { force } => commands::init(&open_store(args)?, *force, &mut out)?,
        Command::PublicKey { fingerprint } => {
            commands::public_key(&open_store(args)?, *fingerprint, &mut out)?;
        },
        Command::Seal { to, missing, message } => {
            let message = match message {
                Some(message) => message.clone(),
                None => read_stdin()?,
            };
            commands::seal(to, missing, &message, &mut out, &mut io::stderr().lock())?;
        },
        Command::Open { self_id, envelope } => {
            let json = match envelope {
                Some(path) => fs::read_to_string(path)?,
                None => read_stdin()?,
            };
            if !commands::open(&open_store(args)?, self_id, &json, &mut out)? {
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Wipe => commands::wipe(&open_store(args)?, &mut out)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    match run(&args) {
        Ok(code) => Ok(code),
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            writeln!(io::stderr().lock(), "error: {err}")?;
            Ok(ExitCode::FAILURE)
        },
    }
}
