//! Tokenseal client binary.
//!
//! # Usage
//!
//! ```bash
//! # Mutual authentication, sealed message
//! tokenseal-client --psk-file client.key --mutual --seal server.example sign@server.example "hello"
//!
//! # Message read from a file, explicit port
//! tokenseal-client --psk-file client.key -p 1234 -f server.example sign ./message.txt
//! ```

use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::Parser;
use tokenseal_client::{
    PayloadSource, Session, SessionConfig, SessionRequest, SystemEnv, TcpConnector, load_psk_file,
};
use tokenseal_core::{ContextFlags, DEFAULT_MAX_ROUNDS, Oid, psk::PskProvider};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Tokenseal protected-message client
#[derive(Parser, Debug)]
#[command(name = "tokenseal-client")]
#[command(about = "Establish a security context and exchange one protected message")]
#[command(version)]
struct Args {
    /// Server port
    #[arg(short, long, default_value_t = tokenseal_client::DEFAULT_PORT)]
    port: u16,

    /// Mechanism OID in dotted form (e.g. 1.3.6.1.3.7.1)
    #[arg(long)]
    mech: Option<Oid>,

    /// Request credential delegation
    #[arg(short, long)]
    delegate: bool,

    /// Treat MESSAGE as a path and send the file's contents
    #[arg(short, long)]
    file: bool,

    /// Request confidentiality for the message
    #[arg(long)]
    seal: bool,

    /// Request mutual authentication
    #[arg(long)]
    mutual: bool,

    /// File holding the hex-encoded pre-shared key
    #[arg(long)]
    psk_file: PathBuf,

    /// Name this client presents to the server
    #[arg(long, default_value = "tokenseal-client")]
    name: String,

    /// Connect timeout in seconds
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Read/write timeout in seconds
    #[arg(long)]
    io_timeout: Option<u64>,

    /// Maximum context-establishment rounds
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Server host
    host: String,

    /// Target service (`service@host` or `service`)
    service: String,

    /// Message to send, or a path with --file
    message: String,
}

impl Args {
    fn flags(&self) -> ContextFlags {
        let mut flags = ContextFlags::empty();
        flags.set(ContextFlags::DELEG, self.delegate);
        flags.set(ContextFlags::MUTUAL, self.mutual);
        flags
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let psk = match load_psk_file(&args.psk_file, &args.name) {
        Ok(psk) => psk,
        Err(err) => {
            tracing::error!("{err}");
            return ExitCode::FAILURE;
        },
    };

    let config = SessionConfig {
        host: args.host.clone(),
        port: args.port,
        connect_timeout: args.connect_timeout.map(Duration::from_secs),
        io_timeout: args.io_timeout.map(Duration::from_secs),
        max_rounds: args.max_rounds,
        ..SessionConfig::default()
    };
    let request = SessionRequest {
        service: args.service.clone(),
        flags: args.flags(),
        mechanism: args.mech.clone(),
        payload: if args.file {
            PayloadSource::File(PathBuf::from(&args.message))
        } else {
            PayloadSource::Literal(args.message.clone())
        },
        seal: args.seal,
    };

    let provider = PskProvider::new(SystemEnv::new(), psk);
    let mut session = Session::new(config, request, TcpConnector, provider);

    match session.run() {
        Ok(outcome) => {
            tracing::debug!(granted = %outcome.granted, confidential = outcome.was_confidential, "session closed");
            report_verified();
            ExitCode::SUCCESS
        },
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        },
    }
}

#[allow(clippy::print_stdout)]
fn report_verified() {
    println!("Signature verified.");
}
