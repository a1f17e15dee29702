mod auth_commands;
mod doctor_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    birdhouse_accounts::TokenCipher,
    birdhouse_config::{load_config, store_passphrase},
};

#[derive(Parser)]
#[command(
    name = "birdhouse",
    about = "Birdhouse: connect accounts over OAuth 2.0 and check they can post"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Path to a birdhouse.toml config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect, list and remove accounts.
    Auth {
        #[command(subcommand)]
        action: auth_commands::AuthAction,
    },
    /// Verify a stored account: expiry, identity and a live test post.
    Doctor(doctor_commands::DoctorArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Cipher keyed by `ACCOUNT_STORE_KEY`, or the insecure default.
pub(crate) fn store_cipher() -> TokenCipher {
    let (passphrase, source) = store_passphrase();
    debug!(?source, "store passphrase resolved");
    TokenCipher::from_passphrase(&passphrase)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "birdhouse starting");

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Auth { action } => auth_commands::handle_auth(action, &config).await,
        Commands::Doctor(args) => doctor_commands::handle_doctor(args, &config).await,
    }
}
