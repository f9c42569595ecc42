mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Provision shop-floor operators with PIN fast access")]
struct Cli {
    /// JSON config file. Falls back to MOULD_* environment variables when omitted.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the identity, profile, operator and fast-access records.
    Create(CreateArgs),
    /// Resolve a PIN the way the shop-floor client does and check the result.
    Verify(VerifyArgs),
    /// Seal credentials under a PIN without contacting the backend.
    Seal(SealArgs),
    /// Open a sealed envelope with its PIN without contacting the backend.
    Open(OpenArgs),
}

#[derive(Args, Debug, Clone)]
struct CreateArgs {
    /// Full name; the first word becomes the first name.
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    /// Job title stored on the operator row.
    #[arg(long)]
    role: String,
    /// Four-digit PIN.
    #[arg(long)]
    pin: String,
    /// Re-read every created record afterwards.
    #[arg(long)]
    verify: bool,
}

#[derive(Args, Debug, Clone)]
struct VerifyArgs {
    #[arg(long)]
    pin: String,
    /// Email the PIN is expected to resolve to.
    #[arg(long)]
    email: String,
}

#[derive(Args, Debug, Clone)]
struct SealArgs {
    #[arg(long)]
    pin: String,
    #[arg(long)]
    email: String,
    /// Defaults to the configured operator password.
    #[arg(long)]
    password: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct OpenArgs {
    #[arg(long)]
    pin: String,
    /// Envelope JSON as stored in the fast-access table.
    #[arg(long, value_name = "JSON")]
    envelope: String,
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = commands::load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Create(args) => commands::create(config, &args).await,
        Command::Verify(args) => commands::verify(config, &args).await,
        Command::Seal(args) => commands::seal(&config, &args),
        Command::Open(args) => commands::open(&args),
    }
}
