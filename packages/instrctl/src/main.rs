//! instrctl keeps repository instruction documents in sync with a canonical
//! principle set.

use color_eyre::{Result, Section};
use tracing::{instrument, level_filters::LevelFilter};

mod cmd;

use clap::{Parser, Subcommand};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keep instruction documents in sync with a canonical principle set.
#[derive(Parser)]
#[command(author, version = env!("INSTRCTL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover instruction documents, extract principles, detect conflicts.
    Init(cmd::init::Config),

    /// Compute managed-section patches against the recorded state.
    Plan(cmd::plan::Config),

    /// Apply the persisted plan, then refresh the state.
    Apply(cmd::apply::Config),
}

#[instrument]
fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Logging is for manual debugging with `INSTRCTL_LOG` directives; normal
    // operation communicates through stdout and exit codes.
    //
    // Examples:
    // - `INSTRCTL_LOG=trace` to log all messages
    // - `INSTRCTL_LOG=debug` to log debug, info, warn, and error messages
    // - `INSTRCTL_LOG=warn` to log warn and error messages (this is the default)
    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(
            fmt::layer()
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .pretty(),
        )
        .with(
            EnvFilter::builder()
                .with_env_var("INSTRCTL_LOG")
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    match cli.command {
        Commands::Init(config) => cmd::init::main(config),
        Commands::Plan(config) => cmd::plan::main(config),
        Commands::Apply(config) => cmd::apply::main(config),
    }
    .suggestion("Run with INSTRCTL_LOG=debug for detailed logs.")
}
