/// yourMoment CLI - operational entrypoint for the monitoring pipeline.
///
/// Parses CLI arguments, initializes logging, loads configuration, and
/// dispatches to subcommand handlers.
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use yourmoment_core::config::Config;

/// yourMoment monitoring pipeline
#[derive(Parser)]
#[command(name = "yourmoment")]
#[command(version)]
#[command(about = "yourMoment monitoring pipeline")]
struct Cli {
    /// Path to config.toml
    #[arg(short = 'c', long, global = true, default_value = "~/.yourmoment/config.toml")]
    config: String,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the coordinator and timeout enforcer until shutdown
    Run(commands::RunArgs),
    /// Run embedded database migrations
    Migrate(commands::MigrateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("yourmoment=debug,yourmoment_core=debug,info")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("yourmoment=info,yourmoment_core=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .compact()
        .init();

    let config = Config::load(Some(&cli.config)).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration: {e}\n\
             Hint: copy a config.toml to {} or set YOURMOMENT_CONFIG.",
            cli.config
        )
    })?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(&config, args.status_interval).await?,
        Commands::Migrate(_) => commands::migrate::execute(&config).await?,
    }

    Ok(())
}
