mod app;
mod config;
mod llm;
mod pipeline;
mod records;
mod search;
mod session;
mod sheets;
mod table;

pub const USER_AGENT: &str = concat!("leadscout/", env!("CARGO_PKG_VERSION"));

use clap::{Parser, Subcommand};
use tracing::info;

use app::App;
use config::Config;

/// Find company contact emails from web search results.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Menu-driven session (the default)
    Interactive,
    /// Process one CSV or sheet and write the results
    Run(app::run::RunArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("leadscout=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let app = App::from_config(&config)
        .inspect_err(|e| tracing::error!("failed to start: {e}"))?;

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Interactive => app::interactive::run(&app).await?,
        Command::Run(args) => app::run::run(&app, args).await?,
    }

    info!("leadscout finished");
    Ok(())
}
