mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::init::run(config),
        Commands::Collect { once } => commands::collect::run(config, once),
        Commands::Export { output, subjects } => {
            commands::export::run(config, output.as_deref(), &subjects)
        }
        Commands::Sessions {
            subject,
            limit,
            json,
        } => commands::sessions::run(config, &subject, limit, json),
        Commands::Subjects => commands::subjects::run(config),
        Commands::Serve { bind } => commands::serve::run(config, bind.as_deref()),
        Commands::Status => commands::status::run(config),
        Commands::History { stats } => commands::history::run(stats),
        Commands::Version => commands::version::run(),
    }
}
