use anyhow::Result;
use clap::Parser;

use field_dispatch::cli::commands::dispatch::DispatchCommand;
use field_dispatch::cli::commands::optimize::OptimizeCommand;
use field_dispatch::cli::commands::pool::PoolCommand;
use field_dispatch::cli::commands::status::StatusCommand;
use field_dispatch::cli::commands::track::TrackCommand;
use field_dispatch::cli::commands::verify::VerifyCommand;
use field_dispatch::cli::commands::{Command, CommandContext};
use field_dispatch::cli::{Cli, Commands};
use field_dispatch::config::{config, FieldDispatchConfig};
use field_dispatch::telemetry::{init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match config() {
        Ok(settings) => settings.clone(),
        Err(e) => {
            eprintln!("⚠️  {e}; falling back to default configuration");
            FieldDispatchConfig::default()
        }
    };
    init_telemetry(&settings.observability)?;

    let context = CommandContext::new(settings, cli.manifest, cli.json);
    let result = tokio::runtime::Runtime::new()?.block_on(async {
        match cli.command {
            // Default behavior: show the floor
            None | Some(Commands::Status) => StatusCommand::new(context).execute().await,
            Some(Commands::Pool) => PoolCommand::new(context).execute().await,
            Some(Commands::Dispatch { agent, case }) => {
                DispatchCommand::new(context, agent, case).execute().await
            }
            Some(Commands::Optimize { agent }) => {
                OptimizeCommand::new(context, agent).execute().await
            }
            Some(Commands::Verify { agent }) => VerifyCommand::new(context, agent).execute().await,
            Some(Commands::Track { ticks, interval_ms }) => {
                TrackCommand::new(context, ticks, interval_ms).execute().await
            }
        }
    });

    shutdown_telemetry();
    if let Err(e) = &result {
        eprintln!("❌ {e:#}");
    }
    result
}
