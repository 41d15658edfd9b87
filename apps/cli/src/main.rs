//! Entry point for the `tablesync` binary.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tablesync_cli::{commands, Cli, Commands, RunStatus};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: cannot start runtime: {}", err);
            return ExitCode::from(RunStatus::CONFIG_ERROR_CODE);
        }
    };

    let result = runtime.block_on(async {
        match &cli.command {
            Commands::Sync(args) => commands::run::sync(&cli.config, args).await,
            Commands::Backup(args) => commands::run::backup(&cli.config, args).await,
            Commands::Restore(args) => commands::run::restore(&cli.config, args).await,
            Commands::GenerateSql(args) => commands::generate_sql::execute(&cli.config, args).await,
            Commands::CheckConfig => commands::check_config::execute(&cli.config).await,
        }
    });

    match result {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(RunStatus::CONFIG_ERROR_CODE)
        }
    }
}
