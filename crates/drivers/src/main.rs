mod cli;
mod commands;
mod config;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use commands::{App, CommandError};
use config::{resolve_config_path, AppConfig};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return if error.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CommandError::Usage(message)) => {
            eprintln!("{message}");
            ExitCode::from(2)
        }
        Err(CommandError::Runtime(message)) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let config_path = resolve_config_path(cli.config);
    let mut config = AppConfig::load(&config_path)?;
    if let Command::Login {
        server: Some(server),
        ..
    } = &cli.command
    {
        config.server_url = server.trim().to_string();
    }

    App::build(config, config_path)?.run(cli.command).await
}
