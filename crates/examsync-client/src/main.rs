//! examsync CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use examsync_client::cli::{AuthAction, Cli, Command, ConfigAction};
use examsync_client::commands;
use examsync_client::config::ClientConfig;
use examsync_client::error::ClientResult;
use examsync_core::{TracingConfig, init_tracing};
use examsync_protocol::Request;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = ClientConfig::path_or_default(cli.config.as_deref());

    // Must work even when the file does not parse.
    if let Command::Config {
        action: ConfigAction::Path,
    } = &cli.command
    {
        return commands::config::path(&config_path);
    }
    if let Command::Config {
        action: ConfigAction::Set { key, value },
    } = &cli.command
    {
        return commands::config::set(&config_path, key, value);
    }

    let config = ClientConfig::load(cli.config.as_deref())?;

    let debug = cli.debug || config.sync.debug_mode;
    let tracing_config = match cli.command {
        Command::Server => TracingConfig::daemon().with_debug(debug),
        _ if debug => TracingConfig::cli_debug(),
        _ => TracingConfig::cli(),
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: failed to initialize logging: {}", e);
    }

    let request = match &cli.command {
        Command::Server => return commands::server::run(&cli, &config, &config_path).await,
        Command::Auth { action } => {
            return match action {
                AuthAction::Import { provider, file } => {
                    commands::auth::import((*provider).into(), file.as_deref(), &config)
                }
                AuthAction::Show => commands::auth::show(&config),
                AuthAction::Clear { provider } => {
                    commands::auth::clear((*provider).into(), &config)
                }
            };
        }
        Command::Config { action } => {
            return match action {
                ConfigAction::Dump => commands::config::dump(&config, &config_path),
                ConfigAction::Validate => commands::config::validate(&config),
                ConfigAction::Path | ConfigAction::Set { .. } => Ok(()),
            };
        }
        Command::Changed { file } => Request::exam_changed(commands::read_input(file.as_deref())?),
        Command::Sync { file } => Request::sync_calendar(commands::read_input(file.as_deref())?),
        Command::ForceSync => Request::ForceSync,
        Command::DeleteSynced => Request::DeleteSynced,
        Command::RefreshTokens => Request::RefreshTokens,
        Command::Status => Request::Status,
        Command::Ping => Request::Ping,
        Command::Shutdown => Request::Shutdown,
    };

    let client = commands::client(&cli, &config);
    commands::sync::run(&client, request, cli.json).await
}
