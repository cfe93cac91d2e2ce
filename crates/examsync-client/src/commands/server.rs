//! Server command: runs the sync daemon in the foreground.
//!
//! Startup order:
//! - build the provider adapters from config
//! - open the preference and state stores
//! - refresh stored tokens
//! - install SIGTERM/SIGINT handlers
//! - bind the socket (fails if another daemon owns it)

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use examsync_server::{
    PreferenceStore, ProviderKind, RequestHandler, ServerConfig, ShutdownHandle, SocketServer,
    StateStore, SyncContext, default_state_path, make_connection_handler,
};

use crate::cli::Cli;
use crate::commands::socket_path;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Starts the daemon and blocks until shutdown is requested by a signal or
/// a `shutdown` request.
pub async fn run(cli: &Cli, config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    config.sync.validate().map_err(ClientError::Config)?;

    let state_path = config
        .server
        .state_path
        .clone()
        .unwrap_or_else(default_state_path);

    let context = build_context(config, config_path, &state_path)?;
    let context = Arc::new(context);

    match context.refresh_tokens().await {
        Ok(refreshed) if !refreshed.is_empty() => info!(providers = ?refreshed, "Tokens refreshed at startup"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Token refresh at startup failed"),
    }

    let shutdown = ShutdownHandle::new();
    shutdown.listen_for_signals()?;

    let socket = socket_path(cli, config);
    let server = SocketServer::bind(ServerConfig::new(&socket)).await?;
    info!(
        path = %server.socket_path().display(),
        state = %state_path.display(),
        config = %config_path.display(),
        "Server listening"
    );

    let handler = RequestHandler::new(context, shutdown.clone());
    server
        .serve(make_connection_handler(handler), shutdown.wait())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Builds the sync context with every compiled-in provider.
///
/// Adapters are built even without a token file so `status` can report
/// them and a later token import works without restarting.
fn build_context(
    config: &ClientConfig,
    config_path: &Path,
    state_path: &Path,
) -> ClientResult<SyncContext> {
    #[allow(unused_mut)]
    let mut context = SyncContext::new(
        PreferenceStore::new(config_path),
        StateStore::new(state_path),
    );

    #[cfg(feature = "outlook")]
    {
        let provider = examsync_providers::outlook::OutlookProvider::new(
            config.outlook.to_provider_config()?,
        )?;
        info!("Outlook provider registered");
        context = context.with_provider(ProviderKind::Outlook, Arc::new(provider));
    }

    #[cfg(feature = "google")]
    {
        let provider = examsync_providers::google::GoogleProvider::new(
            config
                .google
                .to_provider_config(config.sync.timezone.as_deref())?,
        )?;
        info!("Google provider registered");
        context = context.with_provider(ProviderKind::Google, Arc::new(provider));
    }

    Ok(context)
}
