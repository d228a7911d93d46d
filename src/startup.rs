//! Process lifecycle for one plugin invocation.
//!
//! Loads configuration, installs the log sink, wires the Vault backend into the
//! provider, serves the single request and reports why the process is exiting.

use std::fmt;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::config::{AppConfig, ConfigLoader};
use crate::errors::{ErrorContext, Result};
use crate::observability::{log_config_info, LoggingGuard};
use crate::provider::CredentialProvider;
use crate::resolver::VaultCredentialResolver;
use crate::secrets::{SecretBackend, VaultSecretBackend};
use crate::transport::{StreamTransport, Transport};
use crate::{APP_NAME, VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The response was written
    Finished,
    /// SIGINT or SIGTERM arrived before the response was written
    Signal,
    /// Configuration or resolution failed
    Error,
}

impl ShutdownReason {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ShutdownReason::Finished => ExitCode::SUCCESS,
            ShutdownReason::Signal | ShutdownReason::Error => ExitCode::from(1),
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownReason::Finished => "finished",
            ShutdownReason::Signal => "signal",
            ShutdownReason::Error => "error",
        })
    }
}

/// Run one invocation end to end.
///
/// Must be polled on a current-thread runtime: the log sink is installed as the
/// thread's default dispatcher.
pub async fn run(cli: &Cli) -> ShutdownReason {
    let mut loader = ConfigLoader::new().overrides(cli.overrides());
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }

    let config = match loader.load_validated() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ShutdownReason::Error;
        }
    };

    let _logging = match LoggingGuard::init(&config.log) {
        Ok(guard) => guard,
        Err(e) => {
            error!(error = %e, "Failed to initialize logging");
            return ShutdownReason::Error;
        }
    };

    info!(
        app_name = APP_NAME,
        version = VERSION,
        "Starting kubelet credential provider"
    );
    log_config_info(&config);

    let cancel = CancellationToken::new();
    let signals = spawn_signal_watcher(cancel.clone());

    let result = serve(&config, &cancel).await;
    signals.abort();

    let reason = classify(&result, &cancel);
    info!(reason = %reason, "Shutting down");
    reason
}

fn classify(result: &Result<()>, cancel: &CancellationToken) -> ShutdownReason {
    match result {
        Ok(()) => ShutdownReason::Finished,
        Err(e) if cancel.is_cancelled() => {
            warn!(error = %e, "Credential request interrupted");
            ShutdownReason::Signal
        }
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "Failed to provide credentials");
            ShutdownReason::Error
        }
    }
}

/// Serve the request on stdin/stdout against the configured Vault server.
pub async fn serve(config: &AppConfig, cancel: &CancellationToken) -> Result<()> {
    let backend = VaultSecretBackend::builder()
        .address(config.vault.address.as_str())
        .insecure_skip_verify(config.vault.insecure_skip_verify)
        .login(config.login_settings())
        .build()
        .context("failed to setup vault client")?;

    let transport = StreamTransport::stdio()?;
    serve_with(config, transport, Arc::new(backend), cancel).await
}

/// Serve one request over `transport` using `backend`.
pub async fn serve_with<T: Transport>(
    config: &AppConfig,
    transport: T,
    backend: Arc<dyn SecretBackend>,
    cancel: &CancellationToken,
) -> Result<()> {
    let resolver = VaultCredentialResolver::new(backend, config.resolver_settings());
    CredentialProvider::new(transport, resolver)
        .run(cancel)
        .await
}

/// Cancel `cancel` on SIGINT or SIGTERM.
pub fn spawn_signal_watcher(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => {
                warn!("Shutdown signal received");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
