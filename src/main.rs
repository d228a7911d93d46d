use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use vault_credential_provider::{
    cli::Cli,
    observability::LoggingGuard,
    startup::{self, ShutdownReason},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Errors before the configured sink exists go to stderr, which the kubelet captures
    let _bootstrap = LoggingGuard::bootstrap();

    // Load .env file if it exists; variables already set are kept
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            error!(error = %e, "Error loading .env file");
            return ShutdownReason::Error.exit_code();
        }
    }

    let cli = Cli::parse();
    startup::run(&cli).await.exit_code()
}
