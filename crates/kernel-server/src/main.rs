use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use kernel_k8s::K8sCrClient;
use kernel_manager::KernelManager;
use kernel_schema::CrNames;
use kernel_server::{AppState, Config, build_router};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = kernel_server::config::Cli::parse();
    let config = Arc::new(Config::from_env_and_cli(cli));

    kernel_server::logging::setup(&config.log_level);

    if config.allow_unauthenticated_access {
        tracing::warn!("allow_unauthenticated_access is set; binding caller identity to anonymous");
    }

    let client = match K8sCrClient::try_new(CrNames::default()).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to initialise Kubernetes client");
            return ExitCode::FAILURE;
        }
    };

    let manager = Arc::new(KernelManager::new(Arc::new(client)));
    let state = AppState::new(manager, config.clone());
    let router = build_router(state);

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, port = config.port, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(port = config.port, "starting kernel-server");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server exited with error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
