use crate::config::Config;
use crate::state::AppState;
use crate::web::create_router;
use anyhow::Context;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How often idle sessions are swept, relative to the idle timeout.
const SWEEP_DIVISOR: u32 = 4;

/// Main application struct: configuration, shared state, and the bound listener.
pub struct App {
    config: Config,
    app_state: AppState,
    listener: TcpListener,
}

impl App {
    /// Create a new App instance and bind its listener.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let app_state = AppState::from_config(&config);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        info!(
            address = %listener.local_addr().context("Listener has no local address")?,
            crypto_failure = ?config.crypto_failure,
            csp_report_only = config.csp_report_only,
            "web server bound"
        );

        Ok(App {
            config,
            app_state,
            listener,
        })
    }

    /// Serve until a shutdown signal arrives, then drain within `shutdown_timeout`.
    pub async fn run(self) -> ExitCode {
        let App {
            config,
            app_state,
            listener,
        } = self;

        let idle = config.session_idle_timeout;
        let sweep_every = (idle / SWEEP_DIVISOR).max(Duration::from_secs(1));
        app_state.sessions.spawn_sweeper(sweep_every, idle);

        let router = create_router(app_state);
        let shutdown = CancellationToken::new();

        let mut server = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown.cancelled_owned())
                    .await
            }
        });

        tokio::select! {
            _ = shutdown_signal() => {}
            joined = &mut server => {
                match joined {
                    Ok(Ok(())) => error!("Web server stopped unexpectedly"),
                    Ok(Err(e)) => error!(error = %e, "Web server failed"),
                    Err(e) => error!(error = %e, "Web server task panicked"),
                }
                return ExitCode::FAILURE;
            }
        }

        info!(
            timeout = ?config.shutdown_timeout,
            "Shutdown signal received, draining connections"
        );
        shutdown.cancel();

        match tokio::time::timeout(config.shutdown_timeout, server).await {
            Ok(Ok(Ok(()))) => {
                info!("Shutdown complete");
                ExitCode::SUCCESS
            }
            Ok(Ok(Err(e))) => {
                error!(error = %e, "Server error during shutdown");
                ExitCode::FAILURE
            }
            Ok(Err(e)) => {
                error!(error = %e, "Server task panicked");
                ExitCode::FAILURE
            }
            Err(_) => {
                warn!(timeout = ?config.shutdown_timeout, "Graceful shutdown timed out");
                ExitCode::FAILURE
            }
        }
    }
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
