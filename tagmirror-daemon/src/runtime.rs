use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use tagmirror_core::MirrorConfig;
use tagmirror_renderer::Renderer;
use tagmirror_sync::Reconciler;

use crate::error::{io_err, DaemonError};
use crate::scheduler;
use crate::server::{self, AppState};
use crate::telemetry::{init_tracing, LogFormat};

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(config: MirrorConfig, log_format: LogFormat) -> Result<(), DaemonError> {
    init_tracing(log_format);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the sync scheduler and the HTTP server until ctrl-c, or until either
/// of them stops.
pub async fn run(config: MirrorConfig) -> Result<(), DaemonError> {
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    let port = config.require_port()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| io_err(addr.to_string(), e))?;
    let state = AppState::from_config(&config, Renderer::new()?);

    tracing::info!(
        store_root = %config.store_root.display(),
        interval_minutes = config.interval_minutes,
        repositories = config.repositories.len(),
        "serving files on port {port}"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let reconciler = Reconciler::from_config(&config);
        let repositories = config.repositories.clone();
        let interval = config.interval();
        tokio::spawn(async move {
            let result = scheduler::run(
                interval,
                move || scheduler::sync_pass(&reconciler, &repositories),
                shutdown.subscribe(),
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let server_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let result = serve(listener, state, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Task(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (scheduler_result, server_result, signal_result) =
        tokio::join!(scheduler_handle, server_handle, signal_handle);

    handle_join("scheduler", scheduler_result)?;
    handle_join("http_server", server_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

/// Serve `state` on `listener` until the shutdown channel fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let local = listener
        .local_addr()
        .map_err(|e| io_err("http listener", e))?;
    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .map_err(|e| io_err(local.to_string(), e))?;
    tracing::info!("http server stopped");
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Task(format!("{task} task join failure: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagmirror_core::RawSettings;

    #[tokio::test]
    async fn missing_port_fails_before_anything_starts() {
        let config = MirrorConfig::from_settings(RawSettings {
            repositories: Some("org/image".into()),
            ..RawSettings::default()
        })
        .unwrap();

        let err = run(config).await.unwrap_err();
        assert!(matches!(err, DaemonError::Config(_)), "got {err:?}");
    }

    #[test]
    fn join_failure_names_the_task() {
        let ok = handle_join("scheduler", Ok(Ok(())));
        assert!(ok.is_ok());

        let inner = handle_join("scheduler", Ok(Err(DaemonError::Task("boom".into()))));
        assert!(matches!(inner, Err(DaemonError::Task(msg)) if msg == "boom"));
    }
}
