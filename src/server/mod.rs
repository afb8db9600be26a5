// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server for the registry.
//!
//! This module wires the pieces of the `config-registry` binary together:
//! layered [`settings`], the process-wide admission [`limiter`], the [`http`]
//! routes, and a serve loop that drains in-flight requests on shutdown within a
//! bounded grace period.

pub mod http;
pub mod limiter;
pub mod settings;

pub use http::router;
pub use limiter::AdmissionLimiter;
pub use settings::{BackendKind, Cli, ServerSettings, SettingsError};

use crate::domain::{RegistryError, RegistryService};
use crate::service::DefaultRegistry;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Errors that stop the server.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// Settings could not be resolved.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The registry could not be built, e.g. the store is unreachable.
    #[error("Failed to initialize registry: {0}")]
    Registry(#[from] RegistryError),

    /// The listening socket could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The server loop failed.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    /// In-flight requests did not finish within the grace period.
    #[error("Shutdown grace period of {0:?} exceeded")]
    GracePeriodExceeded(Duration),
}

/// Builds the registry for the backend named in `settings`.
///
/// Remote backends are only available when the crate is built with the
/// matching feature; selecting one otherwise is a settings error.
pub fn build_registry(settings: &ServerSettings) -> Result<DefaultRegistry, ServerError> {
    let builder = DefaultRegistry::builder();

    let builder = match settings.backend {
        BackendKind::Memory => builder.with_memory_store(),
        #[cfg(feature = "etcd")]
        BackendKind::Etcd => {
            let store = crate::adapters::EtcdStore::connect_with_timeout(
                settings.etcd_endpoints.clone(),
                Some(settings.key_prefix.as_deref().unwrap_or("registry/")),
                settings.request_timeout,
            )
            .map_err(RegistryError::from)?;
            builder.with_store(Arc::new(store))
        }
        #[cfg(feature = "redis")]
        BackendKind::Redis => {
            let store = crate::adapters::RedisStore::connect_with_timeout(
                &settings.redis_url,
                settings.key_prefix.as_deref().unwrap_or("registry:"),
                settings.request_timeout,
            )
            .map_err(RegistryError::from)?;
            builder.with_store(Arc::new(store))
        }
        #[allow(unreachable_patterns)]
        other => {
            return Err(SettingsError::InvalidValue {
                key: "backend".to_string(),
                value: other.to_string(),
                message: format!("built without the '{}' feature", other),
            }
            .into());
        }
    };

    let registry = builder.build()?;
    tracing::info!(backend = %settings.backend, "Registry ready");
    Ok(registry)
}

/// Serves `app` on `listener` until `shutdown` resolves, then drains.
///
/// Once `shutdown` fires, no new connections are accepted and in-flight
/// requests get `grace` to finish. Exceeding it returns
/// [`ServerError::GracePeriodExceeded`].
pub async fn run<F>(
    listener: TcpListener,
    app: Router,
    grace: Duration,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (drain_tx, mut drain_rx) = watch::channel(false);

    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = drain_rx.wait_for(|draining| *draining).await;
            })
            .await
    });

    tokio::pin!(shutdown);
    tokio::select! {
        joined = &mut server => return flatten(joined),
        _ = &mut shutdown => {}
    }

    tracing::info!(grace = ?grace, "Shutdown requested, draining in-flight requests");
    let _ = drain_tx.send(true);

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => flatten(joined),
        Err(_) => {
            server.abort();
            Err(ServerError::GracePeriodExceeded(grace))
        }
    }
}

fn flatten(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match joined {
        Ok(result) => result.map_err(ServerError::Serve),
        Err(e) => Err(ServerError::Serve(std::io::Error::new(
            std::io::ErrorKind::Other,
            e.to_string(),
        ))),
    }
}

/// Resolves settings-driven pieces and serves until SIGINT or SIGTERM.
pub async fn serve(settings: ServerSettings) -> Result<(), ServerError> {
    // Connecting a remote store blocks; keep it off the async workers.
    let registry = {
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || build_registry(&settings))
            .await
            .map_err(|e| {
                ServerError::Serve(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            })??
    };
    let registry: Arc<dyn RegistryService> = Arc::new(registry);

    let limiter = Arc::new(AdmissionLimiter::new(
        settings.rate_limit_capacity,
        settings.rate_limit_refill_per_sec,
    ));
    let app = router(registry, limiter);

    let listener = TcpListener::bind(settings.listen_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: settings.listen_addr,
            source,
        })?;
    tracing::info!(addr = %settings.listen_addr, "Listening");

    run(listener, app, settings.shutdown_grace, shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or on SIGTERM where supported.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
