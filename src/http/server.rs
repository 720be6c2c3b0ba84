//! HTTP server setup and stop sequence.
//!
//! # Responsibilities
//! - Build the `Router` with the hash, shutdown and stats endpoints
//! - Own the `SubmissionStore` and inject it into the handlers
//! - Serve in the background until a shutdown is triggered
//! - Stop in order: router (stop accepting, finish in-flight), then store drain

use std::sync::Arc;

use axum::{body::Body, http::Request, response::IntoResponse};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::ServiceConfig;
use crate::hashing::SubmissionStore;
use crate::http::handlers;
use crate::lifecycle::Shutdown;
use crate::routing::{Router, RouterError};

/// Errors returned by [`HashServer`].
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The hash service: router, submission store and shutdown coordinator.
pub struct HashServer {
    router: Arc<Router>,
    store: SubmissionStore,
    shutdown: Shutdown,
    shutdown_rx: broadcast::Receiver<()>,
}

impl HashServer {
    /// Create a new server with every endpoint registered.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServerError> {
        let store = SubmissionStore::new(config.hashing.delay());
        let shutdown = Shutdown::new();
        let shutdown_rx = shutdown.subscribe();

        let mut router = Router::new(config.listener.clone());

        let submit_store = store.clone();
        router.register_route("/hash", move |request: Request<Body>| {
            let store = submit_store.clone();
            async move { handlers::submit(store, request).await.into_response() }
        })?;

        let fetch_store = store.clone();
        router.register_route("/hash/{id}", move |request: Request<Body>| {
            let store = fetch_store.clone();
            async move { handlers::fetch(store, request).await.into_response() }
        })?;

        let trigger = shutdown.clone();
        router.register_route("/shutdown", move |request: Request<Body>| {
            let trigger = trigger.clone();
            async move { handlers::shutdown(trigger, request).await.into_response() }
        })?;

        router.register_stats_endpoint()?;

        tracing::debug!(routes = ?router.list_routes(), "Routes registered");

        Ok(Self {
            router: Arc::new(router),
            store,
            shutdown,
            shutdown_rx,
        })
    }

    /// Handle that requests a graceful stop when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn store(&self) -> &SubmissionStore {
        &self.store
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Bind the configured listener address and serve until shut down.
    pub async fn serve(self) -> Result<(), ServerError> {
        let router = Arc::clone(&self.router);
        let serving = tokio::spawn(async move { router.serve().await });
        self.run_until_stopped(serving).await
    }

    /// Serve on `listener` until shutdown is triggered, then stop gracefully.
    ///
    /// Returns once the listener has stopped and every pending digest has
    /// been committed.
    pub async fn run(self, listener: TcpListener) -> Result<(), ServerError> {
        let serving = self.router.spawn(listener);
        self.run_until_stopped(serving).await
    }

    async fn run_until_stopped(
        self,
        mut serving: JoinHandle<Result<(), RouterError>>,
    ) -> Result<(), ServerError> {
        let Self {
            router,
            store,
            shutdown: _shutdown,
            mut shutdown_rx,
        } = self;

        tokio::select! {
            // A lagged receiver still means a trigger happened.
            _ = shutdown_rx.recv() => {}
            finished = &mut serving => {
                tracing::warn!("Listener exited without a shutdown request");
                store.drain().await;
                return Ok(finished??);
            }
        }

        tracing::info!("Hash service shutting down");
        let result = router.shutdown().await;
        match &result {
            Ok(()) => tracing::info!("HTTP server shutdown"),
            Err(e) => tracing::error!(error = %e, "Error while shutting down router"),
        }

        store.drain().await;
        tracing::info!("All hash processing finished");

        // The serve task has already published the same terminal result.
        let _ = serving.await?;
        Ok(result?)
    }
}
