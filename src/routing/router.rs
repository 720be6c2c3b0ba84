//! Route lookup, dispatch and listener lifecycle.
//!
//! # Responsibilities
//! - Store handlers by literal path and parsed templates in registration order
//! - Rewrite templated requests to their canonical path before lookup
//! - Time every dispatch into the `StatsTracker`, whatever the outcome
//! - Serve on a TCP listener and stop gracefully on request
//!
//! # Lifecycle
//! ```text
//! Idle ──serve──▶ Serving ──shutdown──▶ ShuttingDown ──▶ Stopped
//!   └─────────────────shutdown──────────────────────────────┘
//! ```
//!
//! # Design Decisions
//! - Registration takes `&mut self` and serving takes `Arc<Self>`, so the
//!   route table cannot change while requests are dispatched
//! - First matching template wins; overlapping templates are a caller error
//! - Re-registering a path replaces its handler

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::ListenerConfig;
use crate::observability::{metrics, StatsTracker};
use crate::routing::matcher::{is_parameterized, PathTemplate, TemplateError};
use crate::routing::params::RouteParams;

/// Path of the built-in statistics endpoint.
pub const STATS_PATH: &str = "/stats";

/// A registered request handler.
pub type Handler = Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync>;

/// Errors produced by the router.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    #[error("invalid route template: {0}")]
    Template(#[from] TemplateError),

    #[error("router is already serving")]
    AlreadyServing,

    #[error("router has been stopped")]
    Stopped,

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: Arc<std::io::Error>,
    },

    #[error("listener failed: {0}")]
    Listener(Arc<std::io::Error>),
}

/// Router lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// Routes registered, not serving.
    Idle,
    /// Accepting connections.
    Serving,
    /// Stop requested; in-flight connections are finishing.
    ShuttingDown,
    /// Terminal.
    Stopped,
}

type Outcome = Option<Result<(), RouterError>>;

/// HTTP dispatcher with parameterized paths and per-route timing.
pub struct Router {
    routes: HashMap<String, Handler>,
    templates: Vec<PathTemplate>,
    stats: Arc<StatsTracker>,
    listener: ListenerConfig,
    state: Mutex<RouterState>,
    stop: watch::Sender<bool>,
    outcome: watch::Sender<Outcome>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.list_routes())
            .field("listener", &self.listener)
            .field("state", &self.state())
            .finish()
    }
}

impl Router {
    /// Create a router with no routes that will bind `listener` on `serve`.
    pub fn new(listener: ListenerConfig) -> Self {
        let (stop, _) = watch::channel(false);
        let (outcome, _) = watch::channel(None);
        Self {
            routes: HashMap::new(),
            templates: Vec::new(),
            stats: Arc::new(StatsTracker::new()),
            listener,
            state: Mutex::new(RouterState::Idle),
            stop,
            outcome,
        }
    }

    /// Bind `handler` to a literal path or a `{param}` template.
    pub fn register_route<F, Fut>(&mut self, path: &str, handler: F) -> Result<(), RouterError>
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        // Stray braces go through the parser too, so malformed templates are reported.
        if is_parameterized(path) || path.contains(['{', '}']) {
            let template = PathTemplate::parse(path)?;
            if !self.templates.iter().any(|t| t.path() == path) {
                tracing::debug!(
                    path = %path,
                    params = ?template.param_names().collect::<Vec<_>>(),
                    "Route template registered"
                );
                self.templates.push(template);
            }
        }

        let handler: Handler = Arc::new(move |request| handler(request).boxed());
        if self.routes.insert(path.to_string(), handler).is_some() {
            tracing::debug!(path = %path, "Route handler replaced");
        }
        Ok(())
    }

    /// Register `/stats`, reporting every route's count and average latency.
    pub fn register_stats_endpoint(&mut self) -> Result<(), RouterError> {
        let stats = Arc::clone(&self.stats);
        self.register_route(STATS_PATH, move |request: Request<Body>| {
            let stats = Arc::clone(&stats);
            async move {
                if request.method() != Method::GET {
                    return StatusCode::METHOD_NOT_ALLOWED.into_response();
                }
                Json(stats.snapshot()).into_response()
            }
        })
    }

    /// All registered paths, sorted.
    pub fn list_routes(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.routes.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    pub fn state(&self) -> RouterState {
        *self.lock_state()
    }

    fn lock_state(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dispatch one request and record its cycle time.
    pub async fn dispatch(&self, mut request: Request<Body>) -> Response {
        let started = Instant::now();
        let method = request.method().clone();

        let mut params = RouteParams::from_uri(request.uri());
        if let Some(matched) = self
            .templates
            .iter()
            .find_map(|template| template.matches(params.path()))
        {
            params.bind(matched.path, matched.params);
        }

        let path = params.path().to_string();
        tracing::debug!(method = %method, path = %path, uri = %request.uri(), "Dispatching request");

        let handler = self.routes.get(&path).cloned();
        request.extensions_mut().insert(params);

        let response = match handler {
            Some(handler) => handler(request).await,
            None => {
                tracing::debug!(path = %path, "No route matched");
                (StatusCode::NOT_FOUND, "404 page not found").into_response()
            }
        };

        let elapsed = started.elapsed();
        self.stats.record(format!("{} {}", path, method), elapsed);
        metrics::record_request(method.as_str(), response.status().as_u16(), elapsed);
        response
    }

    /// Bind the configured address and serve until shut down.
    pub async fn serve(self: &Arc<Self>) -> Result<(), RouterError> {
        let address = self.listener.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| RouterError::Bind {
                address: address.clone(),
                source: Arc::new(e),
            })?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener until shut down.
    ///
    /// Returns `Ok(())` after a requested, graceful stop; any other listener
    /// failure is returned and also reported to `shutdown` callers.
    pub async fn serve_on(self: &Arc<Self>, listener: TcpListener) -> Result<(), RouterError> {
        {
            let mut state = self.lock_state();
            match *state {
                RouterState::Idle => *state = RouterState::Serving,
                RouterState::Serving => return Err(RouterError::AlreadyServing),
                RouterState::ShuttingDown | RouterState::Stopped => return Err(RouterError::Stopped),
            }
        }

        match listener.local_addr() {
            Ok(addr) => tracing::info!(address = %addr, "Server starting"),
            Err(e) => tracing::warn!(error = %e, "Server starting on unknown address"),
        }

        let app = axum::Router::new()
            .fallback(dispatch_handler)
            .with_state(Arc::clone(self))
            .layer(TraceLayer::new_for_http());

        let mut stop = self.stop.subscribe();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.wait_for(|stop| *stop).await;
            })
            .await
            .map_err(|e| RouterError::Listener(Arc::new(e)));

        match &result {
            Ok(()) => tracing::info!("Server stopped"),
            Err(e) => tracing::error!(error = %e, "Server stopped unexpectedly"),
        }

        *self.lock_state() = RouterState::Stopped;
        self.outcome.send_replace(Some(result.clone()));
        result
    }

    /// Run [`serve_on`](Self::serve_on) as a background task.
    pub fn spawn(self: &Arc<Self>, listener: TcpListener) -> JoinHandle<Result<(), RouterError>> {
        let router = Arc::clone(self);
        tokio::spawn(async move { router.serve_on(listener).await })
    }

    /// Stop accepting connections, let in-flight ones finish, and wait.
    ///
    /// Safe to call before `serve` (the router becomes `Stopped`) and any
    /// number of times; every call returns the same terminal result.
    pub async fn shutdown(&self) -> Result<(), RouterError> {
        {
            let mut state = self.lock_state();
            match *state {
                RouterState::Idle => {
                    *state = RouterState::Stopped;
                    self.outcome.send_replace(Some(Ok(())));
                }
                RouterState::Serving => {
                    tracing::info!("Server shutting down");
                    *state = RouterState::ShuttingDown;
                    self.stop.send_replace(true);
                }
                RouterState::ShuttingDown | RouterState::Stopped => {}
            }
        }

        let mut outcome = self.outcome.subscribe();
        let terminal = outcome
            .wait_for(Option::is_some)
            .await
            .map(|value| value.clone());

        match terminal {
            Ok(Some(result)) => result,
            // The sender lives in `self`; nothing else can close it.
            Ok(None) | Err(_) => Ok(()),
        }
    }
}

async fn dispatch_handler(State(router): State<Arc<Router>>, request: Request<Body>) -> Response {
    router.dispatch(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn text(body: &'static str) -> impl Fn(Request<Body>) -> std::future::Ready<Response> + Send + Sync {
        move |_| std::future::ready(body.into_response())
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn local_router() -> Router {
        Router::new(ListenerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        })
    }

    #[test]
    fn simple_route_listed() {
        let mut router = local_router();
        router.register_route("/test", text("")).unwrap();
        assert_eq!(router.list_routes(), ["/test"]);
    }

    #[test]
    fn routes_sorted_and_deduplicated() {
        let mut router = local_router();
        router.register_route("/test/longer", text("")).unwrap();
        router.register_route("/test", text("")).unwrap();
        router.register_route("/hash/{id}", text("")).unwrap();
        router.register_route("/hash/{id}", text("")).unwrap();

        assert_eq!(router.list_routes(), ["/hash/{id}", "/test", "/test/longer"]);
        assert_eq!(router.templates.len(), 1);
    }

    #[test]
    fn malformed_template_rejected() {
        let mut router = local_router();
        let err = router.register_route("/hash/{id", text("")).unwrap_err();
        assert!(matches!(err, RouterError::Template(TemplateError::Unterminated(_))));
        assert!(router.list_routes().is_empty());
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut router = local_router();
        router.register_route("/test", text("first")).unwrap();
        router.register_route("/test", text("second")).unwrap();

        let response = router.dispatch(request(Method::GET, "/test")).await;
        assert_eq!(body_text(response).await, "second");
    }

    #[tokio::test]
    async fn unknown_path_is_not_found_and_recorded() {
        let router = local_router();
        let response = router.dispatch(request(Method::GET, "/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let snapshot = router.stats().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "/missing GET");
        assert_eq!(snapshot[0].total, 1);
    }

    #[tokio::test]
    async fn template_rewrites_path_and_binds_params() {
        let mut router = local_router();
        router
            .register_route("/hash/{id}", |request: Request<Body>| async move {
                let params = request.extensions().get::<RouteParams>().cloned().unwrap_or_default();
                format!("{} {}", params.path(), params.get("id").unwrap_or("-")).into_response()
            })
            .unwrap();

        let response = router.dispatch(request(Method::GET, "/hash/42")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "/hash/{id} 42");

        let extra = router.dispatch(request(Method::GET, "/hash/42/extra")).await;
        assert_eq!(extra.status(), StatusCode::NOT_FOUND);

        let names: Vec<_> = router.stats().snapshot().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["/hash/42/extra GET", "/hash/{id} GET"]);
    }

    #[tokio::test]
    async fn stats_endpoint_reports_prior_dispatches() {
        let mut router = local_router();
        router.register_route("/hash", text("ok")).unwrap();
        router.register_stats_endpoint().unwrap();

        router.dispatch(request(Method::POST, "/hash")).await;
        let response = router.dispatch(request(Method::GET, STATS_PATH)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let stats: Vec<crate::observability::StatSummary> =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name, "/hash POST");
        assert_eq!(stats[0].total, 1);

        // The stats call itself is recorded once it completes.
        assert_eq!(router.stats().snapshot().len(), 2);
    }

    #[tokio::test]
    async fn shutdown_before_serve_is_a_no_op() {
        let router = Arc::new(local_router());
        assert!(router.shutdown().await.is_ok());
        assert!(router.shutdown().await.is_ok());
        assert_eq!(router.state(), RouterState::Stopped);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        assert!(matches!(router.serve_on(listener).await, Err(RouterError::Stopped)));
    }

    #[tokio::test]
    async fn serves_and_shuts_down_idempotently() {
        let mut router = local_router();
        router.register_route("/test", text("helloWorld")).unwrap();
        let router = Arc::new(router);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let serving = router.spawn(listener);

        let body = reqwest::get(format!("http://{addr}/test"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "helloWorld");
        assert_eq!(router.state(), RouterState::Serving);

        let first = tokio::time::timeout(Duration::from_secs(5), router.shutdown()).await.unwrap();
        assert!(first.is_ok());
        let second = tokio::time::timeout(Duration::from_secs(1), router.shutdown()).await.unwrap();
        assert!(second.is_ok());

        assert!(serving.await.unwrap().is_ok());
        assert_eq!(router.state(), RouterState::Stopped);
    }

    #[tokio::test]
    async fn serve_binds_configured_address() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let mut router = Router::new(ListenerConfig {
            host: "127.0.0.1".into(),
            port,
        });
        router.register_route("/test", text("configured")).unwrap();
        let router = Arc::new(router);

        let serving = tokio::spawn({
            let router = Arc::clone(&router);
            async move { router.serve().await }
        });
        while router.state() == RouterState::Idle {
            tokio::task::yield_now().await;
        }

        let body = reqwest::get(format!("http://127.0.0.1:{port}/test"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "configured");

        router.shutdown().await.unwrap();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn serve_reports_taken_address() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let router = Arc::new(Router::new(ListenerConfig {
            host: "127.0.0.1".into(),
            port,
        }));

        match router.serve().await {
            Err(RouterError::Bind { address, source }) => {
                assert_eq!(address, format!("127.0.0.1:{port}"));
                assert_eq!(source.kind(), std::io::ErrorKind::AddrInUse);
            }
            other => panic!("expected bind failure, got {other:?}"),
        }
        assert_eq!(router.state(), RouterState::Idle);

        let stopped = tokio::time::timeout(Duration::from_secs(2), router.shutdown()).await.unwrap();
        assert!(stopped.is_ok());
        assert_eq!(router.state(), RouterState::Stopped);
    }

    #[tokio::test]
    async fn serving_twice_is_rejected() {
        let router = Arc::new(local_router());
        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let serving = router.spawn(first);

        while router.state() == RouterState::Idle {
            tokio::task::yield_now().await;
        }

        let second = TcpListener::bind("127.0.0.1:0").await.unwrap();
        assert!(matches!(router.serve_on(second).await, Err(RouterError::AlreadyServing)));

        router.shutdown().await.unwrap();
        serving.await.unwrap().unwrap();
    }
}
