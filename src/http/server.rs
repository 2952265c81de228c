//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, rate limits)
//! - Own one rate limiter per policy and run its sweeper
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::observability::metrics;
use crate::security::{rate_limit_middleware, RateLimitGate, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GuardConfig>,
}

/// HTTP server for the submission guard.
pub struct GuardServer {
    router: Router,
    config: Arc<GuardConfig>,
    limiters: Vec<(&'static str, Arc<RateLimiter>)>,
}

impl GuardServer {
    /// Create a new server with the given configuration.
    pub fn new(config: GuardConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a server whose rate limiters read time from `clock`.
    pub fn with_clock(config: GuardConfig, clock: Arc<dyn Clock>) -> Self {
        let config = Arc::new(config);
        let api_limiter = Arc::new(RateLimiter::with_clock(clock.clone()));
        let submission_limiter = Arc::new(RateLimiter::with_clock(clock));

        let api_gate = RateLimitGate::new("api", api_limiter.clone(), config.rate_limit.api);
        let submission_gate = RateLimitGate::new(
            "submission",
            submission_limiter.clone(),
            config.rate_limit.submission,
        );

        let state = AppState {
            config: config.clone(),
        };
        let router = Self::build_router(&config, state, api_gate, submission_gate);

        Self {
            router,
            config,
            limiters: vec![("api", api_limiter), ("submission", submission_limiter)],
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &GuardConfig,
        state: AppState,
        api_gate: RateLimitGate,
        submission_gate: RateLimitGate,
    ) -> Router {
        let mut submissions = Router::new()
            .route("/submissions/seal", post(handlers::seal))
            .route("/submissions/verify", post(handlers::verify))
            .route("/submissions/duplicates", post(handlers::duplicates));

        let mut router = Router::new().route("/health", get(handlers::health));

        if config.rate_limit.enabled {
            submissions = submissions.route_layer(middleware::from_fn_with_state(
                submission_gate,
                rate_limit_middleware,
            ));
            router = router
                .merge(submissions)
                .layer(middleware::from_fn_with_state(api_gate, rate_limit_middleware));
        } else {
            router = router.merge(submissions);
        }

        router
            .with_state(state)
            .layer(middleware::from_fn(track_request))
            .layer(DefaultBodyLimit::max(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// A clone of the fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.rate_limit.enabled {
            let interval = self.config.rate_limit.sweep_interval();
            for (name, limiter) in &self.limiters {
                tokio::spawn(limiter.clone().run_sweeper(*name, interval, shutdown.resubscribe()));
            }
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn wait_for(mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
    tracing::info!("Shutdown signal received");
}

/// Log and count every request that reaches the router.
async fn track_request(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status.as_u16(),
        "Request handled"
    );
    metrics::record_request(&method, status.as_u16(), start);
    response
}
