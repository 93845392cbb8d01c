//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router whose fallback runs every request through the dispatcher
//! - Wire up middleware (request ID, tracing, timeout)
//! - Hand non-action requests and form-action continuations to the page renderer
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::actions::manifest::ActionModuleResolver;
use crate::actions::registry::ModuleRegistry;
use crate::actions::{ActionDispatcher, Dispatch};
use crate::config::ServerConfig;
use crate::http::request::X_REQUEST_ID;
use crate::lifecycle::Shutdown;
use crate::render::{FlightRenderer, JsonFlightRenderer, PageRenderer};

/// The application served: where actions live and how pages render.
#[derive(Clone)]
pub struct ActionApp {
    pub manifest: Arc<dyn ActionModuleResolver>,
    pub modules: Arc<ModuleRegistry>,
    pub flight: Arc<dyn FlightRenderer>,
    pub pages: Arc<dyn PageRenderer>,
}

impl ActionApp {
    /// App with the JSON flight renderer.
    pub fn new(
        manifest: Arc<dyn ActionModuleResolver>,
        modules: Arc<ModuleRegistry>,
        pages: Arc<dyn PageRenderer>,
    ) -> Self {
        Self {
            manifest,
            modules,
            flight: Arc::new(JsonFlightRenderer),
            pages,
        }
    }

    pub fn with_flight(mut self, flight: Arc<dyn FlightRenderer>) -> Self {
        self.flight = flight;
        self
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ActionDispatcher>,
    pub pages: Arc<dyn PageRenderer>,
}

/// HTTP server for the action runtime.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: ServerConfig, app: ActionApp) -> Self {
        let dispatcher = ActionDispatcher::new(config.clone(), app.manifest, app.modules, app.flight);
        let state = AppState {
            dispatcher: Arc::new(dispatcher),
            pages: app.pages,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request id, trace, timeout, request id propagation.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID));

        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(layers)
    }

    /// The router, for serving elsewhere or driving with `oneshot` in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            runtime = self.config.actions.runtime.as_str(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Runs the dispatcher and falls back to the page renderer.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    match state.dispatcher.dispatch(request).await {
        Dispatch::NotAction(request) => {
            let (parts, _) = request.into_parts();
            state.pages.render(parts, false).await
        }
        Dispatch::RenderPage { parts, head } => {
            let mut response = state.pages.render(parts, false).await;
            head.apply(&mut response);
            response
        }
        Dispatch::NotFound { parts, head } => {
            let mut response = state.pages.render(parts, true).await;
            head.apply(&mut response);
            response
        }
        Dispatch::Done(response) => response,
        Dispatch::Failed { error, head } => {
            tracing::warn!(request_id = %request_id, error = %error, "Server action request failed");
            let mut response = error.into_response();
            head.apply(&mut response);
            response
        }
    }
}
