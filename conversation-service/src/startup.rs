//! Application startup and lifecycle management.
//!
//! Collaborators are built once here and shared read-only with every
//! request through [`AppState`].

use crate::auth::{IdentityResolver, JwtIdentityResolver};
use crate::config::ConversationConfig;
use crate::handlers;
use crate::services::providers::openai::OpenAiProvider;
use crate::services::providers::{CompletionProvider, CompletionSettings};
use crate::services::{metrics, InMemoryStore, MongoStore, SubscriptionChecker, UsageLimiter};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, security_headers_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityResolver>,
    pub usage: Arc<dyn UsageLimiter>,
    pub subscriptions: Arc<dyn SubscriptionChecker>,
    pub provider: Arc<dyn CompletionProvider>,
    pub completion: CompletionSettings,
}

/// Build the HTTP router for the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/conversation", post(handlers::create_conversation))
        .route("/api/usage", get(handlers::get_usage))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ConversationConfig) -> Result<Self, AppError> {
        metrics::init_metrics();

        let (usage, subscriptions): (Arc<dyn UsageLimiter>, Arc<dyn SubscriptionChecker>) =
            match &config.mongodb {
                Some(mongo) => {
                    let store =
                        MongoStore::connect(&mongo.uri, &mongo.database, config.usage.max_free_calls)
                            .await?;
                    store.initialize_indexes().await?;
                    let store = Arc::new(store);
                    let usage: Arc<dyn UsageLimiter> = store.clone();
                    let subscriptions: Arc<dyn SubscriptionChecker> = store;
                    (usage, subscriptions)
                }
                None => {
                    tracing::warn!("MONGODB_URI not set, using in-memory usage and subscription stores");
                    let store = Arc::new(InMemoryStore::new(config.usage.max_free_calls));
                    let usage: Arc<dyn UsageLimiter> = store.clone();
                    let subscriptions: Arc<dyn SubscriptionChecker> = store;
                    (usage, subscriptions)
                }
            };

        let provider = OpenAiProvider::new(&config.openai)
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
        if provider.is_configured() {
            tracing::info!(model = %config.openai.model, "Initialized OpenAI provider");
        } else {
            tracing::warn!("OPENAI_API_KEY not set, conversation requests will be rejected");
        }
        if config.openai.forward_messages {
            tracing::info!("Caller messages are forwarded to the provider");
        }

        let state = AppState {
            identity: Arc::new(JwtIdentityResolver::new(&config.auth)),
            usage,
            subscriptions,
            provider: Arc::new(provider),
            completion: CompletionSettings::from(&config.openai),
        };

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Conversation service: HTTP on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
