//! HTTP API server

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{require_session, AccessChain, Gatekeeper, SessionCookie, TokenService};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{self, SharedStore};

use super::routes;

/// Application state shared across handlers
pub struct AppState {
    pub store: SharedStore,
    pub gate: Arc<Gatekeeper>,
    pub cookie: SessionCookie,
    pub enforce_ownership_on_writes: bool,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: &Config, store: SharedStore) -> Self {
        let ttl = chrono::Duration::seconds(config.auth.token_ttl_secs);
        let tokens = TokenService::new(config.auth.secret.as_bytes(), ttl);

        Self {
            store,
            gate: Arc::new(Gatekeeper::new(tokens, AccessChain::standard())),
            cookie: SessionCookie::new(
                config.auth.cookie.secure,
                config.auth.cookie.same_site,
                config.auth.token_ttl_secs,
            ),
            enforce_ownership_on_writes: config.auth.enforce_ownership_on_writes,
        }
    }
}

/// Run the HTTP API server until Ctrl-C or SIGTERM
pub async fn run_server(config: Config) -> Result<()> {
    config.validate()?;

    let store = store::connect(&config.store).await?;
    let state = Arc::new(AppState::new(&config, store.clone()));

    if !state.enforce_ownership_on_writes {
        tracing::warn!(
            "auth.enforce_ownership_on_writes is off: create/update/delete accept any caller"
        );
    }

    let app = create_router(state, &config.server.allowed_origins)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Alternative Stocks server listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.close().await;
    served?;

    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: SharedState, allowed_origins: &[String]) -> Result<Router> {
    let reads: Router<SharedState> = Router::new()
        .route("/", get(routes::index))
        .route("/jwt", post(routes::login))
        .route("/logout", post(routes::logout))
        .route("/queries", get(routes::list_queries))
        .route("/myQueries/{key}", get(routes::get_my_queries))
        .route("/recommendation", get(routes::list_recommendations))
        .route("/recommendation/{key}", get(routes::recommendations_by_email));

    let mut writes: Router<SharedState> = Router::new()
        .route("/queries", post(routes::create_query))
        .route(
            "/myQueries/{key}",
            put(routes::update_query).delete(routes::delete_query),
        )
        .route("/recommendation", post(routes::create_recommendation))
        .route("/recommendation/{key}", delete(routes::delete_recommendation));

    if state.enforce_ownership_on_writes {
        writes = writes.route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            require_session,
        ));
    }

    Ok(reads
        .merge(writes)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins)?)
        .with_state(state))
}

/// CORS for the configured frontends, with credentials so the cookie flows
fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| Error::Config(format!("Invalid allowed origin: {}", origin)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE]))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down");
}
