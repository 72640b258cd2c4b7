//! HTTP surface of the quest engine.
//!
//! | Route                     | Method     | Auth              |
//! |---------------------------|------------|-------------------|
//! | `/api/quests/daily`       | GET        | session           |
//! | `/api/quests/claim-bonus` | POST       | session           |
//! | `/api/wallet`             | GET        | session           |
//! | `/api/shop/purchase`      | POST       | session           |
//! | `/api/cron/reset-quests`  | GET, POST  | cron secret (opt) |
//! | `/healthz`                | GET        | none              |
//!
//! Handlers are thin: SQLite work is pushed onto tokio's blocking pool and errors map to
//! status codes through [`QuestError`](crate::error::QuestError).
use std::{sync::Arc, time::Duration};

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

pub mod auth;
pub mod config;
pub mod routes;
pub mod state;

use crate::error::Result;
use crate::util::database::Database;
use config::Config;
use routes::{
    claim_bonus_handler, daily_quests_handler, healthz_handler, purchase_handler,
    reset_quests_handler, wallet_handler,
};
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/quests/daily", get(daily_quests_handler))
        .route("/api/quests/claim-bonus", post(claim_bonus_handler))
        .route("/api/wallet", get(wallet_handler))
        .route("/api/shop/purchase", post(purchase_handler))
        .route(
            "/api/cron/reset-quests",
            get(reset_quests_handler).post(reset_quests_handler),
        )
        .route("/healthz", get(healthz_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: Config) -> Result<()> {
    info!("Opening database at {}", config.database_path.display());
    let database = Database::open(&config.database_path)?;

    let address = config.address();
    let state = AppState::new(config, database);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

/// Run synchronous storage work off the async workers.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
