mod app;
mod auth;
mod config;
mod error;
mod state;
mod users;

use crate::app::{build_app, serve};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "userstore=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::from_env();

    // Create the users table if it does not exist yet
    let mut store = state.store();
    if store.connect().await {
        if !store.ensure_schema().await {
            tracing::warn!("schema setup failed; continuing");
        }
        store.disconnect().await;
    } else {
        tracing::warn!("database unreachable at startup; continuing");
    }

    let app = build_app(state);
    serve(app).await
}
