mod agent;
mod asr;
mod config;
mod conversations;
mod error;
mod routes;
mod state;

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "interview_backend=debug,tower_http=debug".to_string()),
        )
        .init();

    let config = Config::from_env()?;
    let state = AppState::new(config.clone())?;

    let origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS origin: {}", config.allowed_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("invalid bind host: {}", config.host))?;
    let addr = SocketAddr::from((host, config.port));
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
