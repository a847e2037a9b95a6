// src/main.rs

use std::env;

use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::{Pool, Postgres};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod loyalty;
mod models;
mod notify;
mod pricing;
mod routes;
mod workflow;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub loyalty: config::LoyaltyConfig,
    pub notifier: notify::Notifier,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let pool = db::connect().await?;
    let state = AppState {
        pool,
        loyalty: config::LoyaltyConfig::from_env(),
        notifier: notify::Notifier::new()?,
    };

    // Very permissive CORS for local dev (tighten for prod)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // health
        .route("/health", get(routes::health::health))
        // tickets
        .route(
            "/api/v1/tickets",
            post(routes::tickets::create_ticket).get(routes::tickets::list_tickets),
        )
        .route(
            "/api/v1/tickets/:id",
            get(routes::tickets::get_ticket)
                .patch(routes::tickets::patch_ticket)
                .delete(routes::tickets::delete_ticket),
        )
        // workflow
        .route("/api/v1/tickets/:id/status", post(routes::status::change_status))
        .route("/api/v1/tickets/:id/paid", patch(routes::status::set_paid))
        // audit trail
        .route(
            "/api/v1/tickets/:id/history",
            post(routes::history::append_note).get(routes::history::list_history),
        )
        // loyalty
        .route("/api/v1/clients/:id/loyalty", get(routes::loyalty::get_loyalty_state))
        .route("/api/v1/clients/:id/redeem", post(routes::loyalty::redeem))
        // pricing
        .route("/api/v1/pricing/retail", post(routes::pricing::retail_price))
        // state & middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("API listening on {addr}");

    axum::serve(listener, api.into_make_service()).await?;
    Ok(())
}
