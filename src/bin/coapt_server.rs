//! coapt REST API server.
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/coapt ANTHROPIC_API_KEY=... cargo run --bin coapt_server
//!
//! curl -X POST http://localhost:3000/api/chat \
//!   -H "Content-Type: application/json" \
//!   -d '{"message": "2br in Chelsea under $4000", "threadId": "t1"}'
//!
//! curl -X POST http://localhost:3000/api/analytics/chat \
//!   -H "Content-Type: application/json" \
//!   -d '{"message": "median rent by borough", "threadId": "t1"}'
//! ```

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use coapt::analytics::AnalyticsAgent;
use coapt::api::{create_router, ApiState};
use coapt::llm::AnthropicClient;
use coapt::search::SearchAgent;
use coapt::store::pg::PgListingStore;
use coapt::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coapt=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;
    info!(database_url = %config.database_url, "database connection established");

    let llm = Arc::new(AnthropicClient::with_model(
        config.anthropic_api_key.clone(),
        &config.model,
    ));
    let store = Arc::new(PgListingStore::new(pool));

    let search = Arc::new(SearchAgent::new(llm.clone(), store.clone()));
    let analytics = Arc::new(AnalyticsAgent::new(llm, store));

    let app = create_router(ApiState::new(search, analytics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, model = %config.model, "coapt server listening");

    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}
