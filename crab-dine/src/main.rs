//! crab-dine: restaurant directory service
//!
//! - `/admin`: restaurant CRUD behind a shared admin key
//! - `/recommend`: currently-open restaurants matching simple filters
//! - `/health`: liveness probe
//!
//! Runs as an AWS Lambda function when started by the Lambda runtime,
//! otherwise as a plain HTTP server.

mod api;
mod audit;
mod config;
mod filter;
mod request;
mod restaurants;
mod secrets;
mod state;
mod store;

#[cfg(test)]
mod testing;

use config::Config;
use state::AppState;
use std::sync::Arc;
use tracing::info;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    init_tracing(config::on_lambda());

    let config = Config::from_env();

    let state = Arc::new(AppState::new(&config).await);
    info!(
        store = ?config.record_store,
        audit = ?config.audit_sink,
        fallback = state.fallback.len(),
        "crab-dine state ready"
    );

    let app = api::router(state);

    if config.on_lambda {
        info!("crab-dine Lambda handler ready");
        return lambda_http::run(app).await;
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("crab-dine HTTP listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(on_lambda: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crab_dine=info,tower_http=info".into());
    if on_lambda {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .without_time() // CloudWatch adds timestamps
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
