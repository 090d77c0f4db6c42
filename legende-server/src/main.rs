mod api;
mod engine;
mod handlers;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "legende-server",
    about = "Image captioning service with English→French translation and word tags"
)]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Use CPU even if a GPU is available
    #[arg(long)]
    cpu: bool,
}

/// Shared state: a handle to the inference engine thread.
pub struct AppState {
    pub engine: engine::EngineHandle,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    // Loads both models before binding; a load failure aborts startup.
    let engine = engine::spawn(args.cpu)?;
    let state = Arc::new(AppState { engine });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", args.host, args.port)).await?;
    let local_addr = listener.local_addr()?;

    info!("Models loaded, serving on http://{}", local_addr);
    println!("  POST  http://{local_addr}/caption-image/");
    println!("  GET   http://{local_addr}/health");

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/caption-image/", post(handlers::caption_image))
        .with_state(state)
}
