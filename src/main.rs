use jarvis_relay::main_helper::router;
use jarvis_relay::model::{GeminiModel, GenerativeModel};
use jarvis_relay::*;

use clap::Parser;
use std::sync::Arc;

fn load_api_key() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    use tracing_subscriber::prelude::*;

    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => "jarvis_relay=debug,flight_recorder=info,panic=error".into(),
    };

    let file_appender = tracing_appender::rolling::daily(".", "jarvis.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();

    jarvis_relay::logging::setup_panic_hook();

    let args = Arc::new(Args::parse());

    let api_key = match load_api_key() {
        Some(k) => k,
        None => {
            eprintln!("Error: GEMINI_API_KEY (or API_KEY) environment variable is missing or empty.");
            eprintln!("Please set it in your .env file or environment.");
            std::process::exit(1);
        }
    };

    let client = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(args.request_timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(args.connect_timeout_secs))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(std::time::Duration::from_secs(60)))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let model: Arc<dyn GenerativeModel> = Arc::new(
        GeminiModel::new(client.clone(), api_key, args.model_name.clone())
            .with_base_url(&args.gemini_base_url),
    );

    let state = match AppState::build(args.clone(), model, client) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Model {} with {} tools, max {} turns, {} retries",
        args.model_name,
        state.registry.len(),
        state.engine.max_turns(),
        args.max_retries
    );

    if let Some(ttl) = args.session_idle_ttl() {
        state.sessions.spawn_idle_sweep(ttl);
    }

    let app = router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("J.A.R.V.I.S. relay listening on {}", addr);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
