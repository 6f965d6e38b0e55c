use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voice_journal::auth::verifier_from_config;
use voice_journal::{create_router, AppState, Config, HttpSettings, NatsRecognizer};

/// Streaming transcription relay for the voice journal
#[derive(Parser, Debug)]
#[command(name = "voice-journal")]
#[command(about = "Relay voice journal audio to a speech recognizer", long_about = None)]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/voice-journal")]
    config: String,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    init_tracing(cfg.service.log_json);

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Recognizer: NATS at {}", cfg.recognizer.nats_url);
    info!(
        "Recognition: {} Hz, {}, {}",
        cfg.recognizer.sample_rate, cfg.recognizer.language_code, cfg.recognizer.encoding
    );
    if cfg.auth.tokens.is_empty() {
        info!("Authentication disabled (no tokens configured)");
    }

    let recognizer = Arc::new(NatsRecognizer::new(
        cfg.recognizer.nats_url.clone(),
        cfg.recognizer.drain_timeout(),
    ));

    let state = AppState::new(recognizer)
        .with_verifier(verifier_from_config(&cfg.auth))
        .with_settings(HttpSettings::from_config(&cfg));

    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shut down");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,voice_journal=debug,tower_http=debug"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
