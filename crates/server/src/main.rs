//! docqa server entry point

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use docqa_agent::Orchestrator;
use docqa_config::{load_settings, Settings};
use docqa_core::Retriever;
use docqa_llm::LlmFactory;
use docqa_rag::LexicalRetriever;
use docqa_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.toml > config/default.toml > defaults
    let env = std::env::var("DOCQA_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        },
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&config);

    tracing::info!("Starting docqa server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let retriever = init_retriever(&config);
    let generator = LlmFactory::create(&config.generation).context("creating generator backend")?;
    let orchestrator = Orchestrator::from_settings(&config, retriever, generator)
        .context("building orchestrator")?;

    let shutdown = CancellationToken::new();
    let mut state = AppState::new(config.clone(), orchestrator).with_shutdown(shutdown.clone());

    if config.observability.metrics_enabled {
        match init_metrics() {
            Ok(handle) => {
                tracing::info!("Initialized Prometheus metrics at /metrics");
                state = state.with_metrics(handle);
            },
            Err(e) => tracing::warn!(error = %e, "Failed to install metrics recorder"),
        }
    }

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Knowledge index from `retrieval.knowledge_path`; empty (web-only mode) when absent
fn init_retriever(config: &Settings) -> Arc<dyn Retriever> {
    let path = Path::new(&config.retrieval.knowledge_path);
    match LexicalRetriever::load(path) {
        Ok(retriever) if retriever.is_empty() => {
            tracing::warn!(
                path = %path.display(),
                "No knowledge documents found, answering from the web only"
            );
            Arc::new(retriever)
        },
        Ok(retriever) => {
            tracing::info!(
                path = %path.display(),
                chunks = retriever.len(),
                "Knowledge base loaded"
            );
            Arc::new(retriever)
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Knowledge base unavailable, answering from the web only"
            );
            Arc::new(LexicalRetriever::empty())
        },
    }
}

/// Wait for Ctrl+C or SIGTERM, then cancel every in-flight query
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown.cancel();
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        [
            "docqa",
            "docqa_agent",
            "docqa_web",
            "docqa_llm",
            "docqa_rag",
            "docqa_server",
        ]
        .iter()
        .map(|target| format!("{target}={level}"))
        .chain(std::iter::once("tower_http=debug".to_string()))
        .collect::<Vec<_>>()
        .join(",")
        .into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
