//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;

use docqa_agent::Orchestrator;
use docqa_config::Settings;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub orchestrator: Arc<Orchestrator>,
    /// Prometheus handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
    /// Root token; cancelled on shutdown, parent of every request's token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Settings, orchestrator: Orchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            metrics: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}
