use listing_wizard::config::AppConfig;
use listing_wizard::wizard::{SessionRegistry, SessionTemplate};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Session registry whose sessions submit to the configured backend.
pub(crate) fn session_registry(config: &AppConfig) -> Arc<SessionRegistry> {
    let template = SessionTemplate::from_config(&config.submission, config.environment);
    Arc::new(SessionRegistry::new(template))
}
