//! Alert Gateway API Server
//!
//! HTTP surface for the alert gateway: alert intake, policy toggles, health,
//! statistics, audit log access and Prometheus metrics.

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub mod error;
pub mod routes;
pub mod settings;

pub use error::{ApiError, ServerError};
pub use settings::{AuditSinkKind, LogFormat, LoggingSettings, Settings, SettingsError};

use alerting::{AlertManager, HttpAlertSender};
use storage::{AuditSink, MemoryAuditLog, NoopAuditSink, SqliteAuditLog};

/// Application state shared across handlers
pub struct AppState {
    /// Alert pipeline
    pub manager: AlertManager,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Render handle for `/metrics`, absent when no recorder is installed
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(manager: AlertManager) -> Self {
        Self {
            manager,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::status::health))
        .route("/alert", post(routes::alerts::send_alert))
        .route("/config", get(routes::policy::get_config))
        .route("/config/enable", post(routes::policy::enable_alerts))
        .route("/config/disable", post(routes::policy::disable_alerts))
        .route("/alert-types", get(routes::policy::alert_types))
        .route("/stats", get(routes::status::stats))
        .route("/test", post(routes::alerts::send_test_alert))
        .route("/reset-rate-limit", post(routes::policy::reset_rate_limit))
        .route("/logs", get(routes::logs::get_logs))
        .route("/metrics", get(routes::status::metrics))
        .fallback(routes::not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(detail).into_response()
}

/// Initialize logging
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), SettingsError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| SettingsError::Logging(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    result.map_err(|e| SettingsError::Logging(e.to_string()))
}

/// Install the global Prometheus recorder
pub fn install_metrics_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder not installed: {}", e);
            None
        }
    }
}

/// Select the audit backend
///
/// An unreachable database degrades to the no-op sink instead of failing
/// startup.
pub async fn build_audit_sink(settings: &Settings) -> Result<Arc<dyn AuditSink>, SettingsError> {
    let sink: Arc<dyn AuditSink> = match settings.audit_sink_kind()? {
        AuditSinkKind::None => Arc::new(NoopAuditSink),
        AuditSinkKind::Memory => Arc::new(MemoryAuditLog::new(settings.audit_memory_capacity)),
        AuditSinkKind::Sqlite => match SqliteAuditLog::open(&settings.database_url).await {
            Ok(log) => {
                info!("Database connection established and table ready");
                Arc::new(log)
            }
            Err(e) => {
                warn!("Database not available, audit logging disabled: {}", e);
                Arc::new(NoopAuditSink)
            }
        },
    };
    Ok(sink)
}

/// Wire the pipeline with the real push client
pub async fn build_state(settings: &Settings) -> Result<AppState, ServerError> {
    let audit = build_audit_sink(settings).await?;
    let sender = Arc::new(HttpAlertSender::new()?);
    let manager = AlertManager::new(settings.alert_config(), sender, audit)?;
    Ok(AppState::new(manager))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}

/// Run the server
pub async fn run_server(
    settings: Settings,
    prometheus: Option<PrometheusHandle>,
) -> Result<(), ServerError> {
    let mut state = build_state(&settings).await?;
    if let Some(handle) = prometheus {
        state = state.with_prometheus(handle);
    }
    let app = create_router(Arc::new(state));

    let addr = settings.listen_address();
    info!("Starting alert gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Alert gateway stopped");
    Ok(())
}
