//! # Server Configuration
//!
//! Router construction, shared state and the OpenAPI document.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::alerts::{
    BackingStore, ConfigurationStore, FileBackingStore, MemoryBackingStore, OverrideManager,
    StaticEntityGraph,
};
use crate::config::{AppConfig, StorageBackend};
use crate::db;
use crate::handlers;
use crate::repositories::AlertConfigurationRepository;
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Manager bound to the configured default user; handlers rebind per request.
    pub manager: OverrideManager,
    /// Present only when the store is database-backed.
    pub db: Option<DatabaseConnection>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/api/v1/alert-types",
            get(handlers::alert_types::list_alert_types),
        )
        .route(
            "/api/v1/alert-types/{alert_type}/schema",
            get(handlers::alert_types::get_alert_type_schema),
        )
        .route(
            "/api/v1/alert-types/{alert_type}/configs",
            get(handlers::alert_types::list_alert_type_configs),
        )
        .route(
            "/api/v1/alert-types/{alert_type}/validate",
            post(handlers::alert_types::validate_alert_config),
        )
        .route(
            "/api/v1/alert-configs/{level}/{entity_id}",
            get(handlers::alert_configs::list_scope_configs),
        )
        .route(
            "/api/v1/alert-configs/{level}/{entity_id}/{alert_type}",
            get(handlers::alert_configs::get_effective_config)
                .put(handlers::alert_configs::save_config)
                .delete(handlers::alert_configs::delete_config),
        )
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

impl AppState {
    /// Wire the configured backing store, hydrate the configuration store and
    /// load the entity graph.
    pub async fn initialize(config: AppConfig) -> anyhow::Result<Self> {
        let (backing, db): (Arc<dyn BackingStore>, Option<DatabaseConnection>) =
            match config.storage_backend {
                StorageBackend::Memory => (Arc::new(MemoryBackingStore::new()), None),
                StorageBackend::File => (
                    Arc::new(FileBackingStore::new(config.storage_file_path.clone())),
                    None,
                ),
                StorageBackend::Database => {
                    let conn = db::init_and_migrate(&config)
                        .await
                        .context("initializing database")?;
                    (
                        Arc::new(AlertConfigurationRepository::new(Arc::new(conn.clone()))),
                        Some(conn),
                    )
                }
            };

        let store = ConfigurationStore::hydrate(backing)
            .await
            .context("loading saved alert configurations")?;
        tracing::info!(
            backend = %config.storage_backend,
            records = store.len(),
            "Configuration store ready"
        );

        let graph = load_entity_graph(&config).await?;
        let manager = OverrideManager::new(
            Arc::new(store),
            Arc::new(graph),
            config.default_user_id.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            manager,
            db,
        })
    }
}

async fn load_entity_graph(config: &AppConfig) -> anyhow::Result<StaticEntityGraph> {
    let Some(path) = config.entity_graph_path.as_ref() else {
        tracing::warn!("No entity graph configured; assets and jobs resolve straight to the user");
        return Ok(StaticEntityGraph::default());
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading entity graph {}", path.display()))?;
    let graph: StaticEntityGraph = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing entity graph {}", path.display()))?;
    tracing::info!(
        assets = graph.assets.len(),
        jobs = graph.jobs.len(),
        "Loaded entity graph"
    );
    Ok(graph)
}

/// Starts the server with the given state
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_addr()?;
    let profile = state.config.profile.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::alert_types::list_alert_types,
        crate::handlers::alert_types::get_alert_type_schema,
        crate::handlers::alert_types::validate_alert_config,
        crate::handlers::alert_types::list_alert_type_configs,
        crate::handlers::alert_configs::get_effective_config,
        crate::handlers::alert_configs::save_config,
        crate::handlers::alert_configs::delete_config,
        crate::handlers::alert_configs::list_scope_configs,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::handlers::alert_types::AlertTypeSummary,
            crate::handlers::alert_types::AlertTypesResponse,
            crate::handlers::alert_types::AlertTypeConfigsResponse,
            crate::handlers::alert_configs::EffectiveConfigResponse,
            crate::handlers::alert_configs::DeleteConfigResponse,
            crate::handlers::alert_configs::ScopeConfigsResponse,
            crate::alerts::types::RuleConfig,
            crate::alerts::types::ConfigurationRecord,
            crate::alerts::types::EffectiveConfig,
            crate::alerts::types::OverrideStatus,
            crate::alerts::validator::ValidationReport,
            crate::error::ApiError,
        )
    ),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "alert-types", description = "Alert type catalog and field schemas"),
        (name = "alert-configs", description = "Hierarchical alert configuration"),
    ),
    info(
        title = "Alert Configuration API",
        description = "Hierarchical alert rule configuration across users, sites, assets and jobs",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
