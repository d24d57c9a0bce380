use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit};
use db::DBService;
use services::services::{
    claude_api::ClaudeApiClient,
    document_store::DocumentStore,
    loading_optimizer::{LoadingError, LoadingOptimizer},
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod routes;

use config::ServerConfig;

/// Log directives used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_DIRECTIVES: &str = "info,trucktetris_server=debug,services=debug";

/// Shared handler state. Cloned per request; every field is a handle.
#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub documents: DocumentStore,
    pub optimizer: Option<LoadingOptimizer>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Open the database, prepare the document directory and, when an API
    /// key is configured, the model client.
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let db = DBService::new(&config.database_url).await?;

        let documents = DocumentStore::new(&config.document_dir);
        documents.ensure_root().await?;

        let optimizer = match &config.claude {
            Some(claude) => {
                let client = ClaudeApiClient::new(claude.clone())?;
                info!(model = %client.model(), "Claude client configured");
                Some(LoadingOptimizer::new(Arc::new(client)).with_max_tokens(config.max_tokens))
            }
            None => {
                warn!("ANTHROPIC_API_KEY is not set; loading optimization is disabled");
                None
            }
        };

        Ok(Self {
            db,
            documents,
            optimizer,
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    pub fn optimizer(&self) -> Result<&LoadingOptimizer, LoadingError> {
        self.optimizer
            .as_ref()
            .ok_or_else(|| LoadingError::Configuration("ANTHROPIC_API_KEY is not set".to_string()))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router(&state))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
