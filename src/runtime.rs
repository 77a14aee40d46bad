//! Runtime services and shared state for the support desk.

use tracing::{instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{db::DbClient, http, llm::LlmClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the database client, LLM client, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The database client instance.
    pub db: DbClient,
    /// The LLM client instance.
    pub llm: LlmClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the database.
        let db = DbClient::surreal_memory(&config).await?;

        // Initialize the LLM client.
        let llm = if config.has_openai_api_key() {
            LlmClient::openai(&config)
        } else {
            warn!("No OpenAI API key is configured; the chat endpoints will fail until one is set.");
            LlmClient::unconfigured()
        };

        Ok(Self { config, db, llm })
    }

    /// Serve the HTTP API until shutdown.
    pub async fn start(&self) -> Void {
        http::serve(self.clone()).await
    }
}
