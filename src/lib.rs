//! Library root for `support-desk`.
//!
//! Support-desk is a multi-agent customer support chatbot designed to:
//! - Answer frequent questions and collect customer details
//! - Diagnose order problems through the (simulated) order system
//! - Escalate complex cases to the human support team
//! - Ask for feedback and classify its sentiment
//!
//! An orchestrator agent routes each customer message to one of the four
//! specialised agents, which it sees as tools. The service is exposed over
//! HTTP with axum, keeps its tickets, agents, settings, and conversations in
//! an embedded SurrealDB, and uses OpenAI for the agents themselves.

pub mod agents;
pub mod base;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the support-desk runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the database and LLM clients
/// - Serves the HTTP API until shutdown
pub async fn start(config: Config) -> Void {
    info!("Starting support-desk ...");

    // Start the crypto provider; it may already be installed.
    let _ = crypto::ring::default_provider().install_default();

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
