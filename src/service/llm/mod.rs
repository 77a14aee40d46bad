//! Integration with Large Language Model services.
//!
//! This module provides a thin wrapper around LLM clients (e.g., OpenAI)
//! for running a single agent turn: a system directive, the conversation so
//! far, and a set of tools the model may call before it answers.
//!
//! The module defines the `GenericLlmClient` trait that can be implemented
//! for different LLM providers, with a default implementation for OpenAI.

pub mod openai;

use std::{ops::Deref, pin::Pin, sync::Arc};

use async_trait::async_trait;
use tracing::instrument;

use crate::base::types::{AgentContext, Res, ToolCall, ToolOutput};

// Types.

/// The pending outputs of one batch of tool calls.
pub type ToolFuture = Pin<Box<dyn Future<Output = Res<Vec<ToolOutput>>> + Send>>;

/// Executes the tool calls of one model response, returning the outputs to send back.
pub type ToolCallback = Box<dyn Fn(Vec<ToolCall>) -> ToolFuture + Send + Sync>;

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the core functionality for interacting with large language models.
/// Implementing this trait allows different LLM providers to be used with the support desk.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Run an agent to completion and return its final text.
    ///
    /// Whenever the model asks for tools, the callback executes them and the
    /// outputs are sent back to the model, until it answers with text.
    async fn get_agent_response(&self, context: &AgentContext, tool_callback: ToolCallback) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }

    /// A client for running without an API key: every call fails.
    pub fn unconfigured() -> Self {
        Self { inner: Arc::new(UnconfiguredLlmClient) }
    }
}

// Specific implementations.

/// Stand-in client used when no API key is configured.
struct UnconfiguredLlmClient;

#[async_trait]
impl GenericLlmClient for UnconfiguredLlmClient {
    #[instrument(name = "UnconfiguredLlmClient::get_agent_response", skip_all, fields(agent = %context.agent))]
    async fn get_agent_response(&self, context: &AgentContext, _tool_callback: ToolCallback) -> Res<String> {
        Err(anyhow::anyhow!("No OpenAI API key is configured; cannot run agent `{}`.", context.agent))
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_fails() {
        let client = LlmClient::unconfigured();
        let context = AgentContext {
            agent: "InitialContactAgent".to_string(),
            ..Default::default()
        };

        let result = client.get_agent_response(&context, Box::new(|_| -> ToolFuture { Box::pin(async { Ok(Vec::new()) }) })).await;

        assert!(result.unwrap_err().to_string().contains("InitialContactAgent"));
    }
}
