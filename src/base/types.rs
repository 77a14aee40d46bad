use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::ChatTurn;

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// A tool the model may call, described as a JSON schema function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    /// Raw JSON arguments, as produced by the model.
    pub arguments: String,
}

/// The result of executing a [`ToolCall`], fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub call_id: String,
    pub output: String,
}

/// Everything the LLM client needs to run one agent turn.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    /// Agent name, used for logging and tracing only.
    pub agent: String,
    /// The rendered system directive.
    pub directive: String,
    /// Prior conversation turns, oldest first.
    pub history: Vec<ChatTurn>,
    pub user_message: String,
    pub tools: Vec<ToolSpec>,
}

/// Arguments for the sub-agent tools exposed to the orchestrator.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubAgentCallArgs {
    pub request: String,
}
