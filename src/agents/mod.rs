//! The support agents.
//!
//! Each agent is a directive template plus a set of local tools. The
//! orchestrator sits on top and exposes the agents to the model as tools.

pub mod orchestrator;
pub mod tools;

use tracing::{info, instrument};

use crate::{
    base::{
        model::{AgentKind, ChatTurn},
        prompts::render_directive,
        types::{AgentContext, Res},
    },
    runtime::Runtime,
};

/// Run one agent to completion and return its reply.
///
/// The directive is rendered with the current settings, and a completed task
/// is recorded for the agent once it answers.
#[instrument(skip(runtime, message, history))]
pub async fn run_agent(runtime: &Runtime, kind: AgentKind, message: &str, history: &[ChatTurn]) -> Res<String> {
    let settings = runtime.db.get_settings().await?;
    let offered = tools::tools_for(kind, &settings);

    let context = AgentContext {
        agent: kind.tool_name().to_string(),
        directive: render_directive(runtime.config.agent_directive(kind), &settings),
        history: history.to_vec(),
        user_message: message.to_string(),
        tools: offered.iter().map(|tool| tool.spec()).collect(),
    };

    let callback = tools::tool_callback(runtime.db.clone(), settings, offered);
    let reply = runtime.llm.get_agent_response(&context, callback).await?;

    runtime.db.record_agent_task(kind).await?;

    info!("Agent `{}` replied.", kind);

    Ok(reply)
}

// Tests.
