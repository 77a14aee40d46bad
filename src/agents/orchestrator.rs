//! The orchestrator: an agent whose tools are the other agents.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    base::{
        model::{AgentKind, ChatTurn, Settings},
        prompts::render_directive,
        types::{AgentContext, Res, SubAgentCallArgs, ToolCall, ToolOutput, ToolSpec},
    },
    runtime::Runtime,
    service::llm::{ToolCallback, ToolFuture},
};

use super::run_agent;

const ORCHESTRATOR_AGENT_NAME: &str = "Orchestrator";

/// The orchestrated answer to a customer message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorReply {
    pub reply: String,
    /// The last sub-agent that answered, if any did.
    pub agent: Option<AgentKind>,
}

/// The sub-agents the orchestrator may route to under the current settings.
pub fn routable_agents(settings: &Settings) -> Vec<AgentKind> {
    AgentKind::ALL.into_iter().filter(|kind| settings.is_routable(*kind)).collect()
}

/// The tool schema of a sub-agent.
pub fn sub_agent_spec(kind: AgentKind) -> ToolSpec {
    ToolSpec {
        name: kind.tool_name().to_string(),
        description: format!("Agente de {}: {}.", kind.display_name(), kind.description()),
        parameters: json!({
            "type": "object",
            "properties": {
                "request": { "type": "string", "description": "A mensagem do cliente e o contexto necessário." }
            },
            "required": ["request"],
            "additionalProperties": false
        }),
    }
}

/// Route a customer message through the orchestrator.
///
/// Sub-agent calls run one at a time. When the orchestrator's own answer is
/// blank, the last sub-agent reply is returned as is.
#[instrument(skip_all)]
pub async fn run_orchestrator(runtime: &Runtime, message: &str, history: &[ChatTurn]) -> Res<OrchestratorReply> {
    let settings = runtime.db.get_settings().await?;
    let offered = routable_agents(&settings);

    let context = AgentContext {
        agent: ORCHESTRATOR_AGENT_NAME.to_string(),
        directive: render_directive(&runtime.config.orchestrator_agent_directive, &settings),
        history: history.to_vec(),
        user_message: message.to_string(),
        tools: offered.iter().map(|kind| sub_agent_spec(*kind)).collect(),
    };

    let last_reply = Arc::new(Mutex::new(None));
    let callback = sub_agent_callback(runtime.clone(), offered, last_reply.clone());

    let reply = runtime.llm.get_agent_response(&context, callback).await?;
    let last_reply = last_reply.lock().map_err(|_| anyhow::anyhow!("Sub-agent reply lock poisoned."))?.take();

    match (reply.trim().is_empty(), last_reply) {
        (false, last) => Ok(OrchestratorReply {
            reply,
            agent: last.map(|(kind, _)| kind),
        }),
        (true, Some((kind, text))) => {
            info!("Orchestrator answer was blank, using the `{}` reply.", kind);
            Ok(OrchestratorReply { reply: text, agent: Some(kind) })
        }
        (true, None) => Err(anyhow::anyhow!("The orchestrator produced no reply.")),
    }
}

type LastReply = Arc<Mutex<Option<(AgentKind, String)>>>;

fn sub_agent_callback(runtime: Runtime, offered: Vec<AgentKind>, last_reply: LastReply) -> ToolCallback {
    let offered = Arc::new(offered);

    Box::new(move |calls| -> ToolFuture {
        let runtime = runtime.clone();
        let offered = offered.clone();
        let last_reply = last_reply.clone();

        Box::pin(
            async move {
                let mut outputs = Vec::with_capacity(calls.len());

                for call in calls {
                    let output = run_sub_agent(&runtime, &offered, &last_reply, &call).await;
                    outputs.push(ToolOutput { call_id: call.call_id, output });
                }

                Ok(outputs)
            }
            .in_current_span(),
        )
    })
}

/// Run the sub-agent a tool call names, returning the tool output text.
async fn run_sub_agent(runtime: &Runtime, offered: &[AgentKind], last_reply: &LastReply, call: &ToolCall) -> String {
    let Some(kind) = AgentKind::from_tool_name(&call.name).filter(|kind| offered.contains(kind)) else {
        warn!("Orchestrator called unavailable agent `{}`.", call.name);
        return format!("Erro: o agente `{}` não está disponível.", call.name);
    };

    let args: SubAgentCallArgs = match serde_json::from_str(&call.arguments) {
        Ok(args) => args,
        Err(err) => {
            warn!("Invalid arguments for agent `{}`: {}", call.name, err);
            return format!("Erro: argumentos inválidos para o agente `{}`: {err}", call.name);
        }
    };

    info!("Routing to agent `{}` ...", kind);

    match run_agent(runtime, kind, &args.request, &[]).await {
        Ok(reply) => {
            if let Ok(mut last) = last_reply.lock() {
                *last = Some((kind, reply.clone()));
            }

            reply
        }
        Err(err) => {
            error!("Agent `{}` failed: {}", kind, err);
            format!("Erro ao executar o agente `{}`: {err}", call.name)
        }
    }
}

// Tests.
