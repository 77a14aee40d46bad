//! Local tools the agents may call.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{Instrument, info, instrument, warn};

use crate::{
    base::{
        model::{AgentKind, NewTicket, Settings, TicketPriority, TicketStatus},
        simulation,
        types::{Res, ToolCall, ToolOutput, ToolSpec},
    },
    service::{
        db::DbClient,
        llm::{ToolCallback, ToolFuture},
    },
};

// Arguments.

#[derive(Debug, Deserialize)]
struct SearchFaqArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct CheckOrderStatusArgs {
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateHumanSupportTicketArgs {
    summary: String,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequestCustomerFeedbackArgs {
    customer_id: String,
    case_id: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzeFeedbackSentimentArgs {
    feedback_text: String,
}

// Tools.

/// The mock back-office tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalTool {
    SearchFaq,
    CheckOrderStatus,
    CreateHumanSupportTicket,
    RequestCustomerFeedback,
    AnalyzeFeedbackSentiment,
}

impl LocalTool {
    pub fn name(&self) -> &'static str {
        match self {
            LocalTool::SearchFaq => "search_faq",
            LocalTool::CheckOrderStatus => "check_order_status",
            LocalTool::CreateHumanSupportTicket => "create_human_support_ticket",
            LocalTool::RequestCustomerFeedback => "request_customer_feedback",
            LocalTool::AnalyzeFeedbackSentiment => "analyze_feedback_sentiment",
        }
    }

    /// The function schema sent to the model.
    pub fn spec(&self) -> ToolSpec {
        let (description, parameters) = match self {
            LocalTool::SearchFaq => (
                "Busca uma resposta na base de perguntas frequentes (FAQ).",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "A pergunta do cliente." }
                    },
                    "required": ["query"],
                    "additionalProperties": false
                }),
            ),
            LocalTool::CheckOrderStatus => (
                "Consulta o status de um pedido no sistema de pedidos.",
                json!({
                    "type": "object",
                    "properties": {
                        "order_id": { "type": "string", "description": "O número do pedido, com 5 dígitos." }
                    },
                    "required": ["order_id"],
                    "additionalProperties": false
                }),
            ),
            LocalTool::CreateHumanSupportTicket => (
                "Cria um ticket de suporte para a equipe humana e retorna o número do ticket.",
                json!({
                    "type": "object",
                    "properties": {
                        "summary": { "type": "string", "description": "Resumo do problema do cliente." },
                        "customer_name": { "type": ["string", "null"], "description": "Nome do cliente, se conhecido." },
                        "order_id": { "type": ["string", "null"], "description": "Número do pedido, se conhecido." }
                    },
                    "required": ["summary", "customer_name", "order_id"],
                    "additionalProperties": false
                }),
            ),
            LocalTool::RequestCustomerFeedback => (
                "Envia ao cliente uma solicitação de avaliação do atendimento.",
                json!({
                    "type": "object",
                    "properties": {
                        "customer_id": { "type": "string" },
                        "case_id": { "type": "string" }
                    },
                    "required": ["customer_id", "case_id"],
                    "additionalProperties": false
                }),
            ),
            LocalTool::AnalyzeFeedbackSentiment => (
                "Classifica o sentimento de um feedback como Positivo, Negativo ou Neutro.",
                json!({
                    "type": "object",
                    "properties": {
                        "feedback_text": { "type": "string" }
                    },
                    "required": ["feedback_text"],
                    "additionalProperties": false
                }),
            ),
        };

        ToolSpec {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Run the tool with the model's raw JSON arguments.
    #[instrument(skip(db, settings, arguments), fields(tool = self.name()))]
    pub async fn execute(&self, db: &DbClient, settings: &Settings, arguments: &str) -> Res<String> {
        match self {
            LocalTool::SearchFaq => {
                let args: SearchFaqArgs = serde_json::from_str(arguments)?;

                Ok(simulation::search_faq(&args.query).to_string())
            }
            LocalTool::CheckOrderStatus => {
                let args: CheckOrderStatusArgs = serde_json::from_str(arguments)?;
                let report = simulation::check_order_status(&args.order_id);

                Ok(serde_json::to_string(&report)?)
            }
            LocalTool::CreateHumanSupportTicket => {
                let args: CreateHumanSupportTicketArgs = serde_json::from_str(arguments)?;

                let customer = args.customer_name.filter(|name| !name.trim().is_empty()).unwrap_or_else(|| "Cliente".to_string());
                let subject = match args.order_id.as_deref().map(str::trim) {
                    Some(order_id) if !order_id.is_empty() => format!("Escalonamento do pedido {order_id}"),
                    _ => "Escalonamento de atendimento".to_string(),
                };

                let ticket = db
                    .create_ticket(NewTicket {
                        customer,
                        subject,
                        message: args.summary,
                        status: TicketStatus::Escalated,
                        priority: TicketPriority::High,
                    })
                    .await?;

                if settings.notify_escalated_tickets {
                    info!("Notifying the support team of escalated ticket `{}`.", ticket.id);
                }

                Ok(format!(
                    "Ticket de suporte humano SUP-{} criado. Nossa equipe entrará em contato em breve pelo {}.",
                    ticket.id, settings.contact_email
                ))
            }
            LocalTool::RequestCustomerFeedback => {
                let args: RequestCustomerFeedbackArgs = serde_json::from_str(arguments)?;

                info!("Requesting feedback from customer `{}` for case `{}`.", args.customer_id, args.case_id);

                Ok(format!("Solicitação de feedback enviada ao cliente {} para o caso {}.", args.customer_id, args.case_id))
            }
            LocalTool::AnalyzeFeedbackSentiment => {
                let args: AnalyzeFeedbackSentimentArgs = serde_json::from_str(arguments)?;
                let sentiment = simulation::analyze_sentiment(&args.feedback_text);

                Ok(json!({ "sentiment": sentiment }).to_string())
            }
        }
    }
}

/// The tools offered to an agent under the current settings.
pub fn tools_for(kind: AgentKind, settings: &Settings) -> Vec<LocalTool> {
    match kind {
        AgentKind::Atendimento => vec![LocalTool::SearchFaq],
        AgentKind::Diagnostico => vec![LocalTool::CheckOrderStatus],
        AgentKind::Escalonamento => vec![LocalTool::CreateHumanSupportTicket],
        AgentKind::Feedback if settings.sentiment_analysis => vec![LocalTool::RequestCustomerFeedback, LocalTool::AnalyzeFeedbackSentiment],
        AgentKind::Feedback => vec![LocalTool::RequestCustomerFeedback],
    }
}

/// Execute tool calls in order.
///
/// Failures, and calls to tools that were not offered, are reported back to
/// the model as the tool output rather than aborting the agent.
pub async fn execute_all(db: &DbClient, settings: &Settings, offered: &[LocalTool], calls: Vec<ToolCall>) -> Vec<ToolOutput> {
    let mut outputs = Vec::with_capacity(calls.len());

    for call in calls {
        let output = match offered.iter().find(|tool| tool.name() == call.name) {
            Some(tool) => match tool.execute(db, settings, &call.arguments).await {
                Ok(output) => output,
                Err(err) => {
                    warn!("Tool `{}` failed: {}", call.name, err);
                    format!("Erro ao executar a ferramenta `{}`: {err}", call.name)
                }
            },
            None => {
                warn!("Model called unavailable tool `{}`.", call.name);
                format!("Erro: a ferramenta `{}` não está disponível.", call.name)
            }
        };

        outputs.push(ToolOutput { call_id: call.call_id, output });
    }

    outputs
}

/// Wrap [`execute_all`] as the callback handed to the LLM client.
pub fn tool_callback(db: DbClient, settings: Settings, offered: Vec<LocalTool>) -> ToolCallback {
    let offered = Arc::new(offered);

    Box::new(move |calls| -> ToolFuture {
        let db = db.clone();
        let settings = settings.clone();
        let offered = offered.clone();

        Box::pin(async move { Ok(execute_all(&db, &settings, &offered, calls).await) }.in_current_span())
    })
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{config::Config, model::TicketFilter};

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            call_id: format!("call_{name}"),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_tools_for_feedback_respects_sentiment_toggle() {
        let mut settings = Settings::new("SupportAI", "contato@supportai.com");

        assert_eq!(tools_for(AgentKind::Feedback, &settings).len(), 2);

        settings.sentiment_analysis = false;

        assert_eq!(tools_for(AgentKind::Feedback, &settings), vec![LocalTool::RequestCustomerFeedback]);
        assert_eq!(tools_for(AgentKind::Diagnostico, &settings), vec![LocalTool::CheckOrderStatus]);
    }

    #[test]
    fn test_specs_are_object_schemas() {
        for tool in [
            LocalTool::SearchFaq,
            LocalTool::CheckOrderStatus,
            LocalTool::CreateHumanSupportTicket,
            LocalTool::RequestCustomerFeedback,
            LocalTool::AnalyzeFeedbackSentiment,
        ] {
            let spec = tool.spec();

            assert_eq!(spec.name, tool.name());
            assert_eq!(spec.parameters["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_execute_all_runs_offered_tools() {
        let db = DbClient::surreal_memory(&Config::default()).await.unwrap();
        let settings = db.get_settings().await.unwrap();

        let calls = vec![
            call("search_faq", json!({ "query": "Quero cancelar pedido" })),
            call("analyze_feedback_sentiment", json!({ "feedback_text": "ótimo" })),
            call("search_faq", json!({ "wrong": 1 })),
        ];

        let outputs = execute_all(&db, &settings, &[LocalTool::SearchFaq], calls).await;

        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].call_id, "call_search_faq");
        assert!(outputs[0].output.contains("2 horas"));
        assert!(outputs[1].output.contains("não está disponível"));
        assert!(outputs[2].output.starts_with("Erro"));
    }

    #[tokio::test]
    async fn test_escalation_tool_creates_escalated_ticket() {
        let db = DbClient::surreal_memory(&Config::default()).await.unwrap();
        let settings = db.get_settings().await.unwrap();

        let output = LocalTool::CreateHumanSupportTicket
            .execute(&db, &settings, &json!({ "summary": "Pedido atrasado há 10 dias", "customer_name": "João", "order_id": "12345" }).to_string())
            .await
            .unwrap();

        assert!(output.contains("SUP-1006"));

        let escalated = db
            .list_tickets(&TicketFilter {
                status: Some(TicketStatus::Escalated),
                ..Default::default()
            })
            .await
            .unwrap();

        let ticket = escalated.iter().find(|t| t.id == 1006).expect("Escalated ticket should exist");
        assert_eq!(ticket.priority, TicketPriority::High);
        assert_eq!(ticket.customer, "João");
        assert!(ticket.subject.contains("12345"));
    }

    #[tokio::test]
    async fn test_sentiment_tool_output() {
        let db = DbClient::surreal_memory(&Config::default()).await.unwrap();
        let settings = db.get_settings().await.unwrap();

        let output = LocalTool::AnalyzeFeedbackSentiment
            .execute(&db, &settings, r#"{"feedback_text":"Demorou e não resolveu"}"#)
            .await
            .unwrap();

        assert_eq!(output, r#"{"sentiment":"Negativo"}"#);
    }
}
