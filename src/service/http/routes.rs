//! Request handlers for the HTTP API.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::{
    agents::{orchestrator::run_orchestrator, run_agent},
    base::{
        model::{AgentKind, AgentRecord, ChatTurn, DashboardMetrics, NewTicket, Settings, Ticket, TicketFilter, TicketPriority},
        prompts::apology,
        simulation,
        types::{Err, Res},
    },
    runtime::Runtime,
};

// Errors.

/// An error response: a status and a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<Err> for ApiError {
    fn from(err: Err) -> Self {
        error!("Request failed: {}", err);
        Self::internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// Bodies.

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// The message, which must be present and not blank.
    fn message(&self) -> ApiResult<&str> {
        match self.message.as_deref() {
            Some(message) if !message.trim().is_empty() => Ok(message),
            _ => Err(ApiError::bad_request("The `message` field is required and must not be empty.")),
        }
    }

    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentChatResponse {
    pub response: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

impl TicketQuery {
    fn into_filter(self) -> Res<TicketFilter> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        Ok(TicketFilter {
            status: non_empty(self.status).map(|s| s.trim().parse()).transpose()?,
            priority: non_empty(self.priority).map(|p| p.trim().parse()).transpose()?,
            search: non_empty(self.search),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    /// Missing or `null` means medium.
    #[serde(default)]
    pub priority: Option<TicketPriority>,
}

// Chat.

/// `POST /chat`: route a message through the orchestrator.
#[instrument(skip_all)]
pub async fn chat(State(runtime): State<Runtime>, body: Result<Json<ChatRequest>, JsonRejection>) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = body?;
    let message = request.message()?;

    let session_id = request.session_id().map(str::to_string).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let history = runtime.db.get_session_history(&session_id).await?;

    let reply = match run_orchestrator(&runtime, message, &history).await {
        Ok(reply) => reply,
        Err(err) => {
            error!("Orchestrator failed for session `{}`: {}", session_id, err);
            return Err(ApiError::internal(format!("Failed to process the message: {err}")));
        }
    };

    runtime
        .db
        .append_session_turns(&session_id, vec![ChatTurn::user(message), ChatTurn::assistant(reply.reply.clone(), reply.agent)])
        .await?;

    Ok(Json(ChatResponse { reply: reply.reply, session_id }))
}

/// `POST /api/chat/{agent}`: talk to one agent directly.
///
/// Model failures are answered with an apology rather than an error status.
#[instrument(skip(runtime, body))]
pub async fn chat_with_agent(
    State(runtime): State<Runtime>,
    Path(agent): Path<String>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<AgentChatResponse>> {
    let kind = agent.parse::<AgentKind>().map_err(|_| ApiError::not_found(format!("Agent `{agent}` not found.")))?;

    let Json(request) = body?;
    let message = request.message()?;

    let history = match request.session_id() {
        Some(session_id) => runtime.db.get_session_history(session_id).await?,
        None => Vec::new(),
    };

    let response = match run_agent(&runtime, kind, message, &history).await {
        Ok(response) => response,
        Err(err) => {
            error!("Agent `{}` failed: {}", kind, err);
            apology(&runtime.db.get_settings().await?)
        }
    };

    if let Some(session_id) = request.session_id() {
        runtime
            .db
            .append_session_turns(session_id, vec![ChatTurn::user(message), ChatTurn::assistant(response.clone(), Some(kind))])
            .await?;
    }

    Ok(Json(AgentChatResponse { response }))
}

// Tickets.

/// `GET /api/tickets`
#[instrument(skip(runtime))]
pub async fn list_tickets(State(runtime): State<Runtime>, query: Result<Query<TicketQuery>, QueryRejection>) -> ApiResult<Json<Vec<Ticket>>> {
    let Query(query) = query?;
    let filter = query.into_filter().map_err(|err| ApiError::bad_request(err.to_string()))?;

    Ok(Json(runtime.db.list_tickets(&filter).await?))
}

/// `GET /api/tickets/{id}`
#[instrument(skip(runtime))]
pub async fn get_ticket(State(runtime): State<Runtime>, id: Result<Path<u64>, PathRejection>) -> ApiResult<Json<Ticket>> {
    let Ok(Path(id)) = id else {
        return Err(ApiError::not_found("Ticket not found."));
    };

    runtime
        .db
        .get_ticket(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Ticket `{id}` not found.")))
}

/// `POST /api/tickets`
#[instrument(skip_all)]
pub async fn create_ticket(State(runtime): State<Runtime>, body: Result<Json<CreateTicketRequest>, JsonRejection>) -> ApiResult<(StatusCode, Json<Ticket>)> {
    let Json(request) = body?;

    for (field, value) in [("customer", &request.customer), ("subject", &request.subject), ("message", &request.message)] {
        if value.trim().is_empty() {
            return Err(ApiError::bad_request(format!("The `{field}` field is required and must not be empty.")));
        }
    }

    let ticket = runtime
        .db
        .create_ticket(NewTicket::open(request.customer, request.subject, request.message, request.priority.unwrap_or_default()))
        .await?;

    if runtime.db.get_settings().await?.notify_new_tickets {
        info!("Notifying the support team of new ticket `{}`.", ticket.id);
    }

    Ok((StatusCode::CREATED, Json(ticket)))
}

// Dashboard.

/// `GET /api/agents`
#[instrument(skip_all)]
pub async fn list_agents(State(runtime): State<Runtime>) -> ApiResult<Json<Vec<AgentRecord>>> {
    Ok(Json(runtime.db.list_agents().await?))
}

/// `GET /api/dashboard/metrics`
#[instrument(skip_all)]
pub async fn dashboard_metrics(State(runtime): State<Runtime>) -> ApiResult<Json<DashboardMetrics>> {
    let tickets = runtime.db.list_tickets(&TicketFilter::default()).await?;

    Ok(Json(simulation::dashboard_metrics(&tickets, Utc::now())))
}

/// `GET /api/settings`
#[instrument(skip_all)]
pub async fn get_settings(State(runtime): State<Runtime>) -> ApiResult<Json<Settings>> {
    Ok(Json(runtime.db.get_settings().await?))
}

/// `PUT /api/settings`
#[instrument(skip_all)]
pub async fn update_settings(State(runtime): State<Runtime>, body: Result<Json<Settings>, JsonRejection>) -> ApiResult<Json<Settings>> {
    let Json(settings) = body?;

    Ok(Json(runtime.db.update_settings(settings).await?))
}

/// `GET /api/health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::model::TicketStatus;

    #[test]
    fn test_ticket_query_ignores_empty_params() {
        let query = TicketQuery {
            status: Some("".to_string()),
            priority: Some(" high ".to_string()),
            search: Some("  ".to_string()),
        };

        let filter = query.into_filter().unwrap();

        assert_eq!(filter.status, None);
        assert_eq!(filter.priority, Some(TicketPriority::High));
        assert_eq!(filter.search, None);
    }

    #[test]
    fn test_ticket_query_rejects_unknown_status() {
        let query = TicketQuery {
            status: Some("closed".to_string()),
            ..Default::default()
        };

        assert!(query.into_filter().is_err());

        let query = TicketQuery {
            status: Some("escalated".to_string()),
            ..Default::default()
        };

        assert_eq!(query.into_filter().unwrap().status, Some(TicketStatus::Escalated));
    }

    #[test]
    fn test_chat_request_requires_message() {
        let blank: ChatRequest = serde_json::from_str(r#"{"message":"   "}"#).unwrap();
        let missing: ChatRequest = serde_json::from_str(r#"{"session_id":"abc"}"#).unwrap();
        let ok: ChatRequest = serde_json::from_str(r#"{"message":"Olá","session_id":" "}"#).unwrap();

        assert_eq!(blank.message().unwrap_err().status, StatusCode::BAD_REQUEST);
        assert!(missing.message().is_err());
        assert_eq!(ok.message().unwrap(), "Olá");
        assert_eq!(ok.session_id(), None);
    }

    #[test]
    fn test_create_ticket_request_null_priority() {
        let null: CreateTicketRequest = serde_json::from_str(r#"{"customer":"Ana","subject":"Atraso","message":"Cadê?","priority":null}"#).unwrap();
        let missing: CreateTicketRequest = serde_json::from_str(r#"{"customer":"Ana","subject":"Atraso","message":"Cadê?"}"#).unwrap();
        let high: CreateTicketRequest = serde_json::from_str(r#"{"customer":"Ana","subject":"Atraso","message":"Cadê?","priority":"high"}"#).unwrap();

        assert_eq!(null.priority.unwrap_or_default(), TicketPriority::Medium);
        assert_eq!(missing.priority.unwrap_or_default(), TicketPriority::Medium);
        assert_eq!(high.priority.unwrap_or_default(), TicketPriority::High);
    }

    #[test]
    fn test_api_error_response_status() {
        let response = ApiError::not_found("nope").into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
