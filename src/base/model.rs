//! Records held by the mock support store, and the shapes served over HTTP.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::Err;

// Tickets.

/// Lifecycle state of a support ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Escalated,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Escalated => "escalated",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "escalated" => Ok(TicketStatus::Escalated),
            _ => Err(anyhow::anyhow!("Invalid ticket status `{s}`. Must be one of: open, in_progress, resolved, escalated")),
        }
    }
}

/// Priority of a support ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
        }
    }
}

impl FromStr for TicketPriority {
    type Err = Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TicketPriority::Low),
            "medium" => Ok(TicketPriority::Medium),
            "high" => Ok(TicketPriority::High),
            _ => Err(anyhow::anyhow!("Invalid ticket priority `{s}`. Must be one of: low, medium, high")),
        }
    }
}

/// A customer support case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub customer: String,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub timestamp: DateTime<Utc>,
}

/// The caller-supplied part of a ticket; the store assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub customer: String,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
}

impl NewTicket {
    /// A fresh ticket as opened by a customer.
    pub fn open(customer: impl Into<String>, subject: impl Into<String>, message: impl Into<String>, priority: TicketPriority) -> Self {
        Self {
            customer: customer.into(),
            subject: subject.into(),
            message: message.into(),
            status: TicketStatus::Open,
            priority,
        }
    }
}

/// Ticket list filter. Every unset field matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub search: Option<String>,
}

impl TicketFilter {
    /// Whether the ticket passes every set criterion.
    ///
    /// Search is a case-insensitive substring match over the id, customer,
    /// subject, and message.
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.status.is_some_and(|status| status != ticket.status) {
            return false;
        }

        if self.priority.is_some_and(|priority| priority != ticket.priority) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();

                ticket.id.to_string().contains(&term)
                    || ticket.customer.to_lowercase().contains(&term)
                    || ticket.subject.to_lowercase().contains(&term)
                    || ticket.message.to_lowercase().contains(&term)
            }
        }
    }
}

// Agents.

/// The four specialised support agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Atendimento,
    Diagnostico,
    Escalonamento,
    Feedback,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [AgentKind::Atendimento, AgentKind::Diagnostico, AgentKind::Escalonamento, AgentKind::Feedback];

    /// The path segment and store key for the agent.
    pub fn slug(&self) -> &'static str {
        match self {
            AgentKind::Atendimento => "atendimento",
            AgentKind::Diagnostico => "diagnostico",
            AgentKind::Escalonamento => "escalonamento",
            AgentKind::Feedback => "feedback",
        }
    }

    /// The name under which the orchestrator sees the agent as a tool.
    pub fn tool_name(&self) -> &'static str {
        match self {
            AgentKind::Atendimento => "InitialContactAgent",
            AgentKind::Diagnostico => "TechnicalDiagnosisAgent",
            AgentKind::Escalonamento => "EscalationAgent",
            AgentKind::Feedback => "FeedbackAgent",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tool_name() == name)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Atendimento => "Atendimento Inicial",
            AgentKind::Diagnostico => "Diagnóstico Técnico",
            AgentKind::Escalonamento => "Escalonamento",
            AgentKind::Feedback => "Feedback",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentKind::Atendimento => "Responde perguntas frequentes e coleta informações",
            AgentKind::Diagnostico => "Resolve problemas via APIs internas",
            AgentKind::Escalonamento => "Encaminha casos complexos para humanos",
            AgentKind::Feedback => "Solicita avaliação e analisa sentimentos",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for AgentKind {
    type Err = Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown agent `{s}`. Must be one of: atendimento, diagnostico, escalonamento, feedback"))
    }
}

/// Displayed activity state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Idle,
    Processing,
}

/// The dashboard view of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub id: AgentKind,
    pub name: String,
    pub description: String,
    pub status: AgentStatus,
    pub tasks_completed: u64,
}

impl AgentRecord {
    pub fn new(kind: AgentKind, status: AgentStatus, tasks_completed: u64) -> Self {
        Self {
            id: kind,
            name: kind.display_name().to_string(),
            description: kind.description().to_string(),
            status,
            tasks_completed,
        }
    }
}

// Settings.

/// Operator-editable settings. Replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub company_name: String,
    pub contact_email: String,
    /// Offer the initial contact agent to the orchestrator.
    pub auto_response: bool,
    /// Offer the technical diagnosis agent to the orchestrator.
    pub technical_diagnosis: bool,
    /// Offer the escalation agent to the orchestrator.
    pub smart_escalation: bool,
    /// Let the feedback agent classify customer sentiment.
    pub sentiment_analysis: bool,
    pub notify_new_tickets: bool,
    pub notify_escalated_tickets: bool,
}

impl Settings {
    pub fn new(company_name: impl Into<String>, contact_email: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            contact_email: contact_email.into(),
            auto_response: true,
            technical_diagnosis: true,
            smart_escalation: true,
            sentiment_analysis: true,
            notify_new_tickets: true,
            notify_escalated_tickets: true,
        }
    }

    /// Whether the orchestrator may route to the given agent.
    pub fn is_routable(&self, kind: AgentKind) -> bool {
        match kind {
            AgentKind::Atendimento => self.auto_response,
            AgentKind::Diagnostico => self.technical_diagnosis,
            AgentKind::Escalonamento => self.smart_escalation,
            AgentKind::Feedback => false,
        }
    }
}

// Conversations.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    /// The agent that produced an assistant turn, if known.
    #[serde(default)]
    pub agent: Option<AgentKind>,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            agent: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, agent: Option<AgentKind>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            agent,
            timestamp: Utc::now(),
        }
    }
}

// Dashboard.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub active_tickets: u64,
    pub resolved_today: u64,
    pub avg_response_time_minutes: f64,
    pub satisfaction_rate: u8,
}

// Tests.
