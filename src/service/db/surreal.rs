//! SurrealDB implementation of the support desk store.
//!
//! The store runs embedded and in memory: it is seeded on startup and lost
//! when the process exits.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::{
    RecordId, Surreal,
    engine::local::{Db, Mem},
};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::base::{
    config::Config,
    model::{AgentKind, AgentRecord, AgentStatus, ChatRole, ChatTurn, NewTicket, Settings, Ticket, TicketFilter, TicketPriority, TicketStatus},
    simulation,
    types::{Res, Void},
};

use super::{DbClient, GenericDbClient};

const TICKET_TABLE: &str = "ticket";
const AGENT_TABLE: &str = "agent";
const SETTINGS_TABLE: &str = "settings";
const SESSION_TABLE: &str = "session";
const SETTINGS_KEY: &str = "current";

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Create an in-memory SurrealDB store, seeded with the demo data.
    pub async fn surreal_memory(config: &Config) -> Res<Self> {
        let client = SurrealDbClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Rows.

/// A ticket as stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TicketRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    ticket_id: u64,
    customer: String,
    subject: String,
    message: String,
    status: String,
    priority: String,
    timestamp: DateTime<Utc>,
}

impl TicketRow {
    fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            id: None,
            ticket_id: ticket.id,
            customer: ticket.customer.clone(),
            subject: ticket.subject.clone(),
            message: ticket.message.clone(),
            status: ticket.status.as_str().to_string(),
            priority: ticket.priority.as_str().to_string(),
            timestamp: ticket.timestamp,
        }
    }

    fn into_ticket(self) -> Res<Ticket> {
        Ok(Ticket {
            id: self.ticket_id,
            customer: self.customer,
            subject: self.subject,
            message: self.message,
            status: self.status.parse()?,
            priority: self.priority.parse()?,
            timestamp: self.timestamp,
        })
    }
}

/// An agent display record as stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AgentRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    agent: String,
    status: String,
    tasks_completed: u64,
}

impl AgentRow {
    fn from_record(record: &AgentRecord) -> Self {
        let status = match record.status {
            AgentStatus::Active => "active",
            AgentStatus::Idle => "idle",
            AgentStatus::Processing => "processing",
        };

        Self {
            id: None,
            agent: record.id.slug().to_string(),
            status: status.to_string(),
            tasks_completed: record.tasks_completed,
        }
    }

    fn into_record(self) -> Res<AgentRecord> {
        let status = match self.status.as_str() {
            "active" => AgentStatus::Active,
            "idle" => AgentStatus::Idle,
            "processing" => AgentStatus::Processing,
            other => return Err(anyhow::anyhow!("Invalid agent status `{other}` in store.")),
        };

        Ok(AgentRecord::new(self.agent.parse()?, status, self.tasks_completed))
    }
}

/// The settings as stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    settings: Settings,
}

/// A conversation turn as stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TurnRow {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent: Option<String>,
    timestamp: DateTime<Utc>,
}

impl TurnRow {
    fn from_turn(turn: &ChatTurn) -> Self {
        let role = match turn.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };

        Self {
            role: role.to_string(),
            content: turn.content.clone(),
            agent: turn.agent.map(|agent| agent.slug().to_string()),
            timestamp: turn.timestamp,
        }
    }

    fn into_turn(self) -> Res<ChatTurn> {
        let role = match self.role.as_str() {
            "user" => ChatRole::User,
            "assistant" => ChatRole::Assistant,
            other => return Err(anyhow::anyhow!("Invalid chat role `{other}` in store.")),
        };

        Ok(ChatTurn {
            role,
            content: self.content,
            agent: self.agent.map(|agent| agent.parse()).transpose()?,
            timestamp: self.timestamp,
        })
    }
}

/// A conversation session as stored in the database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    #[serde(default)]
    turns: Vec<TurnRow>,
}

// Specific implementations.

/// SurrealDB-backed store.
pub struct SurrealDbClient {
    db: Surreal<Db>,
    next_ticket_id: AtomicU64,
    /// Serializes read-modify-write updates of agents and sessions.
    write_lock: Mutex<()>,
}

impl SurrealDbClient {
    /// Create a new in-memory database, and seed it.
    #[instrument(name = "SurrealDbClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        let db = Surreal::new::<Mem>(()).await?;

        db.use_ns("support").use_db("desk").await?;

        let client = Self {
            db,
            next_ticket_id: AtomicU64::new(1),
            write_lock: Mutex::new(()),
        };

        client.seed(config).await?;

        info!("Database initialized successfully.");

        Ok(client)
    }

    /// Load the demo tickets, agents, and the initial settings.
    async fn seed(&self, config: &Config) -> Void {
        let now = Utc::now();

        let tickets = [
            (
                1001,
                "João Silva",
                "Pedido não chegou",
                "Meu pedido não chegou e já faz 10 dias. Gostaria de saber o status.",
                TicketStatus::Open,
                TicketPriority::High,
                Duration::minutes(5),
            ),
            (
                1002,
                "Maria Santos",
                "Problema com pagamento",
                "Fui cobrada duas vezes pelo mesmo pedido. Preciso de ajuda urgente.",
                TicketStatus::InProgress,
                TicketPriority::High,
                Duration::minutes(15),
            ),
            (
                1003,
                "Pedro Costa",
                "Dúvida sobre produto",
                "Gostaria de saber se este produto é compatível com meu dispositivo.",
                TicketStatus::InProgress,
                TicketPriority::Medium,
                Duration::minutes(30),
            ),
            (
                1004,
                "Ana Oliveira",
                "Solicitação de reembolso",
                "Recebi o produto com defeito e gostaria de solicitar o reembolso.",
                TicketStatus::Escalated,
                TicketPriority::High,
                Duration::hours(1),
            ),
            (
                1005,
                "Carlos Lima",
                "Atualização de endereço",
                "Preciso atualizar o endereço de entrega do meu pedido em andamento.",
                TicketStatus::Resolved,
                TicketPriority::Low,
                Duration::hours(2),
            ),
        ];

        for (id, customer, subject, message, status, priority, age) in tickets {
            let ticket = Ticket {
                id,
                customer: customer.to_string(),
                subject: subject.to_string(),
                message: message.to_string(),
                status,
                priority,
                timestamp: now - age,
            };

            self.put_ticket(&ticket).await?;
        }

        self.next_ticket_id.store(1006, Ordering::SeqCst);

        let agents = [
            AgentRecord::new(AgentKind::Atendimento, AgentStatus::Active, 142),
            AgentRecord::new(AgentKind::Diagnostico, AgentStatus::Processing, 87),
            AgentRecord::new(AgentKind::Escalonamento, AgentStatus::Active, 34),
            AgentRecord::new(AgentKind::Feedback, AgentStatus::Idle, 156),
        ];

        for agent in &agents {
            self.put_agent(agent).await?;
        }

        self.put_settings(Settings::new(config.company_name.clone(), config.contact_email.clone())).await?;

        Ok(())
    }

    async fn put_ticket(&self, ticket: &Ticket) -> Void {
        let _: Option<TicketRow> = self.db.upsert((TICKET_TABLE, ticket.id.to_string())).content(TicketRow::from_ticket(ticket)).await?;

        Ok(())
    }

    async fn put_agent(&self, agent: &AgentRecord) -> Void {
        let _: Option<AgentRow> = self.db.upsert((AGENT_TABLE, agent.id.slug().to_string())).content(AgentRow::from_record(agent)).await?;

        Ok(())
    }

    async fn put_settings(&self, settings: Settings) -> Res<Settings> {
        let stored: Option<SettingsRow> = self.db.upsert((SETTINGS_TABLE, SETTINGS_KEY.to_string())).content(SettingsRow { id: None, settings }).await?;

        stored.map(|row| row.settings).ok_or_else(|| anyhow::anyhow!("Settings were not stored."))
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(skip(self))]
    async fn list_tickets(&self, filter: &TicketFilter) -> Res<Vec<Ticket>> {
        let rows: Vec<TicketRow> = self.db.select(TICKET_TABLE).await?;

        let mut tickets = rows
            .into_iter()
            .map(TicketRow::into_ticket)
            .collect::<Res<Vec<_>>>()?
            .into_iter()
            .filter(|ticket| filter.matches(ticket))
            .collect::<Vec<_>>();

        tickets.sort_by_key(|ticket| ticket.id);

        Ok(tickets)
    }

    #[instrument(skip(self))]
    async fn get_ticket(&self, id: u64) -> Res<Option<Ticket>> {
        let row: Option<TicketRow> = self.db.select((TICKET_TABLE, id.to_string())).await?;

        row.map(TicketRow::into_ticket).transpose()
    }

    #[instrument(skip(self))]
    async fn create_ticket(&self, ticket: NewTicket) -> Res<Ticket> {
        let id = self.next_ticket_id.fetch_add(1, Ordering::SeqCst);

        let ticket = Ticket {
            id,
            customer: ticket.customer,
            subject: ticket.subject,
            message: ticket.message,
            status: ticket.status,
            priority: ticket.priority,
            timestamp: Utc::now(),
        };

        let created: Option<TicketRow> = self.db.create((TICKET_TABLE, id.to_string())).content(TicketRow::from_ticket(&ticket)).await?;

        if created.is_none() {
            return Err(anyhow::anyhow!("Ticket `{id}` was not created."));
        }

        info!("Ticket `{}` created.", id);

        Ok(ticket)
    }

    #[instrument(skip(self))]
    async fn list_agents(&self) -> Res<Vec<AgentRecord>> {
        let _guard = self.write_lock.lock().await;

        let rows: Vec<AgentRow> = self.db.select(AGENT_TABLE).await?;

        let mut agents = rows.into_iter().map(AgentRow::into_record).collect::<Res<Vec<_>>>()?;
        agents.sort_by_key(|agent| AgentKind::ALL.iter().position(|kind| *kind == agent.id));

        for agent in agents.iter_mut() {
            simulation::simulate_agent_activity(agent);
        }

        for agent in &agents {
            self.put_agent(agent).await?;
        }

        Ok(agents)
    }

    #[instrument(skip(self))]
    async fn record_agent_task(&self, agent: AgentKind) -> Void {
        let _guard = self.write_lock.lock().await;

        let row: Option<AgentRow> = self.db.select((AGENT_TABLE, agent.slug().to_string())).await?;

        let mut record = match row {
            Some(row) => row.into_record()?,
            None => AgentRecord::new(agent, AgentStatus::Idle, 0),
        };

        record.tasks_completed += 1;

        self.put_agent(&record).await
    }

    #[instrument(skip(self))]
    async fn get_settings(&self) -> Res<Settings> {
        let row: Option<SettingsRow> = self.db.select((SETTINGS_TABLE, SETTINGS_KEY.to_string())).await?;

        row.map(|row| row.settings).ok_or_else(|| anyhow::anyhow!("Settings have not been initialized."))
    }

    #[instrument(skip(self))]
    async fn update_settings(&self, settings: Settings) -> Res<Settings> {
        info!("Replacing settings ...");

        self.put_settings(settings).await
    }

    #[instrument(skip(self))]
    async fn get_session_history(&self, session_id: &str) -> Res<Vec<ChatTurn>> {
        let row: Option<SessionRow> = self.db.select((SESSION_TABLE, session_id.to_string())).await?;

        row.unwrap_or_default().turns.into_iter().map(TurnRow::into_turn).collect()
    }

    #[instrument(skip(self, turns))]
    async fn append_session_turns(&self, session_id: &str, turns: Vec<ChatTurn>) -> Void {
        let _guard = self.write_lock.lock().await;

        let row: Option<SessionRow> = self.db.select((SESSION_TABLE, session_id.to_string())).await?;

        let mut row = row.unwrap_or_default();
        row.id = None;
        row.turns.extend(turns.iter().map(TurnRow::from_turn));

        let _: Option<SessionRow> = self.db.upsert((SESSION_TABLE, session_id.to_string())).content(row).await?;

        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_db() -> DbClient {
        DbClient::surreal_memory(&Config::default()).await.expect("Failed to create DB client")
    }

    #[tokio::test]
    async fn test_seeded_tickets() {
        let db = create_test_db().await;

        let tickets = db.list_tickets(&TicketFilter::default()).await.unwrap();

        assert_eq!(tickets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1001, 1002, 1003, 1004, 1005]);
        assert_eq!(tickets[0].customer, "João Silva");
        assert_eq!(tickets[3].status, TicketStatus::Escalated);
    }

    #[tokio::test]
    async fn test_get_ticket() {
        let db = create_test_db().await;

        let ticket = db.get_ticket(1002).await.unwrap().expect("Ticket 1002 should exist");

        assert_eq!(ticket.customer, "Maria Santos");
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert!(db.get_ticket(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_ticket_assigns_fresh_ids() {
        let db = create_test_db().await;

        let first = db.create_ticket(NewTicket::open("X", "Y", "Z", TicketPriority::Medium)).await.unwrap();
        let second = db.create_ticket(NewTicket::open("X", "Y", "Z", TicketPriority::Low)).await.unwrap();

        assert_eq!(first.id, 1006);
        assert_eq!(second.id, 1007);
        assert_eq!(db.get_ticket(1006).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_list_tickets_applies_filter() {
        let db = create_test_db().await;

        let filter = TicketFilter {
            priority: Some(TicketPriority::High),
            search: Some("pedido".to_string()),
            ..Default::default()
        };

        let tickets = db.list_tickets(&filter).await.unwrap();

        assert_eq!(tickets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1001, 1002]);
    }

    #[tokio::test]
    async fn test_list_agents_keeps_order_and_counters() {
        let db = create_test_db().await;

        let agents = db.list_agents().await.unwrap();

        assert_eq!(agents.iter().map(|a| a.id).collect::<Vec<_>>(), AgentKind::ALL.to_vec());
        assert!(agents[0].tasks_completed >= 142);

        let again = db.list_agents().await.unwrap();

        for (before, after) in agents.iter().zip(again.iter()) {
            assert!(after.tasks_completed >= before.tasks_completed);
        }
    }

    #[tokio::test]
    async fn test_record_agent_task() {
        let db = create_test_db().await;

        let before = db.list_agents().await.unwrap()[2].tasks_completed;
        db.record_agent_task(AgentKind::Escalonamento).await.unwrap();
        let after = db.list_agents().await.unwrap()[2].tasks_completed;

        assert!(after > before);
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let db = create_test_db().await;

        let mut settings = db.get_settings().await.unwrap();
        assert_eq!(settings.company_name, "SupportAI");

        settings.company_name = "Acme".to_string();
        settings.sentiment_analysis = false;
        db.update_settings(settings.clone()).await.unwrap();

        assert_eq!(db.get_settings().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_session_history_appends() {
        let db = create_test_db().await;

        assert!(db.get_session_history("abc").await.unwrap().is_empty());

        db.append_session_turns("abc", vec![ChatTurn::user("Olá"), ChatTurn::assistant("Oi!", Some(AgentKind::Atendimento))])
            .await
            .unwrap();
        db.append_session_turns("abc", vec![ChatTurn::user("Meu pedido é 12345")]).await.unwrap();

        let history = db.get_session_history("abc").await.unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history[1].agent, Some(AgentKind::Atendimento));
        assert_eq!(history[2].content, "Meu pedido é 12345");
        assert!(db.get_session_history("other").await.unwrap().is_empty());
    }
}
