use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::{
    model::{AgentKind, AgentRecord, ChatTurn, NewTicket, Settings, Ticket, TicketFilter},
    types::{Res, Void},
};

pub mod surreal;

// Traits.

/// Generic database client trait that clients must implement.
///
/// This trait defines the core functionality for storing and retrieving
/// tickets, agent display records, settings, and conversation sessions.
/// Implementing this trait allows different database backends to be used
/// with the support desk.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Lists the tickets matching the filter, ordered by id.
    async fn list_tickets(&self, filter: &TicketFilter) -> Res<Vec<Ticket>>;

    /// Gets a ticket by its id.
    async fn get_ticket(&self, id: u64) -> Res<Option<Ticket>>;

    /// Creates a ticket with a fresh id and the current timestamp.
    async fn create_ticket(&self, ticket: NewTicket) -> Res<Ticket>;

    /// Lists the agent display records.
    ///
    /// Every read re-rolls the displayed agent activity, and the new values
    /// are kept.
    async fn list_agents(&self) -> Res<Vec<AgentRecord>>;

    /// Counts one completed task for the agent.
    async fn record_agent_task(&self, agent: AgentKind) -> Void;

    /// Gets the current settings.
    async fn get_settings(&self) -> Res<Settings>;

    /// Replaces the settings wholesale, returning the stored value.
    async fn update_settings(&self, settings: Settings) -> Res<Settings>;

    /// Gets the conversation turns of a session, oldest first; empty for unknown sessions.
    async fn get_session_history(&self, session_id: &str) -> Res<Vec<ChatTurn>>;

    /// Appends turns to a session, creating it if needed.
    async fn append_session_turns(&self, session_id: &str, turns: Vec<ChatTurn>) -> Void;
}

/// Database client for the support desk.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    /// The database client instance.
    pub inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}
