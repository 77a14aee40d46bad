//! Mock back-office behaviour: FAQ lookups, order tracking, sentiment, and
//! the randomized activity shown on the dashboard.
//!
//! Everything here is synchronous so that the thread-local RNG never lives
//! across an `.await`.

use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use super::model::{AgentRecord, AgentStatus, DashboardMetrics, Ticket, TicketStatus};

// FAQ.

/// Keyword → answer pairs, checked in order.
pub const FAQ_ENTRIES: &[(&str, &str)] = &[
    ("rastrear pedido", "Para rastrear seu pedido, use o link enviado para seu e-mail de confirmação."),
    (
        "cancelar pedido",
        "Cancelamentos podem ser feitos em até 2 horas após a compra diretamente na página 'Meus Pedidos'. Depois disso, entre em contato conosco.",
    ),
    (
        "devolução",
        "Para devoluções, acesse 'Meus Pedidos', selecione o item e siga as instruções para devolução. O prazo é de 7 dias após o recebimento.",
    ),
    ("pagamento", "Aceitamos cartão de crédito, boleto bancário e Pix."),
];

pub const FAQ_NOT_FOUND: &str = "Desculpe, não encontrei uma resposta direta para isso nas nossas FAQs.";

/// Answer for the first FAQ keyword contained in the query.
pub fn search_faq(query: &str) -> &'static str {
    let query = query.to_lowercase();

    FAQ_ENTRIES
        .iter()
        .find(|(keyword, _)| query.contains(keyword))
        .map(|(_, answer)| *answer)
        .unwrap_or(FAQ_NOT_FOUND)
}

// Orders.

pub const ORDER_STATUSES: [&str; 6] = ["Processando", "Enviado", "Em trânsito", "Entregue", "Atrasado", "Cancelado"];
pub const ORDER_NOT_FOUND: &str = "Não encontrado";

/// Result of an order status lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    pub order_id: String,
    pub status: String,
    pub details: String,
}

/// Whether an order id looks like a real order number (exactly 5 digits).
pub fn is_valid_order_id(order_id: &str) -> bool {
    order_id.len() == 5 && order_id.chars().all(|c| c.is_ascii_digit())
}

/// Look up an order in the simulated order system.
pub fn check_order_status(order_id: &str) -> OrderStatusReport {
    let order_id = order_id.trim();

    if !is_valid_order_id(order_id) {
        return OrderStatusReport {
            order_id: order_id.to_string(),
            status: ORDER_NOT_FOUND.to_string(),
            details: "O número do pedido parece inválido. Verifique se ele tem 5 dígitos.".to_string(),
        };
    }

    let mut rng = rand::thread_rng();
    let status = *ORDER_STATUSES.choose(&mut rng).unwrap_or(&ORDER_STATUSES[0]);
    let (day, month) = (rng.gen_range(1..=28), rng.gen_range(1..=12));

    let details = match status {
        "Processando" => "Aguardando envio.".to_string(),
        "Atrasado" => "Ocorreu um problema logístico. Estimativa: 3 dias úteis.".to_string(),
        "Entregue" => format!("Entregue em {day}/{month}/2025."),
        _ => format!("Última atualização: {day}/{month}/2025"),
    };

    OrderStatusReport {
        order_id: order_id.to_string(),
        status: status.to_string(),
        details,
    }
}

// Sentiment.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positivo,
    Negativo,
    Neutro,
}

const NEGATIVE_WORDS: &[&str] = &["não resolveu", "ruim", "péssimo", "lento", "demorou", "problema", "horrível"];
const POSITIVE_WORDS: &[&str] = &["ótimo", "excelente", "bom", "rápido", "resolveu", "obrigado"];

/// Keyword sentiment classification.
///
/// Negative keywords win, so "não resolveu" is not read as "resolveu".
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let text = text.to_lowercase();

    // Negatives are checked before positives: mixed feedback such as
    // "obrigado, mas demorou" is negative.
    if NEGATIVE_WORDS.iter().any(|word| text.contains(word)) {
        Sentiment::Negativo
    } else if POSITIVE_WORDS.iter().any(|word| text.contains(word)) {
        Sentiment::Positivo
    } else {
        Sentiment::Neutro
    }
}

// Dashboard.

/// Re-roll the displayed status of an agent, occasionally bumping its counter.
pub fn simulate_agent_activity(agent: &mut AgentRecord) {
    let mut rng = rand::thread_rng();

    agent.status = *[AgentStatus::Active, AgentStatus::Idle, AgentStatus::Processing].choose(&mut rng).unwrap_or(&AgentStatus::Idle);

    if agent.status != AgentStatus::Idle {
        agent.tasks_completed += rng.gen_range(0..=2);
    }
}

/// Dashboard metrics: ticket counts from the store, the rest simulated.
pub fn dashboard_metrics(tickets: &[Ticket], now: DateTime<Utc>) -> DashboardMetrics {
    let mut rng = rand::thread_rng();

    let active_tickets = tickets.iter().filter(|t| t.status != TicketStatus::Resolved).count() as u64;
    let resolved_today = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Resolved && t.timestamp.date_naive() == now.date_naive())
        .count() as u64;

    let avg_response_time_minutes = (rng.gen_range(2.5..6.0_f64) * 10.0).round() / 10.0;

    DashboardMetrics {
        active_tickets,
        resolved_today: resolved_today + rng.gen_range(60..=95),
        avg_response_time_minutes,
        satisfaction_rate: rng.gen_range(88..=98),
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::model::{AgentKind, TicketPriority};

    #[test]
    fn test_search_faq_matches_keyword() {
        assert!(search_faq("Como faço para RASTREAR PEDIDO?").contains("link enviado"));
        assert!(search_faq("quais formas de pagamento?").contains("Pix"));
        assert_eq!(search_faq("qual a cor do céu?"), FAQ_NOT_FOUND);
    }

    #[test]
    fn test_check_order_status_rejects_invalid_ids() {
        for id in ["1234", "123456", "12a45", ""] {
            let report = check_order_status(id);

            assert_eq!(report.status, ORDER_NOT_FOUND);
        }
    }

    #[test]
    fn test_check_order_status_valid_id() {
        for _ in 0..20 {
            let report = check_order_status(" 12345 ");

            assert_eq!(report.order_id, "12345");
            assert!(ORDER_STATUSES.contains(&report.status.as_str()));
            assert!(!report.details.is_empty());

            if report.status == "Atrasado" {
                assert!(report.details.contains("logístico"));
            }
        }
    }

    #[test]
    fn test_analyze_sentiment() {
        assert_eq!(analyze_sentiment("Atendimento excelente, muito rápido!"), Sentiment::Positivo);
        assert_eq!(analyze_sentiment("Demorou demais e não resolveu nada"), Sentiment::Negativo);
        assert_eq!(analyze_sentiment("Ok."), Sentiment::Neutro);
    }

    #[test]
    fn test_analyze_sentiment_mixed_feedback_is_negative() {
        assert_eq!(analyze_sentiment("Obrigado, mas demorou"), Sentiment::Negativo);
        assert_eq!(analyze_sentiment("O atendente não resolveu"), Sentiment::Negativo);
        assert_eq!(analyze_sentiment("Resolveu, obrigado!"), Sentiment::Positivo);
    }

    #[test]
    fn test_simulate_agent_activity_never_decreases_counter() {
        let mut agent = AgentRecord::new(AgentKind::Feedback, AgentStatus::Idle, 156);

        for _ in 0..20 {
            let before = agent.tasks_completed;
            simulate_agent_activity(&mut agent);

            assert!(agent.tasks_completed >= before);
            assert!(agent.tasks_completed <= before + 2);
        }
    }

    #[test]
    fn test_dashboard_metrics_counts_active_tickets() {
        let now = Utc::now();
        let ticket = |id, status| Ticket {
            id,
            customer: "Cliente".to_string(),
            subject: "Assunto".to_string(),
            message: "Mensagem".to_string(),
            status,
            priority: TicketPriority::Medium,
            timestamp: now,
        };

        let tickets = vec![ticket(1, TicketStatus::Open), ticket(2, TicketStatus::Escalated), ticket(3, TicketStatus::Resolved)];

        let metrics = dashboard_metrics(&tickets, now);

        assert_eq!(metrics.active_tickets, 2);
        assert!(metrics.resolved_today >= 61);
        assert!((2.5..=6.0).contains(&metrics.avg_response_time_minutes));
        assert!((88..=98).contains(&metrics.satisfaction_rate));
    }
}
