//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for various services used by the support desk:
//! - Database services (e.g., SurrealDB)
//! - LLM services (e.g., OpenAI)
//! - The HTTP API (axum)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod db;
pub mod http;
pub mod llm;
