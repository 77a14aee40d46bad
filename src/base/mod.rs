//! Core components, types, and utilities for the support desk.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - System directives for the support agents.
//! - Store records and the mock back-office simulation.
//! - Common types and result handling.

pub mod config;
pub mod model;
pub mod prompts;
pub mod simulation;
pub mod types;
