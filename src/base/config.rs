//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::{model::AgentKind, prompts};

use super::types::Res;

/// Default OpenAI model for every agent.
fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}

/// Default sampling temperature for the agents.
fn default_openai_temperature() -> f32 {
    0.5
}

/// Default reasoning effort for `o` models.
fn default_openai_reasoning_effort() -> String {
    "medium".to_string()
}

/// Default max output tokens for OpenAI model
fn default_openai_max_tokens() -> u32 {
    4096
}

fn default_agent_max_steps() -> u32 {
    8
}

fn default_history_max_turns() -> usize {
    20
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_cors_allowed_origins() -> String {
    "*".to_string()
}

fn default_company_name() -> String {
    "SupportAI".to_string()
}

fn default_contact_email() -> String {
    "contato@supportai.com".to_string()
}

fn default_initial_contact_agent_directive() -> String {
    prompts::INITIAL_CONTACT_AGENT_DIRECTIVE.to_string()
}

fn default_technical_diagnosis_agent_directive() -> String {
    prompts::TECHNICAL_DIAGNOSIS_AGENT_DIRECTIVE.to_string()
}

fn default_escalation_agent_directive() -> String {
    prompts::ESCALATION_AGENT_DIRECTIVE.to_string()
}

fn default_feedback_agent_directive() -> String {
    prompts::FEEDBACK_AGENT_DIRECTIVE.to_string()
}

fn default_orchestrator_agent_directive() -> String {
    prompts::ORCHESTRATOR_AGENT_DIRECTIVE.to_string()
}

/// Configuration for the support-desk application.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ConfigInner {
    /// OpenAI API key (`OPENAI_API_KEY`).
    ///
    /// Falls back to the unprefixed `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub openai_api_key: String,
    /// Refuse to start without an API key (`REQUIRE_OPENAI_API_KEY`).
    ///
    /// When unset, a missing key only degrades the LLM-backed endpoints.
    #[serde(default)]
    pub require_openai_api_key: bool,
    /// OpenAI model to use for all agents (`OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Sampling temperature (`OPENAI_TEMPERATURE`).
    /// Value between 0 and 2. Only sent to `gpt` models.
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// Reasoning effort for `o` models (`OPENAI_REASONING_EFFORT`): low, medium, or high.
    #[serde(default = "default_openai_reasoning_effort")]
    pub openai_reasoning_effort: String,
    /// Max output tokens for OpenAI model (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Max model round trips per agent invocation (`AGENT_MAX_STEPS`).
    #[serde(default = "default_agent_max_steps")]
    pub agent_max_steps: u32,
    /// How many recent conversation turns are sent to the model (`HISTORY_MAX_TURNS`).
    #[serde(default = "default_history_max_turns")]
    pub history_max_turns: usize,
    /// HTTP bind host (`SERVER_HOST`).
    #[serde(default = "default_server_host")]
    pub server_host: String,
    /// HTTP bind port (`SERVER_PORT`).
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Comma-separated CORS origins, or `*` (`CORS_ALLOWED_ORIGINS`).
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,
    /// Initial company name setting (`COMPANY_NAME`).
    #[serde(default = "default_company_name")]
    pub company_name: String,
    /// Initial contact email setting (`CONTACT_EMAIL`).
    #[serde(default = "default_contact_email")]
    pub contact_email: String,
    #[serde(default = "default_initial_contact_agent_directive")]
    pub initial_contact_agent_directive: String,
    #[serde(default = "default_technical_diagnosis_agent_directive")]
    pub technical_diagnosis_agent_directive: String,
    #[serde(default = "default_escalation_agent_directive")]
    pub escalation_agent_directive: String,
    #[serde(default = "default_feedback_agent_directive")]
    pub feedback_agent_directive: String,
    #[serde(default = "default_orchestrator_agent_directive")]
    pub orchestrator_agent_directive: String,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            require_openai_api_key: false,
            openai_model: default_openai_model(),
            openai_temperature: default_openai_temperature(),
            openai_reasoning_effort: default_openai_reasoning_effort(),
            openai_max_tokens: default_openai_max_tokens(),
            agent_max_steps: default_agent_max_steps(),
            history_max_turns: default_history_max_turns(),
            server_host: default_server_host(),
            server_port: default_server_port(),
            cors_allowed_origins: default_cors_allowed_origins(),
            company_name: default_company_name(),
            contact_email: default_contact_email(),
            initial_contact_agent_directive: default_initial_contact_agent_directive(),
            technical_diagnosis_agent_directive: default_technical_diagnosis_agent_directive(),
            escalation_agent_directive: default_escalation_agent_directive(),
            feedback_agent_directive: default_feedback_agent_directive(),
            orchestrator_agent_directive: default_orchestrator_agent_directive(),
        }
    }
}

impl ConfigInner {
    /// The directive template for a given agent.
    pub fn agent_directive(&self, kind: AgentKind) -> &str {
        match kind {
            AgentKind::Atendimento => &self.initial_contact_agent_directive,
            AgentKind::Diagnostico => &self.technical_diagnosis_agent_directive,
            AgentKind::Escalonamento => &self.escalation_agent_directive,
            AgentKind::Feedback => &self.feedback_agent_directive,
        }
    }

    pub fn has_openai_api_key(&self) -> bool {
        !self.openai_api_key.trim().is_empty()
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("SUPPORT_DESK"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let mut inner: ConfigInner = cfg.build()?.try_deserialize()?;

        if !inner.has_openai_api_key() {
            inner.openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        }

        let result = Config { inner: Arc::new(inner) };

        result.validate()?;

        Ok(result)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Res<()> {
        if self.openai_temperature < 0.0 || self.openai_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI temperature must be between 0 and 2."));
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if !matches!(self.openai_reasoning_effort.to_lowercase().as_str(), "low" | "medium" | "high") {
            return Err(anyhow::anyhow!("OpenAI reasoning effort must be one of: low, medium, high."));
        }

        if self.agent_max_steps < 1 {
            return Err(anyhow::anyhow!("Agent max steps must be at least 1."));
        }

        if self.require_openai_api_key && !self.has_openai_api_key() {
            return Err(anyhow::anyhow!("An OpenAI API key is required (`SUPPORT_DESK_OPENAI_API_KEY` or `OPENAI_API_KEY`)."));
        }

        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_match_serde_defaults() {
        let deserialized = config::Config::builder().build().unwrap().try_deserialize::<ConfigInner>().unwrap();

        assert_eq!(deserialized, ConfigInner::default());

        let config = Config::default();

        assert_eq!(config.openai_model, "gpt-4.1-mini");
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.company_name, "SupportAI");
        assert_eq!(config.agent_directive(AgentKind::Feedback), prompts::FEEDBACK_AGENT_DIRECTIVE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            openai_api_key = "sk-test"
            openai_model = "gpt-4.1-nano"
            server_port = 9001
            company_name = "Acme"
            "#,
        );

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.openai_model, "gpt-4.1-nano");
        assert_eq!(config.server_port, 9001);
        assert_eq!(config.company_name, "Acme");
        assert_eq!(config.history_max_turns, 20);
    }

    #[test]
    fn test_load_rejects_out_of_range_temperature() {
        let file = write_config("openai_temperature = 3.5\n");

        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_validate_requires_key_when_asked() {
        let config = Config {
            inner: Arc::new(ConfigInner {
                require_openai_api_key: true,
                ..Default::default()
            }),
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_reasoning_effort() {
        let config = Config {
            inner: Arc::new(ConfigInner {
                openai_reasoning_effort: "extreme".to_string(),
                ..Default::default()
            }),
        };

        assert!(config.validate().is_err());
    }
}
