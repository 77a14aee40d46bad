//! OpenAI implementation of the LLM client, on the Responses API.

use std::{future::Future, sync::Arc, time::Duration};

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ReasoningEffort,
        responses::{Content, CreateResponseArgs, FunctionArgs, Input, InputItem, InputMessageArgs, OutputContent, ReasoningConfigArgs, Response, Role, ToolDefinition},
    },
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::base::{
    config::Config,
    model::{ChatRole, ChatTurn},
    types::{AgentContext, Res, ToolCall, ToolSpec},
};

use super::{GenericLlmClient, LlmClient, ToolCallback};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Build the agent input: the recent history, then the new user message.
    #[instrument(name = "OpenAiLlmClient::build_agent_input", skip_all)]
    fn build_agent_input(&self, context: &AgentContext) -> Res<Input> {
        let skip = context.history.len().saturating_sub(self.config.history_max_turns);

        let mut items = context.history.iter().skip(skip).map(build_history_item).collect::<Res<Vec<_>>>()?;

        items.push(InputItem::Message(InputMessageArgs::default().role(Role::User).content(context.user_message.clone()).build()?));

        Ok(Input::Items(items))
    }

    /// Helper function to make OpenAI API calls with retry logic and timeout handling.
    async fn call_openai_api(&self, request_builder: CreateResponseArgs) -> Res<Response> {
        const MAX_RETRIES: u32 = 3;
        const TIMEOUT: u64 = 120; // OpenAI can be slow, especially with reasoning models
        const RETRY_DELAY_MS: u64 = 1000;

        let mut retries = 0;

        loop {
            let request = request_builder.build()?;
            let result = timeout(Duration::from_secs(TIMEOUT), self.client.responses().create(request)).await;

            match result {
                Ok(Ok(response)) => {
                    info!("OpenAI API call succeeded after {} attempts", retries + 1);
                    return Ok(response);
                }
                Ok(Err(err)) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow::anyhow!("OpenAI API call failed after {MAX_RETRIES} retries: {err}"));
                    }
                    retries += 1;
                    warn!("OpenAI API call failed, retrying {retries}/{MAX_RETRIES}: {err}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
                Err(_) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow::anyhow!("OpenAI API call timed out after {MAX_RETRIES} attempts"));
                    }
                    retries += 1;
                    warn!("OpenAI API call timed out, retrying {retries}/{MAX_RETRIES}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::get_agent_response", skip_all, fields(agent = %context.agent))]
    async fn get_agent_response(&self, context: &AgentContext, tool_callback: ToolCallback) -> Res<String> {
        let request = self.build_agent_request(context)?;

        run_tool_loop(request, self.config.agent_max_steps, &context.agent, &tool_callback, move |request| self.call_openai_api(request)).await
    }
}

impl OpenAiLlmClient {
    /// Prepare the _initial_ request of an agent run.
    fn build_agent_request(&self, context: &AgentContext) -> Res<CreateResponseArgs> {
        let input = self.build_agent_input(context)?;
        let tools = build_tool_definitions(&context.tools)?;

        let mut request = CreateResponseArgs::default();

        request
            .max_output_tokens(self.config.openai_max_tokens)
            .model(&self.config.openai_model)
            .instructions(context.directive.clone())
            .input(input);

        if !tools.is_empty() {
            request.tools(tools);
        }

        // Add the temperature for the non-reasoning models.
        if self.config.openai_model.starts_with("gpt") {
            request.temperature(self.config.openai_temperature);
        }

        // Add the reasoning effort for `o` models.
        if self.config.openai_model.starts_with("o") {
            let reasoning_effort = parse_openai_reasoning_effort(&self.config.openai_reasoning_effort)?;
            request.reasoning(ReasoningConfigArgs::default().effort(reasoning_effort).build()?);
        }

        Ok(request)
    }
}

/// Send the request, run the tools the model asks for, and feed their outputs
/// back, until the model answers with text or `max_steps` responses were used.
async fn run_tool_loop<F, Fut>(mut request: CreateResponseArgs, max_steps: u32, agent: &str, tool_callback: &ToolCallback, mut send: F) -> Res<String>
where
    F: FnMut(CreateResponseArgs) -> Fut + Send,
    Fut: Future<Output = Res<Response>> + Send,
{
    for step in 1..=max_steps {
        let response = send(request.clone()).await?;
        let (text, calls) = parse_openai_response(&response)?;

        if calls.is_empty() {
            info!("Agent finished after {step} steps");
            return Ok(text);
        }

        info!("Model requested {} tool calls", calls.len());

        let outputs = tool_callback(calls).await?;
        let items = outputs
            .into_iter()
            .map(|output| {
                InputItem::Custom(serde_json::json!({
                    "type": "function_call_output",
                    "call_id": output.call_id,
                    "output": output.output,
                }))
            })
            .collect::<Vec<_>>();

        request.previous_response_id(&response.id).input(Input::Items(items));
    }

    Err(anyhow::anyhow!("Agent `{agent}` did not answer within {max_steps} steps."))
}

/// Parse an OpenAI response into its text and any requested tool calls.
#[instrument(skip_all)]
pub fn parse_openai_response(response: &Response) -> Res<(String, Vec<ToolCall>)> {
    let mut texts = Vec::new();
    let mut calls = Vec::new();

    info!("LLM response has {} outputs.", response.output.len());
    for output in &response.output {
        match output {
            OutputContent::Message(message) => {
                for message_content in &message.content {
                    match message_content {
                        Content::OutputText(text) => texts.push(text.text.clone()),
                        Content::Refusal(reason) => {
                            return Err(anyhow::anyhow!("Request refused: {reason:#?}"));
                        }
                    }
                }
            }
            OutputContent::FunctionCall(function_call) => {
                info!("Tool `{}` called ...", function_call.name);

                calls.push(ToolCall {
                    call_id: function_call.call_id.clone(),
                    name: function_call.name.clone(),
                    arguments: function_call.arguments.clone(),
                });
            }
            _ => {
                warn!("Unknown output: {output:#?}");
            }
        }
    }

    Ok((texts.join("\n\n"), calls))
}

/// Convert a history turn into a Responses API input message.
fn build_history_item(turn: &ChatTurn) -> Res<InputItem> {
    let role = match turn.role {
        ChatRole::User => Role::User,
        ChatRole::Assistant => Role::Assistant,
    };

    Ok(InputItem::Message(InputMessageArgs::default().role(role).content(turn.content.clone()).build()?))
}

/// Convert tool specs into OpenAI function tools.
fn build_tool_definitions(tools: &[ToolSpec]) -> Res<Vec<ToolDefinition>> {
    tools
        .iter()
        .map(|tool| -> Res<ToolDefinition> {
            Ok(ToolDefinition::Function(
                FunctionArgs::default()
                    .name(tool.name.clone())
                    .description(tool.description.clone())
                    .parameters(tool.parameters.clone())
                    .build()?,
            ))
        })
        .collect()
}

/// Convert a string reasoning effort to ReasoningEffort enum.
fn parse_openai_reasoning_effort(effort: &str) -> Res<ReasoningEffort> {
    match effort.to_lowercase().as_str() {
        "low" => Ok(ReasoningEffort::Low),
        "medium" => Ok(ReasoningEffort::Medium),
        "high" => Ok(ReasoningEffort::High),
        _ => Err(crate::base::types::Err::msg(format!("Invalid reasoning effort: {effort}. Must be one of: low, medium, high"))),
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{config::ConfigInner, types::ToolOutput};
    use crate::service::llm::ToolFuture;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_test_config(history_max_turns: usize) -> Config {
        Config {
            inner: Arc::new(ConfigInner {
                openai_api_key: "sk-test".to_string(),
                history_max_turns,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_parse_reasoning_effort() {
        assert!(matches!(parse_openai_reasoning_effort("HIGH").unwrap(), ReasoningEffort::High));
        assert!(parse_openai_reasoning_effort("max").is_err());
    }

    #[test]
    fn test_build_agent_input_keeps_recent_history() {
        let client = OpenAiLlmClient::new(&create_test_config(2));
        let context = AgentContext {
            agent: "InitialContactAgent".to_string(),
            directive: "Be helpful.".to_string(),
            history: vec![ChatTurn::user("primeira"), ChatTurn::assistant("segunda", None), ChatTurn::user("terceira")],
            user_message: "quarta".to_string(),
            tools: Vec::new(),
        };

        let Input::Items(items) = client.build_agent_input(&context).unwrap() else {
            panic!("Expected input items.");
        };

        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_build_tool_definitions() {
        let tools = vec![ToolSpec {
            name: "search_faq".to_string(),
            description: "Search the FAQ.".to_string(),
            parameters: serde_json::json!({ "type": "object", "properties": { "query": { "type": "string" } }, "required": ["query"] }),
        }];

        let definitions = build_tool_definitions(&tools).unwrap();

        assert_eq!(definitions.len(), 1);
        assert!(matches!(&definitions[0], ToolDefinition::Function(f) if f.name == "search_faq"));
    }

    fn response(id: &str, output: Value) -> Response {
        serde_json::from_value(json!({
            "id": id,
            "object": "response",
            "created_at": 0,
            "model": "gpt-4.1-mini",
            "status": "completed",
            "output": output,
        }))
        .unwrap()
    }

    fn message(content: Value) -> Value {
        json!({ "type": "message", "id": "msg_1", "role": "assistant", "status": "completed", "content": content })
    }

    fn output_text(text: &str) -> Value {
        json!({ "type": "output_text", "text": text, "annotations": [] })
    }

    fn function_call(call_id: &str, name: &str, arguments: &str) -> Value {
        json!({ "type": "function_call", "id": format!("fc_{call_id}"), "call_id": call_id, "name": name, "arguments": arguments, "status": "completed" })
    }

    fn echo_callback(counter: Arc<AtomicUsize>) -> ToolCallback {
        Box::new(move |calls| -> ToolFuture {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(calls
                    .into_iter()
                    .map(|call| ToolOutput {
                        call_id: call.call_id,
                        output: format!("resultado de {}", call.name),
                    })
                    .collect())
            })
        })
    }

    #[test]
    fn test_parse_response_with_text_and_function_call() {
        let response = response(
            "resp_1",
            json!([message(json!([output_text("Olá")])), function_call("call_1", "search_faq", r#"{"query":"pagamento"}"#)]),
        );

        let (text, calls) = parse_openai_response(&response).unwrap();

        assert_eq!(text, "Olá");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].call_id, "call_1");
        assert_eq!(calls[0].name, "search_faq");
        assert_eq!(calls[0].arguments, r#"{"query":"pagamento"}"#);
    }

    #[test]
    fn test_parse_response_joins_texts() {
        let response = response("resp_1", json!([message(json!([output_text("Primeiro."), output_text("Segundo.")]))]));

        let (text, calls) = parse_openai_response(&response).unwrap();

        assert_eq!(text, "Primeiro.\n\nSegundo.");
        assert!(calls.is_empty());
    }

    #[test]
    fn test_parse_response_refusal_is_an_error() {
        let response = response("resp_1", json!([message(json!([{ "type": "refusal", "refusal": "Não posso ajudar." }]))]));

        let err = parse_openai_response(&response).unwrap_err();

        assert!(err.to_string().contains("Request refused"));
    }

    #[tokio::test]
    async fn test_tool_loop_sends_outputs_back_with_previous_response() {
        let mut replies = vec![
            response("resp_1", json!([function_call("call_1", "check_order_status", r#"{"order_id":"12345"}"#)])),
            response("resp_2", json!([message(json!([output_text("Seu pedido está a caminho.")]))])),
        ]
        .into_iter();
        let mut sent = Vec::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let text = run_tool_loop(CreateResponseArgs::default(), 5, "OrderAgent", &echo_callback(counter.clone()), |request: CreateResponseArgs| {
            sent.push(request.build().unwrap());
            let reply = replies.next().ok_or_else(|| anyhow::anyhow!("No more replies."));
            async move { reply }
        })
        .await
        .unwrap();

        assert_eq!(text, "Seu pedido está a caminho.");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].previous_response_id, None);
        assert_eq!(sent[1].previous_response_id.as_deref(), Some("resp_1"));

        let Input::Items(items) = &sent[1].input else {
            panic!("Expected input items.");
        };

        assert_eq!(items.len(), 1);
        let InputItem::Custom(item) = &items[0] else {
            panic!("Expected a function call output.");
        };
        assert_eq!(item["type"], "function_call_output");
        assert_eq!(item["call_id"], "call_1");
        assert_eq!(item["output"], "resultado de check_order_status");
    }

    #[tokio::test]
    async fn test_tool_loop_stops_after_max_steps() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut requests = 0;

        let err = run_tool_loop(CreateResponseArgs::default(), 3, "OrderAgent", &echo_callback(counter.clone()), |_request: CreateResponseArgs| {
            requests += 1;
            let reply = response(&format!("resp_{requests}"), json!([function_call("call_1", "search_faq", "{}")]));
            async move { Ok(reply) }
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("did not answer within 3 steps"));
        assert_eq!(requests, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_tool_loop_propagates_send_errors() {
        let counter = Arc::new(AtomicUsize::new(0));

        let result = run_tool_loop(CreateResponseArgs::default(), 3, "OrderAgent", &echo_callback(counter.clone()), |_request: CreateResponseArgs| async {
            Err(anyhow::anyhow!("OpenAI API call timed out"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
