use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use backoff::ExponentialBackoffBuilder;
use serde::Serialize;
use tracing::{debug, trace};

use super::prompt::RenderedPrompt;
use super::reply::RawModelReply;
use super::schema::SchemaContract;
use crate::AppResult;
use crate::config::Config;
use crate::error::InvocationError;

/// Sends one prompt to the model and returns its reply unmodified.
pub trait ModelInvoker {
    async fn invoke(
        &self,
        prompt: &RenderedPrompt,
        contract: &SchemaContract,
        model: &str,
        temperature: f32,
    ) -> AppResult<RawModelReply>;
}

/// How the forced call is expressed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallMode {
    /// `tools` plus a named `tool_choice`.
    #[default]
    Tools,
    /// `functions` plus a named `function_call`, for older endpoints.
    LegacyFunctions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolDefinition<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a SchemaContract,
}

#[derive(Debug, Serialize)]
struct FunctionName<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct NamedToolChoice<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionName<'a>,
}

/// Chat completion request body with the call pinned to the contract.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<NamedToolChoice<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<Vec<&'a SchemaContract>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionName<'a>>,
    temperature: f32,
}

impl<'a> ChatRequest<'a> {
    pub(crate) fn new(
        prompt: &'a RenderedPrompt,
        contract: &'a SchemaContract,
        model: &'a str,
        temperature: f32,
        mode: CallMode,
    ) -> Self {
        let mut request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.as_str(),
            }],
            tools: None,
            tool_choice: None,
            functions: None,
            function_call: None,
            temperature,
        };
        match mode {
            CallMode::Tools => {
                request.tools = Some(vec![ToolDefinition {
                    kind: "function",
                    function: contract,
                }]);
                request.tool_choice = Some(NamedToolChoice {
                    kind: "function",
                    function: FunctionName {
                        name: &contract.name,
                    },
                });
            }
            CallMode::LegacyFunctions => {
                request.functions = Some(vec![contract]);
                request.function_call = Some(FunctionName {
                    name: &contract.name,
                });
            }
        }
        request
    }
}

/// The tool definition as it appears in a request, for display.
pub fn tool_definition(contract: &SchemaContract) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": contract,
    })
}

/// Rejects replies the normalizer cannot work with at all.
fn ensure_choices(reply: RawModelReply) -> Result<RawModelReply, InvocationError> {
    if reply.choices.is_empty() {
        Err(InvocationError::NoChoices)
    } else {
        Ok(reply)
    }
}

/// Model invoker backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiInvoker {
    client: Client<OpenAIConfig>,
    mode: CallMode,
}

impl OpenAiInvoker {
    /// Build the client. A missing API key fails here, before any request.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let api_key = config.api_key()?;
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = config.base_url() {
            debug!("Using API base {base_url}");
            openai_config = openai_config.with_api_base(base_url);
        }

        // The client retries rate limits by default; a zero budget turns that off.
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        let mut client = Client::with_config(openai_config).with_backoff(no_retry);

        if let Some(secs) = config.timeout_secs {
            let http_client = reqwest::Client::builder()
                .timeout(Duration::from_secs(secs))
                .build()
                .map_err(InvocationError::from)?;
            client = client.with_http_client(http_client);
        }

        let mode = if config.legacy_functions {
            CallMode::LegacyFunctions
        } else {
            CallMode::Tools
        };
        Ok(Self { client, mode })
    }
}

impl ModelInvoker for OpenAiInvoker {
    #[tracing::instrument(
        name = "Generating commit message",
        level = "info",
        skip(self, prompt, contract),
        fields(mode = ?self.mode)
    )]
    async fn invoke(
        &self,
        prompt: &RenderedPrompt,
        contract: &SchemaContract,
        model: &str,
        temperature: f32,
    ) -> AppResult<RawModelReply> {
        let request = ChatRequest::new(prompt, contract, model, temperature, self.mode);
        trace!("Request: {}", serde_json::to_string(&request)?);

        let reply: RawModelReply = self
            .client
            .chat()
            .create_byot(request)
            .await
            .map_err(InvocationError::from)?;
        debug!("AI Response: {:?}", reply);

        Ok(ensure_choices(reply)?)
    }
}
