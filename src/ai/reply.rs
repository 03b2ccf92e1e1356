//! The chat completion envelope as returned by the provider.
//!
//! Deserialization is deliberately loose: every field the pipeline does not
//! strictly need is optional, so providers that only approximate the OpenAI
//! format still produce a reply the normalizer can inspect.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawModelReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ReplyChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: ReplyMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Single call used by the legacy `functions` API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    /// JSON text, exactly as produced by the model.
    #[serde(default)]
    pub arguments: String,
}

/// What a reply message carries, so callers match on one value instead of
/// probing optional fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplyShape<'a> {
    /// Modern `tool_calls`, possibly with free text alongside.
    ToolCalls {
        calls: &'a [ToolCall],
        content: Option<&'a str>,
    },
    /// Legacy singular `function_call`, possibly with free text alongside.
    LegacyFunctionCall {
        call: &'a FunctionCall,
        content: Option<&'a str>,
    },
    ContentOnly(&'a str),
    Empty,
}

impl<'a> ReplyShape<'a> {
    /// The structured call the normalizer consults: the first tool call, or
    /// the legacy function call.
    pub fn first_call(&self) -> Option<&'a FunctionCall> {
        match self {
            ReplyShape::ToolCalls { calls, .. } => calls.first().map(|c| &c.function),
            ReplyShape::LegacyFunctionCall { call, .. } => Some(call),
            ReplyShape::ContentOnly(_) | ReplyShape::Empty => None,
        }
    }

    pub fn content(&self) -> Option<&'a str> {
        match self {
            ReplyShape::ToolCalls { content, .. }
            | ReplyShape::LegacyFunctionCall { content, .. } => *content,
            ReplyShape::ContentOnly(content) => Some(content),
            ReplyShape::Empty => None,
        }
    }
}

impl ReplyMessage {
    pub fn shape(&self) -> ReplyShape<'_> {
        let content = self.content.as_deref().filter(|c| !c.is_empty());
        match (&self.tool_calls, &self.function_call) {
            (Some(calls), _) if !calls.is_empty() => ReplyShape::ToolCalls { calls, content },
            (_, Some(call)) => ReplyShape::LegacyFunctionCall { call, content },
            _ => match content {
                Some(content) => ReplyShape::ContentOnly(content),
                None => ReplyShape::Empty,
            },
        }
    }
}

impl RawModelReply {
    /// The message of the first choice, if the provider sent any.
    pub fn first_message(&self) -> Option<&ReplyMessage> {
        self.choices.first().map(|c| &c.message)
    }
}
