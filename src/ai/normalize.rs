//! Turns a raw model reply into a validated [`CommitMessageDraft`].
//!
//! Two extraction stages run in order and each one recovers from its own
//! failures:
//!
//! 1. the first structured call (tool call or legacy function call), if it is
//!    named after the schema contract;
//! 2. the free-text content, either the interior of a ```` ```json ```` fence
//!    or the whole trimmed content.
//!
//! Both stages promote a parsed JSON value through the same [`accept`]
//! predicate. Only when neither yields a draft does normalization fail, with
//! [`AppError::MalformedReply`] carrying the raw message.

use std::fmt::{Display, Formatter};

use serde_json::Value;
use tracing::{debug, error, warn};

use super::commit_message::{CommitMessageDraft, CommitType};
use super::reply::{RawModelReply, ReplyShape};
use super::schema::SchemaContract;
use crate::{AppError, AppResult};

const JSON_FENCE_OPEN: &str = "```json\n";
const JSON_FENCE_CLOSE: &str = "\n```";

/// Why a parsed candidate was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotAnObject,
    MissingType,
    UnknownType(String),
    MissingTitle,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NotAnObject => write!(f, "candidate is not a JSON object"),
            Rejection::MissingType => write!(f, "`type` is missing or not a string"),
            Rejection::UnknownType(t) => write!(f, "`type` {t:?} is not an allowed commit type"),
            Rejection::MissingTitle => write!(f, "`title` is missing or empty"),
        }
    }
}

/// The minimum acceptance predicate.
///
/// A candidate passes when it is an object whose `type` names a
/// [`CommitType`] and whose `title` is a non-empty string. `scope` and
/// `description` are read leniently: a non-string or empty scope counts as
/// absent, and only string entries of an array `description` are kept.
pub fn accept(candidate: &Value) -> Result<CommitMessageDraft, Rejection> {
    let obj = candidate.as_object().ok_or(Rejection::NotAnObject)?;

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(Rejection::MissingType)?;
    let kind: CommitType = kind
        .parse()
        .map_err(|_| Rejection::UnknownType(kind.to_string()))?;

    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or(Rejection::MissingTitle)?;

    let scope = obj
        .get("scope")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let description = obj
        .get("description")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Ok(CommitMessageDraft {
        kind,
        scope,
        title: title.to_owned(),
        description,
    })
}

/// The JSON text to parse out of free-text content: the interior of the
/// first ```` ```json ```` fence when there is a closed one, otherwise the
/// whole content. The result is trimmed.
pub fn json_candidate(content: &str) -> &str {
    fenced_json(content).unwrap_or(content).trim()
}

fn fenced_json(content: &str) -> Option<&str> {
    let start = content.find(JSON_FENCE_OPEN)? + JSON_FENCE_OPEN.len();
    let rest = &content[start..];
    let end = rest.find(JSON_FENCE_CLOSE)?;
    Some(&rest[..end])
}

/// Stage 1: the first structured call, when it targets the contract.
fn from_structured_call(
    shape: &ReplyShape<'_>,
    contract: &SchemaContract,
) -> Option<CommitMessageDraft> {
    let Some(call) = shape.first_call() else {
        debug!("Reply carries no structured call");
        return None;
    };
    if !contract.is_named(&call.name) {
        debug!(
            "Skipping structured call to {:?}, expected {:?}",
            call.name, contract.name
        );
        return None;
    }
    let value: Value = match serde_json::from_str(&call.arguments) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse {} arguments as JSON: {e}", call.name);
            warn!("Raw arguments: {}", call.arguments);
            return None;
        }
    };
    match accept(&value) {
        Ok(draft) => Some(draft),
        Err(reason) => {
            warn!("Structured call arguments rejected: {reason}");
            None
        }
    }
}

/// Stage 2: JSON inside the free-text content.
fn from_content(shape: &ReplyShape<'_>) -> Option<CommitMessageDraft> {
    let Some(content) = shape.content() else {
        debug!("Reply carries no text content");
        return None;
    };
    let value: Value = match serde_json::from_str(json_candidate(content)) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse JSON from message content: {e}");
            warn!("Raw content: {content}");
            return None;
        }
    };
    match accept(&value) {
        Ok(draft) => Some(draft),
        Err(reason) => {
            warn!("Content JSON rejected: {reason}");
            None
        }
    }
}

/// Extract a validated draft from the reply, trying the structured call
/// before the text content.
#[tracing::instrument(name = "Reading the model reply", level = "debug", skip_all)]
pub fn normalize(
    reply: &RawModelReply,
    contract: &SchemaContract,
) -> AppResult<CommitMessageDraft> {
    let message = reply.first_message().cloned().unwrap_or_default();
    if let Some(refusal) = message.refusal.as_deref() {
        error!("AI refused prompt: {refusal}");
    }
    let shape = message.shape();

    if let Some(draft) = from_structured_call(&shape, contract) {
        debug!("Accepted commit message from structured call");
        return Ok(draft);
    }
    if let Some(draft) = from_content(&shape) {
        debug!("Accepted commit message from message content");
        return Ok(draft);
    }

    let raw = serde_json::to_string(&message)?;
    error!("No usable commit message in reply: {raw}");
    Err(AppError::MalformedReply { raw })
}
