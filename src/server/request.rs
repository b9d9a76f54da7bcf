//! Request validation
//!
//! A decoded message is only dispatched when its shape is valid: a
//! `tool_calls` array whose every element carries a string `func`. Validation
//! is all-or-nothing, so no call of an invalid message ever runs.

use super::codec::InboundMessage;
use serde_json::{Map, Value};
use thiserror::Error;

/// Key in the command containing the function call information
pub const TOOL_CALLS_PROPERTY: &str = "tool_calls";
/// Key in a call containing the function's name
pub const FUNCTION_PROPERTY: &str = "func";
/// Key in a call containing the function's parameters
pub const PARAMETERS_PROPERTY: &str = "params";
/// Key in the command containing the context history
pub const MESSAGES_PROPERTY: &str = "messages";

/// Reasons a well-formed document is not a valid request
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("missing `tool_calls` property")]
    MissingToolCalls,

    #[error("`tool_calls` is not an array")]
    ToolCallsNotArray,

    #[error("tool call {0} has no string `func` property")]
    MissingFunction(usize),
}

/// One command invocation inside a request
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Command name as sent by the host
    pub name: String,
    /// Parameters, passed through verbatim; an empty object when absent
    pub params: Value,
}

impl Call {
    /// The name used for registry lookups
    pub fn command(&self) -> String {
        self.name.to_lowercase()
    }
}

/// A validated inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Calls in document order
    pub calls: Vec<Call>,
    /// Conversation history shared by every call; an empty object when absent
    pub context: Value,
}

impl TryFrom<InboundMessage> for Request {
    type Error = ShapeError;

    fn try_from(message: InboundMessage) -> Result<Self, Self::Error> {
        let mut fields = message.into_fields();

        let calls = match fields.remove(TOOL_CALLS_PROPERTY) {
            Some(Value::Array(calls)) => calls,
            Some(_) => return Err(ShapeError::ToolCallsNotArray),
            None => return Err(ShapeError::MissingToolCalls),
        };

        let calls = calls
            .into_iter()
            .enumerate()
            .map(|(index, call)| parse_call(index, call))
            .collect::<Result<Vec<_>, _>>()?;

        let context = fields
            .remove(MESSAGES_PROPERTY)
            .unwrap_or_else(|| Value::Object(Map::new()));

        Ok(Request { calls, context })
    }
}

fn parse_call(index: usize, value: Value) -> Result<Call, ShapeError> {
    let Value::Object(mut fields) = value else {
        return Err(ShapeError::MissingFunction(index));
    };

    let name = match fields.remove(FUNCTION_PROPERTY) {
        Some(Value::String(name)) => name,
        _ => return Err(ShapeError::MissingFunction(index)),
    };

    let params = fields
        .remove(PARAMETERS_PROPERTY)
        .unwrap_or_else(|| Value::Object(Map::new()));

    Ok(Call { name, params })
}
