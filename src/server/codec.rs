//! Message Codec
//!
//! Converts between the bytes exchanged with the host and structured messages.
//! Inbound commands arrive as one JSON object per read. Outbound replies are
//! JSON objects immediately followed by [`END_TOKEN`], because the pipe itself
//! carries no framing.

use crate::config::{END_TOKEN, MAX_MESSAGE_SIZE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, Read};
use thiserror::Error;

/// Error type for encoding and decoding messages
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes are not a complete JSON document
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed, but its root is not an object
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The read filled the whole buffer, so the document may have been cut short
    #[error("Message fills the {0}-byte read buffer and may be truncated")]
    Truncated(usize),

    /// Underlying channel error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended in the middle of a reply
    #[error("Stream ended inside an unterminated reply")]
    IncompleteFrame,
}

/// A decoded inbound document
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    fields: Map<String, Value>,
}

impl InboundMessage {
    /// Look up a top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Consume the message, returning its top-level fields
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for InboundMessage {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Decode one inbound document
///
/// Trailing NUL padding and whitespace are ignored. Anything else that is not
/// a single JSON object is an error.
///
/// # Arguments
/// * `bytes` - The bytes received from the command channel
///
/// # Returns
/// * `Result<InboundMessage, CodecError>` - The decoded message or a decode error
pub fn decode(bytes: &[u8]) -> Result<InboundMessage, CodecError> {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
    let value: Value = serde_json::from_slice(&bytes[..end])?;

    match value {
        Value::Object(fields) => Ok(InboundMessage { fields }),
        other => Err(CodecError::NotAnObject(json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// An outbound reply
///
/// A reply without `success` is a free-form progress message; with it, a
/// success or failure notification. Empty text is left out of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl Response {
    /// A progress message carrying only text
    pub fn message(text: &str) -> Self {
        Self {
            message: non_empty(text),
            success: None,
        }
    }

    /// A success or failure notification with optional text
    pub fn notification(success: bool, text: &str) -> Self {
        Self {
            message: non_empty(text),
            success: Some(success),
        }
    }

    /// Whether this reply carries an outcome flag
    pub fn is_notification(&self) -> bool {
        self.success.is_some()
    }

    /// The reply text, or an empty string
    pub fn text(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

/// Encode a reply and append the sentinel terminator
pub fn encode(response: &Response) -> Result<Vec<u8>, CodecError> {
    let mut bytes = serde_json::to_vec(response)?;
    bytes.extend_from_slice(END_TOKEN.as_bytes());
    Ok(bytes)
}

/// Splits a reply stream back into documents (host side)
///
/// Partial frames are buffered across reads, so replies may be split or
/// coalesced arbitrarily by the underlying channel.
pub struct ReplyReader<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: Read> ReplyReader<R> {
    /// Wrap a reader carrying framed replies
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    /// Read the next reply
    ///
    /// # Returns
    /// * `Ok(Some(Response))` - The next complete reply
    /// * `Ok(None)` - The stream ended cleanly between replies
    /// * `Err(CodecError)` - A read failed, a frame was not valid JSON, or the stream ended mid-frame
    pub fn next_reply(&mut self) -> Result<Option<Response>, CodecError> {
        let token = END_TOKEN.as_bytes();
        let mut chunk = [0u8; MAX_MESSAGE_SIZE];

        loop {
            if let Some(pos) = find(&self.pending, token) {
                let frame: Vec<u8> = self.pending.drain(..pos + token.len()).collect();
                let response = serde_json::from_slice(&frame[..pos])?;
                return Ok(Some(response));
            }

            let read = match self.inner.read(&mut chunk) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if read == 0 {
                return if self.pending.iter().all(u8::is_ascii_whitespace) {
                    Ok(None)
                } else {
                    Err(CodecError::IncompleteFrame)
                };
            }

            self.pending.extend_from_slice(&chunk[..read]);
        }
    }
}

impl<R: Read> Iterator for ReplyReader<R> {
    type Item = Result<Response, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_reply().transpose()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
