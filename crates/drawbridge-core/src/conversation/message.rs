//! Message types for conversation representation.
//!
//! A `Message` carries an ordered list of `Part`s. Tool-call parts move
//! through a forward-only lifecycle: the input streams in, becomes
//! available, and finally the output is recorded.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

use drawbridge_tools::ToolResult;
use strum_macros::Display;

use crate::error::Error;

/// Role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Lifecycle of a tool-call part. Transitions are forward-only and
/// `OutputAvailable` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCallState {
    InputStreaming,
    InputAvailable,
    OutputAvailable,
}

impl ToolCallState {
    fn rank(self) -> u8 {
        match self {
            ToolCallState::InputStreaming => 0,
            ToolCallState::InputAvailable => 1,
            ToolCallState::OutputAvailable => 2,
        }
    }

    pub fn can_advance_to(self, next: ToolCallState) -> bool {
        next.rank() > self.rank()
    }
}

/// A single piece of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text {
        text: String,
    },
    File {
        media_type: String,
        /// Payload as a data URL, ready for transports that embed files inline.
        url: String,
    },
    ToolCall {
        name: String,
        id: String,
        input: Value,
        state: ToolCallState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<ToolResult>,
    },
}

/// A file staged on the session before a submission is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, BASE64.encode(&self.data))
    }

    pub fn into_part(self) -> Part {
        let url = self.to_data_url();
        Part::File {
            media_type: self.media_type,
            url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub timestamp: u64,
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            id: Self::generate_id("msg"),
            timestamp: Self::current_timestamp(),
            role,
            parts,
        }
    }

    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Role::User, parts)
    }

    pub fn assistant(parts: Vec<Part>) -> Self {
        Self::new(Role::Assistant, parts)
    }

    /// Helper to get current timestamp
    pub fn current_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    /// Helper to generate unique IDs
    pub fn generate_id(prefix: &str) -> String {
        use uuid::Uuid;
        format!("{}_{}", prefix, Uuid::now_v7())
    }

    /// Extract text content from the message
    pub fn extract_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::File { .. } | Part::ToolCall { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Append streamed text, extending the trailing text part if there is one.
    pub fn push_text_delta(&mut self, delta: &str) {
        if let Some(Part::Text { text }) = self.parts.last_mut() {
            text.push_str(delta);
        } else {
            self.parts.push(Part::Text {
                text: delta.to_string(),
            });
        }
    }

    /// Record that a tool call has started streaming its input.
    pub fn begin_tool_call(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.parts.push(Part::ToolCall {
            name: name.into(),
            id: id.into(),
            input: Value::Null,
            state: ToolCallState::InputStreaming,
            output: None,
        });
    }

    /// Mark a tool call's input as fully available. Creates the part if the
    /// transport never announced the call starting.
    pub fn ready_tool_call(
        &mut self,
        call_id: &str,
        name: &str,
        call_input: Value,
    ) -> Result<(), Error> {
        match self.tool_call_part_mut(call_id) {
            Some(Part::ToolCall { input, state, .. }) => {
                if !state.can_advance_to(ToolCallState::InputAvailable) {
                    return Err(Error::InvalidOperation(format!(
                        "tool call {call_id} cannot move from {state} back to input-available"
                    )));
                }
                *input = call_input;
                *state = ToolCallState::InputAvailable;
                Ok(())
            }
            _ => {
                self.parts.push(Part::ToolCall {
                    name: name.to_string(),
                    id: call_id.to_string(),
                    input: call_input,
                    state: ToolCallState::InputAvailable,
                    output: None,
                });
                Ok(())
            }
        }
    }

    /// Record a tool call's output, moving it to its terminal state.
    pub fn complete_tool_call(&mut self, call_id: &str, result: ToolResult) -> Result<(), Error> {
        match self.tool_call_part_mut(call_id) {
            Some(Part::ToolCall { state, output, .. }) => {
                if !state.can_advance_to(ToolCallState::OutputAvailable) {
                    return Err(Error::InvalidOperation(format!(
                        "tool call {call_id} already has output available"
                    )));
                }
                *state = ToolCallState::OutputAvailable;
                *output = Some(result);
                Ok(())
            }
            _ => Err(Error::InvalidOperation(format!(
                "no tool call {call_id} in message"
            ))),
        }
    }

    fn tool_call_part_mut(&mut self, call_id: &str) -> Option<&mut Part> {
        self.parts
            .iter_mut()
            .find(|part| matches!(part, Part::ToolCall { id, .. } if id == call_id))
    }
}
