//! Decides whether the agent's turn should resume with no new human input.

use crate::conversation::{Message, Part, Role, ToolCallState};

/// True when the last message is an assistant message whose tool calls all
/// have output available, and there is at least one tool call.
///
/// The agent keeps running while it has tool results to react to, but a
/// plain text turn means it is done and must wait for a human; continuing
/// on text-only turns would loop forever.
pub fn should_continue(history: &[Message]) -> bool {
    let Some(last) = history.last() else {
        return false;
    };
    if last.role != Role::Assistant {
        return false;
    }

    let mut saw_tool_call = false;
    let mut all_complete = true;
    for part in &last.parts {
        if let Part::ToolCall { state, .. } = part {
            saw_tool_call = true;
            if *state != ToolCallState::OutputAvailable {
                all_complete = false;
            }
        }
    }

    saw_tool_call && all_complete
}
