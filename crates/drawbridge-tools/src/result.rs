use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Core enum for all tool results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolResult {
    Display(DisplayResult),
    Edit(EditResult),

    // Failure (any tool)
    Error(ToolError),
}

/// Result for the display tool. The rendering itself happens elsewhere;
/// this only acknowledges the request to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayResult;

/// Result for the edit tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditResult {
    pub edits_applied: usize,
}

impl From<DisplayResult> for ToolResult {
    fn from(r: DisplayResult) -> Self {
        Self::Display(r)
    }
}

impl From<EditResult> for ToolResult {
    fn from(r: EditResult) -> Self {
        Self::Edit(r)
    }
}

impl From<ToolError> for ToolResult {
    fn from(e: ToolError) -> Self {
        Self::Error(e)
    }
}

impl ToolResult {
    /// Format the result for LLM consumption
    pub fn llm_format(&self) -> String {
        match self {
            ToolResult::Display(_) => "Successfully displayed the diagram.".to_string(),
            ToolResult::Edit(r) => format!(
                "Successfully applied {} edit(s) to the diagram.",
                r.edits_applied
            ),
            ToolResult::Error(e) => format!("Error: {e}"),
        }
    }

    /// Get the variant name as a string for metadata
    pub fn variant_name(&self) -> &'static str {
        match self {
            ToolResult::Display(_) => "Display",
            ToolResult::Edit(_) => "Edit",
            ToolResult::Error(_) => "Error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error(_))
    }
}
