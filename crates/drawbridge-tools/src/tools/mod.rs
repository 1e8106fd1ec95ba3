pub mod display;
pub mod edit;

pub use display::{DISPLAY_DIAGRAM_TOOL_NAME, DisplayDiagramParams};
pub use edit::{EDIT_DIAGRAM_TOOL_NAME, EditDiagramParams, EditOperation};

use crate::error::ToolError;
use crate::schema::{ToolCall, ToolSchema};

/// The closed set of tools the agent may invoke, with decoded parameters.
///
/// Dispatching over this enum (rather than matching on name strings at
/// every call site) keeps the supported-tool set exhaustiveness-checked.
#[derive(Debug, Clone)]
pub enum DiagramTool {
    Display(DisplayDiagramParams),
    Edit(EditDiagramParams),
}

impl DiagramTool {
    /// Decode a raw tool call into a typed tool invocation.
    pub fn parse(call: &ToolCall) -> Result<Self, ToolError> {
        match call.name.as_str() {
            DISPLAY_DIAGRAM_TOOL_NAME => serde_json::from_value(call.parameters.clone())
                .map(DiagramTool::Display)
                .map_err(|e| ToolError::invalid_params(DISPLAY_DIAGRAM_TOOL_NAME, e.to_string())),
            EDIT_DIAGRAM_TOOL_NAME => serde_json::from_value(call.parameters.clone())
                .map(DiagramTool::Edit)
                .map_err(|e| ToolError::invalid_params(EDIT_DIAGRAM_TOOL_NAME, e.to_string())),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiagramTool::Display(_) => DISPLAY_DIAGRAM_TOOL_NAME,
            DiagramTool::Edit(_) => EDIT_DIAGRAM_TOOL_NAME,
        }
    }

    /// Schemas for every supported tool, for transports that advertise them.
    pub fn schemas() -> Vec<ToolSchema> {
        vec![display::schema(), edit::schema()]
    }
}
