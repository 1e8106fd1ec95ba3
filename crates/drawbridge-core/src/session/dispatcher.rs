//! Routes tool calls from the agent and reports their outcomes.
//!
//! Failures never propagate out of the dispatcher: every call produces
//! exactly one result, and a failure is encoded as an error result whose
//! text the agent can read and react to on its next turn.

use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use drawbridge_tools::result::{DisplayResult, EditResult, ToolResult};
use drawbridge_tools::schema::ToolCall;
use drawbridge_tools::tools::{DiagramTool, EDIT_DIAGRAM_TOOL_NAME, EditOperation};
use drawbridge_tools::ToolError;

use crate::canvas::{DiagramSurface, EXPORT_TIMEOUT, ExportGateway};
use crate::utils::xml;

pub struct ToolDispatcher {
    gateway: Arc<ExportGateway>,
    surface: Arc<dyn DiagramSurface>,
}

impl ToolDispatcher {
    pub fn new(gateway: Arc<ExportGateway>, surface: Arc<dyn DiagramSurface>) -> Self {
        Self { gateway, surface }
    }

    /// Execute one tool call. Must only be invoked once the call's input is
    /// fully available.
    #[instrument(skip(self, call), fields(tool = %call.name, call_id = %call.id))]
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let tool = match DiagramTool::parse(call) {
            Ok(tool) => tool,
            Err(e) => {
                warn!("rejected tool call: {e}");
                return ToolResult::Error(e);
            }
        };

        let result = match tool {
            // Rendering is driven elsewhere by the same event stream; the
            // agent only needs the acknowledgement.
            DiagramTool::Display(_) => ToolResult::Display(DisplayResult),
            DiagramTool::Edit(params) => match self.apply_edits(&params.edits).await {
                Ok(applied) => ToolResult::Edit(applied),
                Err(e) => {
                    error!("edit failed: {e}");
                    ToolResult::Error(ToolError::execution(EDIT_DIAGRAM_TOOL_NAME, e.to_string()))
                }
            },
        };

        debug!(result = result.variant_name(), "tool call resolved");
        result
    }

    /// Fetch the current snapshot, patch it, and hand the result to the
    /// renderer. The displayed diagram is untouched unless every step
    /// succeeds.
    async fn apply_edits(&self, edits: &[EditOperation]) -> crate::Result<EditResult> {
        let snapshot = self.gateway.fetch_current(EXPORT_TIMEOUT).await?;
        let patched = xml::apply_edits(&snapshot, edits)?;
        self.surface.load(&patched).await?;
        Ok(EditResult {
            edits_applied: edits.len(),
        })
    }
}
