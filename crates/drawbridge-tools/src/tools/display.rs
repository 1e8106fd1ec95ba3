use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::ToolSchema;

pub const DISPLAY_DIAGRAM_TOOL_NAME: &str = "display_diagram";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DisplayDiagramParams {
    /// The complete XML of the diagram to display.
    pub xml: String,
}

pub fn schema() -> ToolSchema {
    ToolSchema {
        name: DISPLAY_DIAGRAM_TOOL_NAME.to_string(),
        display_name: "Display Diagram".to_string(),
        description: "Replace the current diagram with a complete new diagram, given as XML."
            .to_string(),
        input_schema: schemars::schema_for!(DisplayDiagramParams).into(),
    }
}
