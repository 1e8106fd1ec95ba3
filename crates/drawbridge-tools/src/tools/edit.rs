use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::ToolSchema;

pub const EDIT_DIAGRAM_TOOL_NAME: &str = "edit_diagram";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EditOperation {
    /// The exact fragment to find in the current diagram XML.
    pub search: String,
    /// The fragment to replace `search` with.
    pub replace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditDiagramParams {
    /// Edit operations to apply to the current diagram XML, in order.
    pub edits: Vec<EditOperation>,
}

pub fn schema() -> ToolSchema {
    ToolSchema {
        name: EDIT_DIAGRAM_TOOL_NAME.to_string(),
        display_name: "Edit Diagram".to_string(),
        description:
            "Modify the current diagram by applying search/replace edits to its XML, in order."
                .to_string(),
        input_schema: schemars::schema_for!(EditDiagramParams).into(),
    }
}
