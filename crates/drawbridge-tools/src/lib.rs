pub mod error;
pub mod result;
pub mod schema;
pub mod tools;

pub use error::ToolError;
pub use result::{DisplayResult, EditResult, ToolResult};
pub use schema::{InputSchema, ToolCall, ToolSchema};
pub use tools::DiagramTool;
