mod message;

pub use message::{Attachment, Message, Part, Role, ToolCallState};
