// Core orchestration for the diagram chat agent, without UI dependencies

pub mod canvas;
pub mod conversation;
pub mod error;
pub mod session;
pub mod test_utils;
pub mod transport;
pub mod utils;

pub use error::{Error, Result};
pub use session::{ChatSession, SessionStatus};
