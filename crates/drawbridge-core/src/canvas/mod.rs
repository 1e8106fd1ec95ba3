pub mod gateway;

pub use gateway::{EXPORT_TIMEOUT, ExportError, ExportGateway, ExportToken};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("renderer rejected snapshot: {message}")]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The external renderer that owns the diagram's serialized state.
///
/// The core never caches a canonical copy: it reads through
/// [`ExportGateway::fetch_current`] and writes through [`load`].
///
/// [`load`]: DiagramSurface::load
#[async_trait]
pub trait DiagramSurface: Send + Sync {
    /// Ask the renderer to export its current serialized state. The reply
    /// arrives asynchronously through [`ExportGateway::deliver`] with the
    /// same token.
    async fn request_export(&self, token: ExportToken);

    /// Replace the displayed diagram with `snapshot`.
    async fn load(&self, snapshot: &str) -> Result<(), LoadError>;

    /// Reset the diagram to its default state.
    async fn clear(&self);
}
