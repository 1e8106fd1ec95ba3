use thiserror::Error;

use crate::canvas::{ExportError, LoadError};
use crate::transport::TransportError;
use crate::utils::xml::PatchError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
