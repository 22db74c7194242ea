use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, FennError>;

/// Errors surfaced to callers of the engine and the terminal front end.
///
/// Structural and normalization problems (a malformed entry path, a status
/// path that matches no node) never become errors; they are logged and
/// counted in the corresponding report instead.
#[derive(Debug, Error)]
pub enum FennError {
    /// I/O errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The workspace root does not exist.
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The selection backend rejected a load/select/deselect/clear request.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// `load()` was called after the selection had already been mounted.
    #[error("Selection already mounted; wholesale reload is not permitted")]
    AlreadyMounted,

    /// Selection file could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl FennError {
    /// Build a persistence error from anything displayable.
    pub fn persistence(msg: impl std::fmt::Display) -> Self {
        FennError::Persistence(msg.to_string())
    }
}
