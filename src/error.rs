//! Error types for boltwire.

use thiserror::Error;

/// The main error type for boltwire operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// Malformed SQL detected before anything is sent.
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Parameter markers and bindings do not line up.
    #[error("Binding error: {0}")]
    Binding(String),

    /// The compressed block stream could not be decoded.
    #[error("Frame decode error: {0}")]
    FrameDecode(String),

    /// A cell could not be read under the requested kind.
    #[error("Cannot convert '{value}' to {target}: {reason}")]
    TypeCoercion {
        value: String,
        target: String,
        reason: String,
    },

    /// The response body does not follow the names/types/rows layout.
    #[error("Malformed result: {0}")]
    Malformed(String),

    /// The cursor is not positioned on a row.
    #[error("Cursor error: {0}")]
    CursorState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Create a syntax error at the given byte position.
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding(message.into())
    }

    pub fn frame(message: impl Into<String>) -> Self {
        Self::FrameDecode(message.into())
    }

    /// Create a coercion error for `value` read as `target`.
    pub fn coercion(
        value: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TypeCoercion {
            value: value.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn cursor(message: impl Into<String>) -> Self {
        Self::CursorState(message.into())
    }

    /// Frame errors travel through `std::io::Read`; recover them on the other side.
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<WireError>()) {
            match err.into_inner().map(|inner| inner.downcast::<WireError>()) {
                Some(Ok(wire)) => *wire,
                Some(Err(other)) => Self::Io(std::io::Error::other(other)),
                None => Self::malformed("empty io error"),
            }
        } else {
            Self::Io(err)
        }
    }

    /// Wrap into an `io::Error` so it can be returned from `Read` impls.
    pub(crate) fn into_io(self) -> std::io::Error {
        match self {
            Self::Io(err) => err,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

/// Result type alias for boltwire operations.
pub type WireResult<T> = Result<T, WireError>;
