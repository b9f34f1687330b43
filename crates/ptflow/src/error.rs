use thiserror::Error;

use ptflow_engine::EngineCode;
use ptflow_image::ImageError;

/// Decode errors.
#[derive(Error, Debug)]
pub enum Error {
    /// The decoding engine reported a failure; carries the engine's code
    /// for diagnostics.
    #[error("engine error: {0}")]
    Engine(EngineCode),
    /// A system call failed while building the memory image.
    #[error("OS error: {0}")]
    Os(#[source] std::io::Error),
    /// Resource exhaustion with no further detail.
    #[error("unknown error")]
    Unknown,
    /// The engine broke this library's assumptions: an unexpected status,
    /// an event kind it was never configured to emit, a truncated or empty
    /// decode unit. This indicates a bug in the engine or in this crate,
    /// not a runtime condition; callers should not retry.
    #[error("engine contract violation: {0}")]
    Contract(String),
}

impl Error {
    /// Whether this is the distinguished trace-buffer-overflow failure:
    /// the trace lost packets and is unusable, but the process is fine.
    /// Capturing a fresh trace is a reasonable response.
    pub const fn is_overflow(&self) -> bool {
        matches!(self, Self::Engine(EngineCode::Overflow))
    }

    pub(crate) fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }
}

impl From<ImageError> for Error {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Register(code) => Self::Engine(code),
            ImageError::Io(err) => Self::Os(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
