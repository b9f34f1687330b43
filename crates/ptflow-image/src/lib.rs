//! Self-process memory image construction.
//!
//! Enumerates the loaded modules of the current process and registers every
//! loadable, executable segment with an engine memory image so decoded
//! branch targets can be resolved against real code bytes. The vDSO is
//! special: it has no backing file, so its pages are first materialized
//! into a caller-supplied sink file.

mod builder;
mod constants;
mod module;

pub use builder::*;
pub use constants::*;
pub use module::*;

use thiserror::Error;

/// Image construction errors.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("engine rejected segment registration: {0}")]
    Register(ptflow_engine::EngineCode),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ImageError>;
