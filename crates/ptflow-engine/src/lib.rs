//! Boundary types and traits for the external trace-decoding engine.
//!
//! Packet-level hardware trace decoding is an opaque collaborator; this
//! crate pins down the narrow interface the rest of the workspace drives:
//! CPU identification and errata lookup, block-decoder allocation over a
//! borrowed trace buffer, forward synchronization, the next-unit and
//! next-event primitives, and the memory image used to resolve control-flow
//! targets against file-backed code.
//!
//! [`fake`] provides a scriptable engine double for tests.

mod cpu;
mod engine;
mod event;
pub mod fake;
mod status;
mod unit;

pub use cpu::*;
pub use engine::*;
pub use event::*;
pub use status::*;
pub use unit::*;

use thiserror::Error;

/// Error codes reported by the decoding engine.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum EngineCode {
    #[error("internal decoder error")]
    Internal = 1,
    #[error("invalid argument")]
    Invalid = 2,
    #[error("decoder out of sync")]
    NoSync = 3,
    #[error("bad packet")]
    BadPacket = 4,
    #[error("bad decoder configuration")]
    BadConfig = 5,
    #[error("end of trace stream")]
    Eos = 6,
    #[error("trace buffer overflow")]
    Overflow = 7,
    #[error("no code mapped at address")]
    NoMap = 8,
}

impl EngineCode {
    /// Numeric code, for diagnostics.
    pub const fn code(self) -> i32 {
        self as i32
    }
}
