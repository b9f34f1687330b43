//! ptflow - control-flow reconstruction from hardware execution traces.
//!
//! Recovers the sequence of executed basic blocks from a raw hardware
//! trace byte stream. Packet-level decoding is delegated to an external
//! engine behind the narrow [`Engine`] boundary; this crate drives it: it
//! builds a memory image of the current process so branch targets can be
//! resolved against real code, synchronizes a block decoder over the
//! caller's trace buffer, and assembles possibly-fragmented decode units
//! into whole basic blocks, one per [`Session::next_block`] call.
//!
//! # Example
//!
//! ```ignore
//! use ptflow::{Session, VdsoSink};
//!
//! let sink = VdsoSink { file: &mut vdso_file, path: &vdso_path };
//! let mut session = Session::init(&engine, &trace_buf, sink)?;
//! while let Some(block) = session.next_block()? {
//!     println!("{:#x}..{:#x}", block.first_instr(), block.last_instr());
//! }
//! ```

// Re-export from sub-crates
pub use ptflow_engine::{
    BlockDecoder, CpuModel, CpuVendor, DecodeUnit, DecoderConfig, Engine, EngineCode, Errata,
    Event, Image, InsnClass, Status, fake,
};
pub use ptflow_image::{ImageError, Module, ProgramHeader, VdsoSink, build_image, self_modules};

mod block;
mod error;
mod session;

pub use block::Block;
pub use error::{Error, Result};
pub use session::{Blocks, Session};
