//! The engine boundary traits and decoder configuration.

use std::path::Path;

use crate::{CpuModel, DecodeUnit, EngineCode, Errata, Event, Status};

/// Block decoder configuration.
#[derive(Clone, Copy, Debug)]
pub struct DecoderConfig<'buf> {
    /// Raw trace bytes. Borrowed by the decoder for its entire lifetime;
    /// the caller must keep the buffer alive until teardown.
    pub buf: &'buf [u8],
    pub cpu: CpuModel,
    pub errata: Errata,
    /// End blocks on call instructions.
    pub end_on_call: bool,
    /// End blocks on unconditional jump instructions.
    pub end_on_jump: bool,
}

impl<'buf> DecoderConfig<'buf> {
    /// The configuration used for basic-block recovery: blocks end on
    /// calls and on unconditional jumps. Conditional jumps do not end a
    /// block under this policy except where the engine reports one as the
    /// unit's terminating instruction.
    pub const fn block_recovery(buf: &'buf [u8], cpu: CpuModel, errata: Errata) -> Self {
        Self {
            buf,
            cpu,
            errata,
            end_on_call: true,
            end_on_jump: true,
        }
    }
}

/// Memory image mapping virtual address ranges to file-backed code, used by
/// the engine to resolve jump and call targets.
pub trait Image {
    /// Register `size` bytes of `path` starting at file `offset` as the
    /// code mapped at `vaddr`.
    fn add_file(&mut self, path: &Path, offset: u64, size: u64, vaddr: u64)
    -> Result<(), EngineCode>;
}

/// An allocated block-decoding session bound to one trace buffer.
///
/// Not safe for concurrent use.
pub trait BlockDecoder {
    type Image: Image;

    /// Synchronize forward to the first decodable point in the buffer.
    /// An empty stream is reported as `Err(Eos)`.
    fn sync_forward(&mut self) -> Result<Status, EngineCode>;

    /// Fetch the next pending stream event. Only valid while the last
    /// returned status had `EVENT_PENDING` set.
    fn next_event(&mut self) -> Result<(Event, Status), EngineCode>;

    /// Decode the next unit. End of stream is reported as `Err(Eos)`.
    fn next_unit(&mut self) -> Result<(DecodeUnit, Status), EngineCode>;

    /// Bind the memory image used to resolve control-flow targets. The
    /// decoder owns the image from this point on.
    fn set_image(&mut self, image: Self::Image) -> Result<(), EngineCode>;
}

/// Factory half of the engine boundary.
pub trait Engine {
    type Image: Image;
    type Decoder<'buf>: BlockDecoder<Image = Self::Image>
    where
        Self: 'buf;

    /// Identify the host CPU.
    fn detect_cpu(&self) -> Result<CpuModel, EngineCode>;

    /// Look up decode workarounds for `cpu`. Only called for a known
    /// vendor.
    fn cpu_errata(&self, cpu: &CpuModel) -> Result<Errata, EngineCode>;

    /// Allocate a block decoder over `config.buf`. `None` means resource
    /// exhaustion.
    fn new_decoder<'buf>(&self, config: DecoderConfig<'buf>) -> Option<Self::Decoder<'buf>>;

    /// Allocate an empty memory image. `None` means resource exhaustion.
    fn new_image(&self) -> Option<Self::Image>;
}
