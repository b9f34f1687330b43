//! Decoding session: initialization, the event/block state machine and
//! teardown.

use tracing::{debug, trace};

use ptflow_engine::{BlockDecoder, DecoderConfig, Engine, EngineCode, Errata, Event, Status};
use ptflow_image::{Module, VdsoSink, build_image, self_modules};

use crate::block::Block;
use crate::error::{Error, Result};

/// A block-decoding session over one trace buffer.
///
/// Not safe for concurrent use; parallel decodes need independent sessions
/// over independent buffer/image pairs. The trace buffer and the vDSO sink
/// file are caller-owned and must outlive the session. The bound memory
/// image and the engine's decoder state are owned here and released exactly
/// once, on drop.
pub struct Session<'buf, E: Engine + 'buf> {
    decoder: E::Decoder<'buf>,
    status: Status,
    done: bool,
}

impl<'buf, E: Engine + 'buf> Session<'buf, E> {
    /// Set up block decoding over `buf`, building the memory image from
    /// the current process's loaded modules.
    ///
    /// An empty trace stream is not an init failure; the first call to
    /// [`Session::next_block`] reports end of stream.
    pub fn init(engine: &E, buf: &'buf [u8], vdso_sink: VdsoSink<'_>) -> Result<Self> {
        let modules = self_modules().map_err(Error::Os)?;
        Self::init_with_modules(engine, buf, &modules, vdso_sink)
    }

    /// Like [`Session::init`], but over an explicit module list. Module
    /// enumeration is the only initialization step that depends on the
    /// live process, so this is the deterministic entry point for tests.
    pub fn init_with_modules(
        engine: &E,
        buf: &'buf [u8],
        modules: &[Module],
        mut vdso_sink: VdsoSink<'_>,
    ) -> Result<Self> {
        let cpu = engine.detect_cpu().map_err(Error::Engine)?;
        debug!(?cpu, "detected CPU");

        // Work around decode bugs of the identified model. An unrecognized
        // vendor has no errata table to consult.
        let errata = if cpu.is_known() {
            engine.cpu_errata(&cpu).map_err(Error::Engine)?
        } else {
            Errata::default()
        };
        if !errata.is_empty() {
            debug!(?errata, "applied CPU errata");
        }

        let config = DecoderConfig::block_recovery(buf, cpu, errata);
        let mut decoder = engine.new_decoder(config).ok_or(Error::Unknown)?;

        let status = match decoder.sync_forward() {
            // No decodable packets in the stream. Deferred: the caller
            // finds out on the first next_block call.
            Err(EngineCode::Eos) => Status::EOS,
            Err(code) => return Err(Error::Engine(code)),
            Ok(status) => status,
        };
        trace!(?status, "synchronized decoder");

        let mut image = engine.new_image().ok_or(Error::Unknown)?;
        build_image(&mut image, modules, &mut vdso_sink)?;
        decoder.set_image(image).map_err(Error::Engine)?;
        debug!(modules = modules.len(), "bound memory image");

        Ok(Self {
            decoder,
            status,
            done: false,
        })
    }

    /// Reconstruct the next basic block.
    ///
    /// Returns `Ok(None)` once the end of the stream is reached; the
    /// session stays exhausted afterwards, including after an error.
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if self.done {
            return Ok(None);
        }
        match self.advance() {
            Ok(Some(block)) => Ok(Some(block)),
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(err) => {
                self.done = true;
                Err(err)
            }
        }
    }

    fn advance(&mut self) -> Result<Option<Block>> {
        // Pending events always outrank block data: they describe stream
        // state changes that precede the blocks following them.
        self.drain_events()?;
        if self.status.eos() {
            return Ok(None);
        }
        if self.status == Status::IP_SUPPRESSED {
            // Suppression only qualifies the previously reported IP; it
            // carries nothing into the next block.
            trace!("entry IP suppressed");
            self.status = Status::OK;
        } else if !self.status.is_ok() {
            return Err(Error::contract(format!(
                "unexpected decoder status after event drain: {:?}",
                self.status
            )));
        }

        // The engine may hand back a partial unit for a single logical
        // block. Record the first unit's start address, then keep pulling
        // units until one ends in a control-transfer instruction.
        let mut first_instr = None;
        loop {
            self.drain_events()?;
            if self.status.eos() {
                return Ok(None);
            }
            if !self.status.is_ok() && self.status != Status::EVENT_PENDING {
                return Err(Error::contract(format!(
                    "unexpected decoder status before unit fetch: {:?}",
                    self.status
                )));
            }

            let (unit, status) = match self.decoder.next_unit() {
                // The unit fetch reports end of stream as an error code,
                // but mid-assembly it is still a clean end.
                Err(EngineCode::Eos) => return Ok(None),
                Err(code) => return Err(Error::Engine(code)),
                Ok(ok) => ok,
            };
            self.status = status;

            if unit.truncated {
                // A unit cut short at a section boundary. Stitching these
                // is not implemented; a well-configured engine should not
                // produce them for self-process images.
                return Err(Error::contract("truncated decode unit"));
            }
            if unit.ninsn == 0 {
                return Err(Error::contract("decode unit with zero instructions"));
            }

            let first = *first_instr.get_or_insert(unit.ip);
            if unit.iclass.terminates_block() {
                trace!(
                    first_instr = first,
                    last_instr = unit.end_ip,
                    iclass = ?unit.iclass,
                    "assembled block"
                );
                return Ok(Some(Block::new(first, unit.end_ip)));
            }
            trace!(ip = unit.ip, "partial unit, block continues");
        }
    }

    /// Consume pending stream events, updating the decoder status.
    ///
    /// Benign events are logged and dropped. An overflow means the trace
    /// lost packets and fails the operation; any event kind the decoder
    /// was never configured to emit is a contract violation.
    fn drain_events(&mut self) -> Result<()> {
        while self.status.event_pending() {
            let (event, status) = self.decoder.next_event().map_err(Error::Engine)?;
            self.status = status;
            match event {
                Event::Overflow => {
                    return Err(Error::Engine(EngineCode::Overflow));
                }
                Event::Other(kind) => {
                    return Err(Error::contract(format!(
                        "event type {kind} the decoder was not configured to emit"
                    )));
                }
                event => trace!(?event, "consumed stream event"),
            }
        }
        Ok(())
    }

    /// Release the session. Dropping it has the same effect; this exists
    /// for callers that want teardown to be explicit.
    pub fn free(self) {}

    /// Iterate the remaining blocks. Yields each block in order, then at
    /// most one terminal error, then fuses.
    pub fn blocks(self) -> Blocks<'buf, E> {
        Blocks { session: self }
    }
}

/// Fused block iterator over a session.
pub struct Blocks<'buf, E: Engine + 'buf> {
    session: Session<'buf, E>,
}

impl<'buf, E: Engine + 'buf> Iterator for Blocks<'buf, E> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.session.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
