//! Scriptable engine double for tests.
//!
//! Plays back a fixed sequence of events, decode units and failures in
//! place of real hardware packet decoding. The trace buffer's contents are
//! not interpreted; only an empty buffer is meaningful (no sync point).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::{
    BlockDecoder, CpuModel, CpuVendor, DecodeUnit, DecoderConfig, Engine, EngineCode, Errata,
    Event, Image, Status,
};

/// One scripted decoder response, consumed front first.
#[derive(Clone, Copy, Debug)]
pub enum Step {
    /// `next_event` hands out this event.
    Event(Event),
    /// `next_event` fails with this code.
    EventFail(EngineCode),
    /// `next_unit` hands out this unit.
    Unit(DecodeUnit),
    /// `next_unit` fails with this code.
    UnitFail(EngineCode),
    /// Override the status reported alongside the preceding response (or by
    /// `sync_forward` when scripted first). Consumed with that report.
    Status(Status),
}

/// Engine double with scripted behavior.
///
/// Every decoder allocated from the same `FakeEngine` replays its own copy
/// of the script, so independent sessions stay independent.
#[derive(Clone, Debug, Default)]
pub struct FakeEngine {
    pub cpu: CpuModel,
    /// Forced failure for `detect_cpu`.
    pub cpu_fail: Option<EngineCode>,
    /// Forced failure for `cpu_errata`.
    pub errata_fail: Option<EngineCode>,
    /// Report allocation exhaustion from `new_decoder`.
    pub decoder_alloc_fails: bool,
    /// Report allocation exhaustion from `new_image`.
    pub image_alloc_fails: bool,
    /// Forced failure for `add_file` on allocated images.
    pub image_add_fail: Option<EngineCode>,
    /// Forced failure for `sync_forward`, e.g. a corrupt buffer header.
    pub sync_fail: Option<EngineCode>,
    /// The decoder script.
    pub script: Vec<Step>,
}

impl FakeEngine {
    /// An engine reporting a known Intel CPU that replays `script`.
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            cpu: CpuModel {
                vendor: CpuVendor::Intel,
                family: 6,
                model: 142,
                stepping: 10,
            },
            script,
            ..Self::default()
        }
    }
}

impl Engine for FakeEngine {
    type Image = FakeImage;
    type Decoder<'buf>
        = FakeDecoder<'buf>
    where
        Self: 'buf;

    fn detect_cpu(&self) -> Result<CpuModel, EngineCode> {
        match self.cpu_fail {
            Some(code) => Err(code),
            None => Ok(self.cpu),
        }
    }

    fn cpu_errata(&self, _cpu: &CpuModel) -> Result<Errata, EngineCode> {
        match self.errata_fail {
            Some(code) => Err(code),
            None => Ok(Errata::default()),
        }
    }

    fn new_decoder<'buf>(&self, config: DecoderConfig<'buf>) -> Option<FakeDecoder<'buf>> {
        if self.decoder_alloc_fails {
            return None;
        }
        Some(FakeDecoder {
            buf: config.buf,
            script: self.script.iter().copied().collect(),
            sync_fail: self.sync_fail,
            image: None,
        })
    }

    fn new_image(&self) -> Option<FakeImage> {
        if self.image_alloc_fails {
            return None;
        }
        Some(FakeImage {
            add_fail: self.image_add_fail,
            ..FakeImage::default()
        })
    }
}

/// Decoder double replaying the engine's script.
#[derive(Debug)]
pub struct FakeDecoder<'buf> {
    buf: &'buf [u8],
    script: VecDeque<Step>,
    sync_fail: Option<EngineCode>,
    /// The bound image, exposed for assertions.
    pub image: Option<FakeImage>,
}

impl FakeDecoder<'_> {
    /// Status describing what the next primitive call will find. A scripted
    /// status override is consumed here.
    fn head_status(&mut self) -> Status {
        if let Some(&Step::Status(status)) = self.script.front() {
            self.script.pop_front();
            return status;
        }
        match self.script.front() {
            None => Status::EOS,
            Some(Step::Event(_) | Step::EventFail(_)) => Status::EVENT_PENDING,
            Some(Step::Unit(_) | Step::UnitFail(_) | Step::Status(_)) => Status::OK,
        }
    }
}

impl BlockDecoder for FakeDecoder<'_> {
    type Image = FakeImage;

    fn sync_forward(&mut self) -> Result<Status, EngineCode> {
        if let Some(code) = self.sync_fail {
            return Err(code);
        }
        if self.buf.is_empty() || self.script.is_empty() {
            return Err(EngineCode::Eos);
        }
        Ok(self.head_status())
    }

    fn next_event(&mut self) -> Result<(Event, Status), EngineCode> {
        match self.script.pop_front() {
            Some(Step::Event(event)) => Ok((event, self.head_status())),
            Some(Step::EventFail(code)) => Err(code),
            Some(step) => {
                // Caller asked for an event with none pending.
                self.script.push_front(step);
                Err(EngineCode::Invalid)
            }
            None => Err(EngineCode::Eos),
        }
    }

    fn next_unit(&mut self) -> Result<(DecodeUnit, Status), EngineCode> {
        match self.script.pop_front() {
            Some(Step::Unit(unit)) => Ok((unit, self.head_status())),
            Some(Step::UnitFail(code)) => Err(code),
            Some(step) => {
                // Caller must drain pending events before decoding.
                self.script.push_front(step);
                Err(EngineCode::Invalid)
            }
            None => Err(EngineCode::Eos),
        }
    }

    fn set_image(&mut self, image: FakeImage) -> Result<(), EngineCode> {
        self.image = Some(image);
        Ok(())
    }
}

/// One registered file-backed range.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub offset: u64,
    pub size: u64,
    pub vaddr: u64,
}

/// Image double recording registered ranges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FakeImage {
    pub entries: Vec<ImageEntry>,
    /// Forced failure for `add_file`.
    pub add_fail: Option<EngineCode>,
}

impl Image for FakeImage {
    fn add_file(
        &mut self,
        path: &Path,
        offset: u64,
        size: u64,
        vaddr: u64,
    ) -> Result<(), EngineCode> {
        if let Some(code) = self.add_fail {
            return Err(code);
        }
        self.entries.push(ImageEntry {
            path: path.to_path_buf(),
            offset,
            size,
            vaddr,
        });
        Ok(())
    }
}
