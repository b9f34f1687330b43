//! Stream events embedded in the trace packet stream.

/// A single packet-level notification describing a CPU state change
/// unrelated to plain instruction flow.
///
/// Events are ephemeral: fetched, classified and dropped. They are never
/// stored across state-machine steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Tracing was enabled. Expected at the start of a trace and after
    /// e.g. a context switch.
    Enabled,
    /// Tracing was disabled. Expected at the end of a trace.
    Disabled,
    /// Tracing was disabled asynchronously.
    AsyncDisabled,
    /// The trace ring buffer wrapped before it was drained; packets were
    /// probably lost.
    Overflow,
    /// 16/32/64-bit execution mode change.
    ExecMode,
    /// Hardware transactional memory start/commit/abort marker.
    Tsx,
    /// The core went to sleep, e.g. on entering a deep C-state.
    ExecStop,
    /// A hardware thread was woken by an MWAIT monitor.
    MwaitWake,
    /// C-state region entry.
    PowerEntry,
    /// C-state region exit, back to C0.
    PowerExit,
    /// Core clock ratio change. Expected at the start of a trace and
    /// whenever the core clock speed changes.
    ClockRatio,
    /// Model-specific maintenance packet; the vendor manual says to
    /// ignore these.
    Maintenance,
    /// An event kind the decoder was never configured to emit, carried
    /// with its raw type for diagnostics.
    Other(u32),
}

impl Event {
    /// Whether the event is consumed silently by block reconstruction.
    /// Overflow and unconfigured event kinds are not; they fail the
    /// current operation.
    pub const fn is_benign(self) -> bool {
        !matches!(self, Self::Overflow | Self::Other(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_classification() {
        assert!(Event::Enabled.is_benign());
        assert!(Event::ClockRatio.is_benign());
        assert!(Event::Maintenance.is_benign());
        assert!(!Event::Overflow.is_benign());
        assert!(!Event::Other(42).is_benign());
    }
}
