//! Decoder status flags.

use std::fmt;
use std::ops::BitOr;

/// Status bitmask returned by every decoder primitive.
///
/// This is the only synchronization signal between steps of the block
/// state machine: it must be inspected after every engine call before
/// deciding what to do next.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Status(u32);

impl Status {
    /// No flags set; the decoder is ready for the next request.
    pub const OK: Self = Self(0);
    /// The last reported instruction pointer was suppressed.
    pub const IP_SUPPRESSED: Self = Self(1 << 0);
    /// One or more events must be fetched before decoding can continue.
    pub const EVENT_PENDING: Self = Self(1 << 1);
    /// The end of the trace stream has been reached.
    pub const EOS: Self = Self(1 << 2);

    /// Build a status from raw engine bits. Bits this boundary does not
    /// know about are preserved and show up in the `Debug` rendering.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub const fn ip_suppressed(self) -> bool {
        self.contains(Self::IP_SUPPRESSED)
    }

    pub const fn event_pending(self) -> bool {
        self.contains(Self::EVENT_PENDING)
    }

    pub const fn eos(self) -> bool {
        self.contains(Self::EOS)
    }
}

impl BitOr for Status {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "Status(OK)");
        }
        let unknown = self.0 & !(Self::IP_SUPPRESSED.0 | Self::EVENT_PENDING.0 | Self::EOS.0);
        let unknown_repr;
        let mut parts = Vec::new();
        if self.ip_suppressed() {
            parts.push("IP_SUPPRESSED");
        }
        if self.event_pending() {
            parts.push("EVENT_PENDING");
        }
        if self.eos() {
            parts.push("EOS");
        }
        if unknown != 0 {
            unknown_repr = format!("{unknown:#x}");
            parts.push(&unknown_repr);
        }
        write!(f, "Status({})", parts.join("|"))
    }
}
