//! CPU identification and errata descriptors.

/// CPU vendor as reported by identification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CpuVendor {
    /// Vendor could not be determined; no errata table applies.
    #[default]
    Unknown,
    Intel,
}

/// Identified CPU model, used to select decode workarounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuModel {
    pub vendor: CpuVendor,
    pub family: u16,
    pub model: u8,
    pub stepping: u8,
}

impl CpuModel {
    /// Whether the vendor was recognized. Errata lookup is only meaningful
    /// for a known vendor.
    pub const fn is_known(&self) -> bool {
        !matches!(self.vendor, CpuVendor::Unknown)
    }
}

/// Set of model-specific decode workarounds, applied to the decoder
/// configuration. The individual workarounds are engine-internal; this side
/// of the boundary only carries the set around.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Errata(pub u32);

impl Errata {
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}
