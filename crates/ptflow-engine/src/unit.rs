//! Decode units and instruction classes.

/// Class of the instruction that ends a decode unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsnClass {
    /// Not a control-transfer instruction.
    #[default]
    Other,
    Call,
    Return,
    Jump,
    CondJump,
    FarCall,
    FarReturn,
    FarJump,
    Indirect,
    /// Diagnostic write marker; the block continues past it.
    PtWrite,
}

impl InsnClass {
    /// Whether a unit ending in this class terminates a basic block.
    pub const fn terminates_block(self) -> bool {
        matches!(
            self,
            Self::Call
                | Self::Return
                | Self::Jump
                | Self::CondJump
                | Self::FarCall
                | Self::FarReturn
                | Self::FarJump
                | Self::Indirect
        )
    }
}

/// One decode result from the engine.
///
/// The engine may hand back a unit covering only part of a logical basic
/// block, e.g. when the block spans a boundary the engine treats specially.
/// The session stitches consecutive units back together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeUnit {
    /// Address of the unit's first instruction.
    pub ip: u64,
    /// Address of the unit's last instruction.
    pub end_ip: u64,
    /// Number of instructions in the unit. Always at least one for a
    /// well-behaved engine.
    pub ninsn: u16,
    /// Class of the unit's last instruction.
    pub iclass: InsnClass,
    /// The unit was cut short at a section boundary.
    pub truncated: bool,
}

impl DecodeUnit {
    pub const fn new(ip: u64, end_ip: u64, ninsn: u16, iclass: InsnClass) -> Self {
        Self {
            ip,
            end_ip,
            ninsn,
            iclass,
            truncated: false,
        }
    }
}
