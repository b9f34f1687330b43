//! Logical basic blocks.

/// One reconstructed basic block, identified by the addresses of its first
/// and last instructions.
///
/// Under the decoder's end-on-call/end-on-jump policy the last instruction
/// is always a control-transfer instruction. Both addresses are non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    first_instr: u64,
    last_instr: u64,
}

impl Block {
    pub(crate) fn new(first_instr: u64, last_instr: u64) -> Self {
        debug_assert_ne!(first_instr, 0);
        debug_assert_ne!(last_instr, 0);
        Self {
            first_instr,
            last_instr,
        }
    }

    /// Address of the block's first instruction.
    pub const fn first_instr(&self) -> u64 {
        self.first_instr
    }

    /// Address of the block's last instruction.
    pub const fn last_instr(&self) -> u64 {
        self.last_instr
    }
}
