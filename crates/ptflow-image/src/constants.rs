//! Program header constants.

// Program header types
pub const PT_LOAD: u32 = 1;

// Program header flags
pub const PF_X: u32 = 0x1; // Execute
pub const PF_W: u32 = 0x2; // Write
pub const PF_R: u32 = 0x4; // Read

/// Module name the dynamic linker reports for the kernel's vDSO pages.
pub const VDSO_NAME: &str = "linux-vdso.so.1";
