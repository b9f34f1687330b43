//! Loaded-module enumeration for the current process.

use std::ffi::CStr;
use std::io;
use std::path::PathBuf;

use crate::constants::{PF_X, PT_LOAD, VDSO_NAME};

/// One program header of a loaded module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub flags: u32,
    /// Declared virtual address, before the module's load bias is added.
    pub vaddr: u64,
    /// Offset of the segment within the module's file.
    pub offset: u64,
    pub filesz: u64,
    pub memsz: u64,
}

impl ProgramHeader {
    /// Whether this segment belongs in the memory image. Only loadable,
    /// executable segments can contain traced code.
    pub const fn is_loadable_code(&self) -> bool {
        self.p_type == PT_LOAD && self.flags & PF_X != 0
    }
}

/// A module loaded into the current process.
#[derive(Clone, Debug)]
pub struct Module {
    /// On-disk path. For the vDSO this is the kernel's mapping name, not a
    /// real file.
    pub path: PathBuf,
    /// Load bias added to every header's declared virtual address.
    pub load_bias: u64,
    /// The kernel-provided vDSO pages, which have no backing file.
    pub is_vdso: bool,
    pub phdrs: Vec<ProgramHeader>,
}

/// Enumerate every module loaded into the current process, main executable
/// included.
///
/// The dynamic linker reports the main executable with an empty name; it is
/// resolved to the process's own binary path here so every returned module
/// carries a path the engine can read code from.
pub fn self_modules() -> io::Result<Vec<Module>> {
    unsafe extern "C" fn collect(
        info: *mut libc::dl_phdr_info,
        _size: libc::size_t,
        data: *mut libc::c_void,
    ) -> libc::c_int {
        let modules = unsafe { &mut *data.cast::<Vec<Module>>() };
        let info = unsafe { &*info };

        let name = if info.dlpi_name.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(info.dlpi_name) }
                .to_string_lossy()
                .into_owned()
        };

        let phdrs = (0..info.dlpi_phnum)
            .map(|i| {
                let phdr = unsafe { &*info.dlpi_phdr.add(usize::from(i)) };
                ProgramHeader {
                    p_type: phdr.p_type,
                    flags: phdr.p_flags,
                    vaddr: u64::from(phdr.p_vaddr),
                    offset: u64::from(phdr.p_offset),
                    filesz: u64::from(phdr.p_filesz),
                    memsz: u64::from(phdr.p_memsz),
                }
            })
            .collect();

        modules.push(Module {
            is_vdso: name == VDSO_NAME,
            path: PathBuf::from(name),
            load_bias: u64::from(info.dlpi_addr),
            phdrs,
        });
        0
    }

    let mut modules: Vec<Module> = Vec::new();
    unsafe {
        libc::dl_iterate_phdr(
            Some(collect),
            std::ptr::from_mut(&mut modules).cast::<libc::c_void>(),
        );
    }

    for module in &mut modules {
        if module.path.as_os_str().is_empty() {
            module.path = std::env::current_exe()?;
        }
    }
    Ok(modules)
}
