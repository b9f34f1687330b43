//! Memory image population, including vDSO materialization.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::slice;

use ptflow_engine::Image;
use tracing::{debug, trace};

use crate::module::Module;
use crate::{ImageError, Result};

/// Caller-supplied destination for the vDSO code dump.
///
/// The caller creates and eventually closes the file; the builder only
/// fills it. The engine reads the file lazily via `path`, so the file must
/// outlive the decoding session.
#[derive(Debug)]
pub struct VdsoSink<'a> {
    pub file: &'a mut File,
    pub path: &'a Path,
}

/// Copy a vDSO segment's code out of live memory into the sink.
///
/// The engine can only map file-backed code, so the kernel pages are dumped
/// byte-for-byte and later registered under the sink's path.
pub(crate) fn dump_vdso<W: Write>(sink: &mut W, vaddr: u64, len: u64) -> io::Result<()> {
    let len = usize::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "vDSO segment too large"))?;
    // The vDSO stays mapped readable for the life of the process, so the
    // slice is valid for the whole copy.
    let code = unsafe { slice::from_raw_parts(vaddr as usize as *const u8, len) };
    // write_all retries short writes until the dump is complete or a real
    // error surfaces.
    sink.write_all(code)
}

/// Populate `image` with every loadable, executable segment of `modules`.
///
/// Each segment is registered at its biased virtual address for its file
/// size, backed by the module's on-disk path and file offset. The vDSO's
/// code is dumped into `sink` first and registered under the sink's path at
/// offset 0. The sink is flushed to disk before returning so the engine's
/// lazy reads observe the dump. The first failure aborts the build.
pub fn build_image<I: Image>(
    image: &mut I,
    modules: &[Module],
    sink: &mut VdsoSink<'_>,
) -> Result<()> {
    for module in modules {
        for phdr in &module.phdrs {
            if !phdr.is_loadable_code() {
                continue;
            }

            let vaddr = module.load_bias + phdr.vaddr;
            let (path, offset) = if module.is_vdso {
                dump_vdso(sink.file, vaddr, phdr.filesz)?;
                debug!(bytes = phdr.filesz, path = %sink.path.display(), "materialized vDSO");
                (sink.path, 0)
            } else {
                (module.path.as_path(), phdr.offset)
            };

            image
                .add_file(path, offset, phdr.filesz, vaddr)
                .map_err(ImageError::Register)?;
            trace!(
                path = %path.display(),
                offset,
                size = phdr.filesz,
                vaddr,
                "registered code segment"
            );
        }
    }

    // Durability barrier: the dump must be on disk before the engine
    // lazily reads it back.
    sink.file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{PF_R, PF_W, PF_X, PT_LOAD};
    use crate::module::ProgramHeader;
    use ptflow_engine::EngineCode;
    use ptflow_engine::fake::FakeImage;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn phdr(p_type: u32, flags: u32, vaddr: u64, offset: u64, filesz: u64) -> ProgramHeader {
        ProgramHeader {
            p_type,
            flags,
            vaddr,
            offset,
            filesz,
            memsz: filesz,
        }
    }

    fn lib_module() -> Module {
        Module {
            path: PathBuf::from("/usr/lib/libfoo.so.1"),
            load_bias: 0x7f00_0000_0000,
            is_vdso: false,
            phdrs: vec![
                phdr(PT_LOAD, PF_R, 0, 0, 0x400),
                phdr(PT_LOAD, PF_R | PF_X, 0x1000, 0x1000, 0x2000),
                phdr(PT_LOAD, PF_R | PF_W, 0x4000, 0x4000, 0x800),
                phdr(2, PF_R, 0x5000, 0x5000, 0x100), // PT_DYNAMIC
            ],
        }
    }

    fn build_into(image: &mut FakeImage, modules: &[Module]) -> Result<()> {
        let mut tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        let mut sink = VdsoSink {
            file: tmp.as_file_mut(),
            path: &path,
        };
        build_image(image, modules, &mut sink)
    }

    #[test]
    fn test_registers_only_executable_load_segments() {
        let module = lib_module();
        let mut image = FakeImage::default();
        build_into(&mut image, &[module.clone()]).unwrap();

        assert_eq!(image.entries.len(), 1);
        let entry = &image.entries[0];
        assert_eq!(entry.path, module.path);
        assert_eq!(entry.offset, 0x1000);
        assert_eq!(entry.size, 0x2000);
        assert_eq!(entry.vaddr, 0x7f00_0000_1000);
    }

    #[test]
    fn test_build_is_idempotent_on_segment_selection() {
        let modules = [lib_module()];
        let mut first = FakeImage::default();
        let mut second = FakeImage::default();
        build_into(&mut first, &modules).unwrap();
        build_into(&mut second, &modules).unwrap();

        first.entries.sort();
        second.entries.sort();
        assert_eq!(first.entries, second.entries);
    }

    #[test]
    fn test_vdso_dump_is_byte_exact() {
        let code: Vec<u8> = (0u32..0x1234).map(|i| (i % 251) as u8).collect();
        let vdso = Module {
            path: PathBuf::from(crate::VDSO_NAME),
            load_bias: code.as_ptr() as u64,
            is_vdso: true,
            phdrs: vec![phdr(PT_LOAD, PF_R | PF_X, 0, 0, code.len() as u64)],
        };

        let mut tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        let mut image = FakeImage::default();
        {
            let mut sink = VdsoSink {
                file: tmp.as_file_mut(),
                path: &path,
            };
            build_image(&mut image, &[vdso], &mut sink).unwrap();
        }

        // Registered under the sink's path at offset 0, not the mapping name.
        assert_eq!(image.entries.len(), 1);
        assert_eq!(image.entries[0].path, path);
        assert_eq!(image.entries[0].offset, 0);
        assert_eq!(image.entries[0].size, code.len() as u64);

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, code);
    }

    #[test]
    fn test_registration_failure_aborts_build() {
        let mut image = FakeImage {
            add_fail: Some(EngineCode::NoMap),
            ..FakeImage::default()
        };
        let err = build_into(&mut image, &[lib_module()]).unwrap_err();
        assert!(matches!(err, ImageError::Register(EngineCode::NoMap)));
        assert!(image.entries.is_empty());
    }

    /// Accepts at most three bytes per write call.
    struct ShortWriter(Vec<u8>);

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(3);
            self.0.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_dump_retries_partial_writes() {
        let code = *b"vdso code bytes, longer than one write";
        let mut writer = ShortWriter(Vec::new());
        dump_vdso(&mut writer, code.as_ptr() as u64, code.len() as u64).unwrap();
        assert_eq!(writer.0, code);
    }

    /// Accepts one four-byte write, then fails.
    struct FailingWriter {
        accepted: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.accepted > 0 {
                return Err(io::Error::other("device gone"));
            }
            let n = buf.len().min(4);
            self.accepted = n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_dump_surfaces_mid_stream_write_errors() {
        let code = *b"vdso code bytes";
        let mut writer = FailingWriter { accepted: 0 };
        let err = dump_vdso(&mut writer, code.as_ptr() as u64, code.len() as u64).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_vdso_write_error_aborts_build_as_io() {
        // A sink opened read-only rejects the dump; the OS error comes
        // back untranslated.
        let code = [0x90u8; 32];
        let vdso = Module {
            path: PathBuf::from(crate::VDSO_NAME),
            load_bias: code.as_ptr() as u64,
            is_vdso: true,
            phdrs: vec![phdr(PT_LOAD, PF_R | PF_X, 0, 0, code.len() as u64)],
        };

        let tmp = NamedTempFile::new().unwrap();
        let mut readonly = File::open(tmp.path()).unwrap();
        let mut image = FakeImage::default();
        let mut sink = VdsoSink {
            file: &mut readonly,
            path: tmp.path(),
        };
        let err = build_image(&mut image, &[vdso], &mut sink).unwrap_err();
        assert!(matches!(err, ImageError::Io(_)));
        assert!(image.entries.is_empty());
    }
}
