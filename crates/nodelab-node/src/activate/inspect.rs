//! Reading the version and bitness of a node executable

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::Command;

use nodelab_core::version::VersionIdentifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageBits {
    Bits32,
    Bits64,
}

pub trait BinaryInspector {
    /// Release reported by `<binary> --version`; `None` if missing or not runnable
    fn version(&self, binary: &Path) -> Option<VersionIdentifier>;

    /// Bitness from the executable header; `None` for unknown formats
    fn image_arch(&self, binary: &Path) -> Option<ImageBits>;
}

impl<T: BinaryInspector + ?Sized> BinaryInspector for &T {
    fn version(&self, binary: &Path) -> Option<VersionIdentifier> {
        (**self).version(binary)
    }

    fn image_arch(&self, binary: &Path) -> Option<ImageBits> {
        (**self).image_arch(binary)
    }
}

/// Runs the binary and parses its header
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecInspector;

const HEADER_PROBE_LEN: u64 = 4096;

impl BinaryInspector for ExecInspector {
    fn version(&self, binary: &Path) -> Option<VersionIdentifier> {
        if !binary.is_file() {
            return None;
        }
        let output = match Command::new(binary).arg("--version").output() {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                tracing::debug!(binary = %binary.display(), status = ?output.status, "--version failed");
                return None;
            }
            Err(e) => {
                tracing::debug!(binary = %binary.display(), error = %e, "could not run binary");
                return None;
            }
        };
        VersionIdentifier::from_release_str(&String::from_utf8_lossy(&output.stdout))
    }

    fn image_arch(&self, binary: &Path) -> Option<ImageBits> {
        let mut header = Vec::new();
        File::open(binary)
            .ok()?
            .take(HEADER_PROBE_LEN)
            .read_to_end(&mut header)
            .ok()?;
        image_bits(&header)
    }
}

const PE_MACHINE_I386: u16 = 0x014c;
const PE_MACHINE_AMD64: u16 = 0x8664;
const PE_MACHINE_ARM64: u16 = 0xaa64;

/// Bitness of an ELF, PE or Mach-O header
pub fn image_bits(header: &[u8]) -> Option<ImageBits> {
    match header {
        [0x7f, b'E', b'L', b'F', class, ..] => match *class {
            1 => Some(ImageBits::Bits32),
            2 => Some(ImageBits::Bits64),
            _ => None,
        },
        [b'M', b'Z', ..] => pe_bits(header),
        [0xce, 0xfa, 0xed, 0xfe, ..] => Some(ImageBits::Bits32),
        [0xcf, 0xfa, 0xed, 0xfe, ..] => Some(ImageBits::Bits64),
        _ => None,
    }
}

fn pe_bits(header: &[u8]) -> Option<ImageBits> {
    let offset_bytes = header.get(0x3c..0x40)?;
    let offset = u32::from_le_bytes(offset_bytes.try_into().ok()?) as usize;
    if header.get(offset..offset + 4)? != b"PE\0\0" {
        return None;
    }
    let machine_bytes = header.get(offset + 4..offset + 6)?;
    match u16::from_le_bytes(machine_bytes.try_into().ok()?) {
        PE_MACHINE_I386 => Some(ImageBits::Bits32),
        PE_MACHINE_AMD64 | PE_MACHINE_ARM64 => Some(ImageBits::Bits64),
        _ => None,
    }
}
