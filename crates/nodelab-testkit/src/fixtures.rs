//! Fake node artifacts

use std::io::Write;
use std::path::{Path, PathBuf};

/// Minimal ELF header with the given class byte (1 = 32-bit, 2 = 64-bit)
pub fn elf_header(class: u8) -> Vec<u8> {
    let mut bytes = vec![0x7f, b'E', b'L', b'F', class, 1, 1, 0];
    bytes.resize(64, 0);
    bytes
}

/// Minimal PE image with the given COFF machine field
pub fn pe_header(machine: u16) -> Vec<u8> {
    let pe_offset: u32 = 0x80;
    let mut bytes = vec![0u8; 0x100];
    bytes[0] = b'M';
    bytes[1] = b'Z';
    bytes[0x3c..0x40].copy_from_slice(&pe_offset.to_le_bytes());
    let at = pe_offset as usize;
    bytes[at..at + 4].copy_from_slice(b"PE\0\0");
    bytes[at + 4..at + 6].copy_from_slice(&machine.to_le_bytes());
    bytes
}

/// Writes an executable stand-in for node that answers `--version`.
///
/// On Unix this is a shell script printing `v<version>`; elsewhere it is an
/// opaque non-empty file.
pub fn fake_node_binary(path: &Path, version: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let script = format!("#!/bin/sh\necho v{}\n", version);
    std::fs::write(path, script).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    path.to_path_buf()
}

/// Creates `<root>/<dir_name>/node[.exe]` via [`fake_node_binary`]
pub fn install_fake_version(root: &Path, dir_name: &str, version: &str) -> PathBuf {
    fake_node_binary(&root.join(dir_name).join(node_binary_name()), version)
}

fn node_binary_name() -> &'static str {
    if cfg!(windows) { "node.exe" } else { "node" }
}

/// `SHASUMS256.txt` body listing the given relative paths
pub fn shasums_listing(paths: &[&str]) -> String {
    paths
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{:064x}  {}\n", i + 1, p))
        .collect()
}

/// A `.tar.gz` laid out like an upstream node release:
/// `<top>/bin/node` containing `body`
pub fn node_tarball(top: &str, body: &[u8]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(body.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, format!("{}/bin/node", top), body)
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

/// A zip shaped like the historical npm archives: `npm.cmd` plus
/// `node_modules/npm/package.json`
pub fn npm_zip(version: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();

    writer.start_file("npm.cmd", options).unwrap();
    writer.write_all(b"@node node_modules\\npm\\bin\\npm-cli.js %*\r\n").unwrap();
    writer.add_directory("node_modules/npm/", options).unwrap();
    writer
        .start_file("node_modules/npm/package.json", options)
        .unwrap();
    writer
        .write_all(format!("{{\"name\":\"npm\",\"version\":\"{}\"}}", version).as_bytes())
        .unwrap();

    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pe_header_layout() {
        let bytes = pe_header(0x14c);
        assert_eq!(&bytes[0..2], b"MZ");
        assert_eq!(&bytes[0x80..0x84], b"PE\0\0");
        assert_eq!(u16::from_le_bytes([bytes[0x84], bytes[0x85]]), 0x14c);
    }

    #[test]
    fn test_shasums_listing_format() {
        let body = shasums_listing(&["win-x64/node.exe", "node-v6.2.1.tar.gz"]);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("  win-x64/node.exe"));
        assert_eq!(lines[0].split_whitespace().next().unwrap().len(), 64);
    }

    #[test]
    fn test_npm_zip_is_readable() {
        let bytes = npm_zip("1.3.9");
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"npm.cmd"));
        assert!(names.contains(&"node_modules/npm/package.json"));
    }

    #[test]
    fn test_install_fake_version_creates_binary() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = install_fake_version(temp.path(), "6.2.1", "6.2.1");
        assert!(path.is_file());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
