//! Locating the executable inside a release archive.
//!
//! Releases ship as either `.zip` (macOS, Windows) or `.tar.gz` (everything
//! else) archives, usually with every file under one wrapper directory:
//! ```text
//! syncthing-linux-amd64-v1.23.1.tar.gz
//!   syncthing-linux-amd64-v1.23.1/
//!     syncthing              <- wanted
//!     etc/linux-systemd/...
//! ```
//!
//! The archive is never unpacked to disk. The matching entry is handed to a
//! caller-supplied closure as a plain reader, so the tar variant can stream
//! straight out of the gzip decoder.
//!
//! # Examples
//!
//! ```no_run
//! use histver::extract::{ArchiveFormat, with_executable};
//! use std::io::Read;
//!
//! fn main() -> anyhow::Result<()> {
//!     let bytes = std::fs::read("syncthing-linux-amd64-v1.23.1.tar.gz")?;
//!     let format = ArchiveFormat::from_asset_name("syncthing-linux-amd64-v1.23.1.tar.gz");
//!     let size = with_executable(&bytes, format, "syncthing", |rd| {
//!         let mut buf = Vec::new();
//!         rd.read_to_end(&mut buf).map(|_| buf.len())
//!     })??;
//!     println!("binary is {} bytes", size);
//!     Ok(())
//! }
//! ```

use crate::error::ExtractError;
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use std::path::Path;
use tar::Archive;
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Pick the format from an asset's file name. Anything that isn't a
    /// `.zip` is treated as a gzipped tarball.
    pub fn from_asset_name(name: &str) -> Self {
        match Path::new(name).extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zip") => ArchiveFormat::Zip,
            _ => ArchiveFormat::TarGz,
        }
    }
}

/// Find the entry named `exe_name` in the archive and pass a reader over
/// its contents to `f`.
///
/// Returns [`ExtractError::NotFound`] when no entry matches, and one of the
/// `Corrupt*` variants when the archive itself can't be decoded.
pub fn with_executable<T>(
    bytes: &[u8],
    format: ArchiveFormat,
    exe_name: &str,
    f: impl FnOnce(&mut dyn Read) -> T,
) -> Result<T, ExtractError> {
    match format {
        ArchiveFormat::Zip => with_zip_executable(bytes, exe_name, f),
        ArchiveFormat::TarGz => with_tar_gz_executable(bytes, exe_name, f),
    }
}

fn with_zip_executable<T>(
    bytes: &[u8],
    exe_name: &str,
    f: impl FnOnce(&mut dyn Read) -> T,
) -> Result<T, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    // Only entries at most one directory deep qualify (the release wrapper
    // directory). Prefer the shallowest, then the first in archive order.
    let mut best: Option<(usize, usize)> = None;
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(depth) = zip_entry_depth(entry.name(), exe_name) else {
            continue;
        };
        if best.is_none_or(|(best_depth, _)| depth < best_depth) {
            best = Some((depth, i));
        }
    }

    let (_, index) = best.ok_or_else(|| ExtractError::NotFound(exe_name.to_string()))?;
    let mut entry = archive.by_index(index)?;
    Ok(f(&mut entry))
}

/// Directory depth of `name` if its base name is `exe_name` and it sits
/// no deeper than one directory.
fn zip_entry_depth(name: &str, exe_name: &str) -> Option<usize> {
    let (dir, base) = match name.rsplit_once('/') {
        Some((dir, base)) => (Some(dir), base),
        None => (None, name),
    };
    if base != exe_name {
        return None;
    }
    match dir {
        None | Some("") => Some(0),
        Some(dir) if !dir.contains('/') => Some(1),
        Some(_) => None,
    }
}

fn with_tar_gz_executable<T>(
    bytes: &[u8],
    exe_name: &str,
    f: impl FnOnce(&mut dyn Read) -> T,
) -> Result<T, ExtractError> {
    let decompressor = GzDecoder::new(bytes);
    let mut archive = Archive::new(decompressor);

    // Single pass: the decoder can't rewind, so the first match is taken.
    for entry in archive.entries().map_err(ExtractError::CorruptTarGz)? {
        let mut entry = entry.map_err(ExtractError::CorruptTarGz)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().map_err(ExtractError::CorruptTarGz)?;
        if path.file_name().and_then(|n| n.to_str()) != Some(exe_name) {
            continue;
        }
        return Ok(f(&mut entry));
    }

    Err(ExtractError::NotFound(exe_name.to_string()))
}
