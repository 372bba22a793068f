//! Raw dataset access: local files, zipped files and (with the `remote`
//! feature) HTTP URLs.

use std::io::{Cursor, Read};
use std::path::PathBuf;

use crate::error::VigiaguaError;
use crate::VigiaguaResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Path(PathBuf),
    Url(String),
}

/// A dataset location plus whether its payload is a zip archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub location: Location,
    pub zipped: bool,
}

impl DataSource {
    /// Interpret a configured source string. `http://` and `https://`
    /// prefixes select a URL; a `.zip` suffix marks an archive.
    pub fn parse(raw: &str) -> VigiaguaResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(VigiaguaError::InvalidInput {
                field: "source".into(),
                reason: "empty dataset location".into(),
            });
        }
        let zipped = raw.to_ascii_lowercase().ends_with(".zip");
        let location = if raw.starts_with("http://") || raw.starts_with("https://") {
            Location::Url(raw.to_string())
        } else {
            Location::Path(PathBuf::from(raw))
        };
        Ok(Self { location, zipped })
    }

    pub fn describe(&self) -> String {
        match &self.location {
            Location::Path(p) => p.display().to_string(),
            Location::Url(u) => u.clone(),
        }
    }

    /// Payload bytes, unpacked from the archive when the source is zipped.
    pub fn read_bytes(&self) -> VigiaguaResult<Vec<u8>> {
        let raw = match &self.location {
            Location::Path(path) => std::fs::read(path).map_err(|e| VigiaguaError::Load {
                origin: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Location::Url(url) => fetch(url)?,
        };
        if self.zipped {
            extract_first_entry(raw, &self.describe())
        } else {
            Ok(raw)
        }
    }

    /// Payload decoded as text.
    pub fn read_text(&self) -> VigiaguaResult<String> {
        Ok(decode_text(self.read_bytes()?))
    }
}

#[cfg(feature = "remote")]
fn fetch(url: &str) -> VigiaguaResult<Vec<u8>> {
    tracing::info!(url, "fetching remote dataset");
    let load_err = |e: reqwest::Error| VigiaguaError::Load {
        origin: url.to_string(),
        reason: e.to_string(),
    };
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(load_err)?;
    Ok(response.bytes().map_err(load_err)?.to_vec())
}

#[cfg(not(feature = "remote"))]
fn fetch(url: &str) -> VigiaguaResult<Vec<u8>> {
    Err(VigiaguaError::Load {
        origin: url.to_string(),
        reason: "remote sources require the `remote` feature".into(),
    })
}

/// Upper bound on the buffer reserved from a zip member's declared size.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// The declared size comes from the archive header and is not trusted.
fn prealloc_len(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// Read the first file entry of a zip archive, preferring `.csv` / `.txt`
/// members over anything else.
fn extract_first_entry(raw: Vec<u8>, origin: &str) -> VigiaguaResult<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(raw))?;

    let mut chosen: Option<usize> = None;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_ascii_lowercase();
        if name.ends_with(".csv") || name.ends_with(".txt") {
            chosen = Some(i);
            break;
        }
        if chosen.is_none() {
            chosen = Some(i);
        }
    }

    let index = chosen.ok_or_else(|| VigiaguaError::Load {
        origin: origin.to_string(),
        reason: "zip archive contains no files".into(),
    })?;
    let mut entry = archive.by_index(index)?;
    tracing::debug!(entry = entry.name(), origin, "reading zip member");
    let mut buf = Vec::with_capacity(prealloc_len(entry.size()));
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Decode UTF-8, falling back to Latin-1 (the usual encoding of
/// government CSV exports) when the bytes are not valid UTF-8.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text),
        Err(e) => {
            tracing::debug!("input is not UTF-8, decoding as Latin-1");
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    }
}
