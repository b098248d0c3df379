//! Shared binary store-file format with header validation.
//!
//! Every sub-store is one file laid out as a 4-byte little-endian header
//! length, a bincode-encoded header (magic bytes, format version, payload
//! checksum), and the bincode payload. Reads validate all three header
//! fields; any mismatch is a hard [`CacheError`], not a cache miss.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use spindle_common::ContentHash;

use crate::error::CacheError;

/// Magic bytes identifying a Spindle cache store.
const STORE_MAGIC: [u8; 4] = *b"SPNL";

/// Current store format version. Increment on breaking changes to the
/// header or payload format.
const STORE_FORMAT_VERSION: u32 = 1;

/// Header prepended to every store file for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreHeader {
    /// Magic bytes: must be `b"SPNL"`.
    magic: [u8; 4],

    /// Store format version.
    format_version: u32,

    /// Content hash of the payload data (for integrity checks).
    checksum: ContentHash,
}

/// Serializes `value` and writes it to `path` behind a validated header.
///
/// Creates the parent directory if it doesn't exist.
pub(crate) fn write_store<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let payload = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(
        |e| CacheError::Serialization {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    )?;

    let header = StoreHeader {
        magic: STORE_MAGIC,
        format_version: STORE_FORMAT_VERSION,
        checksum: ContentHash::from_bytes(&payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    // Layout: 4-byte header length (little-endian) + header + payload
    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);

    std::fs::write(path, &output).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Reads and validates a store file, returning `Ok(None)` if the file does
/// not exist yet (a fresh cache) and a hard error on any corruption.
pub(crate) fn read_store<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CacheError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CacheError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if raw.len() < 4 {
        return Err(CacheError::InvalidHeader {
            path: path.to_path_buf(),
            reason: "file shorter than header length field".to_string(),
        });
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&raw[..4]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    if raw.len() < 4 + header_len {
        return Err(CacheError::InvalidHeader {
            path: path.to_path_buf(),
            reason: "truncated header".to_string(),
        });
    }

    let header: StoreHeader =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .map_err(|e| CacheError::InvalidHeader {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .0;

    if header.magic != STORE_MAGIC {
        return Err(CacheError::InvalidHeader {
            path: path.to_path_buf(),
            reason: "bad magic bytes".to_string(),
        });
    }

    if header.format_version != STORE_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: STORE_FORMAT_VERSION,
            actual: header.format_version,
        });
    }

    let payload = &raw[4 + header_len..];
    let actual_checksum = ContentHash::from_bytes(payload);
    if actual_checksum != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum.to_string(),
            actual: actual_checksum.to_string(),
        });
    }

    let value = bincode::serde::decode_from_slice(payload, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .0;
    Ok(Some(value))
}
