//! Versioned model file format shared by every recommender.
//!
//! Format (SGR1):
//! ```text
//! [4-byte magic: "SGR1"]
//! [2-byte version: major, minor]
//! [4-byte payload_len: u32 little-endian]
//! [JSON payload: {"model": <tag>, "state": {...}}]
//! [4-byte CRC32: checksum of all preceding bytes]
//! ```
//!
//! Loading validates structure before any model state is touched: magic and
//! length first, then version, checksum, JSON shape and model tag. A model's
//! `load` therefore either succeeds completely or leaves the prior trained
//! state intact.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

use crate::error::{Result, SugerirError};

/// Magic bytes identifying a sugerir model file.
pub const MAGIC: [u8; 4] = *b"SGR1";

/// Current format version (major, minor).
pub const FORMAT_VERSION: (u8, u8) = (1, 0);

/// Fixed header size: magic + version + payload length.
const HEADER_LEN: usize = 10;

/// Outer document wrapping a model's serialized state.
#[derive(Debug, Serialize, Deserialize)]
struct ModelDocument {
    model: String,
    state: JsonValue,
}

/// Encode a model's state into the container format.
///
/// # Errors
///
/// Returns [`SugerirError::Serialization`] if the state cannot be encoded.
pub fn to_bytes(model_tag: &str, state: &JsonValue) -> Result<Vec<u8>> {
    let doc = ModelDocument {
        model: model_tag.to_string(),
        state: state.clone(),
    };
    let payload = serde_json::to_vec(&doc)?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + 4);
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION.0);
    out.push(FORMAT_VERSION.1);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    let crc = crc32(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    Ok(out)
}

/// Decode a container produced by [`to_bytes`], returning the state payload.
///
/// # Errors
///
/// - [`SugerirError::CorruptModel`] — truncation, bad magic, malformed JSON,
///   or a model tag other than `expected_tag`.
/// - [`SugerirError::UnsupportedVersion`] — major version ahead of this build.
/// - [`SugerirError::ChecksumMismatch`] — CRC32 trailer does not match.
pub fn from_bytes(data: &[u8], expected_tag: &str) -> Result<JsonValue> {
    if data.len() < HEADER_LEN + 4 {
        return Err(SugerirError::corrupt_model("file too short"));
    }
    if data[0..4] != MAGIC {
        return Err(SugerirError::corrupt_model("bad magic bytes"));
    }

    let found = (data[4], data[5]);
    if found.0 > FORMAT_VERSION.0 {
        return Err(SugerirError::UnsupportedVersion {
            found,
            supported: FORMAT_VERSION,
        });
    }

    let payload_len = u32::from_le_bytes([data[6], data[7], data[8], data[9]]) as usize;
    if data.len() != HEADER_LEN + payload_len + 4 {
        return Err(SugerirError::corrupt_model(
            "payload length does not match file size",
        ));
    }

    let body_end = HEADER_LEN + payload_len;
    let expected_crc = crc32(&data[..body_end]);
    let actual_crc = u32::from_le_bytes([
        data[body_end],
        data[body_end + 1],
        data[body_end + 2],
        data[body_end + 3],
    ]);
    if expected_crc != actual_crc {
        return Err(SugerirError::ChecksumMismatch {
            expected: expected_crc,
            actual: actual_crc,
        });
    }

    let doc: ModelDocument = serde_json::from_slice(&data[HEADER_LEN..body_end])
        .map_err(|e| SugerirError::corrupt_model(&format!("malformed payload: {e}")))?;
    if doc.model != expected_tag {
        return Err(SugerirError::corrupt_model(&format!(
            "model tag mismatch: expected '{expected_tag}', found '{}'",
            doc.model
        )));
    }
    Ok(doc.state)
}

/// Write a model's state to a file.
///
/// # Errors
///
/// Returns an error on encoding or I/O failure.
pub fn save_file(path: &Path, model_tag: &str, state: &JsonValue) -> Result<()> {
    let bytes = to_bytes(model_tag, state)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Read a model's state from a file.
///
/// # Errors
///
/// Returns an error on I/O failure or any [`from_bytes`] validation failure.
pub fn load_file(path: &Path, expected_tag: &str) -> Result<JsonValue> {
    let data = fs::read(path)?;
    from_bytes(&data, expected_tag)
}

/// Simple CRC32 implementation (IEEE polynomial, bitwise).
fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}
