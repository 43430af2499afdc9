//! Reading capture files into transcript text.
//!
//! Captures are usually UTF-8, but clipboard dumps saved by other tools may
//! carry a UTF-8 BOM or be UTF-16 with a BOM.

use std::path::Path;

use dbgsplit_shared::{Decoding, Result, SplitError};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Read and decode the capture file at `path`.
pub fn read_transcript(path: &Path, decoding: Decoding) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| SplitError::read(path, e))?;
    decode(bytes, decoding).map_err(|message| SplitError::Decode {
        path: path.to_path_buf(),
        message,
    })
}

/// Decode raw capture bytes, honoring a leading byte-order mark.
pub fn decode(mut bytes: Vec<u8>, decoding: Decoding) -> std::result::Result<String, String> {
    if bytes.starts_with(&UTF16_LE_BOM) {
        return decode_utf16(&bytes[2..], u16::from_le_bytes, decoding);
    }
    if bytes.starts_with(&UTF16_BE_BOM) {
        return decode_utf16(&bytes[2..], u16::from_be_bytes, decoding);
    }
    if bytes.starts_with(&UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }

    match decoding {
        Decoding::Strict => String::from_utf8(bytes).map_err(|e| {
            format!(
                "invalid UTF-8 at byte {}",
                e.utf8_error().valid_up_to()
            )
        }),
        Decoding::Lossy => Ok(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn decode_utf16(
    bytes: &[u8],
    unit: fn([u8; 2]) -> u16,
    decoding: Decoding,
) -> std::result::Result<String, String> {
    if bytes.len() % 2 != 0 && decoding == Decoding::Strict {
        return Err("truncated UTF-16 data (odd byte count)".into());
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();

    match decoding {
        Decoding::Strict => {
            String::from_utf16(&units).map_err(|_| "invalid UTF-16 data".to_string())
        }
        Decoding::Lossy => Ok(String::from_utf16_lossy(&units)),
    }
}
