//! Record encoding
//!
//! A stored record is the JSON payload framed with its length and a trailing
//! CRC32 over the payload bytes:
//!
//! ```text
//! +------------------+
//! | Payload Length   | (u32 LE)
//! +------------------+
//! | Payload          | (JSON bytes)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 of payload)
//! +------------------+
//! ```
//!
//! Every read validates the checksum; a mismatch surfaces as corruption and
//! aborts the reading operation.

use crc32fast::Hasher;
use serde_json::Value;

use super::errors::{StorageError, StorageResult};

fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

/// Encodes a document into its framed record form.
pub fn encode_record(doc: &Value) -> StorageResult<Vec<u8>> {
    let payload = serde_json::to_vec(doc).map_err(|e| StorageError::Codec(e.to_string()))?;
    if payload.len() > u32::MAX as usize {
        return Err(StorageError::Codec("payload exceeds frame limit".into()));
    }

    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&checksum(&payload).to_le_bytes());
    Ok(out)
}

/// Decodes a framed record, validating length and checksum.
///
/// `record_id` is only used to attribute corruption.
pub fn decode_record(bytes: &[u8], record_id: u64) -> StorageResult<Value> {
    if bytes.len() < 8 {
        return Err(StorageError::Corruption { record_id });
    }
    let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if bytes.len() != len + 8 {
        return Err(StorageError::Corruption { record_id });
    }

    let payload = &bytes[4..4 + len];
    let stored = u32::from_le_bytes([
        bytes[4 + len],
        bytes[5 + len],
        bytes[6 + len],
        bytes[7 + len],
    ]);
    if checksum(payload) != stored {
        return Err(StorageError::Corruption { record_id });
    }

    serde_json::from_slice(payload).map_err(|e| StorageError::Codec(e.to_string()))
}
