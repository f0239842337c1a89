//! MemStore snapshots
//!
//! Dumps the whole in-memory keyspace to a single file and loads it back.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "AORM" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each entry, ascending key order ...  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                        │
//! │   DataCRC: u32                                          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//! All integers little-endian.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use parking_lot::RwLock;

use crate::error::{OrmError, Result};

use super::MemStore;

/// Magic bytes identifying an AtlasORM snapshot file
const MAGIC: &[u8; 4] = b"AORM";

/// Current snapshot format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) = 14 bytes
const HEADER_SIZE: usize = 14;

/// Footer size: DataCRC (4)
const FOOTER_SIZE: usize = 4;

impl MemStore {
    /// Write every entry to `path`, replacing any existing file.
    ///
    /// Returns the number of entries written.
    pub fn save_snapshot(&self, path: &Path) -> Result<u64> {
        let entries = self.entries();
        let count = entries.len() as u64;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&count.to_le_bytes())?;

        let mut hasher = crc32fast::Hasher::new();
        for (key, value) in &entries {
            let key_len = (key.len() as u32).to_le_bytes();
            let val_len = (value.len() as u32).to_le_bytes();

            for chunk in [&key_len[..], &val_len[..], key.as_slice(), value.as_slice()] {
                writer.write_all(chunk)?;
                hasher.update(chunk);
            }
        }

        writer.write_all(&hasher.finalize().to_le_bytes())?;
        writer.flush()?;

        let file = writer
            .into_inner()
            .map_err(|e| OrmError::Storage(format!("Failed to flush snapshot: {}", e)))?;
        file.sync_all()?;

        tracing::info!("Saved snapshot of {} entries to {}", count, path.display());
        Ok(count)
    }

    /// Load a store previously written by [`MemStore::save_snapshot`]
    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;

        if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(OrmError::Storage(format!(
                "Snapshot too short: {} bytes",
                bytes.len()
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(OrmError::Storage(format!(
                "Invalid snapshot magic: expected AORM, got {:?}",
                &bytes[0..4]
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(OrmError::Storage(format!(
                "Unsupported snapshot version: {}",
                version
            )));
        }

        let count = read_u64(&bytes, 6)?;

        let data_end = bytes.len() - FOOTER_SIZE;
        let data = &bytes[HEADER_SIZE..data_end];
        let stored_crc = read_u32(&bytes, data_end)?;
        if crc32fast::hash(data) != stored_crc {
            return Err(OrmError::Storage("Snapshot checksum mismatch".to_string()));
        }

        // Parse entries: [key_len(4)][val_len(4)][key][value]
        let mut map = BTreeMap::new();
        let mut pos = 0;
        while pos < data.len() {
            let key_len = read_u32(data, pos)? as usize;
            let val_len = read_u32(data, pos + 4)? as usize;
            pos += 8;

            let key = slice(data, pos, key_len)?.to_vec();
            pos += key_len;
            let value = slice(data, pos, val_len)?.to_vec();
            pos += val_len;

            map.insert(key, value);
        }

        if map.len() as u64 != count {
            return Err(OrmError::Storage(format!(
                "Snapshot entry count mismatch: header says {}, found {}",
                count,
                map.len()
            )));
        }

        tracing::info!("Loaded snapshot of {} entries from {}", count, path.display());
        Ok(Self {
            data: RwLock::new(map),
        })
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

fn slice(buf: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    buf.get(pos..pos + len)
        .ok_or_else(|| OrmError::Storage(format!("Truncated snapshot entry at offset {}", pos)))
}

fn read_u32(buf: &[u8], pos: usize) -> Result<u32> {
    let raw: [u8; 4] = slice(buf, pos, 4)?
        .try_into()
        .map_err(|_| OrmError::Storage("Malformed u32".to_string()))?;
    Ok(u32::from_le_bytes(raw))
}

fn read_u64(buf: &[u8], pos: usize) -> Result<u64> {
    let raw: [u8; 8] = slice(buf, pos, 8)?
        .try_into()
        .map_err(|_| OrmError::Storage("Malformed u64".to_string()))?;
    Ok(u64::from_le_bytes(raw))
}
