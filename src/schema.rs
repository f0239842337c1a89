//! Schema
//!
//! Registry of the single-byte prefixes a keeper carves its keyspace into.
//!
//! Tables, indexes and sequences claim their prefix while being constructed,
//! so two structures that would share a namespace fail at construction time
//! instead of silently corrupting each other's rows. Once every structure is
//! built the schema can be sealed; later claims are rejected.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{OrmError, Result};

/// What a prefix is used for (diagnostics only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixKind {
    Table,
    Index,
    Sequence,
}

/// Prefix registry shared by every table, index and sequence of one keeper
#[derive(Debug, Default)]
pub struct Schema {
    /// prefix → owner kind
    claimed: Mutex<BTreeMap<u8, PrefixKind>>,

    /// Set once construction is finished
    sealed: AtomicBool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `prefix` for a structure of the given kind
    pub fn claim(&self, prefix: u8, kind: PrefixKind) -> Result<()> {
        if self.is_sealed() {
            return Err(OrmError::InvalidArgument(format!(
                "schema is sealed, cannot register {:?} prefix 0x{:02x}",
                kind, prefix
            )));
        }

        let mut claimed = self.claimed.lock();
        if let Some(owner) = claimed.get(&prefix) {
            return Err(OrmError::InvalidArgument(format!(
                "prefix 0x{:02x} already used by a {:?}",
                prefix, owner
            )));
        }
        claimed.insert(prefix, kind);

        tracing::debug!("Registered {:?} prefix 0x{:02x}", kind, prefix);
        Ok(())
    }

    /// Reject any further registrations
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    /// All claimed prefixes in ascending order
    pub fn prefixes(&self) -> Vec<(u8, PrefixKind)> {
        self.claimed.lock().iter().map(|(&p, &k)| (p, k)).collect()
    }
}
