//! # AtlasORM
//!
//! A minimal table/index layer over an ordered, byte-keyed key/value store:
//! - Typed tables with auto-increment (`u64`) or natural (content-derived) keys
//! - Multi-key and unique secondary indexes kept current on every mutation
//! - Forward and reverse half-open range scans
//! - Persistent sequences
//! - A query router answering `path?modifier` requests with bounded JSON pages
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Query Router                          │
//! │             (path?modifier → {data, has_more})              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌──────────────┐          ┌─────────────┐
//!   │ AutoUInt64 / │          │   Indexes   │
//!   │ NaturalKey   │◄─────────┤ multi/unique│
//!   │    Table     │ intercept└──────┬──────┘
//!   └──────┬───────┘                 │
//!          │      ┌──────────┐       │
//!          ├─────►│ Sequence │       │
//!          │      └────┬─────┘       │
//!          ▼           ▼             ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │            KVStore  (PrefixStore per namespace)             │
//! │              MemStore · CacheStore · snapshots              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use atlasorm::{AutoUInt64TableBuilder, MemStore, Persistent, Schema};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Group {
//!     name: String,
//! }
//!
//! impl Persistent for Group {}
//!
//! let schema = Schema::new();
//! let groups = AutoUInt64TableBuilder::<Group>::new(&schema, 0x10, 0x11)
//!     .unwrap()
//!     .build();
//!
//! let store = MemStore::new();
//! let id = groups.create(&store, &Group { name: "a".into() }).unwrap();
//! assert_eq!(id, 1);
//! assert_eq!(groups.get_one(&store, id).unwrap().name, "a");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod key;
pub mod codec;
pub mod schema;
pub mod store;

pub mod sequence;
pub mod table;
pub mod indexer;
pub mod index;
pub mod iterator;
pub mod auto_uint64;
pub mod natural_key;
pub mod query;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{OrmError, Result};
pub use config::Config;

pub use key::RowId;
pub use codec::Persistent;
pub use schema::Schema;
pub use store::{CacheStore, KVStore, MemStore, PrefixStore};

pub use sequence::Sequence;
pub use table::{ExportedRow, Indexable, RowGetter, Table, TableBuilder};
pub use index::{Index, MultiKeyIndex, UInt64Index, UniqueIndex};
pub use iterator::{IndexIterator, Page, PageRequest, RowIterator, TableIterator};
pub use auto_uint64::{AutoUInt64Table, AutoUInt64TableBuilder, TableExport};
pub use natural_key::{NaturalKeyTable, NaturalKeyTableBuilder, NaturalKeyed};
pub use query::{QueryResult, QueryRouter, Response, Status};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasORM
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
