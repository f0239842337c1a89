//! Query Module
//!
//! Routes ad hoc external queries to tables and indexes.
//!
//! ## Request Format
//! ```text
//! <route>[?<modifier>]   payload
//!
//! (none) / ""   exact key lookup      payload = key (non-empty)
//! "prefix"      prefix scan           payload = prefix (non-empty)
//! "range"       range scan            payload = {"start": [..], "end": [..]}
//!                                     (either bound optional, empty = unbounded)
//! ```
//!
//! ## Response Format
//! ```text
//! {"data": [{"key": [..], "value": <row as JSON>}, ...], "has_more": bool}
//! ```
//! At most `max_query_result` entries are returned; `has_more` is set when at
//! least one more was available.

mod response;

pub use response::{Response, Status};

use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::codec::{to_json, Persistent};
use crate::config::Config;
use crate::error::{OrmError, Result};
use crate::index::Index;
use crate::key::{prefix_end, RowId};
use crate::store::KVStore;
use crate::table::Table;

/// Rows re-encoded as JSON
pub type JsonRows<'a> = Box<dyn Iterator<Item = Result<(RowId, serde_json::Value)>> + 'a>;

// =============================================================================
// Request Parsing
// =============================================================================

/// How a request payload selects rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    Exact(Vec<u8>),
    Prefix(Vec<u8>),
    Range {
        start: Option<Vec<u8>>,
        end: Option<Vec<u8>>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RangePayload {
    #[serde(default)]
    start: Option<Vec<u8>>,
    #[serde(default)]
    end: Option<Vec<u8>>,
}

impl Modifier {
    /// Interpret `payload` according to the modifier suffix of a path
    pub fn parse(modifier: Option<&str>, payload: &[u8]) -> Result<Self> {
        match modifier.unwrap_or("") {
            "" => {
                require_payload(payload, "key")?;
                Ok(Modifier::Exact(payload.to_vec()))
            }
            "prefix" => {
                require_payload(payload, "prefix")?;
                Ok(Modifier::Prefix(payload.to_vec()))
            }
            "range" => {
                let range = if payload.is_empty() {
                    RangePayload::default()
                } else {
                    serde_json::from_slice(payload).map_err(|e| {
                        OrmError::InvalidArgument(format!("malformed range payload: {}", e))
                    })?
                };
                Ok(Modifier::Range {
                    start: range.start,
                    end: range.end,
                })
            }
            other => Err(OrmError::InvalidArgument(format!(
                "unknown modifier: {:?}",
                other
            ))),
        }
    }
}

fn require_payload(payload: &[u8], what: &str) -> Result<()> {
    if payload.is_empty() {
        return Err(OrmError::InvalidArgument(format!("empty {}", what)));
    }
    Ok(())
}

/// Split `route?modifier` on the first `?`
pub fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((route, modifier)) => (route, Some(modifier)),
        None => (path, None),
    }
}

/// `[key, key ++ 0x00)`: exactly `key`
fn exact_end(key: &[u8]) -> Vec<u8> {
    let mut end = key.to_vec();
    end.push(0x00);
    end
}

// =============================================================================
// Queryables
// =============================================================================

/// Something a route can be bound to
pub trait Queryable {
    fn query<'a>(&self, store: &'a dyn KVStore, modifier: &Modifier) -> Result<JsonRows<'a>>;
}

fn json_rows<'a, T, I>(it: I) -> JsonRows<'a>
where
    T: Serialize + 'a,
    I: Iterator<Item = Result<(RowId, T)>> + 'a,
{
    Box::new(it.map(|item| item.and_then(|(id, row)| Ok((id, to_json(&row)?)))))
}

/// Route target for a table, queried by row id
pub struct TableQuery<T> {
    table: Table<T>,
}

impl<T: Persistent + 'static> Queryable for TableQuery<T> {
    fn query<'a>(&self, store: &'a dyn KVStore, modifier: &Modifier) -> Result<JsonRows<'a>> {
        let it = match modifier {
            Modifier::Exact(key) => {
                let end = exact_end(key);
                self.table
                    .prefix_scan(store, Some(key.as_slice()), Some(end.as_slice()))?
            }
            Modifier::Prefix(prefix) => {
                let end = prefix_end(prefix);
                self.table
                    .prefix_scan(store, Some(prefix.as_slice()), end.as_deref())?
            }
            Modifier::Range { start, end } => {
                self.table.prefix_scan(store, start.as_deref(), end.as_deref())?
            }
        };
        Ok(json_rows(it))
    }
}

/// Route target for an index, queried by index key. The row type is named
/// explicitly at registration.
pub struct IndexQuery<T, I> {
    index: I,
    _row: PhantomData<fn() -> T>,
}

impl<T, I> Queryable for IndexQuery<T, I>
where
    T: Persistent + 'static,
    I: Index<T>,
{
    fn query<'a>(&self, store: &'a dyn KVStore, modifier: &Modifier) -> Result<JsonRows<'a>> {
        let it = match modifier {
            Modifier::Exact(key) => self.index.get(store, key)?,
            Modifier::Prefix(prefix) => {
                let end = prefix_end(prefix);
                self.index
                    .prefix_scan(store, Some(prefix.as_slice()), end.as_deref())?
            }
            Modifier::Range { start, end } => {
                self.index.prefix_scan(store, start.as_deref(), end.as_deref())?
            }
        };
        Ok(json_rows(it))
    }
}

// =============================================================================
// Router
// =============================================================================

/// One returned row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEntry {
    pub key: Vec<u8>,
    pub value: serde_json::Value,
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub data: Vec<QueryEntry>,
    pub has_more: bool,
}

/// Path → queryable registry
pub struct QueryRouter {
    routes: BTreeMap<String, Box<dyn Queryable>>,
    max_results: usize,
}

impl QueryRouter {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            routes: BTreeMap::new(),
            max_results: config.max_query_result,
        })
    }

    /// Bind `path` to a table
    pub fn register_table<T>(&mut self, path: impl Into<String>, table: &Table<T>) -> Result<()>
    where
        T: Persistent + 'static,
    {
        self.register(
            path.into(),
            Box::new(TableQuery {
                table: table.clone(),
            }),
        )
    }

    /// Bind `path` to an index whose rows are of type `T`
    pub fn register_index<T, I>(&mut self, path: impl Into<String>, index: &I) -> Result<()>
    where
        T: Persistent + 'static,
        I: Index<T> + Clone + 'static,
    {
        self.register(
            path.into(),
            Box::new(IndexQuery {
                index: index.clone(),
                _row: PhantomData,
            }),
        )
    }

    /// Registered routes, sorted
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    fn register(&mut self, path: String, queryable: Box<dyn Queryable>) -> Result<()> {
        if path.is_empty() || path.contains('?') {
            return Err(OrmError::InvalidArgument(format!("invalid route: {:?}", path)));
        }
        if self.routes.contains_key(&path) {
            return Err(OrmError::InvalidArgument(format!(
                "route already registered: {}",
                path
            )));
        }
        tracing::debug!("Registered query route {}", path);
        self.routes.insert(path, queryable);
        Ok(())
    }

    /// Run a query and return the JSON envelope
    pub fn handle(&self, store: &dyn KVStore, path: &str, payload: &[u8]) -> Result<Vec<u8>> {
        let (route, modifier) = split_path(path);
        let queryable = self
            .routes
            .get(route)
            .ok_or_else(|| OrmError::UnknownRequest(route.to_string()))?;
        let modifier = Modifier::parse(modifier, payload)?;

        tracing::debug!("Query {} {:?}", route, modifier);

        let result = self.drain(queryable.query(store, &modifier)?)?;
        if result.data.is_empty() && matches!(modifier, Modifier::Exact(_)) {
            return Err(OrmError::NotFound);
        }
        serde_json::to_vec(&result).map_err(|e| OrmError::Serialization(e.to_string()))
    }

    /// [`QueryRouter::handle`] with errors folded into a status
    pub fn serve(&self, store: &dyn KVStore, path: &str, payload: &[u8]) -> Response {
        match self.handle(store, path, payload) {
            Ok(body) => Response::ok(body),
            Err(e) => Response::from_error(&e),
        }
    }

    fn drain(&self, mut rows: JsonRows<'_>) -> Result<QueryResult> {
        let mut data = Vec::new();
        while data.len() < self.max_results {
            match rows.next() {
                Some(item) => {
                    let (id, value) = item?;
                    data.push(QueryEntry {
                        key: id.into_bytes(),
                        value,
                    });
                }
                None => return Ok(QueryResult { data, has_more: false }),
            }
        }

        let has_more = rows.next().transpose()?.is_some();
        Ok(QueryResult { data, has_more })
    }
}
