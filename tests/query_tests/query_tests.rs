//! Tests for the query router
//!
//! These tests verify:
//! - Exact, prefix and range modifiers on tables and indexes
//! - The {data, has_more} envelope and the result cap
//! - Error mapping: unknown routes, bad payloads, missing rows, internal failures
//! - Route registration rules

#[path = "../testdata/mod.rs"]
mod testdata;

use atlasorm::key::encode_u64;
use atlasorm::{Config, KVStore, MemStore, OrmError, QueryResult, QueryRouter, Status};
use serde_json::json;

use testdata::*;

// =============================================================================
// Helper Functions
// =============================================================================

fn router(keeper: &Keeper, config: &Config) -> QueryRouter {
    let mut router = QueryRouter::new(config).unwrap();
    router.register_table("/groups", keeper.groups.table()).unwrap();
    router
        .register_index::<GroupInfo, _>("/groups/admin", &keeper.group_by_admin)
        .unwrap();
    router
        .register_index::<GroupInfo, _>("/groups/alias", &keeper.group_by_alias)
        .unwrap();
    router
        .register_table("/members", keeper.members.table())
        .unwrap();
    router
        .register_index::<GroupMember, _>(
            "/members/by-group",
            keeper.members_by_group.as_multi_key(),
        )
        .unwrap();
    router
}

fn query(router: &QueryRouter, store: &dyn KVStore, path: &str, payload: &[u8]) -> QueryResult {
    let body = router.handle(store, path, payload).unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn group_names(result: &QueryResult) -> Vec<String> {
    result
        .data
        .iter()
        .map(|entry| entry.value["name"].as_str().unwrap().to_string())
        .collect()
}

fn create_groups(keeper: &Keeper, store: &MemStore, count: usize) {
    for i in 0..count {
        keeper
            .groups
            .create(store, &GroupInfo::named(&format!("g{:03}", i)))
            .unwrap();
    }
}

// =============================================================================
// Envelope Tests
// =============================================================================

#[test]
fn test_pagination_caps_results() {
    let keeper = Keeper::new();
    let store = MemStore::new();
    create_groups(&keeper, &store, 53);
    let router = router(&keeper, &Config::default());

    let result = query(&router, &store, "/groups?range", b"");
    assert_eq!(result.data.len(), 50);
    assert!(result.has_more);
    assert_eq!(result.data[0].key, encode_u64(1).to_vec());
    assert_eq!(result.data[49].key, encode_u64(50).to_vec());
}

#[test]
fn test_pagination_exact_cap_has_no_more() {
    let keeper = Keeper::new();
    let store = MemStore::new();
    create_groups(&keeper, &store, 50);
    let router = router(&keeper, &Config::default());

    let result = query(&router, &store, "/groups?range", b"");
    assert_eq!(result.data.len(), 50);
    assert!(!result.has_more);
}

#[test]
fn test_custom_cap() {
    let keeper = Keeper::new();
    let store = MemStore::new();
    create_groups(&keeper, &store, 4);
    let config = Config::builder().max_query_result(3).build();
    let router = router(&keeper, &config);

    let result = query(&router, &store, "/groups?range", b"");
    assert_eq!(group_names(&result), vec!["g000", "g001", "g002"]);
    assert!(result.has_more);
}

#[test]
fn test_envelope_shape() {
    let keeper = Keeper::new();
    let store = MemStore::new();
    keeper
        .groups
        .create(&store, &GroupInfo::named("a").with_alias("x"))
        .unwrap();
    let router = router(&keeper, &Config::default());

    let body = router.handle(&store, "/groups", &encode_u64(1)).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        value,
        json!({
            "data": [{
                "key": [0, 0, 0, 0, 0, 0, 0, 1],
                "value": {"name": "a", "admin": b"admin-a".to_vec(), "alias": "x"}
            }],
            "has_more": false
        })
    );
}

// =============================================================================
// Modifier Tests
// =============================================================================

#[test]
fn test_table_exact_and_prefix() {
    let keeper = Keeper::new();
    let store = MemStore::new();
    for (group, member) in [(1, "al"), (2, "amy"), (2, "bob"), (3, "cat")] {
        keeper
            .members
            .create(&store, &GroupMember::new(group, member.as_bytes(), 1))
            .unwrap();
    }
    let router = router(&keeper, &Config::default());

    let mut key = encode_u64(2).to_vec();
    key.extend_from_slice(b"bob");
    let exact = query(&router, &store, "/members?", &key);
    assert_eq!(exact.data.len(), 1);
    assert_eq!(exact.data[0].key, key);
    assert_eq!(exact.data[0].value["member"], json!(b"bob".to_vec()));

    let prefix = query(&router, &store, "/members?prefix", &encode_u64(2));
    assert_eq!(prefix.data.len(), 2);
    assert!(!prefix.has_more);
}

#[test]
fn test_index_queries() {
    let keeper = Keeper::new();
    let store = MemStore::new();
    for (name, admin, alias) in [
        ("a", "m1", "alpha"),
        ("b", "m2", "beta"),
        ("c", "m1", ""),
        ("d", "n1", "delta"),
    ] {
        keeper
            .groups
            .create(
                &store,
                &GroupInfo::named(name)
                    .with_admin(admin.as_bytes())
                    .with_alias(alias),
            )
            .unwrap();
    }
    let router = router(&keeper, &Config::default());

    let exact = query(&router, &store, "/groups/admin", b"m1");
    assert_eq!(group_names(&exact), vec!["a", "c"]);
    // index queries report the primary row key
    assert_eq!(exact.data[1].key, encode_u64(3).to_vec());

    let prefix = query(&router, &store, "/groups/admin?prefix", b"m");
    assert_eq!(group_names(&prefix), vec!["a", "c", "b"]);

    let range = serde_json::to_vec(&json!({"start": b"b".to_vec(), "end": b"e".to_vec()})).unwrap();
    let aliases = query(&router, &store, "/groups/alias?range", &range);
    assert_eq!(group_names(&aliases), vec!["b", "d"]);

    let open_end = serde_json::to_vec(&json!({"start": b"c".to_vec()})).unwrap();
    let aliases = query(&router, &store, "/groups/alias?range", &open_end);
    assert_eq!(group_names(&aliases), vec!["d"]);

    let by_group = query(&router, &store, "/members/by-group?range", b"");
    assert!(by_group.data.is_empty());
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_unknown_route() {
    let keeper = Keeper::new();
    let store = MemStore::new();
    let router = router(&keeper, &Config::default());

    assert!(matches!(
        router.handle(&store, "/nope?range", b""),
        Err(OrmError::UnknownRequest(_))
    ));
    assert_eq!(router.serve(&store, "/nope", b"x").status, Status::BadRequest);
}

#[test]
fn test_bad_payloads() {
    let keeper = Keeper::new();
    let store = MemStore::new();
    let router = router(&keeper, &Config::default());

    for (path, payload) in [
        ("/groups", &b""[..]),
        ("/groups?prefix", &b""[..]),
        ("/groups?range", &b"{oops"[..]),
        ("/groups?sideways", &b"x"[..]),
        ("/groups?range", &br#"{"start": [5], "end": [5]}"#[..]),
    ] {
        assert!(
            matches!(
                router.handle(&store, path, payload),
                Err(OrmError::InvalidArgument(_))
            ),
            "{} {:?}",
            path,
            payload
        );
        assert_eq!(router.serve(&store, path, payload).status, Status::BadRequest);
    }
}

#[test]
fn test_exact_miss_is_not_found() {
    let keeper = Keeper::new();
    let store = MemStore::new();
    let router = router(&keeper, &Config::default());

    assert!(matches!(
        router.handle(&store, "/groups", &encode_u64(9)),
        Err(OrmError::NotFound)
    ));
    assert_eq!(router.serve(&store, "/groups/alias", b"x").status, Status::NotFound);

    // an empty scan is a successful empty page
    let response = router.serve(&store, "/groups?range", b"");
    assert!(response.is_ok());
    let result: QueryResult = serde_json::from_slice(&response.payload).unwrap();
    assert!(result.data.is_empty());
    assert!(!result.has_more);
}

#[test]
fn test_corrupt_row_is_internal() {
    let keeper = Keeper::new();
    let store = MemStore::new();
    let router = router(&keeper, &Config::default());

    let mut key = vec![GROUP_TABLE];
    key.extend_from_slice(&encode_u64(1));
    store.set(&key, &[0xFF]).unwrap();

    let response = router.serve(&store, "/groups?range", b"");
    assert_eq!(response.status, Status::Internal);
    assert_eq!(response.payload, b"internal error");
}

// =============================================================================
// Registration Tests
// =============================================================================

#[test]
fn test_route_registration_rules() {
    let keeper = Keeper::new();
    let mut router = router(&keeper, &Config::default());

    assert!(matches!(
        router.register_table("/groups", keeper.groups.table()),
        Err(OrmError::InvalidArgument(_))
    ));
    assert!(matches!(
        router.register_table("", keeper.groups.table()),
        Err(OrmError::InvalidArgument(_))
    ));
    assert!(matches!(
        router.register_table("/a?b", keeper.groups.table()),
        Err(OrmError::InvalidArgument(_))
    ));

    let routes: Vec<&str> = router.routes().collect();
    assert_eq!(
        routes,
        vec!["/groups", "/groups/admin", "/groups/alias", "/members", "/members/by-group"]
    );
}

#[test]
fn test_router_rejects_invalid_config() {
    let config = Config::builder().max_query_result(0).build();
    assert!(matches!(QueryRouter::new(&config), Err(OrmError::Config(_))));
}
