//! Tests for NaturalKeyTable
//!
//! These tests verify:
//! - Rows live under their natural key, child rows contiguous per parent
//! - Natural-key uniqueness on create
//! - Natural-key immutability on save
//! - Delete by value
//! - Export/import validation

#[path = "../testdata/mod.rs"]
mod testdata;

use atlasorm::key::encode_u64;
use atlasorm::{ExportedRow, MemStore, NaturalKeyed, OrmError, RowId};

use testdata::*;

fn member_names<I>(it: I) -> Vec<String>
where
    I: Iterator<Item = atlasorm::Result<(RowId, GroupMember)>>,
{
    it.map(|item| {
        let m = item.unwrap().1;
        format!("{}:{}", m.group_id, String::from_utf8(m.member).unwrap())
    })
    .collect()
}

#[test]
fn test_create_stores_under_natural_key() {
    let keeper = Keeper::new();
    let store = MemStore::new();

    let member = GroupMember::new(7, b"alice", 1);
    let row_id = keeper.members.create(&store, &member).unwrap();

    assert_eq!(row_id, member.natural_key());
    assert!(keeper.members.has(&store, &row_id).unwrap());
    assert_eq!(keeper.members.get_one(&store, &row_id).unwrap(), member);

    let mut raw = vec![MEMBER_TABLE];
    raw.extend_from_slice(&encode_u64(7));
    raw.extend_from_slice(b"alice");
    assert_eq!(keys_under(&store, MEMBER_TABLE), vec![raw]);
}

#[test]
fn test_create_duplicate_natural_key_fails() {
    let keeper = Keeper::new();
    let store = MemStore::new();

    keeper
        .members
        .create(&store, &GroupMember::new(1, b"alice", 1))
        .unwrap();

    let result = keeper.members.create(&store, &GroupMember::new(1, b"alice", 99));
    assert!(matches!(result, Err(OrmError::UniqueConstraint(_))));

    let row_id = GroupMember::new(1, b"alice", 0).natural_key();
    assert_eq!(keeper.members.get_one(&store, &row_id).unwrap().weight, 1);
}

#[test]
fn test_save_with_same_key_updates_fields() {
    let keeper = Keeper::new();
    let store = MemStore::new();

    let row_id = keeper
        .members
        .create(&store, &GroupMember::new(1, b"alice", 1))
        .unwrap();

    keeper
        .members
        .save(&store, &GroupMember::new(1, b"alice", 5))
        .unwrap();
    assert_eq!(keeper.members.get_one(&store, &row_id).unwrap().weight, 5);

    keeper
        .members
        .save_at(&store, &row_id, &GroupMember::new(1, b"alice", 6))
        .unwrap();
    assert_eq!(keeper.members.get_one(&store, &row_id).unwrap().weight, 6);
}

#[test]
fn test_save_with_changed_key_fails() {
    let keeper = Keeper::new();
    let store = MemStore::new();

    let original = GroupMember::new(1, b"alice", 1);
    let row_id = keeper.members.create(&store, &original).unwrap();
    let moved = GroupMember::new(2, b"alice", 1);

    assert!(matches!(
        keeper.members.save(&store, &moved),
        Err(OrmError::NotFound)
    ));
    assert!(matches!(
        keeper.members.save_at(&store, &row_id, &moved),
        Err(OrmError::InvalidArgument(_))
    ));

    assert_eq!(keeper.members.get_one(&store, &row_id).unwrap(), original);
    assert!(!keeper.members.has(&store, &moved.natural_key()).unwrap());
    assert!(!keeper.members_by_group.has(&store, 2).unwrap());
}

#[test]
fn test_delete_by_value() {
    let keeper = Keeper::new();
    let store = MemStore::new();

    let member = GroupMember::new(1, b"alice", 1);
    let row_id = keeper.members.create(&store, &member).unwrap();

    keeper.members.delete(&store, &member).unwrap();
    assert!(!keeper.members.has(&store, &row_id).unwrap());
    assert!(!keeper.members_by_group.has(&store, 1).unwrap());
    assert!(matches!(
        keeper.members.delete(&store, &member),
        Err(OrmError::NotFound)
    ));
}

#[test]
fn test_children_are_contiguous_under_parent() {
    let keeper = Keeper::new();
    let store = MemStore::new();

    for (group, member) in [(2, "zed"), (1, "bob"), (2, "amy"), (3, "cat"), (1, "al")] {
        keeper
            .members
            .create(&store, &GroupMember::new(group, member.as_bytes(), 1))
            .unwrap();
    }

    let group_two = encode_u64(2);
    let group_three = encode_u64(3);
    let scanned = member_names(
        keeper
            .members
            .prefix_scan(&store, Some(&group_two[..]), Some(&group_three[..]))
            .unwrap(),
    );
    assert_eq!(scanned, vec!["2:amy", "2:zed"]);

    let all = member_names(keeper.members.reverse_prefix_scan(&store, None, None).unwrap());
    assert_eq!(all, vec!["3:cat", "2:zed", "2:amy", "1:bob", "1:al"]);
}

#[test]
fn test_export_import() {
    let keeper = Keeper::new();
    let store = MemStore::new();

    keeper
        .members
        .create(&store, &GroupMember::new(1, b"alice", 1))
        .unwrap();
    keeper
        .members
        .create(&store, &GroupMember::new(2, b"bob", 2))
        .unwrap();

    let exported = keeper.members.export(&store).unwrap();
    let fresh = MemStore::new();
    keeper.members.import(&fresh, &exported).unwrap();
    assert_eq!(keeper.members.export(&fresh).unwrap(), exported);
    assert!(keeper.members_by_group.has(&fresh, 2).unwrap());

    let misplaced = vec![ExportedRow {
        id: RowId::new(b"wrong".to_vec()),
        value: GroupMember::new(1, b"alice", 1),
    }];
    assert!(matches!(
        keeper.members.import(&MemStore::new(), &misplaced),
        Err(OrmError::InvalidArgument(_))
    ));
}

#[test]
fn test_import_json_type_mismatch() {
    let keeper = Keeper::new();
    let source = MemStore::new();
    keeper
        .members
        .create(&source, &GroupMember::new(1, b"alice", 1))
        .unwrap();

    let json = serde_json::to_vec(&keeper.members.export(&source).unwrap()).unwrap();
    let target = MemStore::new();
    keeper.members.import_json(&target, &json).unwrap();
    assert_eq!(keeper.members.export(&target).unwrap().len(), 1);

    let groups_json = br#"[{"id": [1], "value": {"name": "a", "admin": [], "alias": ""}}]"#;
    assert!(matches!(
        keeper.members.import_json(&MemStore::new(), groups_json),
        Err(OrmError::TypeMismatch(_))
    ));
}
