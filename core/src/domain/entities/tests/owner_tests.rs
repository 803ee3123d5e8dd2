//! Unit tests for owner references

use std::collections::HashSet;

use crate::domain::entities::owner::{OwnerKind, OwnerRef};

#[test]
fn test_known_kinds_parse_to_variants() {
    assert_eq!(OwnerKind::from("user"), OwnerKind::User);
    assert_eq!(OwnerKind::from("organization"), OwnerKind::Organization);
    assert!(matches!(OwnerKind::from("team"), OwnerKind::Other(ref kind) if kind.as_str() == "team"));
}

#[test]
fn test_same_name_is_one_kind() {
    let kinds: HashSet<OwnerKind> = ["user", "user", "team", "team"]
        .into_iter()
        .map(OwnerKind::from)
        .chain([OwnerKind::from("user".to_string()), OwnerKind::User])
        .collect();

    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&OwnerKind::User));
    assert!(kinds.contains(&OwnerKind::from("team")));

    let decoded: OwnerKind = serde_json::from_str("\"user\"").unwrap();
    assert_eq!(decoded, OwnerKind::User);
}

#[test]
fn test_kind_string_round_trip() {
    for kind in [OwnerKind::User, OwnerKind::Organization, OwnerKind::from("device")] {
        let text: String = kind.clone().into();
        assert_eq!(OwnerKind::from(text), kind);
    }
}

#[test]
fn test_owner_ref_serializes_kind_as_string() {
    let owner = OwnerRef::organization(42);
    let json = serde_json::to_value(&owner).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "organization", "id": "42"}));
    assert_eq!(owner.to_string(), "organization#42");
}
