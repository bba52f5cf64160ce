use crate::snapshot::Snapshot;
use crate::types::{AttributeDescriptor, ValueShape};
use crate::value::{AttrValue, Composite, Tabular};
use serde_json::json;

#[test]
fn snapshot_branch_and_leaf_both_survive() {
    let mut snap = Snapshot::new("svc", "svc:name=X");
    snap.add("a\\b", 2);
    snap.add("a", 1);
    snap.add("ab", 3);

    let renamed = snap.make_keys_unique("\\", "_");

    assert_eq!(renamed, 1);
    assert_eq!(snap.get("a_"), Some(&AttrValue::Int(1)));
    assert_eq!(snap.get("a\\b"), Some(&AttrValue::Int(2)));
    // `ab` shares a prefix but is not a branch of `a`
    assert_eq!(snap.get("ab"), Some(&AttrValue::Int(3)));
}

#[test]
fn snapshot_exact_duplicates_get_suffixed() {
    let mut snap = Snapshot::new("svc", "svc:name=X");
    snap.add("k", 1);
    snap.add("k", 2);
    snap.add("k", 3);

    assert_eq!(snap.make_keys_unique("\\", "_"), 2);
    let keys: Vec<&str> = snap.properties().iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["k", "k_", "k__"]);
}

#[test]
fn snapshot_every_nested_branch_is_suffixed() {
    let mut snap = Snapshot::new("svc", "svc:name=X");
    snap.add("a", 1);
    snap.add("a::b", 2);
    snap.add("a::b::c", 3);
    snap.add("a::bc", 4);

    assert_eq!(snap.make_keys_unique("::", "_"), 2);
    let keys: Vec<&str> = snap.properties().iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["a_", "a::b_", "a::b::c", "a::bc"]);
}

#[test]
fn snapshot_wide_tables_stay_unique() {
    let mut snap = Snapshot::new("svc", "svc:name=X");
    for row in 0..2_000 {
        snap.add(format!("T\\{row:04}\\v"), row);
    }
    snap.add("T", 0);

    assert_eq!(snap.make_keys_unique("\\", "_"), 1);
    assert_eq!(snap.get("T_"), Some(&AttrValue::Int(0)));
    assert_eq!(snap.get("T\\1999\\v"), Some(&AttrValue::Int(1999)));
}

#[test]
fn snapshot_unique_keys_are_left_alone() {
    let mut snap = Snapshot::new("svc", "svc:name=X");
    snap.add("Count", 5);
    snap.add("Detail\\k1", 42);
    assert_eq!(snap.make_keys_unique("\\", "_"), 0);
    assert_eq!(snap.len(), 2);
}

#[test]
fn snapshot_transient_flag_is_kept() {
    let mut snap = Snapshot::new("svc", "svc:name=X");
    snap.add_transient("objectName", "svc:name=X");
    assert!(snap.properties()[0].transient);
    assert!(snap.get_ignore_case("OBJECTNAME").is_some());
}

#[test]
fn attr_value_support_rules() {
    assert!(AttrValue::Null.is_supported_scalar());
    assert!(AttrValue::Bytes(vec![1, 2]).is_supported_scalar());
    assert!(AttrValue::List(vec![1.into(), 2.into()]).is_supported_scalar());
    assert!(!AttrValue::Opaque { type_name: "Thread".into() }.is_supported_scalar());
    assert!(!AttrValue::from(Composite::new()).is_supported_scalar());
    let nested = AttrValue::List(vec![Tabular::new(vec![]).into()]);
    assert!(nested.is_nested_list());
}

#[test]
fn attr_value_display_matches_scalar_text() {
    assert_eq!(AttrValue::from(5).to_string(), "5");
    assert_eq!(AttrValue::from(true).to_string(), "true");
    assert_eq!(AttrValue::Null.to_string(), "null");
    assert_eq!(AttrValue::List(vec![1.into(), 2.into()]).to_string(), "[1, 2]");
    assert_eq!(AttrValue::Opaque { type_name: "Thread".into() }.to_string(), "<Thread>");
}

#[test]
fn attr_value_from_json_and_numeric_view() {
    let v = AttrValue::from(json!({"used": 10, "max": 20.5, "name": "heap"}));
    let AttrValue::Composite(c) = v else {
        panic!("expected composite");
    };
    assert_eq!(c.get("used").and_then(AttrValue::as_f64), Some(10.0));
    assert_eq!(c.get("max").and_then(AttrValue::as_f64), Some(20.5));
    assert_eq!(c.get("name").and_then(AttrValue::as_str), Some("heap"));
    assert!(!c.is_key_value_pair());
    assert_eq!(AttrValue::from("12").as_f64(), Some(12.0));
}

#[test]
fn descriptor_builders() {
    let d = AttributeDescriptor::scalar("Count").with_description("requests served");
    assert!(d.readable);
    assert_eq!(d.shape, ValueShape::Scalar);
    assert!(!AttributeDescriptor::scalar("Password").write_only().readable);
}

#[test]
fn unavailable_sentinel() {
    let v = AttrValue::unavailable();
    assert!(v.is_unavailable());
    assert_eq!(v.to_string(), "<unavailable>");
}
