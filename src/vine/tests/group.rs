use serde_json::json;

use crate::error::{BrambleError, Result};
use crate::value::{Value, eq_values};
use crate::vine::tests::records;
use crate::vine::{Depth, Elem, Vine};

#[test]
fn test_group_by_partitions_root_records() -> Result<()> {
    let records = records();
    let grouped = records.field("bar")?.group_by()?;

    let expected = Vine::from_json(&json!([
        [{"foo": 0, "bar": 0}, {"foo": 2, "bar": 0}],
        [{"foo": 1, "bar": 1}],
    ]))?;
    assert!(grouped.all_eq(&expected), "got {grouped}");
    Ok(())
}

#[test]
fn test_group_by_recurses_without_new_levels() -> Result<()> {
    let records = records();
    let grouped = records.field("bar")?.group_by()?;
    // grouping an already-grouped view recurses: the new level appears at
    // the leaves, not above the existing groups
    let regrouped = grouped.field("foo_")?.group_by()?;
    assert_eq!(regrouped.depth(), 3);
    assert_eq!(regrouped.len(), 2, "outer group count unchanged");
    assert_eq!(regrouped.ungroup_all().len(), 3);
    Ok(())
}

#[test]
fn test_group_by_requires_hashable_leaves() {
    let records = records();
    let err = records.group_by().unwrap_err();
    assert!(matches!(err, BrambleError::Unhashable(_)), "got {err}");
}

#[test]
fn test_group_ungroup_roundtrip() -> Result<()> {
    let records = records();
    let grouped = records.field("bar")?.group_by()?;
    let flat = grouped.ungroup(1)?;

    // group-then-within-group order, nothing duplicated or dropped
    assert_eq!(flat.len(), records.len());
    assert!(flat.all_eq(&records.select(&[0, 2, 1])?));

    // the elements are the same records, not copies
    flat.field("bar")?.filter_eq(1)?.set_field("seen", true)?;
    let rec1 = records.select(&[1])?;
    assert!(eq_values(&rec1.field("seen")?.elem_value(0), &Value::Bool(true)));
    Ok(())
}

#[test]
fn test_ungroup_strictness() -> Result<()> {
    let records = records();
    let grouped = records.field("bar")?.group_by()?;
    assert!(grouped.ungroup(1).is_ok());
    let err = grouped.ungroup(2).unwrap_err();
    assert!(matches!(err, BrambleError::Structure(_)));

    // the absorbing variant flattens everything without complaint
    let deep = Vine::from_json(&json!([[[1, 2]], [[3]]]))?;
    assert_eq!(deep.ungroup_all().len(), 3);
    assert_eq!(records.ungroup_all().len(), 3);
    Ok(())
}

#[test]
fn test_nonempty_filters_empty_groups() -> Result<()> {
    let v = Vine::from_json(&json!([[1, 2], [], [3]]))?;
    let kept = v.nonempty(Depth::At(0))?;
    assert_eq!(kept.len(), 2);

    let deep = Vine::from_json(&json!([[[1], []], [[]]]))?;
    let kept = deep.nonempty(Depth::Deepest)?;
    // the inner empties go first, then the group they emptied
    assert_eq!(kept.len(), 1);
    assert_eq!(kept.leaf_count(), 1);
    Ok(())
}

#[test]
fn test_nonempty_filters_root_in_parallel() -> Result<()> {
    let records = records();
    let grouped = records.field("bar")?.group_by()?;
    let gbar = grouped.field("bar")?;
    let zeros = gbar.inds_eq(0)?;
    let filtered = gbar.root().select_tree(&zeros)?;
    // one group emptied; nonempty drops it
    let compact = filtered.nonempty(Depth::At(0))?;
    assert_eq!(compact.len(), 1);
    Ok(())
}

#[test]
fn test_unique_keeps_first_seen() -> Result<()> {
    let records = records();
    let bar = records.field("bar")?;
    let uniq = bar.unique()?;
    assert_eq!(uniq.to_values().len(), 2);
    assert!(eq_values(&uniq.elem_value(0), &Value::Int(0)));
    assert!(eq_values(&uniq.elem_value(1), &Value::Int(1)));

    // the surviving root elements are the first-seen records
    assert!(uniq.root().all_eq(&records.select(&[0, 1])?));
    Ok(())
}

#[test]
fn test_unique_recurses_into_groups() -> Result<()> {
    let v = Vine::from_json(&json!([[1, 1, 2], [2, 2]]))?;
    let uniq = v.unique()?;
    let expected = Vine::from_json(&json!([[1, 2], [2]]))?;
    assert!(uniq.all_eq(&expected), "got {uniq}");
    Ok(())
}

#[test]
fn test_unique_requires_hashable_leaves() {
    let records = records();
    assert!(matches!(
        records.unique().unwrap_err(),
        BrambleError::Unhashable(_)
    ));
}

#[test]
fn test_sort_permutes_root() -> Result<()> {
    let records = records();
    let mut foo = records.field("foo")?;
    foo.sort_by(|e| match e.value() {
        Value::Int(i) => Value::Int(-i),
        other => other,
    });
    assert!(eq_values(&foo.elem_value(0), &Value::Int(2)));
    assert!(eq_values(&foo.elem_value(2), &Value::Int(0)));

    // the root view reflects the same permutation
    assert!(foo.root().all_eq(&records.select(&[2, 1, 0])?));
    Ok(())
}

#[test]
fn test_sort_default_is_stable() -> Result<()> {
    let mut v = Vine::from_iter([2i64, 1, 2, 0]);
    v.sort();
    assert!(eq_values(&v.elem_value(0), &Value::Int(0)));
    assert!(eq_values(&v.elem_value(3), &Value::Int(2)));
    Ok(())
}

#[test]
fn test_grouped_sort_orders_groups() -> Result<()> {
    let records = records();
    let mut grouped = records.field("bar")?.group_by()?;
    // order groups by descending size
    grouped.sort_by(|e| match e {
        Elem::Vine(v) => Value::Int(-(v.len() as i64)),
        Elem::Node(n) => n.get(),
    });
    let first = grouped.elem(0).and_then(|e| e.as_vine()).expect("group");
    assert_eq!(first.len(), 2);
    Ok(())
}
