use serde_json::json;

use crate::error::Result;
use crate::value::{Value, eq_values};
use crate::vine::tests::records;
use crate::vine::{Depth, Rhs, Vine};

fn nested() -> Vine {
    Vine::from_json(&json!([[1, 2], [3]])).expect("fixture parses")
}

#[test]
fn test_depth_and_depths() -> Result<()> {
    assert_eq!(Vine::new().depth(), 0);
    assert_eq!(Vine::from_iter([1i64]).depth(), 1);
    assert_eq!(nested().depth(), 2);

    let levels = nested().depths();
    let expected = Vine::from_json(&json!([[2, 2], [2]]))?;
    assert!(levels.all_eq(&expected));
    Ok(())
}

#[test]
fn test_len_at_levels() -> Result<()> {
    let v = nested();
    assert_eq!(v.len_at(Depth::At(0))?, 2);
    assert_eq!(v.len_at(Depth::At(1))?, 3);
    assert_eq!(v.len_at(Depth::Deepest)?, 3);
    assert!(v.len_at(Depth::At(2)).is_err());
    Ok(())
}

#[test]
fn test_shape_and_structure() -> Result<()> {
    let v = Vine::from_json(&json!([[1, 2], [3]]))?;
    let shape = v.shape();
    let expected = Vine::from_json(&json!([[2, 2], [1]]))?;
    assert!(shape.all_eq(&expected), "got {shape}");

    assert_eq!(v.structure(), vec![2, 3]);
    assert_eq!(Vine::from_iter([1i64, 2]).structure(), vec![2]);
    Ok(())
}

#[test]
fn test_fill_is_depth_first() -> Result<()> {
    let v = nested();
    let filled = v.fill(0);
    let expected = Vine::from_json(&json!([[0, 1], [2]]))?;
    assert!(filled.all_eq(&expected), "got {filled}");

    let from_five = v.fill(5);
    assert!(eq_values(
        &from_five.leaves()[2].value(),
        &Value::Int(7)
    ));
    Ok(())
}

#[test]
fn test_fill_at_depth_restarts_per_branch() -> Result<()> {
    let v = nested();
    let per_group = v.fill_at(0, Depth::Deepest)?;
    let expected = Vine::from_json(&json!([[0, 1], [0]]))?;
    assert!(per_group.all_eq(&expected), "got {per_group}");

    let one_level = v.fill_at(10, Depth::At(1))?;
    let expected = Vine::from_json(&json!([[10, 11], [10]]))?;
    assert!(one_level.all_eq(&expected));

    assert!(v.fill_at(0, Depth::At(2)).is_err());
    Ok(())
}

#[test]
fn test_remaining_matches_fill_complement() -> Result<()> {
    let v = nested();
    let total = v.len_at(Depth::Deepest)? as i64;
    let fills = v.fill(0).leaves();
    let lefts = v.remaining().leaves();
    for (f, l) in fills.iter().zip(lefts.iter()) {
        let f = f.value().as_i64().expect("fill is int");
        let l = l.value().as_i64().expect("remaining is int");
        assert_eq!(l, total - 1 - f);
    }
    Ok(())
}

#[test]
fn test_remaining_at_depth_counts_per_group() -> Result<()> {
    let v = nested();
    let per_group = v.remaining_at(Depth::Deepest)?;
    let expected = Vine::from_json(&json!([[1, 0], [0]]))?;
    assert!(per_group.all_eq(&expected), "got {per_group}");
    Ok(())
}

#[test]
fn test_values_like_broadcasts() -> Result<()> {
    let v = Vine::from_iter([1i64, 2, 3]);
    let zeros = v.values_like(0);
    assert!(zeros.all_eq(&Vine::from_iter([0i64, 0, 0])));

    let picked = v.values_like(vec![7i64, 8, 9]);
    assert!(picked.all_eq(&Vine::from_iter([7i64, 8, 9])));

    // nested structures broadcast through their groups
    let n = nested();
    let filled = n.values_like(1);
    let expected = Vine::from_json(&json!([[1, 1], [1]]))?;
    assert!(filled.all_eq(&expected));
    Ok(())
}

#[test]
fn test_remix_flat_records() -> Result<()> {
    let records = records();
    let out = records.remix(&["foo"], &[("tag", Rhs::from("x"))])?;
    assert_eq!(out.len(), 3);
    assert!(eq_values(&out.field("foo")?.elem_value(2), &Value::Int(2)));
    assert!(eq_values(&out.field("tag")?.elem_value(0), &Value::from("x")));
    Ok(())
}

#[test]
fn test_remix_grouped_packs_lists() -> Result<()> {
    let records = records();
    let grouped = records.field("bar")?.group_by()?;
    let out = grouped.remix(&["foo"], &[])?;
    // one record per group; the field value is the grouped list
    assert_eq!(out.len(), 2);
    assert!(eq_values(
        &out.field("foo")?.elem_value(0),
        &Value::from(vec![0i64, 2])
    ));
    Ok(())
}

#[test]
fn test_remix_deepest_is_per_innermost_group() -> Result<()> {
    let records = records();
    let grouped = records.field("bar")?.group_by()?;
    let out = grouped.deep().remix(&["foo"], &[])?;
    assert_eq!(out.len(), 2, "one record per innermost group");
    assert!(eq_values(
        &out.field("foo")?.elem_value(1),
        &Value::from(vec![1i64])
    ));
    Ok(())
}

#[test]
fn test_at_depth_builder_threads_depth() -> Result<()> {
    let records = records();
    let grouped = records.field("bar")?.group_by()?;

    let a = grouped.deeper(1).field("foo")?;
    let b = grouped.field("foo_")?;
    assert!(a == b);

    assert_eq!(grouped.deep().len()?, 3);
    assert_eq!(grouped.deeper(1).len()?, 3);
    Ok(())
}

#[test]
fn test_values_like_keeps_root() -> Result<()> {
    let records = records();
    let marks = records.field("foo")?.values_like(1);
    assert!(marks.root().all_eq(&records));
    Ok(())
}
