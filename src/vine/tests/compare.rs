use serde_json::json;

use crate::error::Result;
use crate::shape::IndexTree;
use crate::value::{Value, eq_values};
use crate::vine::tests::records;
use crate::vine::{Depth, Vine};

#[test]
fn test_filter_eq_selects_root_records() -> Result<()> {
    let records = records();
    let zeros = records.field("bar")?.filter_eq(0)?;

    let expected = Vine::from_json(&json!([
        {"foo": 0, "bar": 0},
        {"foo": 2, "bar": 0},
    ]))?;
    assert!(zeros.all_eq(&expected), "got {zeros}");
    Ok(())
}

#[test]
fn test_filter_then_mutate_writes_through() -> Result<()> {
    let records = records();
    (records.field("bar")?.filter_eq(0)?).set_field("baz", 3)?;

    let expected = Vine::from_json(&json!([
        {"foo": 0, "bar": 0, "baz": 3},
        {"foo": 1, "bar": 1},
        {"foo": 2, "bar": 0, "baz": 3},
    ]))?;
    assert!(records.all_eq(&expected), "got {records}");
    Ok(())
}

#[test]
fn test_empty_rhs_policy() -> Result<()> {
    let records = records();
    let bar = records.field("bar")?;

    // eq against an empty sequence selects nothing...
    let none = bar.filter_eq(Vec::<Value>::new())?;
    assert!(none.is_empty());

    // ...but every other comparison returns the collection unfiltered
    let all = bar.filter_lt(Vec::<Value>::new())?;
    assert!(all.all_eq(&records), "got {all}");
    let all = bar.filter_ne(Vec::<Value>::new())?;
    assert!(all.all_eq(&records));
    Ok(())
}

#[test]
fn test_same_length_sequence_is_elementwise() -> Result<()> {
    let records = records();
    let bar = records.field("bar")?;
    // positions 0 and 1 match their rhs counterpart, position 2 does not
    let matched = bar.filter_eq(vec![0i64, 1, 5])?;
    assert_eq!(matched.len(), 2);
    assert!(matched.all_eq(&records.select(&[0, 1])?));
    Ok(())
}

#[test]
fn test_different_length_merges() -> Result<()> {
    let records = records();
    let bar = records.field("bar")?;

    // eq against several candidates unions the matches
    let either = bar.filter_eq(vec![0i64, 1])?;
    assert_eq!(either.len(), 3);

    // ne against several candidates intersects the mismatches
    let neither = bar.filter_ne(vec![0i64, 1])?;
    assert!(neither.is_empty());
    let not_five = bar.filter_ne(vec![5i64, 0])?;
    assert_eq!(not_five.len(), 1);
    assert!(not_five.all_eq(&records.select(&[1])?));
    Ok(())
}

#[test]
fn test_identity_shortcuts() -> Result<()> {
    let records = records();
    let bar = records.field("bar")?;

    // a view is identity-equal to its clone (same node tags)
    let everything = bar.filter_eq(&bar)?;
    assert!(everything.all_eq(&records));
    assert!(bar.filter_ne(&bar)?.is_empty());
    assert!(bar.filter_lt(&bar)?.is_empty());
    assert!(bar.filter_ge(&bar)?.all_eq(&records));
    Ok(())
}

#[test]
fn test_ordering_comparisons_filter() -> Result<()> {
    let records = records();
    let foo = records.field("foo")?;
    let big = foo.filter_gt(0)?;
    assert_eq!(big.len(), 2);
    assert!(big.all_eq(&records.select(&[1, 2])?));

    let small = foo.filter_le(1)?;
    assert!(small.all_eq(&records.select(&[0, 1])?));
    Ok(())
}

#[test]
fn test_nested_comparison_preserves_groups() -> Result<()> {
    let records = records();
    let grouped = records.field("bar")?.group_by()?;
    let gbar = grouped.field("bar")?;

    let zeros = gbar.filter_eq(0)?;
    // group structure survives; the non-matching group goes empty
    assert_eq!(zeros.len(), 2);
    let first = zeros.elem(0).and_then(|e| e.as_vine()).expect("group");
    assert_eq!(first.len(), 2);
    let second = zeros.elem(1).and_then(|e| e.as_vine()).expect("group");
    assert!(second.is_empty());
    Ok(())
}

#[test]
fn test_inds_variant_returns_structure() -> Result<()> {
    let records = records();
    let inds = records.field("bar")?.inds_eq(0)?;
    assert_eq!(inds, IndexTree::Flat(vec![0, 2]));

    let grouped = records.field("bar")?.group_by()?;
    let inds = grouped.field("bar")?.inds_eq(1)?;
    assert_eq!(
        inds,
        IndexTree::Nested(vec![IndexTree::Flat(vec![]), IndexTree::Flat(vec![0])])
    );
    Ok(())
}

#[test]
fn test_boolean_equality_is_separate() -> Result<()> {
    let a = Vine::from_json(&json!([[1, 2], [3]]))?;
    let b = Vine::from_json(&json!([[1, 2], [3]]))?;
    let c = Vine::from_json(&json!([[1, 2], [4]]))?;
    assert!(a == b);
    assert!(a != c);
    assert!(a != Vine::from_json(&json!([[1, 2]]))?);
    Ok(())
}

#[test]
fn test_arithmetic_broadcast() -> Result<()> {
    let v = Vine::from_iter([1i64, 2, 3]);
    let out = v.add(10)?;
    assert!(eq_values(&out.elem_value(2), &Value::Int(13)));

    let out = v.mul(vec![2i64, 3, 4])?;
    assert!(eq_values(&out.elem_value(2), &Value::Int(12)));

    let err = v.div(0).unwrap_err();
    assert!(err.to_string().contains("divide by zero"));
    Ok(())
}

#[test]
fn test_arithmetic_recurses_into_groups() -> Result<()> {
    let v = Vine::from_json(&json!([[1, 2], [3]]))?;
    let out = v.add(1)?;
    assert_eq!(out.leaves().len(), 3);
    assert!(eq_values(
        &out.elem(1).unwrap().as_vine().unwrap().elem_value(0),
        &Value::Int(4)
    ));
    Ok(())
}

#[test]
fn test_in_place_ops_mutate_shared_cells() -> Result<()> {
    let records = records();
    records.field("foo")?.add_assign(100)?;
    let expected = Vine::from_json(&json!([
        {"foo": 100, "bar": 0},
        {"foo": 101, "bar": 1},
        {"foo": 102, "bar": 0},
    ]))?;
    assert!(records.all_eq(&expected), "got {records}");
    Ok(())
}

#[test]
fn test_unary_ops() -> Result<()> {
    let v = Vine::from_iter([1i64, -2, 3]);
    assert!(eq_values(&v.neg()?.elem_value(0), &Value::Int(-1)));
    assert!(eq_values(&v.abs()?.elem_value(1), &Value::Int(2)));

    let b = Vine::from_iter([true, false]);
    assert!(eq_values(&b.invert()?.elem_value(0), &Value::Bool(false)));
    Ok(())
}

#[test]
fn test_divmod_pairs() -> Result<()> {
    let v = Vine::from_iter([7i64, 9]);
    let out = v.divmod(2)?;
    assert!(eq_values(&out.elem_value(0), &Value::from(vec![3i64, 1])));
    assert!(eq_values(&out.elem_value(1), &Value::from(vec![4i64, 1])));
    Ok(())
}

#[test]
fn test_logical_elementwise_booleans() {
    let a = Vine::from_iter([true, true, false]);
    let b = Vine::from_iter([true, false, false]);
    let both = &a & &b;
    assert!(eq_values(&both.elem_value(0), &Value::Bool(true)));
    assert!(eq_values(&both.elem_value(1), &Value::Bool(false)));
}

#[test]
fn test_logical_identity_set_fallback() -> Result<()> {
    let records = records();
    let low = records.field("foo")?.filter_lt(2)?; // foo 0, 1
    let zero_bar = records.field("bar")?.filter_eq(0)?; // foo 0, 2

    // records are not booleans, so the set fallback kicks in on identity
    let both = &low & &zero_bar;
    assert_eq!(both.len(), 1);
    assert!(both.all_eq(&records.select(&[0])?));

    let any = &low | &zero_bar;
    assert_eq!(any.len(), 3);

    let one_side = &low ^ &zero_bar;
    assert_eq!(one_side.len(), 2);
    assert!(one_side.all_eq(&records.select(&[1, 2])?));
    Ok(())
}

#[test]
fn test_comparison_at_depth_via_field() -> Result<()> {
    let records = records();
    let grouped = records.field("bar")?.group_by()?;
    // trailing mark and explicit depth agree
    let a = grouped.field("foo_")?;
    let b = grouped.field_at("foo", Depth::At(1))?;
    assert!(a == b);
    Ok(())
}
