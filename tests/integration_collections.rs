//! Integration tests for the full collection workflow
//!
//! These tests run whole chains — construct, derive, filter, mutate,
//! group, sort, convert — and verify the end-to-end behavior the library
//! promises: comparisons that filter, derived views that write through,
//! and grouping that recovers the original records.

use anyhow::Result;
use bramble::value::{Value, eq_values};
use bramble::vine::{Depth, Vine};
use serde_json::json;

fn dataset() -> Vine {
    Vine::from_json(&json!([
        {"name": "ada",   "team": "core",  "score": 3},
        {"name": "brin",  "team": "infra", "score": 5},
        {"name": "cole",  "team": "core",  "score": 1},
        {"name": "dara",  "team": "infra", "score": 5},
        {"name": "edda",  "team": "ml",    "score": 2},
    ]))
    .expect("dataset parses")
}

#[test]
fn test_filter_mutate_recover_chain() -> Result<()> {
    let _ = bramble::logging::init();
    let people = dataset();

    // Filter on one field, mutate through the filtered view, observe the
    // change on the original collection.
    let core = people.field("team")?.filter_eq("core")?.logged("core team");
    assert_eq!(core.len(), 2);
    core.set_field("flagged", true)?;

    let flagged = people.field("team")?.filter_eq("core")?.field("flagged")?;
    assert!(eq_values(&flagged.elem_value(0), &Value::Bool(true)));

    // Records outside the filter never saw the write.
    assert!(
        people.field("name")?.filter_eq("edda")?.field("flagged").is_err(),
        "unfiltered records must stay untouched"
    );
    Ok(())
}

#[test]
fn test_group_sort_and_introspect() -> Result<()> {
    let people = dataset();
    let grouped = people.field("team")?.group_by()?;
    assert_eq!(grouped.len(), 3, "core, infra, ml in first-seen order");
    assert_eq!(grouped.structure(), vec![3, 5]);

    // Shape fills each innermost group with its own length.
    let shape = grouped.field("score_")?.shape();
    let expected = Vine::from_json(&json!([[2, 2], [2, 2], [1]]))?;
    assert!(shape.all_eq(&expected), "got {shape}");

    // Ungrouping recovers every record exactly once.
    let flat = grouped.ungroup(1)?;
    assert_eq!(flat.len(), people.len());
    let names = flat.field("name")?;
    let mut seen: Vec<String> = names
        .to_values()
        .iter()
        .map(Value::render_raw)
        .collect();
    seen.sort();
    assert_eq!(seen, vec!["ada", "brin", "cole", "dara", "edda"]);

    // Sorting a derived view permutes its root the same way.
    let mut scores = people.field("score")?;
    scores.sort();
    assert!(eq_values(&scores.elem_value(0), &Value::Int(1)));
    let first = scores.root().field("name")?;
    assert!(eq_values(&first.elem_value(0), &Value::from("cole")));
    Ok(())
}

#[test]
fn test_grouped_filtering_maps_back() -> Result<()> {
    let people = dataset();
    let grouped = people.field("team")?.group_by()?;
    let scores = grouped.field("score_")?;

    // Grouped comparisons keep the group structure and fill misses with
    // empty groups, which nonempty then strips.
    let high = scores.filter_ge(3)?;
    assert_eq!(high.len(), 3);
    let compact = high.nonempty(Depth::At(0))?;
    assert_eq!(compact.len(), 2);
    assert_eq!(compact.leaf_count(), 3);

    let names = compact.field("name_")?.ungroup_all();
    let got: Vec<String> = names.to_values().iter().map(Value::render_raw).collect();
    assert_eq!(got, vec!["ada", "brin", "dara"]);
    Ok(())
}

#[test]
fn test_unique_and_fill_properties() -> Result<()> {
    let people = dataset();
    let scores = people.field("score")?;

    let uniq = scores.unique()?;
    assert_eq!(uniq.to_values().len(), 4, "5 appears twice");
    assert_eq!(uniq.root().len(), 4, "root keeps first-seen records only");

    // fill assigns [v, v+N) depth-first; remaining counts down to zero.
    let grouped = people.field("team")?.group_by()?;
    let filled = grouped.fill(0);
    let leaves: Vec<i64> = filled
        .leaves()
        .iter()
        .map(|n| n.value().as_i64().expect("fill is int"))
        .collect();
    assert_eq!(leaves, vec![0, 1, 2, 3, 4]);

    let total = grouped.len_at(Depth::Deepest)? as i64;
    let lefts = grouped.remaining().leaves();
    for (f, l) in filled.leaves().iter().zip(lefts.iter()) {
        assert_eq!(
            l.value().as_i64().unwrap(),
            total - 1 - f.value().as_i64().unwrap()
        );
    }
    Ok(())
}

#[test]
fn test_remix_and_tabulate() -> Result<()> {
    let people = dataset();

    let slim = people.remix(&["name", "score"], &[("source", "dataset".into())])?;
    assert_eq!(slim.len(), 5);

    let df = slim.to_dataframe(Some("name"))?;
    assert_eq!(df.height(), 5);
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, vec!["name", "score", "source"]);

    // Numeric nests cross the array boundary with their shape intact.
    let grid = Vine::from_json(&json!([[1, 2], [3, 4], [5, 6]]))?;
    let arr = grid.to_ndarray()?;
    assert_eq!(arr.shape(), &[3, 2]);
    let back = Vine::from_ndarray(&arr);
    assert_eq!(back.structure(), grid.structure());
    Ok(())
}

#[test]
fn test_deep_copy_breaks_aliasing() -> Result<()> {
    let people = dataset();
    let copy = people.deep_copy();
    copy.field("score")?.add_assign(100)?;

    // the copy moved, the original did not
    assert!(eq_values(&copy.field("score")?.elem_value(0), &Value::Int(103)));
    assert!(eq_values(&people.field("score")?.elem_value(0), &Value::Int(3)));
    Ok(())
}
