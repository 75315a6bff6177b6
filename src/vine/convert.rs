//! Boundary conversions: plain nested JSON values, polars data frames, and
//! ndarray arrays.
//!
//! These are the seams to the out-of-scope collaborators: a hosting
//! application serialises through serde_json, hands rows to a tabular
//! engine as a `DataFrame`, or hands numeric nests to ndarray. Conversions
//! are recursive and inclusive of nested collections; aliasing ends here —
//! exported structures are plain copies.

use std::collections::BTreeSet;

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use polars::prelude::{Column, DataFrame, NamedFrom as _, Series};
use serde::{Serialize, Serializer};
use serde_json::Value as Json;

use crate::error::{BrambleError, Result};
use crate::record::Record;
use crate::value::{Node, Value};

use super::model::{Elem, Vine};

/// One JSON value as a leaf value (arrays become plain lists here, not
/// nested collections).
pub fn value_from_json(j: &Json) -> Value {
    match j {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float(n.as_f64().unwrap_or(f64::NAN))),
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) => Value::List(
            items
                .iter()
                .map(|x| Node::new(value_from_json(x)))
                .collect(),
        ),
        Json::Object(map) => {
            let mut record = Record::new();
            for (k, v) in map {
                record.set_node(k.clone(), Node::new(value_from_json(v)));
            }
            Value::Record(record)
        }
    }
}

pub fn value_to_json(v: &Value) -> Json {
    match v {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(x) => serde_json::Number::from_f64(*x)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Str(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(|n| value_to_json(&n.value())).collect()),
        Value::Record(r) => {
            let mut map = serde_json::Map::new();
            for (k, n) in r.entries() {
                map.insert(k, value_to_json(&n.value()));
            }
            Json::Object(map)
        }
        Value::Entry { key, value } => {
            let mut map = serde_json::Map::new();
            map.insert("key".to_owned(), Json::String(key.clone()));
            map.insert("value".to_owned(), value_to_json(&value.value()));
            Json::Object(map)
        }
    }
}

fn elem_from_json(j: &Json) -> Elem {
    match j {
        Json::Array(items) => {
            Elem::Vine(Vine::from_elems(items.iter().map(elem_from_json).collect()))
        }
        other => Elem::Node(Node::new(value_from_json(other))),
    }
}

fn elem_to_json(e: &Elem) -> Json {
    match e {
        Elem::Node(n) => value_to_json(&n.value()),
        Elem::Vine(v) => v.to_json(),
    }
}

fn column_from_cells(name: &str, cells: &[Option<Value>]) -> Column {
    let present: Vec<&Value> = cells
        .iter()
        .filter_map(Option::as_ref)
        .filter(|v| !matches!(v, Value::Null))
        .collect();

    let series = if !present.is_empty() && present.iter().all(|v| matches!(v, Value::Int(_))) {
        let data: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Some(Value::Int(i)) => Some(*i),
                _ => None,
            })
            .collect();
        Series::new(name.into(), data)
    } else if !present.is_empty() && present.iter().all(|v| v.is_number()) {
        let data: Vec<Option<f64>> = cells
            .iter()
            .map(|c| c.as_ref().and_then(Value::as_f64))
            .collect();
        Series::new(name.into(), data)
    } else if !present.is_empty() && present.iter().all(|v| matches!(v, Value::Bool(_))) {
        let data: Vec<Option<bool>> = cells
            .iter()
            .map(|c| c.as_ref().and_then(Value::as_bool))
            .collect();
        Series::new(name.into(), data)
    } else {
        let data: Vec<Option<String>> = cells
            .iter()
            .map(|c| match c {
                None | Some(Value::Null) => None,
                Some(v) => Some(v.render_raw()),
            })
            .collect();
        Series::new(name.into(), data)
    };
    Column::from(series)
}

impl Vine {
    /// Builds a collection from a JSON array. Nested arrays become nested
    /// collections, objects become records, and arrays *inside* objects stay
    /// plain lists.
    pub fn from_json(json: &Json) -> Result<Vine> {
        match json {
            Json::Array(items) => Ok(Vine::from_elems(
                items.iter().map(elem_from_json).collect(),
            )),
            _ => Err(BrambleError::Conversion(
                "expected a JSON array at the top level".to_owned(),
            )),
        }
    }

    /// The collection as a plain JSON array, recursively.
    pub fn to_json(&self) -> Json {
        Json::Array(self.elems.iter().map(elem_to_json).collect())
    }

    /// Tabulates a flat collection of records: rows are positional elements,
    /// columns are the sorted union of record keys (missing keys go null),
    /// and the designated index column, when given, is ordered first.
    /// Per-column dtypes are inferred (i64 / f64 / bool / string).
    pub fn to_dataframe(&self, index: Option<&str>) -> Result<DataFrame> {
        let mut rows: Vec<Record> = Vec::with_capacity(self.len());
        for (i, e) in self.elems.iter().enumerate() {
            match e {
                Elem::Node(n) => match &*n.value() {
                    Value::Record(r) => rows.push(r.clone()),
                    other => {
                        return Err(BrambleError::Structure(format!(
                            "row {i} is {}, not a record",
                            other.type_name()
                        )));
                    }
                },
                Elem::Vine(_) => {
                    return Err(BrambleError::Structure(format!(
                        "row {i} is a nested collection; ungroup before tabulating"
                    )));
                }
            }
        }

        let mut names: Vec<String> = {
            let mut set = BTreeSet::new();
            for r in &rows {
                set.extend(r.keys());
            }
            set.into_iter().collect()
        };
        if let Some(ix) = index {
            let pos = names.iter().position(|n| n == ix).ok_or_else(|| {
                BrambleError::Lookup {
                    container: format!("index column '{ix}' is not present"),
                    element: format!("available columns: [{}]", names.join(", ")),
                }
            })?;
            let ix_name = names.remove(pos);
            names.insert(0, ix_name);
        }

        let mut columns = Vec::with_capacity(names.len());
        for name in &names {
            let cells: Vec<Option<Value>> =
                rows.iter().map(|r| r.try_get(name).map(|n| n.get())).collect();
            columns.push(column_from_cells(name, &cells));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// The collection as a dynamic-dimension float array whose shape matches
    /// the nesting. Ragged or non-numeric structures are errors.
    pub fn to_ndarray(&self) -> Result<ArrayD<f64>> {
        let shape = self.uniform_shape()?;
        let mut data = Vec::with_capacity(self.leaf_count());
        self.collect_numeric(&mut data)?;
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
    }

    fn uniform_shape(&self) -> Result<Vec<usize>> {
        if self.is_nested() {
            let mut child_shape: Option<Vec<usize>> = None;
            for e in &self.elems {
                if let Elem::Vine(v) = e {
                    let s = v.uniform_shape()?;
                    match &child_shape {
                        None => child_shape = Some(s),
                        Some(prev) if *prev == s => {}
                        Some(prev) => {
                            return Err(BrambleError::Structure(format!(
                                "ragged structure: {prev:?} next to {s:?}"
                            )));
                        }
                    }
                }
            }
            let mut shape = vec![self.len()];
            shape.extend(child_shape.unwrap_or_default());
            Ok(shape)
        } else if self.is_flat() {
            Ok(vec![self.len()])
        } else {
            Err(BrambleError::Structure(
                "mixed leaf and nested elements cannot form an array".to_owned(),
            ))
        }
    }

    fn collect_numeric(&self, out: &mut Vec<f64>) -> Result<()> {
        for e in &self.elems {
            match e {
                Elem::Node(n) => {
                    let x = n.value().as_f64().ok_or_else(|| {
                        BrambleError::Type(format!(
                            "{} leaf cannot convert to a float array",
                            n.value().type_name()
                        ))
                    })?;
                    out.push(x);
                }
                Elem::Vine(v) => v.collect_numeric(out)?,
            }
        }
        Ok(())
    }

    /// Builds a nested collection from a float array, one nesting level per
    /// array axis.
    pub fn from_ndarray(arr: &ArrayD<f64>) -> Vine {
        fn build(view: ArrayViewD<'_, f64>) -> Vine {
            if view.ndim() <= 1 {
                Vine::from_values(view.iter().map(|x| Value::Float(*x)).collect())
            } else {
                Vine::from_groups(view.outer_iter().map(build).collect())
            }
        }
        build(arr.view())
    }
}

impl Serialize for Vine {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        value_to_json(self).serialize(serializer)
    }
}
