//! Field interception and the indexing read/write/delete dispatch.
//!
//! Resolution order for a field name, per the engine contract:
//!
//! 1. reserved, double-underscore-delimited names are rejected outright,
//!    naming the member — they belong to the container, not the elements;
//! 2. trailing underscores are stripped off and counted as "go that many
//!    levels deeper" before resolving;
//! 3. the name must then resolve on *every* element — record key, entry
//!    field, nested collection (which recurses), or the subscript fallback —
//!    and the first element that cannot resolve it fails the whole access
//!    with both the container-level and element-level causes attached.
//!
//! Writes and deletes mirror the read dispatch with broadcast semantics, and
//! return the receiver for chaining. Mutation happens through the shared
//! leaf cells, so every view aliasing the same elements observes it.

use std::fmt;
use std::ops::Range;

use crate::error::{BrambleError, Result, deep_or_shallow};
use crate::shape::broadcast;
use crate::value::{Node, Value};

use super::depth::Depth;
use super::model::{Elem, Rhs, Vine};

/// A subscript key: a position or a name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Pos(usize),
    Name(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pos(i) => write!(f, "{i}"),
            Self::Name(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Self::Pos(i)
    }
}
impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Name(s.to_owned())
    }
}
impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Name(s)
    }
}

/// Splits a field name into its base and the depth its trailing marks ask
/// for. Reserved double-underscore-delimited names are rejected by name.
fn parse_field(name: &str) -> Result<(&str, usize)> {
    if name.len() >= 4 && name.starts_with("__") && name.ends_with("__") {
        return Err(BrambleError::Lookup {
            container: format!("'{name}' is a reserved member and cannot be forwarded"),
            element: "reserved names resolve on the container only".to_owned(),
        });
    }
    let base = name.trim_end_matches('_');
    if base.is_empty() {
        return Ok((name, 0));
    }
    Ok((base, name.len() - base.len()))
}

/// Subscript resolution on a single leaf node. Errors here are the
/// element-level causes the collection-level lookup reports.
pub(crate) fn subscript_node(node: &Node, key: &Key) -> Result<Node> {
    let value = node.value();
    match (&*value, key) {
        (Value::Record(r), Key::Name(name)) => r.get(name),
        (Value::Entry { key: k, value: v }, Key::Name(name)) => match name.as_str() {
            "key" => Ok(Node::new(Value::Str(k.clone()))),
            "value" => Ok(v.clone()),
            _ => Err(BrambleError::Type(format!(
                "entries expose 'key' and 'value', not '{name}'"
            ))),
        },
        (Value::List(items), Key::Pos(i)) => items.get(*i).cloned().ok_or_else(|| {
            BrambleError::Type(format!("list index {i} out of range ({} items)", items.len()))
        }),
        (Value::List(items), Key::Name(name)) => name
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned())
            .ok_or_else(|| {
                BrambleError::Type(format!("'{name}' does not index a list of {} items", items.len()))
            }),
        (other, key) => Err(BrambleError::Type(format!(
            "{} is not subscriptable by {key}",
            other.type_name()
        ))),
    }
}

fn assign_node(node: &Node, key: &Key, value: Value) -> Result<()> {
    let mut cell = node.value_mut();
    match (&mut *cell, key) {
        (Value::Record(r), Key::Name(name)) => {
            r.set(name.clone(), value);
            Ok(())
        }
        (Value::List(items), Key::Pos(i)) => {
            if *i < items.len() {
                items[*i] = Node::new(value);
                Ok(())
            } else {
                Err(BrambleError::Type(format!(
                    "list index {i} out of range ({} items)",
                    items.len()
                )))
            }
        }
        (Value::List(items), Key::Name(name)) => match name.parse::<usize>() {
            Ok(i) if i < items.len() => {
                items[i] = Node::new(value);
                Ok(())
            }
            _ => Err(BrambleError::Type(format!(
                "'{name}' does not index a list of {} items",
                items.len()
            ))),
        },
        (other, key) => Err(BrambleError::Type(format!(
            "cannot assign {key} on {}",
            other.type_name()
        ))),
    }
}

fn delete_node(node: &Node, key: &Key) -> Result<()> {
    let mut cell = node.value_mut();
    match (&mut *cell, key) {
        (Value::Record(r), Key::Name(name)) => r.remove(name).map(|_| ()),
        (Value::List(items), Key::Pos(i)) => {
            if *i < items.len() {
                items.remove(*i);
                Ok(())
            } else {
                Err(BrambleError::Type(format!(
                    "list index {i} out of range ({} items)",
                    items.len()
                )))
            }
        }
        (other, key) => Err(BrambleError::Type(format!(
            "cannot delete {key} from {}",
            other.type_name()
        ))),
    }
}

fn lookup_error(name: &str, position: usize, cause: &BrambleError) -> BrambleError {
    BrambleError::Lookup {
        container: format!("the collection has no built-in capability '{name}'"),
        element: format!("element {position}: {cause}"),
    }
}

impl Vine {
    // ----- reads -----

    /// Field access with the ergonomic trailing-mark depth rule: `"bar"`
    /// resolves on immediate elements, `"bar_"` one level deeper, and so on.
    pub fn field(&self, name: &str) -> Result<Vine> {
        let (base, marks) = parse_field(name)?;
        self.field_at(base, Depth::At(marks))
    }

    /// Field access with an explicit depth override.
    pub fn field_at(&self, name: &str, depth: Depth) -> Result<Vine> {
        Ok(self.field_core(name, depth)?.with_root(self.clone()))
    }

    fn field_core(&self, name: &str, depth: Depth) -> Result<Vine> {
        let key = Key::Name(name.to_owned());
        let mut elems = Vec::with_capacity(self.len());
        for (i, e) in self.elems.iter().enumerate() {
            match (e, depth) {
                (Elem::Vine(v), Depth::At(0)) => {
                    elems.push(Elem::Vine(v.field_core(name, Depth::At(0))?));
                }
                (Elem::Vine(v), d) => {
                    elems.push(Elem::Vine(v.field_core(name, d.descend())?));
                }
                (Elem::Node(_), Depth::At(n)) if n > 0 => {
                    return Err(BrambleError::Structure(format!(
                        "cannot recurse {n} more levels: leaf element at position {i}"
                    )));
                }
                (Elem::Node(n), _) => match subscript_node(n, &key) {
                    Ok(node) => elems.push(Elem::Node(node)),
                    Err(err) => return Err(lookup_error(name, i, &err)),
                },
            }
        }
        Ok(Vine::from_elems(elems))
    }

    /// Generic subscript applied to every element, recursing into nested
    /// collections.
    pub fn subscript(&self, key: impl Into<Key>) -> Result<Vine> {
        let key = key.into();
        Ok(self.index_core(&key)?.with_root(self.clone()))
    }

    fn index_core(&self, key: &Key) -> Result<Vine> {
        let mut elems = Vec::with_capacity(self.len());
        for (i, e) in self.elems.iter().enumerate() {
            match e {
                Elem::Vine(v) => elems.push(Elem::Vine(v.index_core(key)?)),
                Elem::Node(n) => match subscript_node(n, key) {
                    Ok(node) => elems.push(Elem::Node(node)),
                    Err(err) => return Err(lookup_error(&key.to_string(), i, &err)),
                },
            }
        }
        Ok(Vine::from_elems(elems))
    }

    /// Per-position keys: position i reads `self[i][keys[i]]`.
    pub fn subscript_each(&self, keys: &[Key]) -> Result<Vine> {
        if keys.len() != self.len() {
            return Err(BrambleError::ShapeMismatch {
                expected: self.len(),
                got: keys.len(),
            });
        }
        let mut elems = Vec::with_capacity(self.len());
        for (i, (e, key)) in self.elems.iter().zip(keys.iter()).enumerate() {
            match e {
                Elem::Vine(v) => elems.push(Elem::Vine(v.index_core(key)?)),
                Elem::Node(n) => match subscript_node(n, key) {
                    Ok(node) => elems.push(Elem::Node(node)),
                    Err(err) => return Err(lookup_error(&key.to_string(), i, &err)),
                },
            }
        }
        Ok(Vine::from_elems(elems).with_root(self.clone()))
    }

    /// Multi-key access: tries the keys as one multi-part path per element
    /// first, then falls back to independent lookups packed per element.
    /// Both failures are reported together when neither reading applies.
    pub fn fields(&self, names: &[&str]) -> Result<Vine> {
        let out = deep_or_shallow(|| self.path_core(names), || self.pack_core(names))?;
        Ok(out.with_root(self.clone()))
    }

    fn path_core(&self, names: &[&str]) -> Result<Vine> {
        let mut elems = Vec::with_capacity(self.len());
        for (i, e) in self.elems.iter().enumerate() {
            match e {
                Elem::Vine(v) => elems.push(Elem::Vine(v.path_core(names)?)),
                Elem::Node(n) => {
                    let mut node = n.clone();
                    for name in names {
                        node = subscript_node(&node, &Key::Name((*name).to_owned()))
                            .map_err(|err| lookup_error(name, i, &err))?;
                    }
                    elems.push(Elem::Node(node));
                }
            }
        }
        Ok(Vine::from_elems(elems))
    }

    fn pack_core(&self, names: &[&str]) -> Result<Vine> {
        let mut elems = Vec::with_capacity(self.len());
        for (i, e) in self.elems.iter().enumerate() {
            match e {
                Elem::Vine(v) => elems.push(Elem::Vine(v.pack_core(names)?)),
                Elem::Node(n) => {
                    let mut packed = Vec::with_capacity(names.len());
                    for name in names {
                        let node = subscript_node(n, &Key::Name((*name).to_owned()))
                            .map_err(|err| lookup_error(name, i, &err))?;
                        packed.push(Elem::Node(node));
                    }
                    elems.push(Elem::Vine(Vine::from_elems(packed)));
                }
            }
        }
        Ok(Vine::from_elems(elems))
    }

    /// A contiguous slice of this view. The derivation history is sliced in
    /// parallel, so the result still maps back onto the matching stretch of
    /// its root.
    pub fn slice(&self, range: Range<usize>) -> Result<Vine> {
        if range.start > range.end || range.end > self.len() {
            return Err(BrambleError::Structure(format!(
                "slice {}..{} out of range for collection of length {}",
                range.start,
                range.end,
                self.len()
            )));
        }
        let elems = self.elems[range.clone()].to_vec();
        let root = match &self.root {
            Some(r) if range.end <= r.len() => {
                Some(Box::new(Vine::from_elems(r.elems[range].to_vec())))
            }
            _ => None,
        };
        Ok(Vine { elems, root })
    }

    // ----- writes -----

    /// Assigns a field on every element, broadcasting the value. Mutates the
    /// shared element cells; chainable.
    pub fn set_field(&self, name: &str, rhs: impl Into<Rhs>) -> Result<&Self> {
        let (base, marks) = parse_field(name)?;
        self.set_field_at(base, Depth::At(marks), rhs)
    }

    /// [`Vine::set_field`] with an explicit depth override.
    pub fn set_field_at(&self, name: &str, depth: Depth, rhs: impl Into<Rhs>) -> Result<&Self> {
        self.write_core(&Key::Name(name.to_owned()), depth, &rhs.into())?;
        Ok(self)
    }

    /// Generic subscript write on every element.
    pub fn set_subscript(&self, key: impl Into<Key>, rhs: impl Into<Rhs>) -> Result<&Self> {
        self.write_core(&key.into(), Depth::At(0), &rhs.into())?;
        Ok(self)
    }

    fn write_core(&self, key: &Key, depth: Depth, rhs: &Rhs) -> Result<()> {
        let items = broadcast(self.len(), rhs, false);
        for (i, (e, item)) in self.elems.iter().zip(items).enumerate() {
            match (e, depth) {
                (Elem::Vine(v), Depth::At(0)) => {
                    v.write_core(key, Depth::At(0), &Rhs::from_broadcast_item(item))?;
                }
                (Elem::Vine(v), d) => {
                    v.write_core(key, d.descend(), &Rhs::from_broadcast_item(item))?;
                }
                (Elem::Node(_), Depth::At(n)) if n > 0 => {
                    return Err(BrambleError::Structure(format!(
                        "cannot recurse {n} more levels: leaf element at position {i}"
                    )));
                }
                (Elem::Node(n), _) => {
                    assign_node(n, key, item).map_err(|err| lookup_error(&key.to_string(), i, &err))?;
                }
            }
        }
        Ok(())
    }

    /// Per-position write: position i assigns `self[i][keys[i]]`.
    pub fn set_subscript_each(&self, keys: &[Key], rhs: impl Into<Rhs>) -> Result<&Self> {
        if keys.len() != self.len() {
            return Err(BrambleError::ShapeMismatch {
                expected: self.len(),
                got: keys.len(),
            });
        }
        let items = broadcast(self.len(), &rhs.into(), false);
        for (i, ((e, key), item)) in self.elems.iter().zip(keys.iter()).zip(items).enumerate() {
            match e {
                Elem::Vine(v) => {
                    v.write_core(key, Depth::At(0), &Rhs::from_broadcast_item(item))?;
                }
                Elem::Node(n) => {
                    assign_node(n, key, item).map_err(|err| lookup_error(&key.to_string(), i, &err))?;
                }
            }
        }
        Ok(self)
    }

    /// Multi-key write: tries the keys as one multi-part path per element,
    /// then falls back to assigning each key independently.
    pub fn set_fields(&self, names: &[&str], rhs: impl Into<Rhs>) -> Result<&Self> {
        let rhs = rhs.into();
        deep_or_shallow(
            || self.write_path(names, &rhs),
            || {
                for name in names {
                    self.write_core(&Key::Name((*name).to_owned()), Depth::At(0), &rhs)?;
                }
                Ok(())
            },
        )?;
        Ok(self)
    }

    fn write_path(&self, names: &[&str], rhs: &Rhs) -> Result<()> {
        let (last, prefix) = names.split_last().ok_or_else(|| {
            BrambleError::Structure("multi-part assignment needs at least one key".to_owned())
        })?;
        let items = broadcast(self.len(), rhs, false);
        for (i, (e, item)) in self.elems.iter().zip(items).enumerate() {
            match e {
                Elem::Vine(v) => v.write_path(names, &Rhs::from_broadcast_item(item))?,
                Elem::Node(n) => {
                    let mut node = n.clone();
                    for name in prefix {
                        node = subscript_node(&node, &Key::Name((*name).to_owned()))
                            .map_err(|err| lookup_error(name, i, &err))?;
                    }
                    assign_node(&node, &Key::Name((*last).to_owned()), item)
                        .map_err(|err| lookup_error(last, i, &err))?;
                }
            }
        }
        Ok(())
    }

    /// Replaces the elements at `positions` with the broadcast value.
    pub fn set_select(&mut self, positions: &[usize], rhs: impl Into<Rhs>) -> Result<&mut Self> {
        let items = broadcast(positions.len(), &rhs.into(), false);
        for (&i, item) in positions.iter().zip(items) {
            if i >= self.elems.len() {
                return Err(BrambleError::Structure(format!(
                    "position {i} out of range for collection of length {}",
                    self.elems.len()
                )));
            }
            self.elems[i] = Elem::Node(Node::new(item));
        }
        Ok(self)
    }

    /// Replaces a contiguous stretch of elements with the broadcast value.
    pub fn set_slice(&mut self, range: Range<usize>, rhs: impl Into<Rhs>) -> Result<&mut Self> {
        if range.start > range.end || range.end > self.elems.len() {
            return Err(BrambleError::Structure(format!(
                "slice {}..{} out of range for collection of length {}",
                range.start,
                range.end,
                self.elems.len()
            )));
        }
        let items = broadcast(range.len(), &rhs.into(), false);
        for (i, item) in range.zip(items) {
            self.elems[i] = Elem::Node(Node::new(item));
        }
        Ok(self)
    }

    // ----- deletes -----

    /// Removes a field from every element; chainable. The trailing-mark
    /// depth rule applies as for reads.
    pub fn del_field(&self, name: &str) -> Result<&Self> {
        let (base, marks) = parse_field(name)?;
        self.delete_core(&Key::Name(base.to_owned()), Depth::At(marks))?;
        Ok(self)
    }

    /// Generic subscript delete on every element.
    pub fn del_subscript(&self, key: impl Into<Key>) -> Result<&Self> {
        self.delete_core(&key.into(), Depth::At(0))?;
        Ok(self)
    }

    fn delete_core(&self, key: &Key, depth: Depth) -> Result<()> {
        for (i, e) in self.elems.iter().enumerate() {
            match (e, depth) {
                (Elem::Vine(v), Depth::At(0)) => v.delete_core(key, Depth::At(0))?,
                (Elem::Vine(v), d) => v.delete_core(key, d.descend())?,
                (Elem::Node(_), Depth::At(n)) if n > 0 => {
                    return Err(BrambleError::Structure(format!(
                        "cannot recurse {n} more levels: leaf element at position {i}"
                    )));
                }
                (Elem::Node(n), _) => {
                    delete_node(n, key).map_err(|err| lookup_error(&key.to_string(), i, &err))?;
                }
            }
        }
        Ok(())
    }

    /// Removes the elements at `positions` from this view.
    pub fn del_select(&mut self, positions: &[usize]) -> Result<&mut Self> {
        let mut sorted: Vec<usize> = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if let Some(&max) = sorted.last() {
            if max >= self.elems.len() {
                return Err(BrambleError::Structure(format!(
                    "position {max} out of range for collection of length {}",
                    self.elems.len()
                )));
            }
        }
        for i in sorted.into_iter().rev() {
            self.elems.remove(i);
        }
        Ok(self)
    }

    /// Removes a contiguous stretch of elements from this view.
    pub fn del_slice(&mut self, range: Range<usize>) -> Result<&mut Self> {
        if range.start > range.end || range.end > self.elems.len() {
            return Err(BrambleError::Structure(format!(
                "slice {}..{} out of range for collection of length {}",
                range.start,
                range.end,
                self.elems.len()
            )));
        }
        self.elems.drain(range);
        Ok(self)
    }
}
