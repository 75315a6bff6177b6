//! The recursion-depth control, structure introspection, and the fill
//! operations.
//!
//! Depth is an explicit parameter threaded through each operation, not
//! transient container state: `At(0)` applies to immediate elements, `At(n)`
//! descends n levels first and propagates the failure when leaves arrive
//! early, and `Deepest` descends as far as each branch allows. The
//! [`AtDepth`] builder wraps a collection reference with a depth so a chain
//! can opt in once instead of repeating the argument.

use crate::error::{BrambleError, Result};
use crate::record::Record;
use crate::shape::{Counter, broadcast};
use crate::value::{Node, Value};

use super::access::Key;
use super::model::{Elem, Rhs, Vine};

/// How many nesting levels an operation descends before applying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Depth {
    /// Descend exactly this many levels; reaching leaves sooner is an error.
    At(usize),
    /// Descend as deep as possible; depth exhaustion is absorbed per branch.
    Deepest,
}

impl Depth {
    pub fn descend(self) -> Self {
        match self {
            Self::At(0) => Self::At(0),
            Self::At(n) => Self::At(n - 1),
            Self::Deepest => Self::Deepest,
        }
    }

    pub fn is_zero(self) -> bool {
        self == Self::At(0)
    }
}

impl Default for Depth {
    fn default() -> Self {
        Self::At(0)
    }
}

/// A depth-scoped view over a collection reference; its methods thread the
/// depth through the corresponding engine operations.
#[derive(Clone, Copy)]
pub struct AtDepth<'a> {
    vine: &'a Vine,
    depth: Depth,
}

impl Vine {
    /// A view of this collection scoped to `depth`.
    pub fn at(&self, depth: Depth) -> AtDepth<'_> {
        AtDepth { vine: self, depth }
    }

    /// A view scoped as deep as possible.
    pub fn deep(&self) -> AtDepth<'_> {
        self.at(Depth::Deepest)
    }

    /// A view scoped exactly `levels` levels down.
    pub fn deeper(&self, levels: usize) -> AtDepth<'_> {
        self.at(Depth::At(levels))
    }
}

impl AtDepth<'_> {
    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn field(&self, name: &str) -> Result<Vine> {
        self.vine.field_at(name, self.depth)
    }

    pub fn set_field(&self, name: &str, rhs: impl Into<Rhs>) -> Result<&Self> {
        self.vine.set_field_at(name, self.depth, rhs)?;
        Ok(self)
    }

    pub fn apply<F: Fn(&Value) -> Result<Value>>(&self, f: F) -> Result<Vine> {
        self.vine.apply_at(self.depth, &f)
    }

    pub fn len(&self) -> Result<usize> {
        self.vine.len_at(self.depth)
    }

    pub fn fill(&self, start: i64) -> Result<Vine> {
        self.vine.fill_at(start, self.depth)
    }

    pub fn remaining(&self) -> Result<Vine> {
        self.vine.remaining_at(self.depth)
    }

    pub fn nonempty(&self) -> Result<Vine> {
        self.vine.nonempty(self.depth)
    }

    pub fn remix(&self, names: &[&str], extras: &[(&str, Rhs)]) -> Result<Vine> {
        self.vine.remix_at(names, extras, self.depth)
    }
}

impl Vine {
    // ----- introspection -----

    /// Number of nesting levels before reaching leaves; an empty collection
    /// has depth 0, a flat one depth 1.
    pub fn depth(&self) -> usize {
        if self.elems.is_empty() {
            return 0;
        }
        1 + self
            .elems
            .iter()
            .filter_map(Elem::as_vine)
            .map(Vine::depth)
            .max()
            .unwrap_or(0)
    }

    /// Isomorphic structure with each leaf replaced by the 1-based nesting
    /// level it sits at.
    pub fn depths(&self) -> Vine {
        self.depths_from(1)
    }

    fn depths_from(&self, level: usize) -> Vine {
        Vine::from_elems(
            self.elems
                .iter()
                .map(|e| match e {
                    Elem::Node(_) => Elem::Node(Node::new(Value::Int(level as i64))),
                    Elem::Vine(v) => Elem::Vine(v.depths_from(level + 1)),
                })
                .collect(),
        )
    }

    /// Total element count at the given level: `At(0)` is this collection's
    /// own length, deeper levels sum the lengths there, `Deepest` counts the
    /// leaves.
    pub fn len_at(&self, depth: Depth) -> Result<usize> {
        match depth {
            Depth::At(0) => Ok(self.len()),
            Depth::At(n) => {
                let mut total = 0;
                for (i, e) in self.elems.iter().enumerate() {
                    match e {
                        Elem::Vine(v) => total += v.len_at(Depth::At(n - 1))?,
                        Elem::Node(_) => {
                            return Err(BrambleError::Structure(format!(
                                "cannot recurse {n} more levels: leaf element at position {i}"
                            )));
                        }
                    }
                }
                Ok(total)
            }
            Depth::Deepest => Ok(self.leaf_count()),
        }
    }

    /// Isomorphic structure with each innermost group filled with its own
    /// length.
    pub fn shape(&self) -> Vine {
        if self.is_nested() {
            Vine::from_elems(
                self.elems
                    .iter()
                    .map(|e| match e {
                        Elem::Vine(v) => Elem::Vine(v.shape()),
                        Elem::Node(n) => Elem::Node(n.clone()),
                    })
                    .collect(),
            )
        } else {
            let len = self.len() as i64;
            Vine::from_elems(
                self.elems
                    .iter()
                    .map(|_| Elem::Node(Node::new(Value::Int(len))))
                    .collect(),
            )
        }
    }

    /// One integer per nesting level: the total element count at that level.
    pub fn structure(&self) -> Vec<usize> {
        let mut counts = Vec::new();
        let mut level: Vec<&Vine> = vec![self];
        loop {
            counts.push(level.iter().map(|v| v.len()).sum());
            let next: Vec<&Vine> = level
                .iter()
                .flat_map(|v| v.elems.iter().filter_map(Elem::as_vine))
                .collect();
            if next.is_empty() {
                break;
            }
            level = next;
        }
        counts
    }

    // ----- fills -----

    /// Isomorphic structure of sequential integers starting at `start`,
    /// assigned depth-first left-to-right.
    pub fn fill(&self, start: i64) -> Vine {
        let mut counter = Counter::new(start - 1);
        self.fill_counter(&mut counter)
    }

    fn fill_counter(&self, counter: &mut Counter) -> Vine {
        Vine::from_elems(
            self.elems
                .iter()
                .map(|e| match e {
                    Elem::Node(_) => Elem::Node(Node::new(Value::Int(counter.succ()))),
                    Elem::Vine(v) => Elem::Vine(v.fill_counter(counter)),
                })
                .collect(),
        )
    }

    /// Depth-aware fill: `At(n)` numbers independently per branch n levels
    /// down, `Deepest` numbers independently per innermost group.
    pub fn fill_at(&self, start: i64, depth: Depth) -> Result<Vine> {
        match depth {
            Depth::At(0) => Ok(self.fill(start)),
            Depth::At(n) => {
                let mut elems = Vec::with_capacity(self.len());
                for (i, e) in self.elems.iter().enumerate() {
                    match e {
                        Elem::Vine(v) => {
                            elems.push(Elem::Vine(v.fill_at(start, Depth::At(n - 1))?));
                        }
                        Elem::Node(_) => {
                            return Err(BrambleError::Structure(format!(
                                "cannot recurse {n} more levels: leaf element at position {i}"
                            )));
                        }
                    }
                }
                Ok(Vine::from_elems(elems))
            }
            Depth::Deepest => {
                if self.is_nested() {
                    let mut elems = Vec::with_capacity(self.len());
                    for e in &self.elems {
                        match e {
                            Elem::Vine(v) => {
                                elems.push(Elem::Vine(v.fill_at(start, Depth::Deepest)?));
                            }
                            Elem::Node(_) => unreachable!("is_nested guarantees vine elements"),
                        }
                    }
                    Ok(Vine::from_elems(elems))
                } else {
                    Ok(self.fill(start))
                }
            }
        }
    }

    /// The fill as plain values (nested structure listifies).
    pub fn fill_values(&self, start: i64) -> Vec<Value> {
        self.fill(start).to_values()
    }

    /// Isomorphic countdown: leaves get `leaf_count - 1` down to 0 in
    /// depth-first order, so `remaining()` equals
    /// `len_at(Deepest) - 1 - fill(0)` pointwise.
    pub fn remaining(&self) -> Vine {
        let mut counter = Counter::new(self.leaf_count() as i64);
        self.drain_counter(&mut counter)
    }

    fn drain_counter(&self, counter: &mut Counter) -> Vine {
        Vine::from_elems(
            self.elems
                .iter()
                .map(|e| match e {
                    Elem::Node(_) => Elem::Node(Node::new(Value::Int(counter.pred()))),
                    Elem::Vine(v) => Elem::Vine(v.drain_counter(counter)),
                })
                .collect(),
        )
    }

    /// Depth-aware countdown, per-branch like [`Vine::fill_at`].
    pub fn remaining_at(&self, depth: Depth) -> Result<Vine> {
        match depth {
            Depth::At(0) => Ok(self.remaining()),
            Depth::At(n) => {
                let mut elems = Vec::with_capacity(self.len());
                for (i, e) in self.elems.iter().enumerate() {
                    match e {
                        Elem::Vine(v) => {
                            elems.push(Elem::Vine(v.remaining_at(Depth::At(n - 1))?));
                        }
                        Elem::Node(_) => {
                            return Err(BrambleError::Structure(format!(
                                "cannot recurse {n} more levels: leaf element at position {i}"
                            )));
                        }
                    }
                }
                Ok(Vine::from_elems(elems))
            }
            Depth::Deepest => {
                if self.is_nested() {
                    let mut elems = Vec::with_capacity(self.len());
                    for e in &self.elems {
                        match e {
                            Elem::Vine(v) => {
                                elems.push(Elem::Vine(v.remaining_at(Depth::Deepest)?));
                            }
                            Elem::Node(_) => unreachable!("is_nested guarantees vine elements"),
                        }
                    }
                    Ok(Vine::from_elems(elems))
                } else {
                    Ok(self.remaining())
                }
            }
        }
    }

    /// Isomorphic structure filled with the broadcast value; no derived
    /// index is computed.
    pub fn values_like(&self, rhs: impl Into<Rhs>) -> Vine {
        self.values_like_rhs(&rhs.into())
    }

    fn values_like_rhs(&self, rhs: &Rhs) -> Vine {
        let items = broadcast(self.len(), rhs, false);
        let elems = self
            .elems
            .iter()
            .zip(items)
            .map(|(e, item)| match e {
                Elem::Node(_) => Elem::Node(Node::new(item)),
                Elem::Vine(v) => Elem::Vine(v.values_like_rhs(&Rhs::from_broadcast_item(item))),
            })
            .collect();
        Vine {
            elems,
            root: self.root.clone(),
        }
    }

    // ----- remix -----

    /// Builds a flat collection of records selecting the named fields plus
    /// caller-supplied extras (broadcast per element), one record per
    /// positional element. When an element is a group, the record's value
    /// for each name is the group's list.
    pub fn remix(&self, names: &[&str], extras: &[(&str, Rhs)]) -> Result<Vine> {
        self.remix_at(names, extras, Depth::At(0))
    }

    /// Depth-aware remix: `Deepest` yields one record per innermost group.
    pub fn remix_at(&self, names: &[&str], extras: &[(&str, Rhs)], depth: Depth) -> Result<Vine> {
        match depth {
            Depth::At(0) => self.remix_positional(names, extras),
            Depth::At(n) => {
                let mut elems = Vec::new();
                for (i, e) in self.elems.iter().enumerate() {
                    match e {
                        Elem::Vine(v) => {
                            let sub = v.remix_at(names, extras, Depth::At(n - 1))?;
                            elems.extend(sub.elems);
                        }
                        Elem::Node(_) => {
                            return Err(BrambleError::Structure(format!(
                                "cannot recurse {n} more levels: leaf element at position {i}"
                            )));
                        }
                    }
                }
                Ok(Vine::from_elems(elems))
            }
            Depth::Deepest => {
                let groups = self.innermost_groups();
                let mut extra_items = Vec::with_capacity(extras.len());
                for (k, rhs) in extras {
                    extra_items.push(((*k).to_owned(), broadcast(groups.len(), rhs, false)));
                }
                let mut elems = Vec::with_capacity(groups.len());
                for (gi, group) in groups.iter().enumerate() {
                    let mut rec = Record::new();
                    for name in names {
                        rec.set(*name, group.field_at(name, Depth::At(0))?.to_value());
                    }
                    for (k, items) in &extra_items {
                        rec.set(k.clone(), items[gi].clone());
                    }
                    elems.push(Elem::Node(Node::new(Value::Record(rec))));
                }
                Ok(Vine::from_elems(elems))
            }
        }
    }

    fn remix_positional(&self, names: &[&str], extras: &[(&str, Rhs)]) -> Result<Vine> {
        let mut extra_items = Vec::with_capacity(extras.len());
        for (k, rhs) in extras {
            extra_items.push(((*k).to_owned(), broadcast(self.len(), rhs, false)));
        }
        let mut elems = Vec::with_capacity(self.len());
        for (i, e) in self.elems.iter().enumerate() {
            let mut rec = Record::new();
            for name in names {
                match e {
                    Elem::Node(n) => {
                        let node = super::access::subscript_node(n, &Key::Name((*name).to_owned()))
                            .map_err(|err| BrambleError::Lookup {
                                container: format!("remix field '{name}' did not resolve"),
                                element: format!("element {i}: {err}"),
                            })?;
                        rec.set_node(*name, node);
                    }
                    Elem::Vine(group) => {
                        rec.set(*name, group.field_at(name, Depth::At(0))?.to_value());
                    }
                }
            }
            for (k, items) in &extra_items {
                rec.set(k.clone(), items[i].clone());
            }
            elems.push(Elem::Node(Node::new(Value::Record(rec))));
        }
        Ok(Vine::from_elems(elems))
    }

    fn innermost_groups(&self) -> Vec<Vine> {
        if self.is_nested() {
            self.elems
                .iter()
                .filter_map(Elem::as_vine)
                .flat_map(Vine::innermost_groups)
                .collect()
        } else {
            vec![self.clone()]
        }
    }
}
