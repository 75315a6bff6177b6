//! The container itself: elements, root back-references, construction, and
//! function application.

use std::fmt;

use crate::error::{BrambleError, Result};
use crate::shape::{self, IndexTree};
use crate::value::{Node, Value, eq_values};

use super::depth::Depth;

/// One element of a collection: a leaf node or a nested sub-collection.
#[derive(Clone, Debug)]
pub enum Elem {
    Node(Node),
    Vine(Vine),
}

impl Elem {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(n) => Some(n),
            Self::Vine(_) => None,
        }
    }

    pub fn as_vine(&self) -> Option<&Vine> {
        match self {
            Self::Vine(v) => Some(v),
            Self::Node(_) => None,
        }
    }

    /// The element as a value: leaf contents, or the listified form of a
    /// nested collection (sharing its leaf nodes).
    pub fn value(&self) -> Value {
        match self {
            Self::Node(n) => n.get(),
            Self::Vine(v) => v.to_value(),
        }
    }
}

impl fmt::Display for Elem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(n) => write!(f, "{}", n.value()),
            Self::Vine(v) => write!(f, "{v}"),
        }
    }
}

/// A right-hand operand for broadcast-aware operations: a single value, a
/// plain sequence, or another collection.
#[derive(Clone, Debug)]
pub enum Rhs {
    Value(Value),
    Seq(Vec<Value>),
    Vine(Vine),
}

impl Rhs {
    /// Sequence length, `None` for scalars.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Value(_) => None,
            Self::Seq(items) => Some(items.len()),
            Self::Vine(v) => Some(v.len()),
        }
    }

    /// The operand as one value (sequences listify).
    pub fn as_value(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Seq(items) => Value::List(items.iter().map(|v| Node::new(v.clone())).collect()),
            Self::Vine(v) => v.to_value(),
        }
    }

    /// The i-th operand position, for per-element pairing.
    pub(crate) fn item(&self, i: usize) -> Rhs {
        match self {
            Self::Value(v) => Self::Value(v.clone()),
            Self::Seq(items) => Self::from_broadcast_item(items[i].clone()),
            Self::Vine(v) => match &v.elems[i] {
                Elem::Node(n) => Self::Value(n.get()),
                Elem::Vine(sub) => Self::Vine(sub.clone()),
            },
        }
    }

    /// Re-wraps a broadcast value so nested pairing can continue: lists
    /// become sequences again, everything else stays scalar.
    pub(crate) fn from_broadcast_item(v: Value) -> Rhs {
        match v {
            Value::List(items) => Self::Seq(items.iter().map(Node::get).collect()),
            other => Self::Value(other),
        }
    }
}

impl From<Value> for Rhs {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}
impl From<i64> for Rhs {
    fn from(v: i64) -> Self {
        Self::Value(Value::Int(v))
    }
}
impl From<i32> for Rhs {
    fn from(v: i32) -> Self {
        Self::Value(Value::Int(v as i64))
    }
}
impl From<f64> for Rhs {
    fn from(v: f64) -> Self {
        Self::Value(Value::Float(v))
    }
}
impl From<bool> for Rhs {
    fn from(v: bool) -> Self {
        Self::Value(Value::Bool(v))
    }
}
impl From<&str> for Rhs {
    fn from(v: &str) -> Self {
        Self::Value(Value::from(v))
    }
}
impl From<String> for Rhs {
    fn from(v: String) -> Self {
        Self::Value(Value::from(v))
    }
}
impl From<Vec<Value>> for Rhs {
    fn from(items: Vec<Value>) -> Self {
        Self::Seq(items)
    }
}
impl From<Vec<i64>> for Rhs {
    fn from(items: Vec<i64>) -> Self {
        Self::Seq(items.into_iter().map(Value::Int).collect())
    }
}
impl From<Vec<f64>> for Rhs {
    fn from(items: Vec<f64>) -> Self {
        Self::Seq(items.into_iter().map(Value::Float).collect())
    }
}
impl From<Vec<&str>> for Rhs {
    fn from(items: Vec<&str>) -> Self {
        Self::Seq(items.into_iter().map(Value::from).collect())
    }
}
impl From<Vine> for Rhs {
    fn from(v: Vine) -> Self {
        Self::Vine(v)
    }
}
impl From<&Vine> for Rhs {
    fn from(v: &Vine) -> Self {
        Self::Vine(v.clone())
    }
}

/// The proxy-collection: an ordered sequence of leaf nodes and nested vines,
/// optionally carrying a back-reference to the collection it was derived
/// from.
#[derive(Clone, Debug, Default)]
pub struct Vine {
    pub(crate) elems: Vec<Elem>,
    pub(crate) root: Option<Box<Vine>>,
}

impl Vine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elems(elems: Vec<Elem>) -> Self {
        Self { elems, root: None }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self::from_elems(
            values
                .into_iter()
                .map(|v| Elem::Node(Node::new(v)))
                .collect(),
        )
    }

    /// A collection of sub-collections (one nesting level).
    pub fn from_groups(groups: Vec<Vine>) -> Self {
        Self::from_elems(groups.into_iter().map(Elem::Vine).collect())
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn elems(&self) -> &[Elem] {
        &self.elems
    }

    pub fn elem(&self, i: usize) -> Option<&Elem> {
        self.elems.get(i)
    }

    /// The i-th element as a value. Panics when out of range; callers are
    /// expected to stay within `len()`.
    pub fn elem_value(&self, i: usize) -> Value {
        self.elems[i].value()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Elem> {
        self.elems.iter()
    }

    pub fn push(&mut self, elem: Elem) -> &mut Self {
        self.elems.push(elem);
        self
    }

    pub fn push_value(&mut self, value: impl Into<Value>) -> &mut Self {
        self.elems.push(Elem::Node(Node::new(value.into())));
        self
    }

    /// True when every element is a nested vine (and there is at least one).
    pub fn is_nested(&self) -> bool {
        !self.elems.is_empty() && self.elems.iter().all(|e| matches!(e, Elem::Vine(_)))
    }

    /// True when no element is a nested vine.
    pub fn is_flat(&self) -> bool {
        self.elems.iter().all(|e| matches!(e, Elem::Node(_)))
    }

    // ----- root handling -----

    /// The collection this view was derived from; a fresh collection is its
    /// own root. Idempotent: `v.root().root() == v.root()`.
    pub fn root(&self) -> Vine {
        match &self.root {
            Some(r) => (**r).clone(),
            None => self.clone(),
        }
    }

    /// True when this collection has no derivation history.
    pub fn is_root(&self) -> bool {
        self.root.is_none()
    }

    /// Attaches `parent`'s root as this view's root.
    pub(crate) fn with_root(mut self, parent: Vine) -> Self {
        let root = match parent.root {
            Some(r) => *r,
            None => parent,
        };
        self.root = Some(Box::new(root));
        self
    }

    /// Drops the derivation history, making this view its own root.
    pub fn unrooted(mut self) -> Self {
        self.root = None;
        self
    }

    // ----- leaves and value forms -----

    /// All leaf nodes in depth-first, left-to-right order.
    pub fn leaves(&self) -> Vec<Node> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<Node>) {
        for e in &self.elems {
            match e {
                Elem::Node(n) => out.push(n.clone()),
                Elem::Vine(v) => v.collect_leaves(out),
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.elems
            .iter()
            .map(|e| match e {
                Elem::Node(_) => 1,
                Elem::Vine(v) => v.leaf_count(),
            })
            .sum()
    }

    /// The listified value form. Leaf nodes are shared, nesting becomes
    /// plain lists.
    pub fn to_value(&self) -> Value {
        Value::List(
            self.elems
                .iter()
                .map(|e| match e {
                    Elem::Node(n) => n.clone(),
                    Elem::Vine(v) => Node::new(v.to_value()),
                })
                .collect(),
        )
    }

    /// One value per element (nested elements listify).
    pub fn to_values(&self) -> Vec<Value> {
        self.elems.iter().map(Elem::value).collect()
    }

    // ----- positional selection -----

    /// Positional select. The result is a fresh collection with no
    /// derivation history, per the indexing contract.
    pub fn select(&self, positions: &[usize]) -> Result<Vine> {
        let mut elems = Vec::with_capacity(positions.len());
        for &i in positions {
            elems.push(self.elems.get(i).cloned().ok_or_else(|| {
                BrambleError::Structure(format!(
                    "position {i} out of range for collection of length {}",
                    self.len()
                ))
            })?);
        }
        Ok(Vine::from_elems(elems))
    }

    /// Selects through an index tree mirroring this collection's nesting.
    pub(crate) fn select_tree(&self, tree: &IndexTree) -> Result<Vine> {
        match tree {
            IndexTree::Flat(ids) => self.select(ids),
            IndexTree::Nested(trees) => {
                if trees.len() != self.len() {
                    return Err(BrambleError::Structure(format!(
                        "index tree arity {} does not match collection length {}",
                        trees.len(),
                        self.len()
                    )));
                }
                let mut elems = Vec::with_capacity(trees.len());
                for (e, t) in self.elems.iter().zip(trees.iter()) {
                    match e {
                        Elem::Vine(v) => elems.push(Elem::Vine(v.select_tree(t)?)),
                        Elem::Node(_) => {
                            return Err(BrambleError::Structure(
                                "nested index tree reached a leaf element".to_owned(),
                            ));
                        }
                    }
                }
                Ok(Vine::from_elems(elems))
            }
        }
    }

    // ----- function application -----

    /// Applies `f` to each immediate element (nested elements listify),
    /// keeping the derivation history so the result still maps back to the
    /// same root.
    pub fn apply<F: Fn(&Value) -> Value>(&self, f: F) -> Vine {
        let elems = self
            .elems
            .iter()
            .map(|e| Elem::Node(Node::new(f(&e.value()))))
            .collect();
        Vine {
            elems,
            root: self.root.clone(),
        }
    }

    /// Fallible [`Vine::apply`].
    pub fn try_apply<F: Fn(&Value) -> Result<Value>>(&self, f: F) -> Result<Vine> {
        let mut elems = Vec::with_capacity(self.len());
        for e in &self.elems {
            elems.push(Elem::Node(Node::new(f(&e.value())?)));
        }
        Ok(Vine {
            elems,
            root: self.root.clone(),
        })
    }

    /// Depth-aware application. `At(0)` applies to immediate elements,
    /// `At(n)` descends n levels first (erroring where leaves arrive early),
    /// `Deepest` applies at the leaves and absorbs depth exhaustion.
    pub fn apply_at<F>(&self, depth: Depth, f: &F) -> Result<Vine>
    where
        F: Fn(&Value) -> Result<Value>,
    {
        match depth {
            Depth::At(0) => self.try_apply(f),
            Depth::At(n) => {
                let mut elems = Vec::with_capacity(self.len());
                for e in &self.elems {
                    match e {
                        Elem::Vine(v) => {
                            elems.push(Elem::Vine(v.apply_at(Depth::At(n - 1), f)?));
                        }
                        Elem::Node(_) => {
                            return Err(BrambleError::Structure(format!(
                                "cannot recurse {n} more levels: leaf element reached"
                            )));
                        }
                    }
                }
                Ok(Vine {
                    elems,
                    root: self.root.clone(),
                })
            }
            Depth::Deepest => {
                let mut elems = Vec::with_capacity(self.len());
                for e in &self.elems {
                    match e {
                        Elem::Vine(v) => elems.push(Elem::Vine(v.apply_at(Depth::Deepest, f)?)),
                        Elem::Node(n) => elems.push(Elem::Node(Node::new(f(&n.value())?))),
                    }
                }
                Ok(Vine {
                    elems,
                    root: self.root.clone(),
                })
            }
        }
    }

    /// Applies a binary function with the second operand broadcast per
    /// element, recursing into nested elements.
    pub fn apply_with<F>(&self, f: &F, rhs: impl Into<Rhs>) -> Result<Vine>
    where
        F: Fn(&Value, &Value) -> Result<Value>,
    {
        self.apply_with_rhs(f, &rhs.into())
    }

    pub(crate) fn apply_with_rhs<F>(&self, f: &F, rhs: &Rhs) -> Result<Vine>
    where
        F: Fn(&Value, &Value) -> Result<Value>,
    {
        let items = shape::broadcast(self.len(), rhs, false);
        let mut elems = Vec::with_capacity(self.len());
        for (e, item) in self.elems.iter().zip(items) {
            match e {
                Elem::Node(n) => {
                    elems.push(Elem::Node(Node::new(f(&n.value(), &item)?)));
                }
                Elem::Vine(v) => {
                    elems.push(Elem::Vine(
                        v.apply_with_rhs(f, &Rhs::from_broadcast_item(item))?,
                    ));
                }
            }
        }
        Ok(Vine {
            elems,
            root: self.root.clone(),
        })
    }

    // ----- diagnostics -----

    /// Routes the collection through a debug log line and hands it back
    /// unchanged, for in-chain diagnostics.
    pub fn logged(self, tag: &str) -> Self {
        tracing::debug!(target: "bramble", "{tag}: {self}");
        self
    }

    // ----- equality and copying -----

    /// Boolean deep equality: equal length and pairwise-recursive equality
    /// at every level, short-circuiting on the first mismatch. This is the
    /// *test*, not the filter — the filtering comparisons live alongside the
    /// other operators.
    pub fn all_eq(&self, other: &Vine) -> bool {
        self.len() == other.len()
            && self
                .elems
                .iter()
                .zip(other.elems.iter())
                .all(|(a, b)| match (a, b) {
                    (Elem::Vine(x), Elem::Vine(y)) => x.all_eq(y),
                    (a, b) => eq_values(&a.value(), &b.value()),
                })
    }

    /// Recursive copy with fresh nodes throughout; no derivation history.
    pub fn deep_copy(&self) -> Vine {
        Vine::from_elems(
            self.elems
                .iter()
                .map(|e| match e {
                    Elem::Node(n) => Elem::Node(n.deep_copy()),
                    Elem::Vine(v) => Elem::Vine(v.deep_copy()),
                })
                .collect(),
        )
    }
}

impl PartialEq for Vine {
    fn eq(&self, other: &Self) -> bool {
        self.all_eq(other)
    }
}

impl fmt::Display for Vine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.elems.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, "]")
    }
}

impl std::ops::Index<usize> for Vine {
    type Output = Elem;

    fn index(&self, i: usize) -> &Elem {
        &self.elems[i]
    }
}

impl<V: Into<Value>> FromIterator<V> for Vine {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        Self::from_values(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a Vine {
    type Item = &'a Elem;
    type IntoIter = std::slice::Iter<'a, Elem>;

    fn into_iter(self) -> Self::IntoIter {
        self.elems.iter()
    }
}
