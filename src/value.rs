//! Dynamic leaf model for the collection engine.
//!
//! [`Value`] is the heterogeneous payload a collection can hold: scalars,
//! plain nested lists, records, and key/value entries. [`Node`] is the shared
//! handle the engine passes around — a reference-counted cell plus a stable
//! identity tag assigned at construction. Derived views alias the same nodes
//! as their roots, so mutation through one view is visible through all of
//! them; the identity tag (not value equality) is what the set-style logical
//! operations key off.

use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use crate::error::{BrambleError, Result};
use crate::record::Record;

/// A heterogeneous leaf value.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A plain nested list (held inside a record or leaf position). Distinct
    /// from nested collection structure, which lives in the engine.
    List(Vec<Node>),
    Record(Record),
    /// Key/value pair preserving key identity through list-keyed record
    /// access, so a derived view's root can reconstruct a mapping later.
    Entry { key: String, value: Node },
}

/// Shared handle to a [`Value`] cell with a stable identity tag.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

struct NodeInner {
    id: Uuid,
    cell: RefCell<Value>,
}

impl Node {
    pub fn new(value: Value) -> Self {
        Self(Rc::new(NodeInner {
            id: Uuid::new_v4(),
            cell: RefCell::new(value),
        }))
    }

    /// The identity tag. Stable for the lifetime of the node; cloned handles
    /// share it.
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// True when both handles refer to the same underlying cell.
    pub fn same(&self, other: &Node) -> bool {
        self.0.id == other.0.id
    }

    pub fn value(&self) -> Ref<'_, Value> {
        self.0.cell.borrow()
    }

    pub fn value_mut(&self) -> RefMut<'_, Value> {
        self.0.cell.borrow_mut()
    }

    /// Clones the current value out of the cell.
    pub fn get(&self) -> Value {
        self.0.cell.borrow().clone()
    }

    /// Replaces the cell contents in place; every view sharing the handle
    /// observes the new value.
    pub fn set(&self, value: Value) {
        *self.0.cell.borrow_mut() = value;
    }

    /// A fresh node holding a recursively copied value (new identity tags
    /// throughout).
    pub fn deep_copy(&self) -> Node {
        Node::new(self.get().deep_copy())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.value())
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Record(_) => "record",
            Self::Entry { .. } => "entry",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Recursive copy with fresh nodes throughout.
    pub fn deep_copy(&self) -> Value {
        match self {
            Self::List(items) => Self::List(items.iter().map(Node::deep_copy).collect()),
            Self::Record(r) => Self::Record(r.deep_copy()),
            Self::Entry { key, value } => Self::Entry {
                key: key.clone(),
                value: value.deep_copy(),
            },
            other => other.clone(),
        }
    }

    /// Renders without quoting strings, for log lines and tabular cells.
    pub fn render_raw(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            other => format!("{other}"),
        }
    }
}

fn fmt_num_trim(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{}", x as i64)
    } else {
        format!("{x}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{}", fmt_num_trim(*x)),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, n) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", n.value())?;
                }
                write!(f, "]")
            }
            Self::Record(r) => write!(f, "{r}"),
            Self::Entry { key, value } => write!(f, "({key:?}, {})", value.value()),
        }
    }
}

// ===================== Conversions =====================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}
impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}
impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Self::Record(v)
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(
            items
                .into_iter()
                .map(|v| Node::new(v.into()))
                .collect(),
        )
    }
}

// ===================== Equality & ordering =====================

/// Value equality with numeric normalisation (`1 == 1.0`), recursing into
/// lists, records, and entries. Cross-type comparisons (beyond numerics) are
/// unequal, never an error.
pub fn eq_values(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (x, y) if x.is_number() && y.is_number() => x.as_f64() == y.as_f64(),
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|(m, n)| eq_values(&m.value(), &n.value()))
        }
        (Value::Record(x), Value::Record(y)) => x == y,
        (
            Value::Entry { key: ka, value: va },
            Value::Entry { key: kb, value: vb },
        ) => ka == kb && eq_values(&va.value(), &vb.value()),
        _ => false,
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::Str(_) => 3,
        Value::List(_) => 4,
        Value::Record(_) => 5,
        Value::Entry { .. } => 6,
    }
}

/// Total ordering over values: by type rank, then within type. Numbers
/// compare across int/float; lists compare element-wise then by length;
/// records compare by sorted entries. Used by sorting and the ordering
/// comparators.
pub fn cmp_values(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (x, y) if x.is_number() && y.is_number() => {
            let (xf, yf) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            xf.total_cmp(&yf)
        }
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::List(x), Value::List(y)) => {
            for (m, n) in x.iter().zip(y.iter()) {
                let ord = cmp_values(&m.value(), &n.value());
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Record(x), Value::Record(y)) => {
            let (ex, ey) = (x.entries(), y.entries());
            for ((ka, va), (kb, vb)) in ex.iter().zip(ey.iter()) {
                let ord = ka.cmp(kb);
                if ord != Ordering::Equal {
                    return ord;
                }
                let ord = cmp_values(&va.value(), &vb.value());
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            ex.len().cmp(&ey.len())
        }
        (
            Value::Entry { key: ka, value: va },
            Value::Entry { key: kb, value: vb },
        ) => ka
            .cmp(kb)
            .then_with(|| cmp_values(&va.value(), &vb.value())),
        _ => Ordering::Equal,
    }
}

// ===================== Hashable surrogate =====================

/// Hashable surrogate for grouping and uniqueness-reduction. Integral floats
/// normalise to the matching integer so `1` and `1.0` land in the same
/// group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HashKey {
    Null,
    Bool(bool),
    Int(i64),
    Bits(u64),
    Str(String),
}

pub fn hash_key(v: &Value) -> Result<HashKey> {
    match v {
        Value::Null => Ok(HashKey::Null),
        Value::Bool(b) => Ok(HashKey::Bool(*b)),
        Value::Int(i) => Ok(HashKey::Int(*i)),
        Value::Float(x) => {
            if x.is_finite() && x.fract() == 0.0 && *x >= i64::MIN as f64 && *x <= i64::MAX as f64 {
                Ok(HashKey::Int(*x as i64))
            } else {
                Ok(HashKey::Bits(x.to_bits()))
            }
        }
        Value::Str(s) => Ok(HashKey::Str(s.clone())),
        other => Err(BrambleError::Unhashable(format!(
            "{} leaves have no hashable surrogate; map them to a string form or identity first",
            other.type_name()
        ))),
    }
}

// ===================== Arithmetic =====================

/// Binary value operations. Element-wise application and broadcasting live
/// in the engine; this is the per-pair semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
    Pow,
    Shl,
    Shr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Rem => "%",
            Self::Pow => "**",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }
}

fn type_err(op: BinOp, a: &Value, b: &Value) -> BrambleError {
    BrambleError::Type(format!(
        "'{}' not defined for {} and {}",
        op.symbol(),
        a.type_name(),
        b.type_name()
    ))
}

fn num_pair(a: &Value, b: &Value) -> Option<(f64, f64)> {
    Some((a.as_f64()?, b.as_f64()?))
}

/// Applies a binary operation to a pair of values.
pub fn arith(op: BinOp, a: &Value, b: &Value) -> Result<Value> {
    match op {
        BinOp::Add => match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_add(*y))),
            (Value::Str(x), Value::Str(y)) => Ok(Value::Str(format!("{x}{y}"))),
            (Value::List(x), Value::List(y)) => {
                let mut items = x.clone();
                items.extend(y.iter().cloned());
                Ok(Value::List(items))
            }
            _ => num_pair(a, b)
                .map(|(x, y)| Value::Float(x + y))
                .ok_or_else(|| type_err(op, a, b)),
        },
        BinOp::Sub => match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_sub(*y))),
            _ => num_pair(a, b)
                .map(|(x, y)| Value::Float(x - y))
                .ok_or_else(|| type_err(op, a, b)),
        },
        BinOp::Mul => match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_mul(*y))),
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                Ok(Value::Str(s.repeat((*n).max(0) as usize)))
            }
            _ => num_pair(a, b)
                .map(|(x, y)| Value::Float(x * y))
                .ok_or_else(|| type_err(op, a, b)),
        },
        BinOp::Div => {
            let (x, y) = num_pair(a, b).ok_or_else(|| type_err(op, a, b))?;
            if y == 0.0 {
                return Err(BrambleError::Type("divide by zero".to_owned()));
            }
            Ok(Value::Float(x / y))
        }
        BinOp::FloorDiv => match (a, b) {
            (Value::Int(x), Value::Int(y)) => {
                if *y == 0 {
                    return Err(BrambleError::Type("divide by zero".to_owned()));
                }
                Ok(Value::Int(x.div_euclid(*y)))
            }
            _ => {
                let (x, y) = num_pair(a, b).ok_or_else(|| type_err(op, a, b))?;
                if y == 0.0 {
                    return Err(BrambleError::Type("divide by zero".to_owned()));
                }
                Ok(Value::Float((x / y).floor()))
            }
        },
        BinOp::Rem => match (a, b) {
            (Value::Int(x), Value::Int(y)) => {
                if *y == 0 {
                    return Err(BrambleError::Type("divide by zero".to_owned()));
                }
                Ok(Value::Int(x.rem_euclid(*y)))
            }
            _ => {
                let (x, y) = num_pair(a, b).ok_or_else(|| type_err(op, a, b))?;
                if y == 0.0 {
                    return Err(BrambleError::Type("divide by zero".to_owned()));
                }
                // floored remainder, matching floor division
                Ok(Value::Float(x - (x / y).floor() * y))
            }
        },
        BinOp::Pow => match (a, b) {
            (Value::Int(x), Value::Int(y)) if *y >= 0 => {
                match u32::try_from(*y).ok().and_then(|e| x.checked_pow(e)) {
                    Some(v) => Ok(Value::Int(v)),
                    None => Ok(Value::Float((*x as f64).powf(*y as f64))),
                }
            }
            _ => num_pair(a, b)
                .map(|(x, y)| Value::Float(x.powf(y)))
                .ok_or_else(|| type_err(op, a, b)),
        },
        BinOp::Shl | BinOp::Shr => match (a, b) {
            (Value::Int(x), Value::Int(y)) => {
                let shift = u32::try_from(*y).map_err(|_| {
                    BrambleError::Type(format!("invalid shift amount {y}"))
                })?;
                if shift >= 64 {
                    return Err(BrambleError::Type(format!("invalid shift amount {y}")));
                }
                Ok(Value::Int(if op == BinOp::Shl {
                    x.wrapping_shl(shift)
                } else {
                    x.wrapping_shr(shift)
                }))
            }
            _ => Err(type_err(op, a, b)),
        },
    }
}

/// Floor division plus floored remainder as a two-element list.
pub fn divmod(a: &Value, b: &Value) -> Result<Value> {
    let q = arith(BinOp::FloorDiv, a, b)?;
    let r = arith(BinOp::Rem, a, b)?;
    Ok(Value::List(vec![Node::new(q), Node::new(r)]))
}

/// Unary value operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    Abs,
}

pub fn unary(op: UnOp, a: &Value) -> Result<Value> {
    match (op, a) {
        (UnOp::Neg, Value::Int(x)) => Ok(Value::Int(x.wrapping_neg())),
        (UnOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnOp::Not, Value::Int(x)) => Ok(Value::Int(!x)),
        (UnOp::Abs, Value::Int(x)) => Ok(Value::Int(x.wrapping_abs())),
        (UnOp::Abs, Value::Float(x)) => Ok(Value::Float(x.abs())),
        _ => Err(BrambleError::Type(format!(
            "unary {:?} not defined for {}",
            op,
            a.type_name()
        ))),
    }
}
