//! # Bramble - Chainable Proxy Collections
//!
//! Bramble is a Rust library for manipulating heterogeneous, nested
//! record/list data through chainable, numpy-like collection types. A
//! [`Vine`](vine::Vine) forwards field access, function application, and
//! operators to its elements — recursively through nested groups — and every
//! derived view keeps a back-reference to the collection it came from, so
//! "filter, mutate, recover original" works as one chain.
//!
//! ## Quick Start
//!
//! ```
//! use bramble::vine::Vine;
//! use serde_json::json;
//!
//! # fn main() -> bramble::error::Result<()> {
//! let records = Vine::from_json(&json!([
//!     {"foo": 0, "bar": 0},
//!     {"foo": 1, "bar": 1},
//!     {"foo": 2, "bar": 0},
//! ]))?;
//!
//! // Comparisons filter rather than answering true/false.
//! let zeros = records.field("bar")?.filter_eq(0)?;
//!
//! // Writes go through the shared cells, visible from the original.
//! zeros.set_field("baz", 3)?;
//!
//! // Group the records by a field, then recover the flat form.
//! let grouped = records.field("bar")?.group_by()?;
//! assert_eq!(grouped.ungroup_all().len(), records.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`vine`]: the proxy-collection engine — access, grouping, depth
//!   control, fills, conversions
//! - [`record`]: the mapping proxy whose keys behave like fields
//! - [`value`]: the dynamic leaf model and shared node handles
//! - [`shape`]: broadcasting and index-structure helpers
//! - [`ops`]: the generated comparison/logical/binary/unary operators
//! - [`scope`]: explicit named bindings threaded through a chain
//! - [`error`]: error types and handling utilities
//! - [`logging`]: console `tracing` subscriber setup
//!
//! ## Key Concepts
//!
//! ### Aliasing by design
//!
//! Derived views share leaf cells with their roots. Filtering never copies
//! the elements, so mutating a filtered view mutates the original records —
//! that is the point. Copying happens only when explicitly requested
//! (`deep_copy`) or at conversion boundaries.
//!
//! ### Comparisons as filters
//!
//! `filter_eq`/`filter_lt`/… select matching elements from the *root*
//! collection instead of returning booleans; boolean deep equality is the
//! separate `all_eq`/`PartialEq`. See [`ops`] for the dispatch rules.
//!
//! ### Explicit recursion depth
//!
//! Operations take their recursion depth as an explicit value
//! ([`vine::Depth`]), with `vine.deep()`/`vine.deeper(n)` as the scoped
//! builders and trailing underscores on field names as the inline shorthand.

#![warn(clippy::all, rust_2018_idioms)]

pub mod error;
pub mod logging;
pub mod ops;
pub mod record;
pub mod scope;
pub mod shape;
pub mod value;
pub mod vine;

pub use error::{BrambleError, Result};
pub use record::{DefaultRecord, Record};
pub use scope::Scope;
pub use shape::{Counter, IndexTree, SetOp};
pub use value::{Node, Value};
pub use vine::{AtDepth, Depth, Elem, Key, Rhs, Vine};
