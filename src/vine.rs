//! The proxy-collection engine.
//!
//! A [`Vine`] is a sequence-like container over heterogeneous, nested data.
//! Field access, function application, and operators forward to its elements
//! — recursively, when the elements are themselves vines — and every derived
//! view can carry a back-reference to the collection it came from, so a
//! filtered or regrouped view maps back onto the original structure.
//!
//! The working loop looks like this:
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
//! // Comparisons filter: the result is the matching *records*, not booleans.
//! let zeros = records.field("bar")?.filter_eq(0)?;
//! assert_eq!(zeros.len(), 2);
//!
//! // Derived views alias the original, so mutation writes through.
//! zeros.set_field("baz", 3)?;
//!
//! // Grouping partitions the source records by the accessed field.
//! let grouped = records.field("bar")?.group_by()?;
//! assert_eq!(grouped.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! Submodules:
//! - [`model`]: the container itself — elements, roots, construction,
//!   function application, boolean equality.
//! - [`access`]: field interception and the indexing read/write/delete
//!   dispatch.
//! - [`group`]: grouping, ungrouping, sorting, uniqueness-reduction, and
//!   empty-group filtering.
//! - [`depth`]: the recursion-depth control, introspection, and the fill
//!   operations.
//! - [`convert`]: serde_json / polars / ndarray boundaries.

pub mod access;
pub mod convert;
pub mod depth;
pub mod group;
pub mod model;

pub use access::Key;
pub use depth::{AtDepth, Depth};
pub use model::{Elem, Rhs, Vine};
