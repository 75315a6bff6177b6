//! Centralized error handling for bramble.
//!
//! All fallible operations in the crate return [`Result<T>`], an alias over
//! [`BrambleError`]. The taxonomy mirrors the failure modes of the collection
//! engine rather than the layers of the implementation:
//!
//! - [`BrambleError::Lookup`] — a field or key resolved neither on the
//!   container, nor on any of its elements, nor via the subscript fallback.
//!   Both the container-level and element-level reasons are attached.
//! - [`BrambleError::ShapeMismatch`] — broadcasting a value across elements
//!   or keys with incompatible lengths.
//! - [`BrambleError::Structure`] — removing more nesting than exists,
//!   selecting with an index tree that does not match the collection's shape,
//!   or converting a ragged structure to an array.
//! - [`BrambleError::Unhashable`] — grouping or uniqueness-reduction over
//!   leaf values with no hashable surrogate.
//! - [`BrambleError::BothFailed`] — recursive operations try a
//!   structure-aware interpretation first and a flat one second; when both
//!   fail, both causes are reported together.
//!
//! `From` conversions cover the boundary crates so the `?` operator works
//! across the polars/serde_json/ndarray seams, and [`ResultExt`] adds
//! `.context()` to any compatible result:
//!
//! ```
//! use bramble::error::{BrambleError, Result, ResultExt};
//!
//! fn parse_len(s: &str) -> Result<usize> {
//!     s.parse::<usize>()
//!         .map_err(|e| BrambleError::Type(e.to_string()))
//!         .context("Failed to parse length")
//! }
//! ```

use std::fmt;

/// Main error type for bramble operations.
#[derive(Debug)]
pub enum BrambleError {
    /// Field/key not found on the container, any element, or via subscript
    /// fallback. Carries both the container-level and element-level causes.
    Lookup {
        container: String,
        element: String,
    },

    /// Incompatible lengths where no scalar-broadcast rule applies.
    ShapeMismatch { expected: usize, got: usize },

    /// Nesting-structure violations (ungroup past the leaves, index trees
    /// that do not match the collection shape, ragged array conversions).
    Structure(String),

    /// Grouping or uniqueness-reduction over unhashable leaf values.
    Unhashable(String),

    /// Value-level type failures (arithmetic on incompatible values,
    /// division by zero, non-numeric array leaves).
    Type(String),

    /// Deep and shallow interpretations both failed; both causes attached.
    BothFailed {
        deep: Box<BrambleError>,
        shallow: Box<BrambleError>,
    },

    /// Boundary conversion errors (polars, serde_json, ndarray).
    Conversion(String),

    /// Generic error with context.
    Other(String),
}

impl fmt::Display for BrambleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lookup { container, element } => {
                write!(
                    f,
                    "Lookup failed: {container}; element-level cause: {element}"
                )
            }
            Self::ShapeMismatch { expected, got } => {
                write!(f, "Shape mismatch: expected length {expected}, got {got}")
            }
            Self::Structure(msg) => write!(f, "Structure error: {msg}"),
            Self::Unhashable(msg) => write!(f, "Unhashable value: {msg}"),
            Self::Type(msg) => write!(f, "Type error: {msg}"),
            Self::BothFailed { deep, shallow } => {
                write!(
                    f,
                    "Deep interpretation failed ({deep}); flat fallback failed ({shallow})"
                )
            }
            Self::Conversion(msg) => write!(f, "Conversion error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for BrambleError {}

impl From<polars::error::PolarsError> for BrambleError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::Conversion(err.to_string())
    }
}

impl From<serde_json::Error> for BrambleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Conversion(format!("JSON error: {err}"))
    }
}

impl From<ndarray::ShapeError> for BrambleError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Conversion(format!("Array shape error: {err}"))
    }
}

// Embedding hosts tend to want plain strings at their boundary.
impl From<BrambleError> for String {
    fn from(err: BrambleError) -> Self {
        err.to_string()
    }
}

/// Result type alias for bramble operations.
pub type Result<T> = std::result::Result<T, BrambleError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<BrambleError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: BrambleError = e.into();
            BrambleError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: BrambleError = e.into();
            BrambleError::Other(format!("{}: {}", f(), err))
        })
    }
}

/// Runs a structure-aware attempt first and a flat fallback second.
///
/// This is the crate's two-phase policy as an explicit branch on typed
/// outcomes: the deep result wins when it succeeds, the shallow result is
/// tried next, and a double failure reports both causes together.
pub fn deep_or_shallow<T>(
    deep: impl FnOnce() -> Result<T>,
    shallow: impl FnOnce() -> Result<T>,
) -> Result<T> {
    match deep() {
        Ok(v) => Ok(v),
        Err(deep_err) => match shallow() {
            Ok(v) => Ok(v),
            Err(shallow_err) => Err(BrambleError::BothFailed {
                deep: Box::new(deep_err),
                shallow: Box::new(shallow_err),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrambleError::ShapeMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "Shape mismatch: expected length 3, got 2");
    }

    #[test]
    fn test_lookup_carries_both_causes() {
        let err = BrambleError::Lookup {
            container: "no engine capability 'bar'".to_owned(),
            element: "element 1 has no key 'bar'".to_owned(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("no engine capability 'bar'"));
        assert!(rendered.contains("element 1 has no key 'bar'"));
    }

    #[test]
    fn test_error_conversion_to_string() {
        let err = BrambleError::Unhashable("record leaf".to_owned());
        let s: String = err.into();
        assert_eq!(s, "Unhashable value: record leaf");
    }

    #[test]
    fn test_deep_or_shallow_prefers_deep() {
        let out = deep_or_shallow(|| Ok(1), || Ok(2)).expect("deep succeeds");
        assert_eq!(out, 1);
    }

    #[test]
    fn test_deep_or_shallow_falls_back() {
        let out = deep_or_shallow(
            || Err(BrambleError::Structure("too deep".to_owned())),
            || Ok(2),
        )
        .expect("shallow succeeds");
        assert_eq!(out, 2);
    }

    #[test]
    fn test_deep_or_shallow_reports_both() {
        let err = deep_or_shallow::<()>(
            || Err(BrambleError::Structure("too deep".to_owned())),
            || Err(BrambleError::Type("not a number".to_owned())),
        )
        .unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("too deep"), "deep cause kept: {rendered}");
        assert!(
            rendered.contains("not a number"),
            "shallow cause kept: {rendered}"
        );
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(BrambleError::Type("bad operand".to_owned()));
        let result = result.context("Failed to add");
        assert!(result.unwrap_err().to_string().contains("Failed to add"));
    }
}
