//! Error taxonomy shared by every engine.
//!
//! Absence of a key is never an error: it is reported through `Option` or
//! through the map's default return value. Errors are raised before any
//! state is mutated.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// A construction or view parameter is outside its valid domain.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Bulk operation received key and value arrays of different lengths.
    #[error("length mismatch: {keys} keys but {values} values")]
    LengthMismatch { keys: usize, values: usize },

    /// Bulk operation range does not fit the source arrays.
    #[error("range {offset}..{offset}+{count} out of bounds for length {len}")]
    OutOfBounds {
        offset: usize,
        count: usize,
        len: usize,
    },

    /// Insertion through a range view with a key outside the view.
    #[error("key outside of the view range")]
    KeyOutOfRange,

    /// Mutation attempted through a read-only wrapper.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: &'static str },

    /// First/last query on an empty collection.
    #[error("no such element")]
    NoSuchElement,

    /// Table growth beyond the largest supported bucket array.
    #[error("capacity overflow: {requested} buckets requested, maximum is {max}")]
    CapacityOverflow { requested: usize, max: usize },
}

impl MapError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        MapError::InvalidArgument {
            message: message.into(),
        }
    }
}

pub type Result<T, E = MapError> = core::result::Result<T, E>;
