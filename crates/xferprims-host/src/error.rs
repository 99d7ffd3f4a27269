use crate::value::ValueKind;

/// Errors reported by host embedding-API operations.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The value is not of the kind the operation expects.
    #[error("invalid argument: expected {expected}, found {found}")]
    InvalidArg {
        expected: ValueKind,
        found: ValueKind,
    },

    /// The value was created by a different execution context.
    #[error("value belongs to context {owner}, not context {current}")]
    ForeignValue { owner: u64, current: u64 },

    /// The buffer has been detached from its backing store.
    #[error("ArrayBuffer is detached")]
    Detached,

    /// The backing-store reference is null.
    #[error("backing store reference is null")]
    NullBackingStore,

    /// The backing-store reference is not held by the host (already released,
    /// or never handed out).
    #[error("unknown backing store reference {0:#x}")]
    UnknownBackingStore(u64),

    /// An allocation or resize exceeds the configured maximum.
    #[error("byte length {requested} exceeds maximum {max}")]
    ByteLengthExceeded { requested: usize, max: usize },

    /// A read or write falls outside the buffer.
    #[error("access of {len} bytes at offset {offset} is out of bounds ({byte_length} bytes)")]
    OutOfBounds {
        offset: usize,
        len: usize,
        byte_length: usize,
    },

    /// The buffer was created with a fixed length.
    #[error("buffer is not resizable")]
    NotResizable,

    /// Growable shared buffers never shrink.
    #[error("shared buffer cannot shrink from {current} to {requested} bytes")]
    CannotShrink { current: usize, requested: usize },

    /// The host registry is full.
    #[error("too many outstanding backing store handles (max {0})")]
    TooManyHandles(usize),
}

pub type Result<T> = std::result::Result<T, HostError>;
