use std::fmt;

/// Which kind of buffer an operation was building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    ArrayBuffer,
    SharedArrayBuffer,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferKind::ArrayBuffer => f.write_str("ArrayBuffer"),
            BufferKind::SharedArrayBuffer => f.write_str("SharedArrayBuffer"),
        }
    }
}

/// Codes carried by [`DataCloneError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCloneCode {
    /// The value cannot appear in a transfer list.
    UntransferableType,
    /// The value appears in the transfer list more than once.
    AlreadyTransferred,
    /// A transfer record refers to an id that is invalid or already used.
    InvalidReference,
}

impl DataCloneCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataCloneCode::UntransferableType => "UNTRANSFERABLE_TYPE",
            DataCloneCode::AlreadyTransferred => "ALREADY_TRANSFERRED",
            DataCloneCode::InvalidReference => "INVALID_REFERENCE",
        }
    }
}

impl fmt::Display for DataCloneCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transfer list the clone logic refuses to process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct DataCloneError {
    pub code: DataCloneCode,
    pub message: String,
}

impl DataCloneError {
    pub fn untransferable_type(message: impl Into<String>) -> Self {
        Self {
            code: DataCloneCode::UntransferableType,
            message: message.into(),
        }
    }

    pub fn already_transferred(message: impl Into<String>) -> Self {
        Self {
            code: DataCloneCode::AlreadyTransferred,
            message: message.into(),
        }
    }

    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self {
            code: DataCloneCode::InvalidReference,
            message: message.into(),
        }
    }
}

/// Recoverable errors raised by the transfer primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CloneError {
    /// The handle blob encodes the null reference: it was never valid.
    #[error("{0} backing store is unset")]
    BackingStoreUnset(BufferKind),

    /// The transfer list was rejected.
    #[error(transparent)]
    DataClone(#[from] DataCloneError),
}

pub type Result<T> = std::result::Result<T, CloneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_messages_name_the_buffer_kind() {
        assert_eq!(
            CloneError::BackingStoreUnset(BufferKind::ArrayBuffer).to_string(),
            "ArrayBuffer backing store is unset"
        );
        assert_eq!(
            CloneError::BackingStoreUnset(BufferKind::SharedArrayBuffer).to_string(),
            "SharedArrayBuffer backing store is unset"
        );
    }

    #[test]
    fn data_clone_error_is_prefixed_with_code() {
        let err: CloneError = DataCloneError::already_transferred("twice").into();
        assert_eq!(err.to_string(), "ALREADY_TRANSFERRED: twice");
    }
}
