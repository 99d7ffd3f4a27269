/// Errors that can occur while decoding transfer handles.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    /// A handle blob must be exactly [`crate::HANDLE_SIZE`] bytes.
    #[error("invalid handle length ({found} bytes, expected {expected})")]
    InvalidLength { expected: usize, found: usize },

    /// The wire form carries a kind tag this version does not know.
    #[error("unknown handle kind tag {0:#04x}")]
    UnknownKind(u8),
}

pub type Result<T> = std::result::Result<T, HandleError>;
