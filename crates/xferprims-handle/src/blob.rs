use crate::error::{HandleError, Result};

/// Size of a handle blob: one pointer-width value, fixed at 8 bytes.
pub const HANDLE_SIZE: usize = 8;

/// An opaque, fixed-size handle blob.
///
/// Layout:
/// ```text
/// ┌──────────────────────────┐
/// │ Value (8B LE)            │
/// │ 0 = unset                │
/// └──────────────────────────┘
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HandleBlob([u8; HANDLE_SIZE]);

impl HandleBlob {
    /// The blob of the unset handle.
    pub const NULL: HandleBlob = HandleBlob([0; HANDLE_SIZE]);

    pub fn from_value(value: u64) -> Self {
        Self(value.to_le_bytes())
    }

    pub fn value(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    pub fn is_null(&self) -> bool {
        self.value() == 0
    }

    pub fn from_bytes(bytes: [u8; HANDLE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a blob from a byte slice of exactly [`HANDLE_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; HANDLE_SIZE] =
            bytes.try_into().map_err(|_| HandleError::InvalidLength {
                expected: HANDLE_SIZE,
                found: bytes.len(),
            })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; HANDLE_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for HandleBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HandleBlob({:#x})", self.value())
    }
}
