use crate::error::Result;
use crate::value::{ArrayBuffer, External, SharedArrayBuffer, Value};

/// A backing-store reference as handed out by the host.
///
/// The value is process-local and meaningless outside the host that issued
/// it. Zero is the null reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackingStoreRef(u64);

impl BackingStoreRef {
    /// The unset reference.
    pub const NULL: BackingStoreRef = BackingStoreRef(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// The embedding-API capability the transfer primitives are written against.
///
/// Every method is synchronous and runs on the thread that owns the context.
/// Reference accounting rules:
/// - each `get_*_backing_store` call takes one bookkeeping reference
/// - `create_*_with_backing_store` gives the new view its own reference and
///   leaves the bookkeeping reference in place
/// - `release_arraybuffer_backing_store` drops the bookkeeping reference
pub trait Env {
    /// Take a bookkeeping reference to the store behind an `ArrayBuffer`.
    fn get_arraybuffer_backing_store(&self, value: &Value) -> Result<BackingStoreRef>;

    /// Take a bookkeeping reference to the store behind a `SharedArrayBuffer`.
    fn get_sharedarraybuffer_backing_store(&self, value: &Value) -> Result<BackingStoreRef>;

    /// Create a transferable view over a referenced store.
    fn create_arraybuffer_with_backing_store(&self, store: BackingStoreRef)
        -> Result<ArrayBuffer>;

    /// Create a shared view over a referenced store.
    fn create_sharedarraybuffer_with_backing_store(
        &self,
        store: BackingStoreRef,
    ) -> Result<SharedArrayBuffer>;

    /// Drop a bookkeeping reference.
    fn release_arraybuffer_backing_store(&self, store: BackingStoreRef) -> Result<()>;

    /// Sever an attached `ArrayBuffer` from its store.
    fn detach_arraybuffer(&self, value: &Value) -> Result<()>;

    /// Read the pointer wrapped by an external.
    fn get_value_external(&self, value: &Value) -> Result<usize>;

    /// Wrap a pointer in a new external with no finalizer.
    fn create_external(&self, data: usize) -> Result<External>;

    /// Whether the value is an external.
    fn is_external(&self, value: &Value) -> bool;

    /// Allocate a zero-filled, fixed-length `ArrayBuffer`.
    fn create_arraybuffer(&self, byte_length: usize) -> Result<ArrayBuffer>;
}
