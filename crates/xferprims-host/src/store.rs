use parking_lot::RwLock;

use crate::error::{HostError, Result};

/// The memory allocation behind one or more buffer views.
///
/// Stores are always handled through `Arc<BackingStore>`: every attached view
/// and every bookkeeping reference in the host registry holds one strong
/// count, and the bytes are freed when the last of them drops.
///
/// Capacity is reserved up to `max_byte_length` at allocation, so resizing
/// never moves the bytes and [`BackingStore::data_ptr`] stays stable.
pub struct BackingStore {
    id: u64,
    bytes: RwLock<Vec<u8>>,
    max_byte_length: Option<usize>,
    shared: bool,
}

impl BackingStore {
    pub(crate) fn allocate(
        id: u64,
        byte_length: usize,
        max_byte_length: Option<usize>,
        shared: bool,
    ) -> Self {
        let mut bytes = Vec::with_capacity(max_byte_length.unwrap_or(byte_length));
        bytes.resize(byte_length, 0);
        Self {
            id,
            bytes: RwLock::new(bytes),
            max_byte_length,
            shared,
        }
    }

    /// Host-assigned identifier, stable for the lifetime of the store.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current length in bytes.
    pub fn byte_length(&self) -> usize {
        self.bytes.read().len()
    }

    /// Maximum length for resizable or growable stores.
    pub fn max_byte_length(&self) -> Option<usize> {
        self.max_byte_length
    }

    /// Whether the store backs shared views.
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Address of the first byte. Two views observing the same address observe
    /// the same memory.
    pub fn data_ptr(&self) -> *const u8 {
        self.bytes.read().as_ptr()
    }

    pub(crate) fn read(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        let bytes = self.bytes.read();
        let range = checked_range(offset, dst.len(), bytes.len())?;
        dst.copy_from_slice(&bytes[range]);
        Ok(())
    }

    pub(crate) fn write(&self, offset: usize, src: &[u8]) -> Result<()> {
        let mut bytes = self.bytes.write();
        let range = checked_range(offset, src.len(), bytes.len())?;
        bytes[range].copy_from_slice(src);
        Ok(())
    }

    pub(crate) fn to_vec(&self) -> Vec<u8> {
        self.bytes.read().clone()
    }

    pub(crate) fn resize(&self, new_length: usize) -> Result<()> {
        let max = self.max_byte_length.ok_or(HostError::NotResizable)?;
        if new_length > max {
            return Err(HostError::ByteLengthExceeded {
                requested: new_length,
                max,
            });
        }

        let mut bytes = self.bytes.write();
        if self.shared && new_length < bytes.len() {
            return Err(HostError::CannotShrink {
                current: bytes.len(),
                requested: new_length,
            });
        }

        bytes.resize(new_length, 0);
        Ok(())
    }
}

impl Drop for BackingStore {
    fn drop(&mut self) {
        tracing::trace!(store = self.id, shared = self.is_shared(), "backing store freed");
    }
}

impl std::fmt::Debug for BackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackingStore")
            .field("id", &self.id)
            .field("byte_length", &self.byte_length())
            .field("max_byte_length", &self.max_byte_length)
            .field("shared", &self.is_shared())
            .finish()
    }
}

fn checked_range(offset: usize, len: usize, byte_length: usize) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= byte_length => Ok(offset..end),
        _ => Err(HostError::OutOfBounds {
            offset,
            len,
            byte_length,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_zero_fills() {
        let store = BackingStore::allocate(1, 4, None, false);
        assert_eq!(store.byte_length(), 4);
        assert_eq!(store.to_vec(), vec![0; 4]);
    }

    #[test]
    fn write_then_read() {
        let store = BackingStore::allocate(1, 8, None, false);
        store.write(2, &[1, 2, 3]).unwrap();

        let mut out = [0u8; 4];
        store.read(1, &mut out).unwrap();
        assert_eq!(out, [0, 1, 2, 3]);
    }

    #[test]
    fn out_of_bounds_access_is_rejected() {
        let store = BackingStore::allocate(1, 4, None, false);
        assert!(matches!(
            store.write(3, &[1, 2]),
            Err(HostError::OutOfBounds { offset: 3, len: 2, byte_length: 4 })
        ));
        assert!(matches!(
            store.write(usize::MAX, &[1]),
            Err(HostError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn fixed_length_store_rejects_resize() {
        let store = BackingStore::allocate(1, 4, None, false);
        assert!(matches!(store.resize(8), Err(HostError::NotResizable)));
    }

    #[test]
    fn resize_keeps_data_pointer() {
        let store = BackingStore::allocate(1, 4, Some(64), false);
        let ptr = store.data_ptr();

        store.resize(64).unwrap();
        assert_eq!(store.byte_length(), 64);
        assert_eq!(store.data_ptr(), ptr);

        store.resize(2).unwrap();
        assert_eq!(store.byte_length(), 2);
        assert_eq!(store.data_ptr(), ptr);
    }

    #[test]
    fn resize_past_maximum_is_rejected() {
        let store = BackingStore::allocate(1, 4, Some(8), false);
        assert!(matches!(
            store.resize(9),
            Err(HostError::ByteLengthExceeded { requested: 9, max: 8 })
        ));
    }

    #[test]
    fn shared_flag_is_reported() {
        let plain = BackingStore::allocate(1, 4, None, false);
        let shared = BackingStore::allocate(2, 4, None, true);
        assert!(!plain.is_shared());
        assert!(shared.is_shared());
        assert!(format!("{shared:?}").contains("shared: true"));
    }

    #[test]
    fn shared_store_only_grows() {
        let store = BackingStore::allocate(1, 4, Some(8), true);
        store.resize(8).unwrap();
        assert!(matches!(
            store.resize(4),
            Err(HostError::CannotShrink { current: 8, requested: 4 })
        ));
    }
}
