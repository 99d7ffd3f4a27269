use bytes::{Buf, BufMut, BytesMut};

use crate::blob::{HandleBlob, HANDLE_SIZE};
use crate::error::{HandleError, Result};
use crate::kind::{BUFFER, EXTERNAL};

/// Wire size of a tagged handle: kind (1) + value (8) = 9 bytes.
pub const WIRE_SIZE: usize = 1 + HANDLE_SIZE;

/// A transfer handle tagged with what it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferHandle {
    /// A backing-store reference.
    Buffer(u64),
    /// An opaque native pointer.
    External(u64),
}

impl TransferHandle {
    /// The kind tag written on the wire.
    pub fn kind(&self) -> u8 {
        match self {
            TransferHandle::Buffer(_) => BUFFER,
            TransferHandle::External(_) => EXTERNAL,
        }
    }

    pub fn value(&self) -> u64 {
        match self {
            TransferHandle::Buffer(value) | TransferHandle::External(value) => *value,
        }
    }

    /// The untagged blob carrying the same value.
    pub fn blob(&self) -> HandleBlob {
        HandleBlob::from_value(self.value())
    }

    /// Rebuild a tagged handle from a kind tag and an untagged blob.
    pub fn from_parts(kind: u8, blob: HandleBlob) -> Result<Self> {
        match kind {
            BUFFER => Ok(TransferHandle::Buffer(blob.value())),
            EXTERNAL => Ok(TransferHandle::External(blob.value())),
            other => Err(HandleError::UnknownKind(other)),
        }
    }
}

/// Encode a tagged handle into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬─────────────────┐
/// │ Kind     │ Value           │
/// │ (1B)     │ (8B LE)         │
/// └──────────┴─────────────────┘
/// ```
pub fn encode_handle(handle: &TransferHandle, dst: &mut BytesMut) {
    dst.reserve(WIRE_SIZE);
    dst.put_u8(handle.kind());
    dst.put_u64_le(handle.value());
}

/// Decode a tagged handle from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete handle yet.
/// On success, consumes the handle bytes from the buffer.
pub fn decode_handle(src: &mut BytesMut) -> Result<Option<TransferHandle>> {
    if src.len() < WIRE_SIZE {
        return Ok(None); // Need more data
    }

    let kind = src[0];
    if kind != BUFFER && kind != EXTERNAL {
        tracing::debug!(kind, "rejecting handle with unknown kind tag");
        return Err(HandleError::UnknownKind(kind));
    }

    src.advance(1);
    let value = src.get_u64_le();
    TransferHandle::from_parts(kind, HandleBlob::from_value(value)).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_buffer_handle() {
        let mut buf = BytesMut::new();
        encode_handle(&TransferHandle::Buffer(0x1234), &mut buf);
        assert_eq!(buf.len(), WIRE_SIZE);
        assert_eq!(buf[0], BUFFER);

        let handle = decode_handle(&mut buf).unwrap().unwrap();
        assert_eq!(handle, TransferHandle::Buffer(0x1234));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_incomplete() {
        let mut buf = BytesMut::from(&[BUFFER, 1, 0, 0][..]);
        assert!(decode_handle(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 4, "incomplete input is left untouched");
    }

    #[test]
    fn test_decode_unknown_kind() {
        let mut buf = BytesMut::from(&[0u8; WIRE_SIZE][..]);
        assert!(matches!(
            decode_handle(&mut buf),
            Err(HandleError::UnknownKind(0))
        ));
    }

    #[test]
    fn test_multiple_handles() {
        let mut buf = BytesMut::new();
        encode_handle(&TransferHandle::Buffer(7), &mut buf);
        encode_handle(&TransferHandle::External(0xdead_beef), &mut buf);

        assert_eq!(
            decode_handle(&mut buf).unwrap(),
            Some(TransferHandle::Buffer(7))
        );
        assert_eq!(
            decode_handle(&mut buf).unwrap(),
            Some(TransferHandle::External(0xdead_beef))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_blob_carries_untagged_value() {
        let handle = TransferHandle::External(42);
        assert_eq!(handle.blob().value(), 42);
        assert_eq!(
            TransferHandle::from_parts(handle.kind(), handle.blob()).unwrap(),
            handle
        );
        assert!(matches!(
            TransferHandle::from_parts(9, handle.blob()),
            Err(HandleError::UnknownKind(9))
        ));
    }
}
