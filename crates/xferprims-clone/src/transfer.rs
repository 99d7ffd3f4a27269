//! Transfer-list handling for structured clone.
//!
//! The encoder hands over the values listed for transfer; each one becomes a
//! [`Transfer`] record carrying a consumed-once handle, and its source view
//! is detached. The decoder turns the records back into views and resolves
//! references to them by id.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use xferprims_handle::HandleBlob;
use xferprims_host::{ArrayBuffer, Env, Value};

use crate::backing::{create_arraybuffer, detach_arraybuffer, get_arraybuffer_backing_store};
use crate::error::{BufferKind, CloneError, DataCloneError, Result};
use crate::fatal;

/// What kind of view a transfer record rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferKind {
    ArrayBuffer,
    ResizableArrayBuffer,
}

/// One transferred buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// 1-based position in the transfer list.
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: TransferKind,
    /// Handle value, as carried by a [`HandleBlob`].
    #[serde(rename = "backingStore")]
    pub backing_store: u64,
    #[serde(
        rename = "maxByteLength",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_byte_length: Option<usize>,
}

impl Transfer {
    pub fn handle(&self) -> HandleBlob {
        HandleBlob::from_value(self.backing_store)
    }
}

/// Move every buffer in `transfer_list` out of the calling context.
///
/// The whole list is validated before any handle is extracted, so a rejected
/// list leaves every buffer attached. Sources are detached only once every
/// handle has been extracted.
///
/// # Errors
/// - `UNTRANSFERABLE_TYPE` for a value that is not an `ArrayBuffer`, or one
///   that is already detached
/// - `ALREADY_TRANSFERRED` for a buffer listed more than once
///
/// # Panics
/// If a buffer belongs to another context. No source is detached in that
/// case.
pub fn serialize_transfers<E: Env + ?Sized>(
    env: &E,
    transfer_list: &[Value],
) -> Result<Vec<Transfer>> {
    let mut buffers: Vec<&ArrayBuffer> = Vec::with_capacity(transfer_list.len());

    for value in transfer_list {
        let Some(buf) = value.as_arraybuffer() else {
            return Err(DataCloneError::untransferable_type("Value cannot be transferred").into());
        };
        if buf.is_detached() {
            return Err(DataCloneError::untransferable_type(
                "Detached ArrayBuffer cannot be transferred",
            )
            .into());
        }
        if buffers.iter().any(|seen| seen.ptr_eq(buf)) {
            return Err(DataCloneError::already_transferred(
                "ArrayBuffer has already been transferred",
            )
            .into());
        }
        buffers.push(buf);
    }

    let mut transfers = Vec::with_capacity(transfer_list.len());
    for (index, (value, buf)) in transfer_list.iter().zip(&buffers).enumerate() {
        let id = u32::try_from(index + 1).unwrap_or_else(|_| {
            fatal::violation(format!(
                "transfer list too long ({} entries)",
                transfer_list.len()
            ))
        });
        let max_byte_length = buf.max_byte_length();
        let handle = get_arraybuffer_backing_store(env, value);

        transfers.push(Transfer {
            id,
            kind: if max_byte_length.is_some() {
                TransferKind::ResizableArrayBuffer
            } else {
                TransferKind::ArrayBuffer
            },
            backing_store: handle.value(),
            max_byte_length,
        });
    }

    for value in transfer_list {
        detach_arraybuffer(env, value);
    }

    tracing::debug!(count = transfers.len(), "serialized transfer list");
    Ok(transfers)
}

/// Rebuild the transferred buffers in the calling context.
///
/// Returns `(id, view)` pairs in record order.
///
/// Every record is checked before any handle is consumed, so a rejected
/// list leaves every handle outstanding and still usable.
///
/// # Errors
/// - `INVALID_REFERENCE` if an id is zero or appears twice
/// - [`CloneError::BackingStoreUnset`] for a record with an unset handle
pub fn deserialize_transfers<E: Env + ?Sized>(
    env: &E,
    transfers: &[Transfer],
) -> Result<Vec<(u32, ArrayBuffer)>> {
    let mut ids = HashSet::with_capacity(transfers.len());
    for transfer in transfers {
        if transfer.id == 0 {
            return Err(DataCloneError::invalid_reference("Transfer id must be positive").into());
        }
        if !ids.insert(transfer.id) {
            return Err(DataCloneError::invalid_reference(format!(
                "Transfer id {} is used more than once",
                transfer.id
            ))
            .into());
        }
        if transfer.handle().is_null() {
            return Err(CloneError::BackingStoreUnset(BufferKind::ArrayBuffer));
        }
    }

    let mut buffers = Vec::with_capacity(transfers.len());
    for transfer in transfers {
        let buf = create_arraybuffer(env, &transfer.handle())?;
        buffers.push((transfer.id, buf));
    }

    tracing::debug!(count = buffers.len(), "deserialized transfer list");
    Ok(buffers)
}
