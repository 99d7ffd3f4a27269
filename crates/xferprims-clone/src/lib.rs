//! Zero-copy buffer transfer primitives for structured clone.
//!
//! This is the core layer of xferprims. A structured-clone encoder drives the
//! sequence extract handle → transmit handle as bytes → reconstruct buffer:
//! - [`get_arraybuffer_backing_store`] / [`get_sharedarraybuffer_backing_store`]
//!   take one backing-store reference and encode it as a [`HandleBlob`]
//! - [`create_arraybuffer`] / [`create_sharedarraybuffer`] build a view over
//!   that store in the target context and release the reference
//! - [`detach_arraybuffer`] severs the source view once ownership has moved
//! - [`get_external`] / [`create_external`] carry opaque native pointers over
//!   the same channel (feature `external`)
//!
//! Contract violations (wrong value kind, wrong argument count, host calls
//! that cannot fail under correct usage) panic. The only recoverable failure
//! is reconstructing from an unset handle, reported as
//! [`CloneError::BackingStoreUnset`].

pub mod backing;
pub mod error;
pub mod exports;
#[cfg(feature = "external")]
pub mod external;
mod fatal;
pub mod transfer;

pub use backing::{
    create_arraybuffer, create_sharedarraybuffer, detach_arraybuffer,
    get_arraybuffer_backing_store, get_sharedarraybuffer_backing_store,
};
pub use error::{BufferKind, CloneError, DataCloneCode, DataCloneError, Result};
pub use exports::{exports, Callback, Exports};
#[cfg(feature = "external")]
pub use external::{create_external, get_external, is_external};
pub use transfer::{deserialize_transfers, serialize_transfers, Transfer, TransferKind};
pub use xferprims_handle::HandleBlob;
