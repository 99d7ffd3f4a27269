//! Transfer handles and their byte representations.
//!
//! A transfer handle is a pointer-width number standing for a backing-store
//! reference or an external pointer. It travels between contexts in one of
//! two shapes:
//! - [`HandleBlob`]: the bare 8-byte little-endian value, for transports that
//!   only carry byte-copyable buffers
//! - [`TransferHandle`]: a tagged union with a 9-byte wire form (1-byte kind
//!   tag + value), for transports that can carry richer payloads
//!
//! Handles are process-local. Decoding one in another process yields a
//! number with no meaning.

pub mod blob;
pub mod codec;
pub mod error;
pub mod kind;

pub use blob::{HandleBlob, HANDLE_SIZE};
pub use codec::{decode_handle, encode_handle, TransferHandle, WIRE_SIZE};
pub use error::{HandleError, Result};
pub use kind::{kind_name, BUFFER, EXTERNAL};
