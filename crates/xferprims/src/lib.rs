//! Zero-copy buffer transfer primitives for structured clone.
//!
//! xferprims moves `ArrayBuffer` and `SharedArrayBuffer` backing stores
//! between execution contexts without copying their bytes, by passing a
//! fixed-size handle through whatever channel the contexts already share.
//!
//! # Crate Structure
//!
//! - [`host`]: the `Env` capability and an in-process reference host
//! - [`handle`]: handle blobs and the tagged wire codec
//! - [`clone`]: the transfer primitives, entry-point table and transfer lists
//!
//! ```
//! use xferprims::clone::{create_arraybuffer, detach_arraybuffer, get_arraybuffer_backing_store};
//! use xferprims::host::{Env, Host, HostConfig, Value};
//!
//! let host = Host::new(HostConfig::default());
//! let (a, b) = (host.context(), host.context());
//!
//! let buf = a.create_arraybuffer(4).unwrap();
//! buf.write(0, b"data").unwrap();
//! let value = Value::from(buf);
//!
//! let handle = get_arraybuffer_backing_store(&a, &value);
//! detach_arraybuffer(&a, &value);
//!
//! let moved = create_arraybuffer(&b, &handle).unwrap();
//! assert_eq!(moved.to_vec(), b"data");
//! assert_eq!(host.outstanding(), 0);
//! ```

/// Re-export host types.
pub mod host {
    pub use xferprims_host::*;
}

/// Re-export handle types.
pub mod handle {
    pub use xferprims_handle::*;
}

/// Re-export the transfer primitives.
pub mod clone {
    pub use xferprims_clone::*;
}
