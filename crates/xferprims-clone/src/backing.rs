use xferprims_handle::HandleBlob;
use xferprims_host::{ArrayBuffer, BackingStoreRef, Env, SharedArrayBuffer, Value};

use crate::error::{BufferKind, CloneError, Result};
use crate::fatal;

/// Take a reference to the store behind a transferable view and encode it as
/// a handle blob.
///
/// The view stays attached and usable. The reference is owned by the blob
/// until [`create_arraybuffer`] consumes it.
///
/// # Panics
/// If `value` is not an attached `ArrayBuffer` of the calling context.
#[track_caller]
#[must_use = "dropping the handle leaks the backing-store reference"]
pub fn get_arraybuffer_backing_store<E: Env + ?Sized>(env: &E, value: &Value) -> HandleBlob {
    let store = fatal::check(
        "get_arraybuffer_backing_store",
        env.get_arraybuffer_backing_store(value),
    );
    tracing::debug!(handle = store.as_raw(), "extracted ArrayBuffer backing store");
    HandleBlob::from_value(store.as_raw())
}

/// Take a reference to the store behind a shared view and encode it as a
/// handle blob. Shared views are never detached after extraction.
///
/// # Panics
/// If `value` is not a `SharedArrayBuffer` of the calling context.
#[track_caller]
#[must_use = "dropping the handle leaks the backing-store reference"]
pub fn get_sharedarraybuffer_backing_store<E: Env + ?Sized>(env: &E, value: &Value) -> HandleBlob {
    let store = fatal::check(
        "get_sharedarraybuffer_backing_store",
        env.get_sharedarraybuffer_backing_store(value),
    );
    tracing::debug!(handle = store.as_raw(), "extracted SharedArrayBuffer backing store");
    HandleBlob::from_value(store.as_raw())
}

/// Build a transferable view over the store a handle refers to, consuming the
/// handle.
///
/// # Errors
/// [`CloneError::BackingStoreUnset`] if the handle is the null handle.
///
/// # Panics
/// If the handle was already consumed or was never issued by this host.
#[track_caller]
pub fn create_arraybuffer<E: Env + ?Sized>(env: &E, handle: &HandleBlob) -> Result<ArrayBuffer> {
    let store = BackingStoreRef::from_raw(handle.value());
    if store.is_null() {
        return Err(CloneError::BackingStoreUnset(BufferKind::ArrayBuffer));
    }

    let buf = fatal::check(
        "create_arraybuffer_with_backing_store",
        env.create_arraybuffer_with_backing_store(store),
    );
    // The view holds its own reference now; drop the one taken at extraction.
    fatal::check(
        "release_arraybuffer_backing_store",
        env.release_arraybuffer_backing_store(store),
    );

    tracing::debug!(
        handle = store.as_raw(),
        byte_length = buf.byte_length(),
        "reconstructed ArrayBuffer"
    );
    Ok(buf)
}

/// Build a shared view over the store a handle refers to, consuming the
/// handle. Other views of the same store keep observing the same memory.
///
/// # Errors
/// [`CloneError::BackingStoreUnset`] if the handle is the null handle.
///
/// # Panics
/// If the handle was already consumed or was never issued by this host.
#[track_caller]
pub fn create_sharedarraybuffer<E: Env + ?Sized>(
    env: &E,
    handle: &HandleBlob,
) -> Result<SharedArrayBuffer> {
    let store = BackingStoreRef::from_raw(handle.value());
    if store.is_null() {
        return Err(CloneError::BackingStoreUnset(BufferKind::SharedArrayBuffer));
    }

    let buf = fatal::check(
        "create_sharedarraybuffer_with_backing_store",
        env.create_sharedarraybuffer_with_backing_store(store),
    );
    fatal::check(
        "release_arraybuffer_backing_store",
        env.release_arraybuffer_backing_store(store),
    );

    tracing::debug!(
        handle = store.as_raw(),
        byte_length = buf.byte_length(),
        "reconstructed SharedArrayBuffer"
    );
    Ok(buf)
}

/// Sever a transferable view from its store and reset its length to zero.
///
/// # Panics
/// If `value` is not an attached `ArrayBuffer` of the calling context.
#[track_caller]
pub fn detach_arraybuffer<E: Env + ?Sized>(env: &E, value: &Value) {
    fatal::check("detach_arraybuffer", env.detach_arraybuffer(value));
    tracing::debug!("detached ArrayBuffer");
}
