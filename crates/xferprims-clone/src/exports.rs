//! Host-callable entry points.
//!
//! Each entry point takes exactly one argument and returns one value (or
//! none). Handle blobs cross this surface as 8-byte `ArrayBuffer`s created
//! in the calling context, so any transport able to move an `ArrayBuffer`
//! can move a handle.

use xferprims_handle::{HandleBlob, HANDLE_SIZE};
use xferprims_host::{Env, Value};

use crate::error::Result;
use crate::fatal;

pub const GET_ARRAYBUFFER_BACKING_STORE: &str = "getArrayBufferBackingStore";
pub const GET_SHAREDARRAYBUFFER_BACKING_STORE: &str = "getSharedArrayBufferBackingStore";
pub const CREATE_ARRAYBUFFER: &str = "createArrayBuffer";
pub const CREATE_SHAREDARRAYBUFFER: &str = "createSharedArrayBuffer";
pub const DETACH_ARRAYBUFFER: &str = "detachArrayBuffer";
#[cfg(feature = "external")]
pub const GET_EXTERNAL: &str = "getExternal";
#[cfg(feature = "external")]
pub const CREATE_EXTERNAL: &str = "createExternal";
#[cfg(feature = "external")]
pub const IS_EXTERNAL: &str = "isExternal";

/// An entry point: one environment, the call arguments, an optional result.
pub type Callback<E> = fn(&E, &[Value]) -> Result<Option<Value>>;

/// Name → callback table registered with the host.
pub struct Exports<E: Env> {
    entries: Vec<(&'static str, Callback<E>)>,
}

impl<E: Env> Exports<E> {
    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn get(&self, name: &str) -> Option<Callback<E>> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, callback)| *callback)
    }

    /// Invoke an entry point by name.
    ///
    /// # Panics
    /// If no entry point has that name, or on any contract violation inside
    /// the entry point.
    #[track_caller]
    pub fn call(&self, name: &str, env: &E, args: &[Value]) -> Result<Option<Value>> {
        match self.get(name) {
            Some(callback) => callback(env, args),
            None => fatal::violation(format!("no entry point named {name}")),
        }
    }
}

/// Build the entry-point table for an environment type.
pub fn exports<E: Env>() -> Exports<E> {
    #[cfg_attr(not(feature = "external"), allow(unused_mut))]
    let mut entries: Vec<(&'static str, Callback<E>)> = vec![
        (
            GET_ARRAYBUFFER_BACKING_STORE,
            get_arraybuffer_backing_store::<E> as Callback<E>,
        ),
        (
            GET_SHAREDARRAYBUFFER_BACKING_STORE,
            get_sharedarraybuffer_backing_store::<E> as Callback<E>,
        ),
        (CREATE_ARRAYBUFFER, create_arraybuffer::<E> as Callback<E>),
        (
            CREATE_SHAREDARRAYBUFFER,
            create_sharedarraybuffer::<E> as Callback<E>,
        ),
        (DETACH_ARRAYBUFFER, detach_arraybuffer::<E> as Callback<E>),
    ];

    #[cfg(feature = "external")]
    entries.extend([
        (GET_EXTERNAL, get_external::<E> as Callback<E>),
        (CREATE_EXTERNAL, create_external::<E> as Callback<E>),
        (IS_EXTERNAL, is_external::<E> as Callback<E>),
    ]);

    Exports { entries }
}

fn get_arraybuffer_backing_store<E: Env>(env: &E, args: &[Value]) -> Result<Option<Value>> {
    let value = argument(GET_ARRAYBUFFER_BACKING_STORE, args);
    let handle = crate::get_arraybuffer_backing_store(env, value);
    Ok(Some(blob_to_value(env, &handle)))
}

fn get_sharedarraybuffer_backing_store<E: Env>(env: &E, args: &[Value]) -> Result<Option<Value>> {
    let value = argument(GET_SHAREDARRAYBUFFER_BACKING_STORE, args);
    let handle = crate::get_sharedarraybuffer_backing_store(env, value);
    Ok(Some(blob_to_value(env, &handle)))
}

fn create_arraybuffer<E: Env>(env: &E, args: &[Value]) -> Result<Option<Value>> {
    let handle = value_to_blob(CREATE_ARRAYBUFFER, argument(CREATE_ARRAYBUFFER, args));
    let buf = crate::create_arraybuffer(env, &handle)?;
    Ok(Some(buf.into()))
}

fn create_sharedarraybuffer<E: Env>(env: &E, args: &[Value]) -> Result<Option<Value>> {
    let handle = value_to_blob(
        CREATE_SHAREDARRAYBUFFER,
        argument(CREATE_SHAREDARRAYBUFFER, args),
    );
    let buf = crate::create_sharedarraybuffer(env, &handle)?;
    Ok(Some(buf.into()))
}

fn detach_arraybuffer<E: Env>(env: &E, args: &[Value]) -> Result<Option<Value>> {
    crate::detach_arraybuffer(env, argument(DETACH_ARRAYBUFFER, args));
    Ok(None)
}

#[cfg(feature = "external")]
fn get_external<E: Env>(env: &E, args: &[Value]) -> Result<Option<Value>> {
    let pointer = crate::get_external(env, argument(GET_EXTERNAL, args));
    Ok(Some(blob_to_value(env, &pointer)))
}

#[cfg(feature = "external")]
fn create_external<E: Env>(env: &E, args: &[Value]) -> Result<Option<Value>> {
    let pointer = value_to_blob(CREATE_EXTERNAL, argument(CREATE_EXTERNAL, args));
    Ok(Some(crate::create_external(env, &pointer).into()))
}

#[cfg(feature = "external")]
fn is_external<E: Env>(env: &E, args: &[Value]) -> Result<Option<Value>> {
    let value = argument(IS_EXTERNAL, args);
    Ok(Some(Value::Boolean(crate::is_external(env, value))))
}

#[track_caller]
fn argument<'a>(name: &str, args: &'a [Value]) -> &'a Value {
    match args {
        [value] => value,
        _ => fatal::violation(format!(
            "{name} expects exactly 1 argument, got {}",
            args.len()
        )),
    }
}

fn blob_to_value<E: Env>(env: &E, blob: &HandleBlob) -> Value {
    let buf = fatal::check("create_arraybuffer", env.create_arraybuffer(HANDLE_SIZE));
    fatal::check("write handle blob", buf.write(0, blob.as_bytes()));
    buf.into()
}

#[track_caller]
fn value_to_blob(name: &str, value: &Value) -> HandleBlob {
    let Some(buf) = value.as_arraybuffer() else {
        fatal::violation(format!(
            "{name} expects an ArrayBuffer handle, got {}",
            value.kind()
        ));
    };

    HandleBlob::from_slice(&buf.to_vec())
        .unwrap_or_else(|err| fatal::violation(format!("{name}: {err}")))
}
