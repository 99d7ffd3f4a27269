use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::HostConfig;
use crate::env::{BackingStoreRef, Env};
use crate::error::{HostError, Result};
use crate::store::BackingStore;
use crate::value::{ArrayBuffer, External, SharedArrayBuffer, Value, ValueKind};

/// Process-wide host state shared by every [`Context`].
///
/// The registry maps each outstanding [`BackingStoreRef`] to the strong
/// reference it stands for. Entries are inserted by the `get_*_backing_store`
/// operations and removed by `release_arraybuffer_backing_store`, so a
/// reference value is never reissued while it is live and a stale value
/// resolves to [`HostError::UnknownBackingStore`].
pub struct Host {
    config: HostConfig,
    registry: Mutex<HashMap<u64, Arc<BackingStore>>>,
    next_ref: AtomicU64,
    next_store: AtomicU64,
    next_context: AtomicU64,
}

impl Host {
    pub fn new(config: HostConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: Mutex::new(HashMap::new()),
            next_ref: AtomicU64::new(1),
            next_store: AtomicU64::new(1),
            next_context: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Create a new execution context bound to this host.
    pub fn context(self: &Arc<Self>) -> Context {
        let id = self.next_context.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(context = id, "context created");
        Context {
            id,
            host: Arc::clone(self),
        }
    }

    /// Number of bookkeeping references taken but not yet released.
    pub fn outstanding(&self) -> usize {
        self.registry.lock().len()
    }

    fn allocate(
        &self,
        byte_length: usize,
        max_byte_length: Option<usize>,
        shared: bool,
    ) -> Result<Arc<BackingStore>> {
        let limit = self.config.max_byte_length;
        let reserved = max_byte_length.unwrap_or(byte_length);
        if reserved > limit {
            return Err(HostError::ByteLengthExceeded {
                requested: reserved,
                max: limit,
            });
        }
        if byte_length > reserved {
            return Err(HostError::ByteLengthExceeded {
                requested: byte_length,
                max: reserved,
            });
        }

        let id = self.next_store.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(store = id, byte_length, ?max_byte_length, shared, "backing store allocated");
        Ok(Arc::new(BackingStore::allocate(
            id,
            byte_length,
            max_byte_length,
            shared,
        )))
    }

    fn retain(&self, store: Arc<BackingStore>) -> Result<BackingStoreRef> {
        let mut registry = self.registry.lock();
        if registry.len() >= self.config.max_outstanding_handles {
            return Err(HostError::TooManyHandles(self.config.max_outstanding_handles));
        }

        let raw = self.next_ref.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(
            reference = raw,
            store = store.id(),
            shared = store.is_shared(),
            "backing store retained"
        );
        registry.insert(raw, store);
        Ok(BackingStoreRef::from_raw(raw))
    }

    fn lookup(&self, store: BackingStoreRef) -> Result<Arc<BackingStore>> {
        if store.is_null() {
            return Err(HostError::NullBackingStore);
        }
        self.registry
            .lock()
            .get(&store.as_raw())
            .cloned()
            .ok_or(HostError::UnknownBackingStore(store.as_raw()))
    }

    fn release(&self, store: BackingStoreRef) -> Result<()> {
        if store.is_null() {
            return Err(HostError::NullBackingStore);
        }
        let removed = self
            .registry
            .lock()
            .remove(&store.as_raw())
            .ok_or(HostError::UnknownBackingStore(store.as_raw()))?;
        tracing::trace!(reference = store.as_raw(), store = removed.id(), "backing store released");
        Ok(())
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("config", &self.config)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// One execution context.
///
/// A context is `Send` and may be moved to the thread that will run it; the
/// values it creates are not, and stay on that thread.
#[derive(Debug)]
pub struct Context {
    id: u64,
    host: Arc<Host>,
}

impl Context {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    /// Allocate a resizable `ArrayBuffer` whose length may change up to
    /// `max_byte_length`.
    pub fn create_resizable_arraybuffer(
        &self,
        byte_length: usize,
        max_byte_length: usize,
    ) -> Result<ArrayBuffer> {
        let store = self
            .host
            .allocate(byte_length, Some(max_byte_length), false)?;
        Ok(ArrayBuffer::new(self.id, store))
    }

    pub fn create_sharedarraybuffer(&self, byte_length: usize) -> Result<SharedArrayBuffer> {
        let store = self.host.allocate(byte_length, None, true)?;
        Ok(SharedArrayBuffer::new(self.id, store))
    }

    /// Allocate a `SharedArrayBuffer` that may grow up to `max_byte_length`.
    pub fn create_growable_sharedarraybuffer(
        &self,
        byte_length: usize,
        max_byte_length: usize,
    ) -> Result<SharedArrayBuffer> {
        let store = self
            .host
            .allocate(byte_length, Some(max_byte_length), true)?;
        Ok(SharedArrayBuffer::new(self.id, store))
    }

    /// Wrap a pointer in an external whose finalizer runs when the last
    /// handle to it drops.
    pub fn create_external_with_finalizer(
        &self,
        data: usize,
        finalize: impl FnOnce(usize) + 'static,
    ) -> External {
        External::new(self.id, data, Some(Box::new(finalize)))
    }

    fn owned<'a>(&self, value: &'a Value) -> Result<&'a Value> {
        match value.context_id() {
            Some(owner) if owner != self.id => Err(HostError::ForeignValue {
                owner,
                current: self.id,
            }),
            _ => Ok(value),
        }
    }

    fn arraybuffer<'a>(&self, value: &'a Value) -> Result<&'a ArrayBuffer> {
        self.owned(value)?
            .as_arraybuffer()
            .ok_or(HostError::InvalidArg {
                expected: ValueKind::ArrayBuffer,
                found: value.kind(),
            })
    }
}

impl Env for Context {
    fn get_arraybuffer_backing_store(&self, value: &Value) -> Result<BackingStoreRef> {
        let store = self.arraybuffer(value)?.store().ok_or(HostError::Detached)?;
        self.host.retain(store)
    }

    fn get_sharedarraybuffer_backing_store(&self, value: &Value) -> Result<BackingStoreRef> {
        let buf = self
            .owned(value)?
            .as_sharedarraybuffer()
            .ok_or(HostError::InvalidArg {
                expected: ValueKind::SharedArrayBuffer,
                found: value.kind(),
            })?;
        self.host.retain(buf.store())
    }

    fn create_arraybuffer_with_backing_store(
        &self,
        store: BackingStoreRef,
    ) -> Result<ArrayBuffer> {
        let store = self.host.lookup(store)?;
        Ok(ArrayBuffer::new(self.id, store))
    }

    fn create_sharedarraybuffer_with_backing_store(
        &self,
        store: BackingStoreRef,
    ) -> Result<SharedArrayBuffer> {
        let store = self.host.lookup(store)?;
        Ok(SharedArrayBuffer::new(self.id, store))
    }

    fn release_arraybuffer_backing_store(&self, store: BackingStoreRef) -> Result<()> {
        self.host.release(store)
    }

    fn detach_arraybuffer(&self, value: &Value) -> Result<()> {
        let store = self
            .arraybuffer(value)?
            .take_store()
            .ok_or(HostError::Detached)?;
        tracing::trace!(context = self.id, store = store.id(), "ArrayBuffer detached");
        Ok(())
    }

    fn get_value_external(&self, value: &Value) -> Result<usize> {
        self.owned(value)?
            .as_external()
            .map(External::data)
            .ok_or(HostError::InvalidArg {
                expected: ValueKind::External,
                found: value.kind(),
            })
    }

    fn create_external(&self, data: usize) -> Result<External> {
        Ok(External::new(self.id, data, None))
    }

    fn is_external(&self, value: &Value) -> bool {
        matches!(value, Value::External(_))
    }

    fn create_arraybuffer(&self, byte_length: usize) -> Result<ArrayBuffer> {
        let store = self.host.allocate(byte_length, None, false)?;
        Ok(ArrayBuffer::new(self.id, store))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Weak;

    use super::*;

    fn host() -> Arc<Host> {
        Host::new(HostConfig::default())
    }

    #[test]
    fn contexts_get_distinct_ids() {
        let host = host();
        let a = host.context();
        let b = host.context();
        assert_ne!(a.id(), b.id());
        assert!(Arc::ptr_eq(a.host(), b.host()));
    }

    #[test]
    fn retain_and_release_track_outstanding() {
        let host = host();
        let cx = host.context();
        let buf: Value = cx.create_arraybuffer(4).unwrap().into();

        let first = cx.get_arraybuffer_backing_store(&buf).unwrap();
        let second = cx.get_arraybuffer_backing_store(&buf).unwrap();
        assert_ne!(first, second);
        assert!(!first.is_null());
        assert_eq!(host.outstanding(), 2);

        cx.release_arraybuffer_backing_store(first).unwrap();
        cx.release_arraybuffer_backing_store(second).unwrap();
        assert_eq!(host.outstanding(), 0);
    }

    #[test]
    fn released_reference_is_unknown() {
        let host = host();
        let cx = host.context();
        let buf: Value = cx.create_arraybuffer(4).unwrap().into();

        let store = cx.get_arraybuffer_backing_store(&buf).unwrap();
        cx.release_arraybuffer_backing_store(store).unwrap();

        assert!(matches!(
            cx.create_arraybuffer_with_backing_store(store),
            Err(HostError::UnknownBackingStore(raw)) if raw == store.as_raw()
        ));
        assert!(matches!(
            cx.release_arraybuffer_backing_store(store),
            Err(HostError::UnknownBackingStore(_))
        ));
    }

    #[test]
    fn null_reference_is_rejected() {
        let cx = host().context();
        assert!(matches!(
            cx.create_arraybuffer_with_backing_store(BackingStoreRef::NULL),
            Err(HostError::NullBackingStore)
        ));
        assert!(matches!(
            cx.release_arraybuffer_backing_store(BackingStoreRef::NULL),
            Err(HostError::NullBackingStore)
        ));
    }

    #[test]
    fn wrong_kind_is_invalid_arg() {
        let cx = host().context();
        let shared: Value = cx.create_sharedarraybuffer(4).unwrap().into();

        assert!(matches!(
            cx.get_arraybuffer_backing_store(&shared),
            Err(HostError::InvalidArg {
                expected: ValueKind::ArrayBuffer,
                found: ValueKind::SharedArrayBuffer,
            })
        ));
        assert!(matches!(
            cx.get_sharedarraybuffer_backing_store(&Value::Null),
            Err(HostError::InvalidArg { .. })
        ));
        assert!(matches!(
            cx.get_value_external(&Value::Boolean(true)),
            Err(HostError::InvalidArg { .. })
        ));
    }

    #[test]
    fn foreign_value_is_rejected() {
        let host = host();
        let a = host.context();
        let b = host.context();
        let buf: Value = a.create_arraybuffer(4).unwrap().into();

        assert!(matches!(
            b.get_arraybuffer_backing_store(&buf),
            Err(HostError::ForeignValue { owner, current }) if owner == a.id() && current == b.id()
        ));
        assert!(matches!(b.detach_arraybuffer(&buf), Err(HostError::ForeignValue { .. })));
    }

    #[test]
    fn detach_twice_is_reported() {
        let cx = host().context();
        let buf: Value = cx.create_arraybuffer(4).unwrap().into();

        cx.detach_arraybuffer(&buf).unwrap();
        assert!(matches!(cx.detach_arraybuffer(&buf), Err(HostError::Detached)));
        assert!(matches!(
            cx.get_arraybuffer_backing_store(&buf),
            Err(HostError::Detached)
        ));
    }

    #[test]
    fn store_freed_after_last_reference() {
        let host = host();
        let cx = host.context();
        let buf = cx.create_arraybuffer(4).unwrap();
        let probe: Weak<BackingStore> = Arc::downgrade(&buf.store().unwrap());
        let value: Value = buf.into();

        let store = cx.get_arraybuffer_backing_store(&value).unwrap();
        drop(value);
        assert!(probe.upgrade().is_some(), "registry keeps the store alive");

        cx.release_arraybuffer_backing_store(store).unwrap();
        assert!(probe.upgrade().is_none());
    }

    #[test]
    fn allocation_limits() {
        let host = Host::new(HostConfig {
            max_byte_length: 16,
            ..HostConfig::default()
        });
        let cx = host.context();

        assert!(cx.create_arraybuffer(16).is_ok());
        assert!(matches!(
            cx.create_arraybuffer(17),
            Err(HostError::ByteLengthExceeded { requested: 17, max: 16 })
        ));
        assert!(matches!(
            cx.create_resizable_arraybuffer(4, 32),
            Err(HostError::ByteLengthExceeded { requested: 32, max: 16 })
        ));
        assert!(matches!(
            cx.create_growable_sharedarraybuffer(8, 4),
            Err(HostError::ByteLengthExceeded { requested: 8, max: 4 })
        ));
    }

    #[test]
    fn outstanding_handle_limit() {
        let host = Host::new(HostConfig {
            max_outstanding_handles: 1,
            ..HostConfig::default()
        });
        let cx = host.context();
        let buf: Value = cx.create_sharedarraybuffer(4).unwrap().into();

        let store = cx.get_sharedarraybuffer_backing_store(&buf).unwrap();
        assert!(matches!(
            cx.get_sharedarraybuffer_backing_store(&buf),
            Err(HostError::TooManyHandles(1))
        ));

        cx.release_arraybuffer_backing_store(store).unwrap();
        assert!(cx.get_sharedarraybuffer_backing_store(&buf).is_ok());
    }

    #[test]
    fn external_without_finalizer() {
        let cx = host().context();
        let ext = cx.create_external(0x1000).unwrap();
        assert!(!ext.has_finalizer());

        let value: Value = ext.into();
        assert!(cx.is_external(&value));
        assert_eq!(cx.get_value_external(&value).unwrap(), 0x1000);
        assert!(!cx.is_external(&Value::Undefined));
    }
}
