//! Values handed out by an execution context.
//!
//! Views are reference-counted handles local to the context that created
//! them (`Rc`, not `Send`). Only the backing store behind a view may be
//! reached from other contexts, and only through the host.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{HostError, Result};
use crate::store::BackingStore;

/// Discriminant of a [`Value`], used in error messages and type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    ArrayBuffer,
    SharedArrayBuffer,
    External,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::ArrayBuffer => "ArrayBuffer",
            ValueKind::SharedArrayBuffer => "SharedArrayBuffer",
            ValueKind::External => "external",
        };
        f.write_str(name)
    }
}

/// A value as seen inside one execution context.
#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    ArrayBuffer(ArrayBuffer),
    SharedArrayBuffer(SharedArrayBuffer),
    External(External),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::ArrayBuffer(_) => ValueKind::ArrayBuffer,
            Value::SharedArrayBuffer(_) => ValueKind::SharedArrayBuffer,
            Value::External(_) => ValueKind::External,
        }
    }

    /// The context that created this value. Primitives belong to no context.
    pub fn context_id(&self) -> Option<u64> {
        match self {
            Value::ArrayBuffer(buf) => Some(buf.context_id()),
            Value::SharedArrayBuffer(buf) => Some(buf.context_id()),
            Value::External(ext) => Some(ext.context_id()),
            _ => None,
        }
    }

    pub fn as_arraybuffer(&self) -> Option<&ArrayBuffer> {
        match self {
            Value::ArrayBuffer(buf) => Some(buf),
            _ => None,
        }
    }

    pub fn as_sharedarraybuffer(&self) -> Option<&SharedArrayBuffer> {
        match self {
            Value::SharedArrayBuffer(buf) => Some(buf),
            _ => None,
        }
    }

    pub fn as_external(&self) -> Option<&External> {
        match self {
            Value::External(ext) => Some(ext),
            _ => None,
        }
    }
}

impl From<ArrayBuffer> for Value {
    fn from(value: ArrayBuffer) -> Self {
        Value::ArrayBuffer(value)
    }
}

impl From<SharedArrayBuffer> for Value {
    fn from(value: SharedArrayBuffer) -> Self {
        Value::SharedArrayBuffer(value)
    }
}

impl From<External> for Value {
    fn from(value: External) -> Self {
        Value::External(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Rc::from(value))
    }
}

/// An exclusively owned, transferable buffer view.
///
/// Cloning the view clones the handle, not the bytes: clones share
/// attachment state, so detaching one detaches all of them.
#[derive(Clone)]
pub struct ArrayBuffer {
    inner: Rc<ArrayBufferInner>,
}

struct ArrayBufferInner {
    context: u64,
    store: RefCell<Option<Arc<BackingStore>>>,
}

impl ArrayBuffer {
    pub(crate) fn new(context: u64, store: Arc<BackingStore>) -> Self {
        Self {
            inner: Rc::new(ArrayBufferInner {
                context,
                store: RefCell::new(Some(store)),
            }),
        }
    }

    pub fn context_id(&self) -> u64 {
        self.inner.context
    }

    /// Current length; zero once detached.
    pub fn byte_length(&self) -> usize {
        self.store().map_or(0, |store| store.byte_length())
    }

    pub fn max_byte_length(&self) -> Option<usize> {
        self.store().and_then(|store| store.max_byte_length())
    }

    pub fn is_resizable(&self) -> bool {
        self.max_byte_length().is_some()
    }

    pub fn is_detached(&self) -> bool {
        self.inner.store.borrow().is_none()
    }

    /// Address of the backing bytes, or `None` once detached.
    pub fn data_ptr(&self) -> Option<*const u8> {
        self.store().map(|store| store.data_ptr())
    }

    /// Copy of the current contents. A detached buffer reads as empty.
    pub fn to_vec(&self) -> Vec<u8> {
        self.store().map(|store| store.to_vec()).unwrap_or_default()
    }

    pub fn read(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.attached()?.read(offset, dst)
    }

    pub fn write(&self, offset: usize, src: &[u8]) -> Result<()> {
        self.attached()?.write(offset, src)
    }

    pub fn resize(&self, new_length: usize) -> Result<()> {
        self.attached()?.resize(new_length)
    }

    /// Identity comparison: true when both handles name the same view.
    pub fn ptr_eq(&self, other: &ArrayBuffer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn store(&self) -> Option<Arc<BackingStore>> {
        self.inner.store.borrow().clone()
    }

    pub(crate) fn take_store(&self) -> Option<Arc<BackingStore>> {
        self.inner.store.borrow_mut().take()
    }

    fn attached(&self) -> Result<Arc<BackingStore>> {
        self.store().ok_or(HostError::Detached)
    }
}

impl fmt::Debug for ArrayBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayBuffer")
            .field("context", &self.inner.context)
            .field("byte_length", &self.byte_length())
            .field("detached", &self.is_detached())
            .finish()
    }
}

/// A buffer view whose backing store may be shared with other contexts.
#[derive(Clone)]
pub struct SharedArrayBuffer {
    inner: Rc<SharedArrayBufferInner>,
}

struct SharedArrayBufferInner {
    context: u64,
    store: Arc<BackingStore>,
}

impl SharedArrayBuffer {
    pub(crate) fn new(context: u64, store: Arc<BackingStore>) -> Self {
        Self {
            inner: Rc::new(SharedArrayBufferInner { context, store }),
        }
    }

    pub fn context_id(&self) -> u64 {
        self.inner.context
    }

    pub fn byte_length(&self) -> usize {
        self.inner.store.byte_length()
    }

    pub fn max_byte_length(&self) -> Option<usize> {
        self.inner.store.max_byte_length()
    }

    pub fn is_growable(&self) -> bool {
        self.max_byte_length().is_some()
    }

    pub fn data_ptr(&self) -> *const u8 {
        self.inner.store.data_ptr()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.inner.store.to_vec()
    }

    pub fn read(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.inner.store.read(offset, dst)
    }

    pub fn write(&self, offset: usize, src: &[u8]) -> Result<()> {
        self.inner.store.write(offset, src)
    }

    pub fn grow(&self, new_length: usize) -> Result<()> {
        self.inner.store.resize(new_length)
    }

    /// True when both views observe the same backing store, even across
    /// contexts.
    pub fn same_store(&self, other: &SharedArrayBuffer) -> bool {
        Arc::ptr_eq(&self.inner.store, &other.inner.store)
    }

    pub fn ptr_eq(&self, other: &SharedArrayBuffer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn store(&self) -> Arc<BackingStore> {
        Arc::clone(&self.inner.store)
    }
}

impl fmt::Debug for SharedArrayBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedArrayBuffer")
            .field("context", &self.inner.context)
            .field("store", &self.inner.store.id())
            .field("byte_length", &self.byte_length())
            .finish()
    }
}

type Finalizer = Box<dyn FnOnce(usize)>;

/// An opaque native pointer. The host never dereferences it.
#[derive(Clone)]
pub struct External {
    inner: Rc<ExternalInner>,
}

struct ExternalInner {
    context: u64,
    data: usize,
    finalizer: Option<Finalizer>,
}

impl Drop for ExternalInner {
    fn drop(&mut self) {
        if let Some(finalize) = self.finalizer.take() {
            finalize(self.data);
        }
    }
}

impl External {
    pub(crate) fn new(context: u64, data: usize, finalizer: Option<Finalizer>) -> Self {
        Self {
            inner: Rc::new(ExternalInner {
                context,
                data,
                finalizer,
            }),
        }
    }

    pub fn context_id(&self) -> u64 {
        self.inner.context
    }

    /// The wrapped pointer value.
    pub fn data(&self) -> usize {
        self.inner.data
    }

    pub fn has_finalizer(&self) -> bool {
        self.inner.finalizer.is_some()
    }

    pub fn ptr_eq(&self, other: &External) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for External {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("External")
            .field("context", &self.inner.context)
            .field("data", &format_args!("{:#x}", self.inner.data))
            .field("finalizer", &self.has_finalizer())
            .finish()
    }
}
