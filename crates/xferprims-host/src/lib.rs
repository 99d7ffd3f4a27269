//! Embedding-API capability for zero-copy buffer transfer.
//!
//! The transfer primitives never reach into a script engine directly. They
//! talk to an [`Env`], a narrow capability exposing backing-store
//! retain/create/release, detach, and external-pointer operations.
//!
//! This crate also ships a reference in-process host:
//! - [`Host`] owns the process-wide registry of outstanding backing-store
//!   references
//! - [`Context`] is one execution context bound to a host, and implements [`Env`]
//! - [`Value`], [`ArrayBuffer`], [`SharedArrayBuffer`] and [`External`] model
//!   the values a context hands out
//!
//! This is the lowest layer of xferprims. Everything else builds on top of
//! the [`Env`] trait provided here.

pub mod config;
pub mod env;
pub mod error;
pub mod host;
pub mod store;
pub mod value;

pub use config::{HostConfig, DEFAULT_MAX_BYTE_LENGTH, DEFAULT_MAX_OUTSTANDING_HANDLES};
pub use env::{BackingStoreRef, Env};
pub use error::{HostError, Result};
pub use host::{Context, Host};
pub use store::BackingStore;
pub use value::{ArrayBuffer, External, SharedArrayBuffer, Value, ValueKind};
