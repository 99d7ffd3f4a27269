/// Default maximum byte length of a single backing store: 1 GiB.
pub const DEFAULT_MAX_BYTE_LENGTH: usize = 1024 * 1024 * 1024;

/// Default maximum number of handles extracted but not yet consumed.
pub const DEFAULT_MAX_OUTSTANDING_HANDLES: usize = 64 * 1024;

/// Limits applied by the reference host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    /// Largest byte length (or maximum byte length for resizable buffers)
    /// a context may allocate.
    pub max_byte_length: usize,
    /// Upper bound on bookkeeping references held by the host registry.
    /// Reaching it usually means handles are extracted and never consumed.
    pub max_outstanding_handles: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_byte_length: DEFAULT_MAX_BYTE_LENGTH,
            max_outstanding_handles: DEFAULT_MAX_OUTSTANDING_HANDLES,
        }
    }
}
