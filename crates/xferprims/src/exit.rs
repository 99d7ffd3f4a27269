use std::fmt;

use xferprims_clone::CloneError;
use xferprims_host::HostError;

// Process exit codes. 64 follows sysexits EX_USAGE.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn host_error(context: &str, err: HostError) -> CliError {
    match err {
        HostError::ByteLengthExceeded { .. }
        | HostError::CannotShrink { .. }
        | HostError::NotResizable => CliError::new(USAGE, format!("{context}: {err}")),
        HostError::OutOfBounds { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn clone_error(context: &str, err: CloneError) -> CliError {
    match err {
        CloneError::BackingStoreUnset(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        CloneError::DataClone(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use xferprims_clone::BufferKind;

    use super::*;

    #[test]
    fn oversized_allocation_is_a_usage_error() {
        let err = host_error(
            "allocate",
            HostError::ByteLengthExceeded {
                requested: 10,
                max: 4,
            },
        );
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("allocate: "));
    }

    #[test]
    fn unset_handle_is_invalid_data() {
        let err = clone_error(
            "reconstruct",
            CloneError::BackingStoreUnset(BufferKind::ArrayBuffer),
        );
        assert_eq!(err.code, DATA_INVALID);
        assert_eq!(
            err.to_string(),
            "reconstruct: ArrayBuffer backing store is unset"
        );
    }
}
