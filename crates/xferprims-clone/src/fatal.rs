use xferprims_host::HostError;

/// Unwrap a host call that cannot fail under correct usage.
///
/// A failure means the trusted caller broke the contract; it is logged and
/// turned into a panic.
#[track_caller]
pub(crate) fn check<T>(operation: &'static str, result: Result<T, HostError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(operation, error = %err, "host call failed");
            panic!("{operation} failed: {err}");
        }
    }
}

/// Abort on a contract violation detected by the primitives themselves.
#[track_caller]
pub(crate) fn violation(message: String) -> ! {
    tracing::error!(%message, "contract violation");
    panic!("{message}");
}
