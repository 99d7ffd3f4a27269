use xferprims_handle::HandleBlob;
use xferprims_host::{Env, External, Value};

use crate::fatal;

/// Encode the pointer wrapped by an external as a handle blob.
///
/// No reference is taken: the pointer's lifetime stays with whoever created
/// it.
///
/// # Panics
/// If `value` is not an external of the calling context.
#[track_caller]
pub fn get_external<E: Env + ?Sized>(env: &E, value: &Value) -> HandleBlob {
    let data = fatal::check("get_value_external", env.get_value_external(value));
    tracing::debug!(pointer = data, "extracted external pointer");
    HandleBlob::from_value(data as u64)
}

/// Wrap the pointer carried by a blob in a new external with no finalizer.
///
/// # Panics
/// If the value does not fit in a pointer on this target.
#[track_caller]
pub fn create_external<E: Env + ?Sized>(env: &E, pointer: &HandleBlob) -> External {
    let data = usize::try_from(pointer.value()).unwrap_or_else(|_| {
        fatal::violation(format!(
            "external pointer {:#x} does not fit in usize",
            pointer.value()
        ))
    });
    let external = fatal::check("create_external", env.create_external(data));
    tracing::debug!(pointer = data, "reconstructed external");
    external
}

/// Whether `value` is an external, as opposed to a buffer or a primitive.
pub fn is_external<E: Env + ?Sized>(env: &E, value: &Value) -> bool {
    env.is_external(value)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use xferprims_host::{Host, HostConfig};

    use super::*;

    #[test]
    fn pointer_survives_wrap_and_unwrap() {
        let host = Host::new(HostConfig::default());
        let a = host.context();
        let b = host.context();

        let finalized = Rc::new(Cell::new(false));
        let flag = Rc::clone(&finalized);
        let original = a.create_external_with_finalizer(0xdead_beef, move |_| flag.set(true));

        let blob = get_external(&a, &original.clone().into());
        assert_eq!(blob.value(), 0xdead_beef);

        let unwrapped = create_external(&b, &blob);
        assert_eq!(unwrapped.data(), original.data());
        assert_eq!(unwrapped.context_id(), b.id());
        assert!(!unwrapped.has_finalizer());

        drop(unwrapped);
        assert!(!finalized.get(), "the copy never finalizes the pointer");
        drop(original);
        assert!(finalized.get());
        assert_eq!(host.outstanding(), 0, "externals take no references");
    }

    #[test]
    fn type_check() {
        let cx = Host::new(HostConfig::default()).context();
        let external: Value = cx.create_external(1).unwrap().into();
        let buffer: Value = cx.create_arraybuffer(8).unwrap().into();
        let shared: Value = cx.create_sharedarraybuffer(8).unwrap().into();

        assert!(is_external(&cx, &external));
        assert!(!is_external(&cx, &buffer));
        assert!(!is_external(&cx, &shared));
        assert!(!is_external(&cx, &Value::Number(1.0)));
        assert!(!is_external(&cx, &Value::from("external")));
        assert!(!is_external(&cx, &Value::Undefined));
    }

    #[test]
    #[should_panic(expected = "get_value_external failed")]
    fn extracting_from_non_external_is_fatal() {
        let cx = Host::new(HostConfig::default()).context();
        get_external(&cx, &Value::Null);
    }
}
