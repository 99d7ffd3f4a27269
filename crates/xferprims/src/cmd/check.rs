use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use xferprims_clone::{
    create_arraybuffer, create_external, create_sharedarraybuffer, deserialize_transfers,
    detach_arraybuffer, exports, get_arraybuffer_backing_store, get_external,
    get_sharedarraybuffer_backing_store, is_external, serialize_transfers, BufferKind, CloneError,
    DataCloneCode, HandleBlob,
};
use xferprims_host::{Context, Env, Host, HostConfig, HostError, Value};

use crate::cmd::CheckArgs;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, print_rows, OutputFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    schema_id: &'static str,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

type Outcome = Result<String, String>;

pub fn run(_args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    // Expected panics are reported as check results, not on stderr.
    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let checks = all_checks();
    panic::set_hook(hook);

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let report = CheckReport {
        schema_id: "https://schemas.3leaps.dev/xferprims/cli/v1/check-report.schema.json",
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };
    print_report(&report, format);

    if has_fail {
        Ok(FAILURE)
    } else {
        Ok(SUCCESS)
    }
}

fn all_checks() -> Vec<CheckResult> {
    vec![
        run_check("round_trip_identity", round_trip_identity),
        run_check("single_owner", single_owner),
        run_check("shared_aliasing", shared_aliasing),
        run_check("double_consumption", double_consumption),
        run_check("unset_handle", unset_handle),
        run_check("external_opacity", external_opacity),
        run_check("exactly_once_release", exactly_once_release),
        run_check("transfer_list_validation", transfer_list_validation),
    ]
}

/// Run one check against a fresh host; a panic counts as a failure.
fn run_check(name: &'static str, check: impl FnOnce(&Arc<Host>) -> Outcome) -> CheckResult {
    let host = Host::new(HostConfig::default());
    let (status, detail) = match panic::catch_unwind(AssertUnwindSafe(|| check(&host))) {
        Ok(Ok(detail)) => (CheckStatus::Pass, detail),
        Ok(Err(detail)) => (CheckStatus::Fail, detail),
        Err(payload) => (
            CheckStatus::Fail,
            format!("panicked: {}", panic_message(payload.as_ref())),
        ),
    };
    tracing::debug!(check = name, ?status, "check finished");
    CheckResult {
        name,
        status,
        detail,
    }
}

fn round_trip_identity(host: &Arc<Host>) -> Outcome {
    let (a, b) = (host.context(), host.context());
    let pattern: Vec<u8> = (0..16).collect();
    let buf = a.create_arraybuffer(pattern.len()).map_err(failed)?;
    buf.write(0, &pattern).map_err(failed)?;
    let source_ptr = buf.data_ptr();

    let value = Value::from(buf);
    let handle = get_arraybuffer_backing_store(&a, &value);
    detach_arraybuffer(&a, &value);
    let moved = create_arraybuffer(&b, &handle).map_err(failed)?;

    ensure(moved.byte_length() == pattern.len(), "byte length changed")?;
    ensure(moved.to_vec() == pattern, "contents changed")?;
    ensure(moved.data_ptr() == source_ptr, "bytes were copied")?;
    Ok(format!("{} bytes moved without copying", pattern.len()))
}

fn single_owner(host: &Arc<Host>) -> Outcome {
    let (a, b) = (host.context(), host.context());
    let buf = a.create_arraybuffer(8).map_err(failed)?;
    let value = Value::from(buf.clone());

    let handle = get_arraybuffer_backing_store(&a, &value);
    detach_arraybuffer(&a, &value);
    let _moved = create_arraybuffer(&b, &handle).map_err(failed)?;

    ensure(buf.is_detached(), "source still attached")?;
    ensure(buf.byte_length() == 0, "source still reports bytes")?;
    ensure(
        matches!(buf.write(0, &[1]), Err(HostError::Detached)),
        "source still writable",
    )?;
    Ok("source detached to length 0".to_string())
}

fn shared_aliasing(host: &Arc<Host>) -> Outcome {
    let (a, b, c) = (host.context(), host.context(), host.context());
    let shared = Value::from(a.create_sharedarraybuffer(8).map_err(failed)?);

    let first = get_sharedarraybuffer_backing_store(&a, &shared);
    let second = get_sharedarraybuffer_backing_store(&a, &shared);
    let in_b = create_sharedarraybuffer(&b, &first).map_err(failed)?;
    let in_c = create_sharedarraybuffer(&c, &second).map_err(failed)?;

    in_b.write(0, b"aliased!").map_err(failed)?;
    ensure(in_c.to_vec() == b"aliased!", "write not visible in the other view")?;
    ensure(in_b.same_store(&in_c), "views do not share a store")?;
    Ok("two reconstructions observe the same memory".to_string())
}

fn double_consumption(host: &Arc<Host>) -> Outcome {
    let (a, b) = (host.context(), host.context());
    let value = Value::from(a.create_arraybuffer(8).map_err(failed)?);
    let handle = get_arraybuffer_backing_store(&a, &value);
    let _first = create_arraybuffer(&b, &handle).map_err(failed)?;

    match expect_panic(|| create_arraybuffer(&b, &handle)) {
        Some(message) if message.contains("unknown backing store reference") => {
            Ok("second reconstruction is fatal".to_string())
        }
        Some(message) => Err(format!("unexpected failure: {message}")),
        None => Err("second reconstruction succeeded".to_string()),
    }
}

fn unset_handle(host: &Arc<Host>) -> Outcome {
    let cx = host.context();
    ensure(
        create_arraybuffer(&cx, &HandleBlob::NULL).err()
            == Some(CloneError::BackingStoreUnset(BufferKind::ArrayBuffer)),
        "createArrayBuffer accepted an unset handle",
    )?;
    ensure(
        create_sharedarraybuffer(&cx, &HandleBlob::NULL).err()
            == Some(CloneError::BackingStoreUnset(BufferKind::SharedArrayBuffer)),
        "createSharedArrayBuffer accepted an unset handle",
    )?;

    // Same through the entry-point table, with a zero-filled 8-byte blob.
    let blob = Value::from(cx.create_arraybuffer(8).map_err(failed)?);
    let err = exports::<Context>()
        .call("createArrayBuffer", &cx, &[blob])
        .err()
        .ok_or("createArrayBuffer entry point accepted an unset handle")?;
    Ok(err.to_string())
}

fn external_opacity(host: &Arc<Host>) -> Outcome {
    let (a, b) = (host.context(), host.context());
    let pointer = 0x1000_usize;
    let external = Value::from(a.create_external(pointer).map_err(failed)?);

    let blob = get_external(&a, &external);
    let unwrapped = create_external(&b, &blob);
    ensure(unwrapped.data() == pointer, "pointer changed")?;
    ensure(is_external(&a, &external), "external not recognized")?;

    let buffer = Value::from(a.create_arraybuffer(8).map_err(failed)?);
    ensure(!is_external(&a, &buffer), "buffer reported as external")?;
    ensure(!is_external(&a, &Value::Number(1.0)), "number reported as external")?;
    Ok(format!("pointer {pointer:#x} preserved"))
}

fn exactly_once_release(host: &Arc<Host>) -> Outcome {
    let (a, b) = (host.context(), host.context());
    let list = (1..=3)
        .map(|len| a.create_arraybuffer(len).map(Value::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(failed)?;

    let transfers = serialize_transfers(&a, &list).map_err(failed)?;
    ensure(host.outstanding() == 3, "handles not taken")?;
    let buffers = deserialize_transfers(&b, &transfers).map_err(failed)?;
    ensure(buffers.len() == 3, "buffers lost")?;
    ensure(host.outstanding() == 0, "handles not released")?;
    Ok("3 handles taken and released".to_string())
}

fn transfer_list_validation(host: &Arc<Host>) -> Outcome {
    let cx = host.context();
    let buf = cx.create_arraybuffer(4).map_err(failed)?;
    let value = Value::from(buf.clone());

    let duplicate = serialize_transfers(&cx, &[value.clone(), value.clone()]);
    ensure(
        code(duplicate.err()) == Some(DataCloneCode::AlreadyTransferred),
        "duplicate entry accepted",
    )?;
    ensure(!buf.is_detached(), "rejected list detached a buffer")?;

    detach_arraybuffer(&cx, &value);
    let detached = serialize_transfers(&cx, &[value]);
    ensure(
        code(detached.err()) == Some(DataCloneCode::UntransferableType),
        "detached entry accepted",
    )?;
    Ok("duplicate and detached entries rejected".to_string())
}

fn code(err: Option<CloneError>) -> Option<DataCloneCode> {
    match err {
        Some(CloneError::DataClone(err)) => Some(err.code),
        _ => None,
    }
}

fn ensure(condition: bool, message: &str) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

fn failed(err: impl Display) -> String {
    err.to_string()
}

fn expect_panic<T>(f: impl FnOnce() -> T) -> Option<String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => None,
        Err(payload) => Some(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    }
}

fn print_report(report: &CheckReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let rows = report
                .checks
                .iter()
                .map(|c| {
                    vec![
                        c.name.to_string(),
                        status_text(c.status).to_string(),
                        c.detail.clone(),
                    ]
                })
                .collect();
            print_rows(&["CHECK", "STATUS", "DETAIL"], rows);
            print_summary(report);
        }
        OutputFormat::Pretty => {
            println!("xferprims check\n");
            for c in &report.checks {
                println!("  [{:>4}] {:<26} {}", status_text(c.status), c.name, c.detail);
            }
            println!();
            print_summary(report);
        }
    }
}

fn print_summary(report: &CheckReport) {
    if report.overall == "pass" {
        println!("  Result: all checks passed");
    } else {
        println!("  Result: one or more checks failed");
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
    }
}
