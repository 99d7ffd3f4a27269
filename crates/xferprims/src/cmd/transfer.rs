use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use bytes::{Bytes, BytesMut};
use serde::Serialize;
use xferprims_clone::{
    create_arraybuffer, create_sharedarraybuffer, detach_arraybuffer,
    get_arraybuffer_backing_store, get_sharedarraybuffer_backing_store,
};
use xferprims_handle::{decode_handle, encode_handle, kind_name, TransferHandle};
use xferprims_host::{Context, Env, Host, HostConfig, Value};

use crate::cmd::TransferArgs;
use crate::exit::{
    clone_error, host_error, CliError, CliResult, DATA_INVALID, FAILURE, INTERNAL, SUCCESS,
};
use crate::output::{print_fields, print_json, OutputFormat};

/// What travels from the main context to the worker.
struct Message {
    shared: bool,
    handle: Bytes,
}

struct Sent {
    kind: &'static str,
    data_ptr: usize,
    wire: Bytes,
    source_detached: bool,
    source_byte_length: usize,
}

struct Arrived {
    contents: Vec<u8>,
    data_ptr: usize,
    byte_length: usize,
    max_byte_length: Option<usize>,
}

#[derive(Debug, Serialize)]
struct TransferReport {
    schema_id: &'static str,
    kind: &'static str,
    handle: String,
    byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_byte_length: Option<usize>,
    contents_match: bool,
    zero_copy: bool,
    source_detached: bool,
    source_byte_length: usize,
    outstanding_handles: usize,
}

pub fn run(args: TransferArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = HostConfig::default();
    if let Some(limit) = args.limit {
        config.max_byte_length = limit;
    }
    let host = Host::new(config);
    let main = host.context();
    let worker = host.context();

    let pattern: Vec<u8> = (0..args.size).map(|i| i as u8).collect();
    let (tx, rx) = mpsc::channel();

    let worker_thread = thread::Builder::new()
        .name("worker".to_string())
        .spawn(move || receive(&worker, rx))
        .map_err(|err| CliError::new(INTERNAL, format!("spawn worker: {err}")))?;

    let sent = if args.shared {
        send_shared(&main, &args, &pattern, &tx)?
    } else {
        send_arraybuffer(&main, &args, &pattern, &tx)?
    };

    let arrived = worker_thread
        .join()
        .map_err(|_| CliError::new(INTERNAL, "worker thread panicked"))??;

    let report = TransferReport {
        schema_id: "https://schemas.3leaps.dev/xferprims/cli/v1/transfer-report.schema.json",
        kind: sent.kind,
        handle: hex(&sent.wire),
        byte_length: arrived.byte_length,
        max_byte_length: arrived.max_byte_length,
        contents_match: arrived.contents == pattern,
        zero_copy: arrived.data_ptr == sent.data_ptr,
        source_detached: sent.source_detached,
        source_byte_length: sent.source_byte_length,
        outstanding_handles: host.outstanding(),
    };
    print_report(&report, format);

    if report.contents_match && report.zero_copy && report.outstanding_handles == 0 {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

fn send_arraybuffer(
    main: &Context,
    args: &TransferArgs,
    pattern: &[u8],
    tx: &Sender<Message>,
) -> CliResult<Sent> {
    let buf = match args.max_byte_length {
        Some(max) => main.create_resizable_arraybuffer(args.size, max),
        None => main.create_arraybuffer(args.size),
    }
    .map_err(|err| host_error("allocate", err))?;
    buf.write(0, pattern).map_err(|err| host_error("fill", err))?;
    let data_ptr = buf.data_ptr().map_or(0, |ptr| ptr as usize);

    let value = Value::from(buf.clone());
    let handle = get_arraybuffer_backing_store(main, &value);
    detach_arraybuffer(main, &value);
    tracing::info!(handle = handle.value(), byte_length = args.size, "ArrayBuffer handed off");

    let wire = encode(TransferHandle::Buffer(handle.value()));
    post(tx, false, wire.clone())?;

    Ok(Sent {
        kind: "ArrayBuffer",
        data_ptr,
        wire,
        source_detached: buf.is_detached(),
        source_byte_length: buf.byte_length(),
    })
}

fn send_shared(
    main: &Context,
    args: &TransferArgs,
    pattern: &[u8],
    tx: &Sender<Message>,
) -> CliResult<Sent> {
    let buf = match args.max_byte_length {
        Some(max) => main.create_growable_sharedarraybuffer(args.size, max),
        None => main.create_sharedarraybuffer(args.size),
    }
    .map_err(|err| host_error("allocate", err))?;
    buf.write(0, pattern).map_err(|err| host_error("fill", err))?;

    let handle = get_sharedarraybuffer_backing_store(main, &Value::from(buf.clone()));
    tracing::info!(handle = handle.value(), byte_length = args.size, "SharedArrayBuffer shared");

    let wire = encode(TransferHandle::Buffer(handle.value()));
    post(tx, true, wire.clone())?;

    Ok(Sent {
        kind: "SharedArrayBuffer",
        data_ptr: buf.data_ptr() as usize,
        wire,
        source_detached: false,
        source_byte_length: buf.byte_length(),
    })
}

fn receive(worker: &Context, rx: Receiver<Message>) -> CliResult<Arrived> {
    let message = rx
        .recv()
        .map_err(|_| CliError::new(FAILURE, "worker: channel closed before a handle arrived"))?;

    let mut src = BytesMut::from(&message.handle[..]);
    let handle = decode_handle(&mut src)
        .map_err(|err| CliError::new(DATA_INVALID, format!("worker: {err}")))?
        .ok_or_else(|| CliError::new(DATA_INVALID, "worker: truncated handle"))?;
    if !matches!(handle, TransferHandle::Buffer(_)) {
        return Err(CliError::new(
            DATA_INVALID,
            format!("worker: expected a BUFFER handle, got {}", kind_name(handle.kind())),
        ));
    }

    let arrived = if message.shared {
        let view = create_sharedarraybuffer(worker, &handle.blob())
            .map_err(|err| clone_error("worker", err))?;
        Arrived {
            contents: view.to_vec(),
            data_ptr: view.data_ptr() as usize,
            byte_length: view.byte_length(),
            max_byte_length: view.max_byte_length(),
        }
    } else {
        let view =
            create_arraybuffer(worker, &handle.blob()).map_err(|err| clone_error("worker", err))?;
        Arrived {
            contents: view.to_vec(),
            data_ptr: view.data_ptr().map_or(0, |ptr| ptr as usize),
            byte_length: view.byte_length(),
            max_byte_length: view.max_byte_length(),
        }
    };

    tracing::info!(
        handle = handle.value(),
        byte_length = arrived.byte_length,
        "worker reconstructed buffer"
    );
    Ok(arrived)
}

fn encode(handle: TransferHandle) -> Bytes {
    let mut dst = BytesMut::new();
    encode_handle(&handle, &mut dst);
    dst.freeze()
}

fn post(tx: &Sender<Message>, shared: bool, handle: Bytes) -> CliResult<()> {
    tx.send(Message { shared, handle })
        .map_err(|_| CliError::new(FAILURE, "worker exited before receiving the handle"))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn print_report(report: &TransferReport, format: OutputFormat) {
    if let OutputFormat::Json = format {
        print_json(report);
        return;
    }

    let max_byte_length = report
        .max_byte_length
        .map_or_else(|| "-".to_string(), |max| max.to_string());
    print_fields(
        &[
            ("kind", report.kind.to_string()),
            ("handle", report.handle.clone()),
            ("byte_length", report.byte_length.to_string()),
            ("max_byte_length", max_byte_length),
            ("contents_match", report.contents_match.to_string()),
            ("zero_copy", report.zero_copy.to_string()),
            ("source_detached", report.source_detached.to_string()),
            ("source_byte_length", report.source_byte_length.to_string()),
            ("outstanding_handles", report.outstanding_handles.to_string()),
        ],
        format,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_renders_wire_bytes() {
        let wire = encode(TransferHandle::Buffer(1));
        assert_eq!(hex(&wire), "010100000000000000");
    }

    #[test]
    fn arraybuffer_transfer_detaches_source() {
        let args = TransferArgs {
            size: 32,
            shared: false,
            max_byte_length: None,
            limit: None,
        };
        let host = Host::new(HostConfig::default());
        let main = host.context();
        let worker = host.context();
        let pattern: Vec<u8> = (0..32).collect();
        let (tx, rx) = mpsc::channel();

        let sent = send_arraybuffer(&main, &args, &pattern, &tx).unwrap();
        let arrived = receive(&worker, rx).unwrap();

        assert!(sent.source_detached);
        assert_eq!(sent.source_byte_length, 0);
        assert_eq!(arrived.contents, pattern);
        assert_eq!(arrived.data_ptr, sent.data_ptr);
        assert_eq!(host.outstanding(), 0);
    }

    #[test]
    fn shared_transfer_keeps_source_attached() {
        let args = TransferArgs {
            size: 8,
            shared: true,
            max_byte_length: Some(16),
            limit: None,
        };
        let host = Host::new(HostConfig::default());
        let main = host.context();
        let worker = host.context();
        let pattern: Vec<u8> = (0..8).collect();
        let (tx, rx) = mpsc::channel();

        let sent = send_shared(&main, &args, &pattern, &tx).unwrap();
        let arrived = receive(&worker, rx).unwrap();

        assert!(!sent.source_detached);
        assert_eq!(sent.source_byte_length, 8);
        assert_eq!(arrived.max_byte_length, Some(16));
        assert_eq!(arrived.data_ptr, sent.data_ptr);
    }

    #[test]
    fn oversized_request_is_a_usage_error() {
        let args = TransferArgs {
            size: 64,
            shared: false,
            max_byte_length: None,
            limit: None,
        };
        let host = Host::new(HostConfig {
            max_byte_length: 16,
            ..HostConfig::default()
        });
        let main = host.context();
        let (tx, _rx) = mpsc::channel();

        let err = send_arraybuffer(&main, &args, &[], &tx).err().unwrap();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
