//! Handles carried between contexts on different threads.
//!
//! Each worker owns its own `Context`; only handle bytes cross the channel.

use std::sync::mpsc;
use std::thread;

use xferprims_clone::{
    create_arraybuffer, create_sharedarraybuffer, deserialize_transfers, detach_arraybuffer,
    get_arraybuffer_backing_store, get_sharedarraybuffer_backing_store, serialize_transfers,
    HandleBlob, Transfer,
};
use xferprims_host::{Env, Host, HostConfig, Value};

#[test]
fn arraybuffer_moves_to_worker_without_copying() {
    let host = Host::new(HostConfig::default());
    let main = host.context();
    let worker = host.context();

    let buf = main.create_arraybuffer(16).unwrap();
    buf.write(0, b"sixteen bytes!!!").unwrap();
    let source_ptr = buf.data_ptr().unwrap() as usize;

    let value: Value = buf.clone().into();
    let handle = get_arraybuffer_backing_store(&main, &value);
    detach_arraybuffer(&main, &value);
    assert!(buf.is_detached());
    assert_eq!(buf.byte_length(), 0);

    let (tx, rx) = mpsc::channel::<[u8; 8]>();
    let join = thread::spawn(move || {
        let bytes = rx.recv().unwrap();
        let buf = create_arraybuffer(&worker, &HandleBlob::from_bytes(bytes)).unwrap();
        (buf.to_vec(), buf.data_ptr().unwrap() as usize)
    });

    tx.send(*handle.as_bytes()).unwrap();
    let (contents, worker_ptr) = join.join().unwrap();

    assert_eq!(contents, b"sixteen bytes!!!");
    assert_eq!(worker_ptr, source_ptr, "worker view aliases the original memory");
    assert_eq!(host.outstanding(), 0);
}

#[test]
fn shared_buffer_is_observed_from_both_threads() {
    let host = Host::new(HostConfig::default());
    let main = host.context();
    let worker = host.context();

    let shared = main.create_sharedarraybuffer(4).unwrap();
    let handle = get_sharedarraybuffer_backing_store(&main, &shared.clone().into());

    let (to_worker, worker_rx) = mpsc::channel::<[u8; 8]>();
    let (to_main, main_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let join = thread::spawn(move || {
        let bytes = worker_rx.recv().unwrap();
        let view = create_sharedarraybuffer(&worker, &HandleBlob::from_bytes(bytes)).unwrap();
        view.write(0, &[1, 2, 3, 4]).unwrap();
        to_main.send(()).unwrap();

        done_rx.recv().unwrap();
        view.to_vec()
    });

    to_worker.send(*handle.as_bytes()).unwrap();
    main_rx.recv().unwrap();
    assert_eq!(shared.to_vec(), [1, 2, 3, 4], "worker write is visible");

    shared.write(0, &[9]).unwrap();
    done_tx.send(()).unwrap();
    assert_eq!(join.join().unwrap(), [9, 2, 3, 4], "main write is visible");
    assert_eq!(host.outstanding(), 0);
}

#[test]
fn transfer_list_round_trips_through_json() {
    let host = Host::new(HostConfig::default());
    let main = host.context();
    let worker = host.context();

    let fixed = main.create_arraybuffer(3).unwrap();
    fixed.write(0, b"abc").unwrap();
    let resizable = main.create_resizable_arraybuffer(1, 32).unwrap();
    resizable.write(0, b"z").unwrap();

    let list: Vec<Value> = vec![fixed.clone().into(), resizable.clone().into()];
    let transfers = serialize_transfers(&main, &list).unwrap();
    let message = serde_json::to_string(&transfers).unwrap();

    let join = thread::spawn(move || {
        let transfers: Vec<Transfer> = serde_json::from_str(&message).unwrap();
        let buffers = deserialize_transfers(&worker, &transfers).unwrap();
        buffers[1].1.resize(32).unwrap();
        buffers
            .iter()
            .map(|(id, buf)| (*id, buf.to_vec()))
            .collect::<Vec<_>>()
    });

    let received = join.join().unwrap();
    assert!(fixed.is_detached());
    assert!(resizable.is_detached());
    assert_eq!(received[0], (1, b"abc".to_vec()));
    assert_eq!(received[1].0, 2);
    assert_eq!(received[1].1.len(), 32);
    assert_eq!(received[1].1[0], b'z');
    assert_eq!(host.outstanding(), 0);
}

#[test]
fn store_is_freed_after_last_view_drops() {
    let host = Host::new(HostConfig::default());
    let main = host.context();
    let worker = host.context();

    let value: Value = main.create_arraybuffer(8).unwrap().into();
    let handle = get_arraybuffer_backing_store(&main, &value);
    detach_arraybuffer(&main, &value);
    drop(value);
    assert_eq!(host.outstanding(), 1, "handle keeps the store alive");

    let join = thread::spawn(move || {
        let buf = create_arraybuffer(&worker, &handle).unwrap();
        buf.byte_length()
    });
    assert_eq!(join.join().unwrap(), 8);
    assert_eq!(host.outstanding(), 0);
}
