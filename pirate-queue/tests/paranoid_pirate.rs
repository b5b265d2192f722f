//! End-to-end tests driving a real broker over loopback TCP.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use flume::bounded;

use monocoque::zmq::DealerSocket;
use pirate_queue::client::UNBOUNDED_RETRIES;
use pirate_queue::{ClientEndpoint, ClientOutcome, RetryPolicy};

fn addr_pair() -> (String, String) {
    let frontend = portpicker::pick_unused_port().expect("no ports available");
    let backend = portpicker::pick_unused_port().expect("no ports available");
    (
        format!("127.0.0.1:{frontend}"),
        format!("127.0.0.1:{backend}"),
    )
}

#[compio::test]
async fn happy_path_request_is_echoed_through_a_worker() {
    let (frontend_addr, backend_addr) = addr_pair();

    let broker_frontend = frontend_addr.clone();
    let broker_backend = backend_addr.clone();
    compio::runtime::spawn(async move {
        let _ = pirate_queue::broker::run(&broker_frontend, &broker_backend).await;
    })
    .detach();

    compio::time::sleep(Duration::from_millis(100)).await;

    let worker_backend = backend_addr.clone();
    compio::runtime::spawn(async move {
        pirate_queue::worker::run(&worker_backend, |req: Bytes| {
            Some(Bytes::from(format!("echo:{}", String::from_utf8_lossy(&req))))
        })
        .await
    })
    .detach();

    compio::time::sleep(Duration::from_millis(200)).await;

    let endpoint = ClientEndpoint::new(frontend_addr, RetryPolicy::default());
    let (tx, rx) = bounded(1);
    endpoint.submit(Bytes::from_static(b"hi"), 0, move |outcome| {
        let _ = tx.send(outcome);
    });

    let outcome = rx.recv_async().await.expect("callback should fire");
    match outcome {
        ClientOutcome::Reply(payload) => assert_eq!(payload, Bytes::from_static(b"echo:hi")),
        other => panic!("expected a reply, got {other:?}"),
    }
}

#[compio::test]
async fn worker_crash_mid_job_triggers_a_ko_driven_resend_to_a_fresh_worker() {
    let (frontend_addr, backend_addr) = addr_pair();

    let broker_frontend = frontend_addr.clone();
    let broker_backend = backend_addr.clone();
    compio::runtime::spawn(async move {
        let _ = pirate_queue::broker::run(&broker_frontend, &broker_backend).await;
    })
    .detach();

    compio::time::sleep(Duration::from_millis(100)).await;

    // A hand-rolled worker that announces itself and then goes silent,
    // simulating a crash: it never answers the request it's given and never
    // heartbeats again, so the broker must purge it on expiry and send the
    // client a KO.
    let flaky_addr = backend_addr.clone();
    compio::runtime::spawn(async move {
        let mut socket = DealerSocket::connect(&flaky_addr)
            .await
            .expect("flaky worker should connect");
        socket
            .send(vec![pirate_queue::protocol::ready_frame()])
            .await
            .expect("READY should send");
        // Receive the dispatched job, then simply stop responding.
        let _ = socket.recv().await;
        compio::time::sleep(Duration::from_secs(10)).await;
    })
    .detach();

    // A healthy second worker, up from the start, sits available the whole
    // time — the first dispatch still goes to the (oldest-ready) flaky one,
    // so this one is free to serve the client's KO-triggered resend.
    let healthy_backend = backend_addr.clone();
    compio::runtime::spawn(async move {
        pirate_queue::worker::run(&healthy_backend, |req: Bytes| {
            Some(Bytes::from(format!("ok:{}", String::from_utf8_lossy(&req))))
        })
        .await
    })
    .detach();

    compio::time::sleep(Duration::from_millis(200)).await;

    let endpoint = ClientEndpoint::new(frontend_addr, RetryPolicy::default());
    let (tx, rx) = bounded(1);
    // retries=2, as in the crash-mid-job scenario: the client has retries to
    // spare, so the KO resends rather than giving up.
    endpoint.submit(Bytes::from_static(b"x"), 2, move |outcome| {
        let _ = tx.send(outcome);
    });

    // Broker heartbeat interval is 1s with liveness 3, so expiry takes ~3s;
    // give it comfortable margin.
    let outcome = compio::time::timeout(Duration::from_secs(6), rx.recv_async())
        .await
        .expect("should resolve before the test timeout")
        .expect("callback should fire");

    match outcome {
        ClientOutcome::Reply(payload) => assert_eq!(payload, Bytes::from_static(b"ok:x")),
        other => panic!("expected the resend to succeed, got {other:?}"),
    }
}

#[compio::test]
async fn zero_retries_gives_up_on_the_first_ko() {
    let (frontend_addr, backend_addr) = addr_pair();

    let broker_frontend = frontend_addr.clone();
    let broker_backend = backend_addr.clone();
    compio::runtime::spawn(async move {
        let _ = pirate_queue::broker::run(&broker_frontend, &broker_backend).await;
    })
    .detach();

    compio::time::sleep(Duration::from_millis(100)).await;

    // A worker whose handler always rejects the job, reporting KO instantly
    // (no need to wait out the heartbeat expiry window for this test).
    compio::runtime::spawn({
        let backend_addr = backend_addr.clone();
        async move {
            pirate_queue::worker::run(&backend_addr, |_req: Bytes| -> Option<Bytes> { None }).await
        }
    })
    .detach();

    compio::time::sleep(Duration::from_millis(200)).await;

    let endpoint = ClientEndpoint::new(frontend_addr, RetryPolicy::default());
    let (tx, rx) = bounded(1);
    endpoint.submit(Bytes::from_static(b"job"), 0, move |outcome| {
        let _ = tx.send(outcome);
    });

    let outcome = compio::time::timeout(Duration::from_secs(3), rx.recv_async())
        .await
        .expect("should resolve before the test timeout")
        .expect("callback should fire");

    assert!(matches!(outcome, ClientOutcome::Ko), "expected a KO, got {outcome:?}");
}

#[compio::test]
async fn unbounded_retries_keeps_resending_after_repeated_ko() {
    let (frontend_addr, backend_addr) = addr_pair();

    let broker_frontend = frontend_addr.clone();
    let broker_backend = backend_addr.clone();
    compio::runtime::spawn(async move {
        let _ = pirate_queue::broker::run(&broker_frontend, &broker_backend).await;
    })
    .detach();

    compio::time::sleep(Duration::from_millis(100)).await;

    // A worker that always rejects the job, counting how many times it's
    // asked — each count is one resend the client made after a KO.
    let attempts = Arc::new(AtomicU32::new(0));
    let worker_attempts = attempts.clone();
    compio::runtime::spawn({
        let backend_addr = backend_addr.clone();
        async move {
            pirate_queue::worker::run(&backend_addr, move |_req: Bytes| -> Option<Bytes> {
                worker_attempts.fetch_add(1, Ordering::Relaxed);
                None
            })
            .await
        }
    })
    .detach();

    compio::time::sleep(Duration::from_millis(200)).await;

    let endpoint = ClientEndpoint::new(frontend_addr, RetryPolicy::default());
    let (tx, _rx) = bounded::<ClientOutcome>(1);

    endpoint.submit(Bytes::from_static(b"job"), UNBOUNDED_RETRIES, move |outcome| {
        let _ = tx.send(outcome);
    });

    // Well past what any bounded retry count (the crate's bin default is 0)
    // would tolerate, the client must still be resending: neither given up
    // (outstanding stays true) nor stalled (the worker keeps getting asked).
    compio::time::sleep(Duration::from_secs(2)).await;
    assert!(
        endpoint.is_outstanding(),
        "unbounded retries must keep resending instead of giving up"
    );
    assert!(
        attempts.load(Ordering::Relaxed) >= 3,
        "expected several resends, got {}",
        attempts.load(Ordering::Relaxed)
    );
}

#[compio::test]
async fn client_refuses_a_second_submit_while_one_is_outstanding() {
    let (frontend_addr, backend_addr) = addr_pair();

    let broker_frontend = frontend_addr.clone();
    let broker_backend = backend_addr.clone();
    compio::runtime::spawn(async move {
        let _ = pirate_queue::broker::run(&broker_frontend, &broker_backend).await;
    })
    .detach();

    compio::time::sleep(Duration::from_millis(100)).await;

    // No worker is started, so the first request sits in the broker's
    // pending queue — it stays outstanding for the duration of this test.
    let endpoint = ClientEndpoint::new(frontend_addr, RetryPolicy::default());
    let (tx, _rx) = bounded(1);
    let first_accepted = endpoint.submit(Bytes::from_static(b"first"), 0, move |outcome| {
        let _ = tx.send(outcome);
    });
    assert!(first_accepted);

    let second_accepted = endpoint.submit(Bytes::from_static(b"second"), 0, |_| {});
    assert!(!second_accepted);
}
