//! Worker endpoint: connects to the broker's backend socket, announces
//! itself, and processes dispatched requests until told otherwise.
//!
//! Grounded on `src/gppworker.c`'s two-phase task model: a handler call
//! returns quickly with whether it accepted the job, and completion — which
//! may happen on a different turn of the event loop entirely — is reported
//! separately through [`TaskHandle`], mirroring `gpp_worker_set_task_done`.
//! Reconnection reuses [`monocoque_core::reconnect::ReconnectState`] rather
//! than re-deriving the same exponential backoff the broker already gets for
//! free from that crate.

use std::time::{Duration, Instant};

use bytes::Bytes;
use flume::{Receiver, Sender};
use futures::{select, FutureExt};
use monocoque_core::options::SocketOptions;
use monocoque_core::reconnect::ReconnectState;
use tracing::{debug, info, trace, warn};

use monocoque::zmq::DealerSocket;

use crate::protocol::{self, HEARTBEAT};

/// Liveness window tracked on the worker's side of the broker link — mirrors
/// the broker's own [`crate::broker::HEARTBEAT_INTERVAL`] /
/// [`crate::broker::HEARTBEAT_LIVENESS`] so both sides expire at the same
/// rate.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
pub const HEARTBEAT_LIVENESS: u32 = 3;

fn expiry_window() -> Duration {
    HEARTBEAT_INTERVAL * HEARTBEAT_LIVENESS
}

/// Outcome of a completed task, reported back through a [`TaskHandle`].
#[derive(Debug)]
enum TaskResult {
    Success { client_id: Bytes, payload: Bytes },
    Failure { client_id: Bytes },
}

/// A handle a [`RequestHandler`] can retain past the `handle()` call and use
/// to report completion once the work is actually done — possibly from a
/// spawned task, possibly much later.
#[derive(Clone)]
pub struct TaskHandle {
    client_id: Bytes,
    done: Sender<TaskResult>,
}

impl TaskHandle {
    /// Report success with the reply payload to send back to the client.
    pub fn complete(self, payload: Bytes) {
        let _ = self.done.send(TaskResult::Success {
            client_id: self.client_id,
            payload,
        });
    }

    /// Report failure; the client will receive a KO.
    pub fn fail(self) {
        let _ = self.done.send(TaskResult::Failure {
            client_id: self.client_id,
        });
    }
}

/// Implemented by application code that processes requests dispatched to
/// this worker.
///
/// `handle` must return quickly: `true` means the handler accepted the job
/// and will eventually call [`TaskHandle::complete`] or [`TaskHandle::fail`]
/// (possibly asynchronously); `false` means the handler rejected the job
/// outright, and the worker reports a KO on the caller's behalf.
pub trait RequestHandler {
    fn handle(&mut self, request: Bytes, task: TaskHandle) -> bool;
}

/// Blanket impl for simple synchronous handlers that compute the reply
/// in-place and never retain the [`TaskHandle`].
impl<F> RequestHandler for F
where
    F: FnMut(Bytes) -> Option<Bytes>,
{
    fn handle(&mut self, request: Bytes, task: TaskHandle) -> bool {
        match self(request) {
            Some(reply) => {
                task.complete(reply);
                true
            }
            None => {
                task.fail();
                true
            }
        }
    }
}

/// Connects to a broker's backend socket and services dispatched requests
/// with a [`RequestHandler`] until the process is stopped.
///
/// Reconnects with exponential backoff (1s, 2s, 4s, ... capped at 32s, per
/// [`ReconnectState`]) whenever the broker link is lost or judged dead by
/// heartbeat expiry, and resets the backoff on every successful reconnect.
pub async fn run<H: RequestHandler>(broker_addr: &str, mut handler: H) -> ! {
    let options = SocketOptions::default()
        .with_reconnect_ivl(Duration::from_secs(1))
        .with_reconnect_ivl_max(Duration::from_secs(32));
    let mut backoff = ReconnectState::new(&options);

    loop {
        match DealerSocket::connect(broker_addr).await {
            Ok(socket) => {
                info!(broker = broker_addr, "connected to broker");
                // Backoff resets on the first valid message received over
                // this connection, not on bare TCP connect — see run_session.
                run_session(socket, &mut handler, &mut backoff).await;
                warn!("lost connection to broker, reconnecting");
            }
            Err(e) => {
                warn!("failed to connect to broker: {e}");
            }
        }

        let delay = backoff.next_delay();
        debug!(?delay, attempt = backoff.attempt(), "backing off before reconnect");
        compio::time::sleep(delay).await;
    }
}

/// Services one broker connection until it's judged dead (heartbeat expiry
/// or a closed socket), returning so the caller can reconnect.
async fn run_session<H: RequestHandler>(
    mut socket: DealerSocket,
    handler: &mut H,
    backoff: &mut ReconnectState,
) {
    if let Err(e) = socket.send(vec![protocol::ready_frame()]).await {
        warn!("failed to send READY: {e}");
        return;
    }

    let (done_tx, done_rx) = flume::unbounded::<TaskResult>();
    let mut broker_expiry = Instant::now() + expiry_window();
    let mut next_heartbeat = Instant::now() + HEARTBEAT_INTERVAL;

    loop {
        let now = Instant::now();
        if now >= broker_expiry {
            warn!("broker heartbeat expired, treating link as dead");
            return;
        }

        let tick = compio::time::sleep(next_heartbeat.saturating_duration_since(now)).fuse();
        futures::pin_mut!(tick);

        select! {
            msg = socket.recv().fuse() => {
                match msg {
                    Some(frames) => {
                        // Any valid message from the broker invalidates
                        // accumulated backoff, not just the first one.
                        backoff.reset();
                        broker_expiry = Instant::now() + expiry_window();
                        if !handle_backend_message(frames, handler, &done_tx) {
                            return;
                        }
                    }
                    None => {
                        debug!("broker connection closed");
                        return;
                    }
                }
            }
            result = done_rx.recv_async().fuse() => {
                match result {
                    Ok(TaskResult::Success { client_id, payload }) => {
                        let msg = vec![client_id, Bytes::new(), payload];
                        if let Err(e) = socket.send(msg).await {
                            warn!("failed to send reply: {e}");
                            return;
                        }
                    }
                    Ok(TaskResult::Failure { client_id }) => {
                        let msg = vec![client_id, Bytes::new(), protocol::ko_frame()];
                        if let Err(e) = socket.send(msg).await {
                            warn!("failed to send KO: {e}");
                            return;
                        }
                    }
                    Err(_) => return,
                }
            }
            _ = tick => {
                if let Err(e) = socket.send(vec![protocol::heartbeat_frame()]).await {
                    warn!("failed to send heartbeat: {e}");
                    return;
                }
                // Advance by whole intervals rather than resetting relative
                // to now, so ticks keep a fixed cadence under load instead
                // of being pushed back by every message/completion handled
                // in between.
                while next_heartbeat <= Instant::now() {
                    next_heartbeat += HEARTBEAT_INTERVAL;
                }
            }
        }
    }
}

/// Returns `false` if the connection should be considered dead.
fn handle_backend_message<H: RequestHandler>(
    frames: Vec<Bytes>,
    handler: &mut H,
    done_tx: &Sender<TaskResult>,
) -> bool {
    if frames.len() == 1 {
        if protocol::is_marker(&frames[0], HEARTBEAT) {
            trace!("heartbeat from broker");
        } else {
            warn!("unrecognized single-frame message from broker");
        }
        return true;
    }

    if frames.len() < 3 {
        warn!(frames = frames.len(), "malformed dispatch from broker, dropping");
        return true;
    }

    let client_id = frames[0].clone();
    let payload = frames[2].clone();

    let task = TaskHandle {
        client_id,
        done: done_tx.clone(),
    };
    handler.handle(payload, task);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;
    impl RequestHandler for Echo {
        fn handle(&mut self, request: Bytes, task: TaskHandle) -> bool {
            task.complete(request);
            true
        }
    }

    #[test]
    fn synchronous_closure_handler_completes_inline() {
        let (done_tx, done_rx) = flume::unbounded();
        let mut handler = |req: Bytes| Some(Bytes::from(format!("ok:{}", String::from_utf8_lossy(&req))));
        let task = TaskHandle {
            client_id: Bytes::from_static(b"c1"),
            done: done_tx,
        };
        assert!(handler.handle(Bytes::from_static(b"ping"), task));

        match done_rx.try_recv() {
            Ok(TaskResult::Success { client_id, payload }) => {
                assert_eq!(client_id, Bytes::from_static(b"c1"));
                assert_eq!(payload, Bytes::from_static(b"ok:ping"));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn handler_reject_reports_failure() {
        let (done_tx, done_rx) = flume::unbounded();
        let mut handler = |_req: Bytes| -> Option<Bytes> { None };
        let task = TaskHandle {
            client_id: Bytes::from_static(b"c1"),
            done: done_tx,
        };
        assert!(handler.handle(Bytes::from_static(b"ping"), task));
        assert!(matches!(done_rx.try_recv(), Ok(TaskResult::Failure { .. })));
    }

    #[test]
    fn handle_backend_message_routes_dispatch_to_handler() {
        let mut echo = Echo;
        let (done_tx, done_rx) = flume::unbounded();
        let frames = vec![
            Bytes::from_static(b"c1"),
            Bytes::new(),
            Bytes::from_static(b"payload"),
        ];
        assert!(handle_backend_message(frames, &mut echo, &done_tx));
        match done_rx.try_recv() {
            Ok(TaskResult::Success { client_id, payload }) => {
                assert_eq!(client_id, Bytes::from_static(b"c1"));
                assert_eq!(payload, Bytes::from_static(b"payload"));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn handle_backend_message_ignores_heartbeat() {
        let mut echo = Echo;
        let (done_tx, done_rx) = flume::unbounded();
        assert!(handle_backend_message(vec![protocol::heartbeat_frame()], &mut echo, &done_tx));
        assert!(done_rx.try_recv().is_err());
    }
}
