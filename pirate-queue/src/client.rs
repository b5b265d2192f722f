//! Client endpoint: submits one in-flight request at a time to a broker's
//! frontend socket, retrying on explicit job failure.
//!
//! Retries here are driven by the broker's KO reply, not by a client-side
//! timeout: a dispatched request always eventually gets an answer from the
//! broker — either the worker's reply or a synthesized KO once the worker
//! holding it is purged — so the client just waits for it. A KO consumes one
//! retry and resends the same request on the same [`ReqSocket`] (which is
//! back in its `Idle` state right after that `recv()`, so no reconnect is
//! needed for this path). Only a transport-level failure — the connect or
//! send itself erroring, as opposed to the job failing — drops the socket
//! and retries the connection with a fixed backoff; `src/gppclient.c`'s own
//! retry loop conflates the two, but the spec's per-request `retries`
//! counter is explicitly about job failures (KO), so this keeps them apart.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use monocoque::zmq::ReqSocket;

use crate::protocol::{self, KO};

/// Sentinel `retries` value meaning "retry forever" — matches the spec's
/// "-1 means retry forever" convention.
pub const UNBOUNDED_RETRIES: i32 = -1;

/// Outcome of a submitted request, delivered to the caller's callback.
#[derive(Debug)]
pub enum ClientOutcome {
    /// A reply payload, either from the worker or forwarded by the broker.
    Reply(Bytes),
    /// The job failed and no retries remain: `(success=false, reply=none)`.
    Ko,
}

/// Governs reconnection after a transport-level failure (connect/send
/// error) — distinct from the spec's job-level `retries` counter passed to
/// [`ClientEndpoint::submit`], which is driven by KO replies and has no
/// timeout of its own.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub connect_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn with_connect_backoff(mut self, delay: Duration) -> Self {
        self.connect_backoff = delay;
        self
    }
}

/// A client endpoint bound to one broker frontend address.
///
/// Enforces single-in-flight-request semantics: [`submit`](Self::submit)
/// refuses a new request while a previous one hasn't resolved, so retries
/// can't silently pile up faster than the broker can answer them.
///
/// Not `Send` — the underlying [`ReqSocket`] and its retry task are meant to
/// run on one `compio` single-threaded runtime, matching how the rest of
/// this crate uses the transport.
pub struct ClientEndpoint {
    addr: String,
    socket: Rc<RefCell<Option<ReqSocket>>>,
    outstanding: Rc<Cell<bool>>,
    policy: RetryPolicy,
}

impl ClientEndpoint {
    pub fn new(addr: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            addr: addr.into(),
            socket: Rc::new(RefCell::new(None)),
            outstanding: Rc::new(Cell::new(false)),
            policy,
        }
    }

    /// True while a previously submitted request hasn't resolved yet.
    pub fn is_outstanding(&self) -> bool {
        self.outstanding.get()
    }

    /// Submits `request`, invoking `on_done` once it resolves.
    ///
    /// `retries` is the number of times a KO reply may trigger a resend
    /// before the caller is told the job failed; [`UNBOUNDED_RETRIES`]
    /// (`-1`) retries forever.
    ///
    /// Returns `false` without sending anything if a previous request is
    /// still outstanding; the caller must wait for its `on_done` first.
    pub fn submit(
        &self,
        request: Bytes,
        retries: i32,
        on_done: impl FnOnce(ClientOutcome) + 'static,
    ) -> bool {
        if self.outstanding.replace(true) {
            return false;
        }

        let addr = self.addr.clone();
        let socket = self.socket.clone();
        let outstanding = self.outstanding.clone();
        let policy = self.policy;

        compio::runtime::spawn(async move {
            let outcome = run_request(&addr, &socket, policy, request, retries).await;
            outstanding.set(false);
            on_done(outcome);
        })
        .detach();

        true
    }
}

async fn run_request(
    addr: &str,
    socket: &Rc<RefCell<Option<ReqSocket>>>,
    policy: RetryPolicy,
    request: Bytes,
    mut retries: i32,
) -> ClientOutcome {
    loop {
        if socket.borrow().is_none() {
            match ReqSocket::connect(addr).await {
                Ok(s) => *socket.borrow_mut() = Some(s),
                Err(e) => {
                    warn!("failed to connect to broker: {e}");
                    compio::time::sleep(policy.connect_backoff).await;
                    continue;
                }
            }
        }

        {
            let mut guard = socket.borrow_mut();
            let s = guard.as_mut().expect("just connected above");
            if let Err(e) = s.send(vec![request.clone()]).await {
                warn!("send failed: {e}");
                *guard = None;
                drop(guard);
                compio::time::sleep(policy.connect_backoff).await;
                continue;
            }
        }

        let reply = {
            let mut guard = socket.borrow_mut();
            let s = guard.as_mut().expect("just sent above");
            s.recv().await
        };

        match reply {
            Some(mut frames) if !frames.is_empty() => {
                let payload = frames.remove(0);
                if protocol::is_marker(&payload, KO) {
                    match apply_failure(retries) {
                        Some(next) => {
                            retries = next;
                            debug!(retries, "job failed, resending");
                            continue;
                        }
                        None => {
                            debug!("retries exhausted after KO, giving up");
                            return ClientOutcome::Ko;
                        }
                    }
                }
                return ClientOutcome::Reply(payload);
            }
            _ => {
                debug!("broker connection closed, reconnecting");
                *socket.borrow_mut() = None;
                compio::time::sleep(policy.connect_backoff).await;
            }
        }
    }
}

/// Applies one job failure to a `retries` counter: `None` means give up
/// (no retries remained), `Some(next)` means resend with the counter
/// updated to `next`. [`UNBOUNDED_RETRIES`] is never decremented.
fn apply_failure(retries: i32) -> Option<i32> {
    if retries == UNBOUNDED_RETRIES {
        return Some(retries);
    }
    if retries == 0 {
        return None;
    }
    Some(retries - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_retries_count_down_then_give_up() {
        assert_eq!(apply_failure(2), Some(1));
        assert_eq!(apply_failure(1), Some(0));
        assert_eq!(apply_failure(0), None);
    }

    #[test]
    fn unbounded_sentinel_never_decrements() {
        assert_eq!(apply_failure(UNBOUNDED_RETRIES), Some(UNBOUNDED_RETRIES));
        assert_eq!(apply_failure(UNBOUNDED_RETRIES), Some(UNBOUNDED_RETRIES));
    }

    #[test]
    fn submit_refuses_while_outstanding() {
        let endpoint = ClientEndpoint::new("127.0.0.1:1", RetryPolicy::default());
        endpoint.outstanding.set(true);
        let accepted = endpoint.submit(Bytes::from_static(b"req"), 0, |_| {});
        assert!(!accepted);
    }
}
