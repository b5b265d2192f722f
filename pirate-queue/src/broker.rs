//! Paranoid Pirate broker: dispatches client requests to a pool of workers
//! on an LRU basis, tracking liveness with bidirectional heartbeats.
//!
//! `ppqueue.c` runs this as one `select()`/`poll()` loop owning the frontend
//! socket, the backend socket, and the worker queue together. Here each
//! accepted connection (frontend client or backend worker) gets its own
//! lightweight task that only knows how to talk to its peer; a single
//! [`Dispatcher`] task owns the LRU queue, the worker liveness table, and the
//! pending-request FIFO, and the connection tasks only exchange `Event`s and
//! `Cmd`s with it over `flume` channels. The dispatcher is still a single
//! sequential actor, so the broker's observable behavior — LRU order,
//! heartbeat cadence, purge timing — matches a one-loop implementation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use compio::net::{TcpListener, TcpStream};
use flume::{Receiver, Sender};
use futures::{select, FutureExt};
use hashbrown::HashMap;
use tracing::{debug, info, trace, warn};

use monocoque::zmq::RouterSocket;

use crate::error::{PirateError, Result};
use crate::protocol::{self, HEARTBEAT, READY};

/// How often the broker pings each connected worker, and the granularity of
/// its expiry sweep.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// A worker missing this many consecutive heartbeat intervals is purged.
pub const HEARTBEAT_LIVENESS: u32 = 3;

fn expiry_window() -> Duration {
    HEARTBEAT_INTERVAL * HEARTBEAT_LIVENESS
}

static WORKER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Broker configuration, following the `SocketOptions` builder idiom used
/// throughout `monocoque-core`.
///
/// ```
/// use pirate_queue::broker::BrokerConfig;
/// use std::time::Duration;
///
/// let config = BrokerConfig::default()
///     .with_frontend_addr("127.0.0.1:5555")
///     .with_backend_addr("127.0.0.1:5556")
///     .with_heartbeat_interval(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub frontend_addr: String,
    pub backend_addr: String,
    pub heartbeat_interval: Duration,
    pub heartbeat_liveness: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            frontend_addr: "127.0.0.1:5555".to_string(),
            backend_addr: "127.0.0.1:5556".to_string(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            heartbeat_liveness: HEARTBEAT_LIVENESS,
        }
    }
}

impl BrokerConfig {
    pub fn with_frontend_addr(mut self, addr: impl Into<String>) -> Self {
        self.frontend_addr = addr.into();
        self
    }

    pub fn with_backend_addr(mut self, addr: impl Into<String>) -> Self {
        self.backend_addr = addr.into();
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_heartbeat_liveness(mut self, liveness: u32) -> Self {
        self.heartbeat_liveness = liveness;
        self
    }

    fn expiry_window(&self) -> Duration {
        self.heartbeat_interval * self.heartbeat_liveness
    }
}

/// Commands the dispatcher issues to one backend (worker) connection task.
enum BackendCmd {
    /// Forward a client request: `[empty, client_id, empty, payload]`, ready
    /// to hand to `RouterSocket::send` as-is (it strips the leading frame).
    Dispatch(Vec<Bytes>),
    Heartbeat,
}

/// Commands the dispatcher issues to one frontend (client) connection task.
enum FrontendCmd {
    /// Deliver a reply (or synthesized KO) payload back to the client.
    Reply(Bytes),
}

/// Events connection tasks report to the dispatcher.
enum Event {
    WorkerUp {
        identity: Bytes,
        outbox: Sender<BackendCmd>,
    },
    WorkerMessage {
        identity: Bytes,
        frames: Vec<Bytes>,
    },
    WorkerDown {
        identity: Bytes,
    },
    ClientUp {
        identity: Bytes,
        outbox: Sender<FrontendCmd>,
    },
    ClientRequest {
        identity: Bytes,
        payload: Bytes,
    },
    ClientDown {
        identity: Bytes,
    },
}

struct WorkerRecord {
    outbox: Sender<BackendCmd>,
    expiry: Instant,
    /// Client this worker is currently chewing on, if any. Needed so a purge
    /// knows who to send the synthesized KO to.
    current_client: Option<Bytes>,
}

/// Owns all broker state: the worker liveness table, the LRU-ish available
/// queue, and the FIFO of requests waiting for a free worker.
struct Dispatcher {
    config: BrokerConfig,
    workers: HashMap<Bytes, WorkerRecord>,
    /// Workers free to take work, oldest-seen at the front. A worker can
    /// linger here after being purged elsewhere; `try_dispatch` re-checks
    /// `workers` before trusting an entry.
    available: VecDeque<Bytes>,
    clients: HashMap<Bytes, Sender<FrontendCmd>>,
    pending: VecDeque<(Bytes, Bytes)>,
}

impl Dispatcher {
    fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            workers: HashMap::new(),
            available: VecDeque::new(),
            clients: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    async fn run(mut self, events: Receiver<Event>) {
        let interval = self.config.heartbeat_interval;
        let mut next_tick = Instant::now() + interval;

        loop {
            let now = Instant::now();
            let tick = compio::time::sleep(next_tick.saturating_duration_since(now)).fuse();
            futures::pin_mut!(tick);

            select! {
                event = events.recv_async().fuse() => {
                    match event {
                        Ok(event) => self.handle_event(event),
                        Err(_) => break,
                    }
                }
                _ = tick => {
                    self.sweep_expired();
                    self.heartbeat_all();
                    // Advance by whole intervals rather than resetting
                    // relative to now, so a burst of events handled in
                    // between ticks can't push the cadence back.
                    while next_tick <= Instant::now() {
                        next_tick += interval;
                    }
                }
            }
        }

        debug!("dispatcher shutting down");
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::WorkerUp { identity, outbox } => self.worker_up(identity, outbox),
            Event::WorkerMessage { identity, frames } => self.worker_message(identity, frames),
            Event::WorkerDown { identity } => self.purge_worker(&identity),
            Event::ClientUp { identity, outbox } => {
                self.clients.insert(identity, outbox);
            }
            Event::ClientRequest { identity, payload } => {
                self.pending.push_back((identity, payload));
                self.try_dispatch();
            }
            Event::ClientDown { identity } => {
                self.clients.remove(&identity);
                self.pending.retain(|(id, _)| id != &identity);
            }
        }
    }

    fn worker_up(&mut self, identity: Bytes, outbox: Sender<BackendCmd>) {
        info!(worker = ?identity, "worker ready");
        // A worker that reconnects with the same identity replaces its old
        // record outright; the old connection task is already gone.
        self.workers.insert(
            identity.clone(),
            WorkerRecord {
                outbox,
                expiry: Instant::now() + self.config.expiry_window(),
                current_client: None,
            },
        );
        self.available.push_back(identity);
        self.try_dispatch();
    }

    fn worker_message(&mut self, identity: Bytes, mut frames: Vec<Bytes>) {
        let expiry_window = self.config.expiry_window();
        let Some(record) = self.workers.get_mut(&identity) else {
            return;
        };
        record.expiry = Instant::now() + expiry_window;

        if frames.len() == 1 {
            if protocol::is_marker(&frames[0], HEARTBEAT) {
                trace!(worker = ?identity, "heartbeat");
                return;
            }
            if protocol::is_marker(&frames[0], READY) {
                // Redundant READY on an already-registered worker; liveness
                // was already refreshed above.
                return;
            }
            warn!(worker = ?identity, "unrecognized single-frame message from worker");
            return;
        }

        if frames.len() < 3 {
            warn!(worker = ?identity, frames = frames.len(), "malformed worker reply, dropping");
            return;
        }

        let client_id = frames.remove(0);
        let _empty = frames.remove(0);
        let payload = frames.remove(0);

        record.current_client = None;
        self.available.push_back(identity);

        if let Some(outbox) = self.clients.get(&client_id) {
            let _ = outbox.send(FrontendCmd::Reply(payload));
        } else {
            debug!(client = ?client_id, "reply for client that already disconnected");
        }

        self.try_dispatch();
    }

    fn purge_worker(&mut self, identity: &Bytes) {
        if let Some(record) = self.workers.remove(identity) {
            warn!(worker = ?identity, "purging worker");
            if let Some(client_id) = record.current_client {
                if let Some(outbox) = self.clients.get(&client_id) {
                    let _ = outbox.send(FrontendCmd::Reply(protocol::ko_frame()));
                }
            }
        }
        self.available.retain(|id| id != identity);
    }

    /// Hands pending client requests to available workers, LRU-first.
    fn try_dispatch(&mut self) {
        while let Some(worker_id) = self.available.pop_front() {
            if !self.workers.contains_key(&worker_id) {
                continue; // stale entry for a worker purged elsewhere
            }
            let Some((client_id, payload)) = self.pending.pop_front() else {
                self.available.push_front(worker_id);
                break;
            };

            let record = self
                .workers
                .get_mut(&worker_id)
                .expect("checked contains_key above");
            record.current_client = Some(client_id.clone());
            let msg = vec![Bytes::new(), client_id, Bytes::new(), payload];
            let _ = record.outbox.send(BackendCmd::Dispatch(msg));
        }
    }

    fn sweep_expired(&mut self) {
        let now = Instant::now();
        let expired: Vec<Bytes> = self
            .workers
            .iter()
            .filter(|(_, record)| record.expiry <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            warn!(worker = ?id, "worker heartbeat expired");
            self.purge_worker(&id);
        }
    }

    fn heartbeat_all(&self) {
        for record in self.workers.values() {
            let _ = record.outbox.send(BackendCmd::Heartbeat);
        }
    }
}

/// Runs the broker's backend (worker-facing) connection task for one
/// accepted TCP stream until the worker disconnects.
async fn run_backend_connection(stream: TcpStream, dispatcher: Sender<Event>) {
    let mut socket = match RouterSocket::from_tcp(stream).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!("backend handshake failed: {e}");
            return;
        }
    };

    let identity = Bytes::from(format!(
        "worker-{}",
        WORKER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let (outbox_tx, outbox_rx) = flume::unbounded::<BackendCmd>();

    if dispatcher
        .send(Event::WorkerUp {
            identity: identity.clone(),
            outbox: outbox_tx,
        })
        .is_err()
    {
        return;
    }

    loop {
        select! {
            msg = socket.recv().fuse() => {
                match msg {
                    Some(frames) => {
                        // RouterSocket::recv() prepends this connection's
                        // peer identity; the rest is the worker's payload.
                        let frames = frames.into_iter().skip(1).collect::<Vec<_>>();
                        if dispatcher
                            .send(Event::WorkerMessage { identity: identity.clone(), frames })
                            .is_err()
                        {
                            break;
                        }
                    }
                    None => {
                        debug!(worker = ?identity, "backend connection closed");
                        break;
                    }
                }
            }
            cmd = outbox_rx.recv_async().fuse() => {
                match cmd {
                    Ok(BackendCmd::Dispatch(msg)) => {
                        if let Err(e) = socket.send(msg).await {
                            warn!(worker = ?identity, "dispatch send failed: {e}");
                            break;
                        }
                    }
                    Ok(BackendCmd::Heartbeat) => {
                        let msg = vec![Bytes::new(), protocol::heartbeat_frame()];
                        if let Err(e) = socket.send(msg).await {
                            warn!(worker = ?identity, "heartbeat send failed: {e}");
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    }

    let _ = dispatcher.send(Event::WorkerDown { identity });
}

/// Runs the broker's frontend (client-facing) connection task for one
/// accepted TCP stream until the client disconnects.
async fn run_frontend_connection(stream: TcpStream, dispatcher: Sender<Event>) {
    let mut socket = match RouterSocket::from_tcp(stream).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!("frontend handshake failed: {e}");
            return;
        }
    };

    let identity = Bytes::from(format!(
        "client-{}",
        CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let (outbox_tx, outbox_rx) = flume::unbounded::<FrontendCmd>();

    if dispatcher
        .send(Event::ClientUp {
            identity: identity.clone(),
            outbox: outbox_tx,
        })
        .is_err()
    {
        return;
    }

    loop {
        select! {
            msg = socket.recv().fuse() => {
                match msg {
                    Some(mut frames) => {
                        // [identity, payload] — REQ sockets here don't add an
                        // empty delimiter frame of their own.
                        if frames.len() < 2 {
                            warn!(client = ?identity, "malformed client request, dropping");
                            continue;
                        }
                        let payload = frames.remove(1);
                        if dispatcher
                            .send(Event::ClientRequest { identity: identity.clone(), payload })
                            .is_err()
                        {
                            break;
                        }
                    }
                    None => {
                        debug!(client = ?identity, "frontend connection closed");
                        break;
                    }
                }
            }
            cmd = outbox_rx.recv_async().fuse() => {
                match cmd {
                    Ok(FrontendCmd::Reply(payload)) => {
                        if let Err(e) = socket.send(vec![Bytes::new(), payload]).await {
                            warn!(client = ?identity, "reply send failed: {e}");
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    }

    let _ = dispatcher.send(Event::ClientDown { identity });
}

/// Runs the broker with default heartbeat settings. Never returns on success.
pub async fn run(frontend_addr: &str, backend_addr: &str) -> Result<()> {
    run_with_config(
        BrokerConfig::default()
            .with_frontend_addr(frontend_addr)
            .with_backend_addr(backend_addr),
    )
    .await
}

/// Runs the broker until a listener fails to bind. Never returns on success.
pub async fn run_with_config(config: BrokerConfig) -> Result<()> {
    let frontend_listener = TcpListener::bind(&config.frontend_addr)
        .await
        .map_err(|source| PirateError::Bind {
            endpoint: config.frontend_addr.clone(),
            source,
        })?;
    let backend_listener = TcpListener::bind(&config.backend_addr)
        .await
        .map_err(|source| PirateError::Bind {
            endpoint: config.backend_addr.clone(),
            source,
        })?;

    info!(
        frontend = config.frontend_addr,
        backend = config.backend_addr,
        "broker listening"
    );

    let (event_tx, event_rx) = flume::unbounded();
    compio::runtime::spawn(Dispatcher::new(config).run(event_rx)).detach();

    let frontend_events = event_tx.clone();
    let frontend_task = compio::runtime::spawn(async move {
        loop {
            match frontend_listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "client connected");
                    let dispatcher = frontend_events.clone();
                    compio::runtime::spawn(run_frontend_connection(stream, dispatcher)).detach();
                }
                Err(e) => {
                    warn!("frontend accept failed: {e}");
                }
            }
        }
    });

    let backend_events = event_tx;
    let backend_task = compio::runtime::spawn(async move {
        loop {
            match backend_listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "worker connected");
                    let dispatcher = backend_events.clone();
                    compio::runtime::spawn(run_backend_connection(stream, dispatcher)).detach();
                }
                Err(e) => {
                    warn!("backend accept failed: {e}");
                }
            }
        }
    });

    let _ = futures::join!(frontend_task, backend_task);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outbox: Sender<BackendCmd>) -> WorkerRecord {
        WorkerRecord {
            outbox,
            expiry: Instant::now() + expiry_window(),
            current_client: None,
        }
    }

    #[test]
    fn try_dispatch_assigns_lru_worker_first() {
        let mut dispatcher = Dispatcher::new(BrokerConfig::default());
        let (tx1, rx1) = flume::unbounded();
        let (tx2, rx2) = flume::unbounded();

        dispatcher.workers.insert(Bytes::from_static(b"w1"), record(tx1));
        dispatcher.workers.insert(Bytes::from_static(b"w2"), record(tx2));
        dispatcher.available.push_back(Bytes::from_static(b"w1"));
        dispatcher.available.push_back(Bytes::from_static(b"w2"));

        dispatcher.pending.push_back((Bytes::from_static(b"c1"), Bytes::from_static(b"req")));
        dispatcher.try_dispatch();

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
        assert_eq!(dispatcher.available.len(), 1);
        assert_eq!(dispatcher.available[0], Bytes::from_static(b"w2"));
    }

    #[test]
    fn pending_request_waits_for_a_free_worker() {
        let mut dispatcher = Dispatcher::new(BrokerConfig::default());
        dispatcher.pending.push_back((Bytes::from_static(b"c1"), Bytes::from_static(b"req")));
        dispatcher.try_dispatch();
        assert_eq!(dispatcher.pending.len(), 1);

        let (tx, rx) = flume::unbounded();
        dispatcher.worker_up(Bytes::from_static(b"w1"), tx);

        assert!(dispatcher.pending.is_empty());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn purge_sends_ko_to_the_client_with_an_outstanding_request() {
        let mut dispatcher = Dispatcher::new(BrokerConfig::default());
        let (worker_tx, _worker_rx) = flume::unbounded();
        dispatcher.workers.insert(
            Bytes::from_static(b"w1"),
            WorkerRecord {
                outbox: worker_tx,
                expiry: Instant::now() + expiry_window(),
                current_client: Some(Bytes::from_static(b"c1")),
            },
        );
        let (client_tx, client_rx) = flume::unbounded();
        dispatcher.clients.insert(Bytes::from_static(b"c1"), client_tx);

        dispatcher.purge_worker(&Bytes::from_static(b"w1"));

        match client_rx.try_recv() {
            Ok(FrontendCmd::Reply(payload)) => assert!(protocol::is_marker(&payload, protocol::KO)),
            other => panic!("expected a KO reply, got {other:?}"),
        }
        assert!(!dispatcher.workers.contains_key(&Bytes::from_static(b"w1")));
    }

    #[test]
    fn worker_reply_frees_the_worker_and_routes_to_the_right_client() {
        let mut dispatcher = Dispatcher::new(BrokerConfig::default());
        let (worker_tx, _worker_rx) = flume::unbounded();
        dispatcher.workers.insert(
            Bytes::from_static(b"w1"),
            WorkerRecord {
                outbox: worker_tx,
                expiry: Instant::now() + expiry_window(),
                current_client: Some(Bytes::from_static(b"c1")),
            },
        );
        let (client_tx, client_rx) = flume::unbounded();
        dispatcher.clients.insert(Bytes::from_static(b"c1"), client_tx);

        dispatcher.worker_message(
            Bytes::from_static(b"w1"),
            vec![
                Bytes::from_static(b"c1"),
                Bytes::new(),
                Bytes::from_static(b"result"),
            ],
        );

        match client_rx.try_recv() {
            Ok(FrontendCmd::Reply(payload)) => assert_eq!(payload, Bytes::from_static(b"result")),
            other => panic!("expected a reply, got {other:?}"),
        }
        assert_eq!(dispatcher.available.len(), 1);
        assert!(dispatcher.workers[&Bytes::from_static(b"w1")].current_client.is_none());
    }

    #[test]
    fn heartbeat_marker_refreshes_expiry_without_freeing_the_worker() {
        let mut dispatcher = Dispatcher::new(BrokerConfig::default());
        let (worker_tx, worker_rx) = flume::unbounded();
        let stale = Instant::now();
        dispatcher.workers.insert(
            Bytes::from_static(b"w1"),
            WorkerRecord {
                outbox: worker_tx,
                expiry: stale,
                current_client: Some(Bytes::from_static(b"c1")),
            },
        );

        dispatcher.worker_message(Bytes::from_static(b"w1"), vec![protocol::heartbeat_frame()]);

        assert!(dispatcher.workers[&Bytes::from_static(b"w1")].expiry > stale);
        assert!(dispatcher.available.is_empty());
        assert!(worker_rx.try_recv().is_err());
    }
}
