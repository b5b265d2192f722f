//! Paranoid Pirate client binary.
//!
//! ```bash
//! pirate-client <broker_frontend_addr> <request> [retries]
//! ```
//! Sends one request and prints the outcome. `retries` defaults to `0`
//! (give up on the first KO); pass `-1` to retry forever.

use std::io;

use bytes::Bytes;

use pirate_queue::{ClientEndpoint, ClientOutcome, RetryPolicy};

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let broker_addr = args.next().unwrap_or_else(|| "127.0.0.1:5555".to_string());
    let request = args.next().unwrap_or_else(|| "hello".to_string());
    let retries: i32 = args
        .next()
        .map(|s| s.parse().expect("retries must be an integer"))
        .unwrap_or(0);

    compio::runtime::Runtime::new()?.block_on(async move {
        let endpoint = ClientEndpoint::new(broker_addr, RetryPolicy::default());
        let (tx, rx) = flume::bounded(1);

        endpoint.submit(Bytes::from(request), retries, move |outcome| {
            let _ = tx.send(outcome);
        });

        match rx.recv_async().await {
            Ok(ClientOutcome::Reply(payload)) => {
                println!("reply: {}", String::from_utf8_lossy(&payload));
            }
            Ok(ClientOutcome::Ko) => println!("job failed (KO), no retries left"),
            Err(_) => println!("no outcome received"),
        }
    });

    Ok(())
}
