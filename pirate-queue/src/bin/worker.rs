//! Paranoid Pirate worker binary.
//!
//! ```bash
//! pirate-worker [broker_backend_addr]
//! ```
//! Defaults to `127.0.0.1:5556`. Echoes each request back uppercased, purely
//! as a demonstration handler — real workers implement [`pirate_queue::RequestHandler`].

use std::io;

use bytes::Bytes;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let broker_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5556".to_string());

    compio::runtime::Runtime::new()?.block_on(async {
        pirate_queue::worker::run(&broker_addr, |request: Bytes| {
            let upper = String::from_utf8_lossy(&request).to_uppercase();
            Some(Bytes::from(upper))
        })
        .await
    })
}
