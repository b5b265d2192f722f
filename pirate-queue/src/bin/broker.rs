//! Paranoid Pirate broker binary.
//!
//! ```bash
//! pirate-broker [frontend_addr] [backend_addr]
//! ```
//! Defaults to `127.0.0.1:5555` (clients) and `127.0.0.1:5556` (workers).

use std::io;

use tracing::error;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let frontend_addr = args.next().unwrap_or_else(|| "127.0.0.1:5555".to_string());
    let backend_addr = args.next().unwrap_or_else(|| "127.0.0.1:5556".to_string());

    compio::runtime::Runtime::new()?.block_on(async {
        if let Err(e) = pirate_queue::broker::run(&frontend_addr, &backend_addr).await {
            error!("broker exited: {e}");
        }
    });

    Ok(())
}
