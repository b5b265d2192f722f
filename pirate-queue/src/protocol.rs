//! Paranoid Pirate wire-protocol constants.
//!
//! Shared by the broker, worker, and client so the three near-duplicate
//! copies of these markers in the original implementation collapse to one.

use bytes::Bytes;

/// Worker just started, announcing itself to the broker.
pub const READY: u8 = 0x01;
/// Liveness ping exchanged on both broker->worker and worker->broker links.
pub const HEARTBEAT: u8 = 0x02;
/// Job failed — either the handler rejected it or the broker synthesized
/// this after purging the worker that held it.
pub const KO: u8 = 0x03;

/// Returns `true` if `frame` is a single-byte marker equal to `marker`.
pub fn is_marker(frame: &Bytes, marker: u8) -> bool {
    frame.len() == 1 && frame[0] == marker
}

pub fn ready_frame() -> Bytes {
    Bytes::from_static(&[READY])
}

pub fn heartbeat_frame() -> Bytes {
    Bytes::from_static(&[HEARTBEAT])
}

pub fn ko_frame() -> Bytes {
    Bytes::from_static(&[KO])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_markers() {
        assert!(is_marker(&ready_frame(), READY));
        assert!(is_marker(&heartbeat_frame(), HEARTBEAT));
        assert!(is_marker(&ko_frame(), KO));
        assert!(!is_marker(&Bytes::from_static(b"hi"), READY));
        assert!(!is_marker(&ready_frame(), HEARTBEAT));
    }
}
