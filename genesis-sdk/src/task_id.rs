//! Task identity minting.
//!
//! Format: `task_<ms-timestamp>_<9 random alphanumerics>`, matching what the
//! backend's WebSocket manager keys connections on. Each generation run gets
//! a fresh identity, and events from an older identity are dropped by the
//! orchestrator's stale guard.

use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Mint a fresh identity for one generation run.
pub fn mint() -> String {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("task_{now_ms}_{suffix}")
}
