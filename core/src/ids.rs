//! Id generation without a shared mutable singleton.
//!
//! Per Design Note §9, global state (the coordinator, persistence,
//! recovery engine) is constructed once in the process entrypoint and
//! passed down rather than reached through package-local statics. ID
//! minting is the one place a process-wide monotonic counter is
//! genuinely useful (ordering ids lexically by mint time within a
//! process), so it is kept process-local via an atomic rather than
//! threaded through every call site.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Mints a new id of the form `{prefix}-{millis_since_epoch}-{seq}`.
///
/// Monotonic within a process: two ids minted in the same millisecond
/// still sort correctly by the trailing sequence number.
pub fn mint_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{millis}-{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_id_is_unique_and_prefixed() {
        let a = mint_id("sig");
        let b = mint_id("sig");
        assert_ne!(a, b);
        assert!(a.starts_with("sig-"));
        assert!(b.starts_with("sig-"));
    }
}
