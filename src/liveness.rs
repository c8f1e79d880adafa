//! Lazy liveness: connectivity is a read-time derivation from the stored
//! heartbeat timestamp, never pushed state. No monitor task exists; a
//! participant that stops heartbeating simply reads as disconnected on
//! the next query.

use chrono::{DateTime, Duration, Utc};

/// A participant counts as connected only while the explicit flag is set
/// and the last heartbeat is strictly younger than the timeout. A missing
/// heartbeat always reads as disconnected.
pub fn effective_connected(
    is_connected: bool,
    last_heartbeat: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    timeout: Duration,
) -> bool {
    if !is_connected {
        return false;
    }
    match last_heartbeat {
        Some(beat) => now - beat < timeout,
        None => false,
    }
}

/// Heartbeat timeout from config. Must stay >= 3x the client ping
/// interval so one or two dropped beats don't flag a disconnect.
pub fn heartbeat_timeout() -> Duration {
    Duration::seconds(crate::config::get_config().heartbeat_timeout_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn connected_within_timeout_window() {
        let timeout = Duration::seconds(15);
        // heartbeat at t=0, query at t=14 -> connected
        assert!(effective_connected(true, Some(t(0)), t(14), timeout));
        // query at t=16 -> disconnected
        assert!(!effective_connected(true, Some(t(0)), t(16), timeout));
    }

    #[test]
    fn boundary_is_exclusive() {
        let timeout = Duration::seconds(15);
        // now - last_heartbeat >= timeout means disconnected
        assert!(!effective_connected(true, Some(t(0)), t(15), timeout));
    }

    #[test]
    fn explicit_flag_overrides_recent_heartbeat() {
        let timeout = Duration::seconds(15);
        assert!(!effective_connected(false, Some(t(0)), t(1), timeout));
    }

    #[test]
    fn never_heartbeated_reads_disconnected() {
        let timeout = Duration::seconds(15);
        assert!(!effective_connected(true, None, t(0), timeout));
    }
}
