use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Wall-clock time in Unix milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
