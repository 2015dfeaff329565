use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

pub mod money;
pub mod persistence;
pub mod version;

pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Current Unix timestamp in seconds; 0 if the clock is before the epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
