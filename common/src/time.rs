// Time types used by the referral ledger
//
// Reward rows and user records carry wall clock timestamps. They are only
// informative: ordering guarantees of the ledger never depend on them.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Unix timestamp in seconds
pub type TimestampSeconds = u64;

#[inline]
pub fn get_current_time() -> Duration {
    // A clock set before the epoch is reported as the epoch itself
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}

// Return timestamp in seconds
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}
