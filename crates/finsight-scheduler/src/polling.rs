use std::time::Duration;

use finsight_schema::Belief;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5_000);

/// Delay before the next status poll, or `None` when polling should halt.
///
/// An unknown belief still polls so the first response can settle it. Hidden views
/// never poll.
pub fn polling_interval(belief: Belief, visible: bool, interval: Duration) -> Option<Duration> {
    if !visible {
        return None;
    }
    match belief {
        Belief::Inactive => None,
        Belief::Active | Belief::Unknown => Some(interval),
    }
}
