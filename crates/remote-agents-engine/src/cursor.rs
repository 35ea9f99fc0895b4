//! The `(lastSeenTime, seenIdsAtLastTime)` dedup bookkeeping the polling
//! loop carries across pages and across the replay/live boundary.

use std::collections::HashSet;

use remote_agents_core::Activity;

#[derive(Debug, Default, Clone)]
pub struct Cursor {
    last_seen_time: String,
    seen_ids_at_last_time: HashSet<String>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `activity` is older than the water mark, or a duplicate of
    /// an already-yielded activity at the same `createTime`.
    pub fn should_drop(&self, activity: &Activity) -> bool {
        activity.create_time < self.last_seen_time
            || (activity.create_time == self.last_seen_time
                && self.seen_ids_at_last_time.contains(&activity.id))
    }

    /// Record `activity` as seen, advancing the water mark. Resets the
    /// per-timestamp id set when `createTime` moves forward.
    pub fn advance(&mut self, activity: &Activity) {
        if activity.create_time != self.last_seen_time {
            self.last_seen_time = activity.create_time.clone();
            self.seen_ids_at_last_time.clear();
        }
        self.seen_ids_at_last_time.insert(activity.id.clone());
    }
}
