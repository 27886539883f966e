//! Per-user inotify limits from `/proc/sys/fs/inotify`.

use crate::error::WatchError;
use std::fs;

const MAX_USER_WATCHES: &str = "/proc/sys/fs/inotify/max_user_watches";
const MAX_USER_INSTANCES: &str = "/proc/sys/fs/inotify/max_user_instances";
const MAX_QUEUED_EVENTS: &str = "/proc/sys/fs/inotify/max_queued_events";

/// Maximum number of watches per user.
pub fn max_user_watches() -> Result<u64, WatchError> {
    read_limit(MAX_USER_WATCHES)
}

/// Maximum number of inotify descriptors per user.
pub fn max_user_instances() -> Result<u64, WatchError> {
    read_limit(MAX_USER_INSTANCES)
}

/// Maximum number of events queued per descriptor before `q_overflow`.
pub fn max_queued_events() -> Result<u64, WatchError> {
    read_limit(MAX_QUEUED_EVENTS)
}

fn read_limit(path: &'static str) -> Result<u64, WatchError> {
    parse_limit(path, &fs::read_to_string(path)?)
}

fn parse_limit(path: &'static str, contents: &str) -> Result<u64, WatchError> {
    let value = contents.trim();
    value.parse().map_err(|_| WatchError::InvalidLimit {
        path,
        value: value.to_string(),
    })
}
