//! Line formats for events and the flag table.

use inotifier::Flag;
use inotifier_watch::WatchEvent;

/// `<path> <flag,flag,...>[ cookie=<n>]`
pub fn format_event(ev: &WatchEvent) -> String {
    let flags = ev
        .event
        .events
        .iter()
        .map(|flag| flag.name())
        .collect::<Vec<_>>()
        .join(",");

    let mut line = format!("{} {}", ev.path().display(), flags);
    if ev.event.cookie != 0 {
        line.push_str(&format!(" cookie={}", ev.event.cookie));
    }
    line
}

fn kind(flag: Flag) -> &'static str {
    if flag.is_alias() {
        "alias"
    } else if flag.is_option() {
        "option"
    } else if flag.is_result_only() {
        "result"
    } else {
        "event"
    }
}

/// One line per recognized flag, in decode order.
pub fn flag_table() -> Vec<String> {
    Flag::ALL
        .into_iter()
        .map(|flag| format!("{:<14} {:#010x}  {}", flag.name(), flag.mask().bits(), kind(flag)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use inotifier::{Event, EventMask};
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn watch_event(mask: EventMask, cookie: u32, name: Option<&str>) -> WatchEvent {
        WatchEvent {
            event: Event {
                wd: 1,
                mask,
                cookie,
                name: name.map(OsString::from),
                events: inotifier::decode(mask),
            },
            watched_path: PathBuf::from("/srv"),
        }
    }

    #[test]
    fn test_format_event_with_name() {
        let ev = watch_event(EventMask::IN_CREATE | EventMask::IN_ISDIR, 0, Some("sub"));
        assert_eq!(format_event(&ev), "/srv/sub create,isdir");
    }

    #[test]
    fn test_format_event_self() {
        let ev = watch_event(EventMask::IN_DELETE_SELF, 0, None);
        assert_eq!(format_event(&ev), "/srv delete_self");
    }

    #[test]
    fn test_format_event_cookie() {
        let ev = watch_event(EventMask::IN_MOVED_TO, 42, Some("new"));
        assert_eq!(format_event(&ev), "/srv/new moved_to cookie=42");
    }

    #[test]
    fn test_flag_table() {
        let table = flag_table();
        assert_eq!(table.len(), Flag::ALL.len());
        assert_eq!(table[0], "access         0x00000001  event");
        assert!(table.iter().any(|l| l.starts_with("all_events") && l.ends_with("alias")));
        assert!(table.iter().any(|l| l.starts_with("oneshot") && l.contains("0x80000000")));
        assert!(table.last().unwrap().ends_with("result"));
    }
}
