//! inotify mask constants and the symbolic flag table.
//!
//! [`EventMask`] mirrors the kernel bit values. [`Flag`] is the symbolic
//! name of one bit (or alias) as seen by callers; [`Flag::ALL`] fixes the
//! order in which masks are decoded.

use crate::error::Error;
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// inotify event mask flags.
    ///
    /// These match the kernel's inotify mask values exactly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        /// File was accessed (e.g., read).
        const IN_ACCESS = 0x0000_0001;
        /// File was modified.
        const IN_MODIFY = 0x0000_0002;
        /// Metadata changed (e.g., permissions, timestamps).
        const IN_ATTRIB = 0x0000_0004;
        /// Writable file was closed.
        const IN_CLOSE_WRITE = 0x0000_0008;
        /// Unwritable file was closed.
        const IN_CLOSE_NOWRITE = 0x0000_0010;
        /// File was opened.
        const IN_OPEN = 0x0000_0020;
        /// File/directory moved out of watched directory.
        const IN_MOVED_FROM = 0x0000_0040;
        /// File/directory moved into watched directory.
        const IN_MOVED_TO = 0x0000_0080;
        /// File/directory created in watched directory.
        const IN_CREATE = 0x0000_0100;
        /// File/directory deleted from watched directory.
        const IN_DELETE = 0x0000_0200;
        /// Watched file/directory was deleted.
        const IN_DELETE_SELF = 0x0000_0400;
        /// Watched file/directory was moved.
        const IN_MOVE_SELF = 0x0000_0800;

        // Convenience combinations
        /// Close event (write or no-write).
        const IN_CLOSE = Self::IN_CLOSE_WRITE.bits() | Self::IN_CLOSE_NOWRITE.bits();
        /// Move event (from or to).
        const IN_MOVE = Self::IN_MOVED_FROM.bits() | Self::IN_MOVED_TO.bits();

        /// All events that can be watched.
        const IN_ALL_EVENTS = Self::IN_ACCESS.bits()
            | Self::IN_MODIFY.bits()
            | Self::IN_ATTRIB.bits()
            | Self::IN_CLOSE_WRITE.bits()
            | Self::IN_CLOSE_NOWRITE.bits()
            | Self::IN_OPEN.bits()
            | Self::IN_MOVED_FROM.bits()
            | Self::IN_MOVED_TO.bits()
            | Self::IN_CREATE.bits()
            | Self::IN_DELETE.bits()
            | Self::IN_DELETE_SELF.bits()
            | Self::IN_MOVE_SELF.bits();

        // Additional flags (for add_watch)
        /// Only watch pathname if it is a directory.
        const IN_ONLYDIR = 0x0100_0000;
        /// Don't follow symlinks.
        const IN_DONT_FOLLOW = 0x0200_0000;
        /// Don't report events for children after they are unlinked.
        const IN_EXCL_UNLINK = 0x0400_0000;
        /// Add to existing watch mask rather than replacing.
        const IN_MASK_ADD = 0x2000_0000;
        /// Only send event once, then remove watch.
        const IN_ONESHOT = 0x8000_0000;

        // Event flags (set by kernel in returned events)
        /// Watch was removed (explicitly or automatically).
        const IN_IGNORED = 0x0000_8000;
        /// Subject of event is a directory.
        const IN_ISDIR = 0x4000_0000;
        /// Event queue overflowed.
        const IN_Q_OVERFLOW = 0x0000_4000;
        /// Filesystem containing watched object was unmounted.
        const IN_UNMOUNT = 0x0000_2000;
    }
}

/// Symbolic name for one entry of the inotify mask table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Access,
    Attrib,
    CloseWrite,
    CloseNowrite,
    Close,
    Modify,
    Open,
    Create,
    Delete,
    DeleteSelf,
    MovedFrom,
    MovedTo,
    Move,
    MoveSelf,
    AllEvents,
    Oneshot,
    Onlydir,
    DontFollow,
    ExclUnlink,
    MaskAdd,
    Ignored,
    Isdir,
    QOverflow,
    Unmount,
}

impl Flag {
    /// Every recognized flag, in decode order.
    pub const ALL: [Flag; 24] = [
        // File activity
        Flag::Access,
        Flag::Attrib,
        Flag::CloseWrite,
        Flag::CloseNowrite,
        Flag::Close,
        Flag::Modify,
        Flag::Open,
        // Directory entry activity
        Flag::Create,
        Flag::Delete,
        Flag::DeleteSelf,
        Flag::MovedFrom,
        Flag::MovedTo,
        Flag::Move,
        Flag::MoveSelf,
        Flag::AllEvents,
        // Registration options
        Flag::Oneshot,
        Flag::Onlydir,
        Flag::DontFollow,
        Flag::ExclUnlink,
        Flag::MaskAdd,
        // Set by the kernel on read
        Flag::Ignored,
        Flag::Isdir,
        Flag::QOverflow,
        Flag::Unmount,
    ];

    /// The symbol spelling used at the API boundary.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Flag::Access => "access",
            Flag::Attrib => "attrib",
            Flag::CloseWrite => "close_write",
            Flag::CloseNowrite => "close_nowrite",
            Flag::Close => "close",
            Flag::Modify => "modify",
            Flag::Open => "open",
            Flag::Create => "create",
            Flag::Delete => "delete",
            Flag::DeleteSelf => "delete_self",
            Flag::MovedFrom => "moved_from",
            Flag::MovedTo => "moved_to",
            Flag::Move => "move",
            Flag::MoveSelf => "move_self",
            Flag::AllEvents => "all_events",
            Flag::Oneshot => "oneshot",
            Flag::Onlydir => "onlydir",
            Flag::DontFollow => "dont_follow",
            Flag::ExclUnlink => "excl_unlink",
            Flag::MaskAdd => "mask_add",
            Flag::Ignored => "ignored",
            Flag::Isdir => "isdir",
            Flag::QOverflow => "q_overflow",
            Flag::Unmount => "unmount",
        }
    }

    /// The mask bits this flag stands for.
    #[must_use]
    pub const fn mask(self) -> EventMask {
        match self {
            Flag::Access => EventMask::IN_ACCESS,
            Flag::Attrib => EventMask::IN_ATTRIB,
            Flag::CloseWrite => EventMask::IN_CLOSE_WRITE,
            Flag::CloseNowrite => EventMask::IN_CLOSE_NOWRITE,
            Flag::Close => EventMask::IN_CLOSE,
            Flag::Modify => EventMask::IN_MODIFY,
            Flag::Open => EventMask::IN_OPEN,
            Flag::Create => EventMask::IN_CREATE,
            Flag::Delete => EventMask::IN_DELETE,
            Flag::DeleteSelf => EventMask::IN_DELETE_SELF,
            Flag::MovedFrom => EventMask::IN_MOVED_FROM,
            Flag::MovedTo => EventMask::IN_MOVED_TO,
            Flag::Move => EventMask::IN_MOVE,
            Flag::MoveSelf => EventMask::IN_MOVE_SELF,
            Flag::AllEvents => EventMask::IN_ALL_EVENTS,
            Flag::Oneshot => EventMask::IN_ONESHOT,
            Flag::Onlydir => EventMask::IN_ONLYDIR,
            Flag::DontFollow => EventMask::IN_DONT_FOLLOW,
            Flag::ExclUnlink => EventMask::IN_EXCL_UNLINK,
            Flag::MaskAdd => EventMask::IN_MASK_ADD,
            Flag::Ignored => EventMask::IN_IGNORED,
            Flag::Isdir => EventMask::IN_ISDIR,
            Flag::QOverflow => EventMask::IN_Q_OVERFLOW,
            Flag::Unmount => EventMask::IN_UNMOUNT,
        }
    }

    /// Whether this flag is a union of other flags.
    ///
    /// Aliases are accepted when encoding but never produced by [`decode`].
    #[must_use]
    pub const fn is_alias(self) -> bool {
        matches!(self, Flag::Close | Flag::Move | Flag::AllEvents)
    }

    /// Whether this flag only modifies how a watch is registered.
    #[must_use]
    pub const fn is_option(self) -> bool {
        matches!(
            self,
            Flag::Oneshot | Flag::Onlydir | Flag::DontFollow | Flag::ExclUnlink | Flag::MaskAdd
        )
    }

    /// Whether this flag is only ever reported by the kernel.
    #[must_use]
    pub const fn is_result_only(self) -> bool {
        matches!(self, Flag::Ignored | Flag::Isdir | Flag::QOverflow | Flag::Unmount)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Flag {
    type Err = Error;

    /// Parse a symbol. A leading `:` is tolerated so `:create` and
    /// `create` name the same flag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix(':').unwrap_or(s);
        Flag::ALL
            .into_iter()
            .find(|flag| flag.name() == name)
            .ok_or_else(|| Error::InvalidFlag(name.to_string()))
    }
}

/// Encode a sequence of symbols into a mask.
///
/// Order and duplicates do not matter. The first unknown symbol fails the
/// whole call with [`Error::InvalidFlag`].
pub fn encode<I, S>(symbols: I) -> Result<EventMask, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .try_fold(EventMask::empty(), |mask, symbol| {
            Ok(mask | symbol.as_ref().parse::<Flag>()?.mask())
        })
}

/// Encode symbols for a watch registration.
///
/// Like [`encode`], but rejects flags the kernel only reports on read.
pub fn encode_watch<I, S>(symbols: I) -> Result<EventMask, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .try_fold(EventMask::empty(), |mask, symbol| {
            let flag = symbol.as_ref().parse::<Flag>()?;
            if flag.is_result_only() {
                return Err(Error::InvalidFlag(flag.name().to_string()));
            }
            Ok(mask | flag.mask())
        })
}

/// Encode already-parsed flags. Cannot fail.
#[must_use]
pub fn encode_flags(flags: &[Flag]) -> EventMask {
    flags
        .iter()
        .fold(EventMask::empty(), |mask, flag| mask | flag.mask())
}

/// Decode a mask into its flags, in [`Flag::ALL`] order.
///
/// Aliases are skipped; only the individual bits actually set appear.
/// Bits with no table entry are dropped.
#[must_use]
pub fn decode(mask: EventMask) -> Vec<Flag> {
    Flag::ALL
        .into_iter()
        .filter(|flag| !flag.is_alias() && mask.contains(flag.mask()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_matches_kernel() {
        assert_eq!(EventMask::IN_ACCESS.bits(), libc::IN_ACCESS);
        assert_eq!(EventMask::IN_MODIFY.bits(), libc::IN_MODIFY);
        assert_eq!(EventMask::IN_ATTRIB.bits(), libc::IN_ATTRIB);
        assert_eq!(EventMask::IN_CLOSE_WRITE.bits(), libc::IN_CLOSE_WRITE);
        assert_eq!(EventMask::IN_CLOSE_NOWRITE.bits(), libc::IN_CLOSE_NOWRITE);
        assert_eq!(EventMask::IN_OPEN.bits(), libc::IN_OPEN);
        assert_eq!(EventMask::IN_MOVED_FROM.bits(), libc::IN_MOVED_FROM);
        assert_eq!(EventMask::IN_MOVED_TO.bits(), libc::IN_MOVED_TO);
        assert_eq!(EventMask::IN_CREATE.bits(), libc::IN_CREATE);
        assert_eq!(EventMask::IN_DELETE.bits(), libc::IN_DELETE);
        assert_eq!(EventMask::IN_DELETE_SELF.bits(), libc::IN_DELETE_SELF);
        assert_eq!(EventMask::IN_MOVE_SELF.bits(), libc::IN_MOVE_SELF);
        assert_eq!(EventMask::IN_ALL_EVENTS.bits(), libc::IN_ALL_EVENTS);
        assert_eq!(EventMask::IN_ONLYDIR.bits(), libc::IN_ONLYDIR);
        assert_eq!(EventMask::IN_DONT_FOLLOW.bits(), libc::IN_DONT_FOLLOW);
        assert_eq!(EventMask::IN_EXCL_UNLINK.bits(), libc::IN_EXCL_UNLINK);
        assert_eq!(EventMask::IN_MASK_ADD.bits(), libc::IN_MASK_ADD);
        assert_eq!(EventMask::IN_ONESHOT.bits(), libc::IN_ONESHOT);
        assert_eq!(EventMask::IN_IGNORED.bits(), libc::IN_IGNORED);
        assert_eq!(EventMask::IN_ISDIR.bits(), libc::IN_ISDIR);
        assert_eq!(EventMask::IN_Q_OVERFLOW.bits(), libc::IN_Q_OVERFLOW);
        assert_eq!(EventMask::IN_UNMOUNT.bits(), libc::IN_UNMOUNT);
    }

    #[test]
    fn test_single_flag_roundtrip() {
        for flag in Flag::ALL.into_iter().filter(|f| !f.is_alias()) {
            let mask = encode([flag.name()]).unwrap();
            assert_eq!(decode(mask), vec![flag], "flag {flag}");
        }
    }

    #[test]
    fn test_all_events_expands() {
        let mask = encode(["all_events"]).unwrap();
        let expected = vec![
            Flag::Access,
            Flag::Attrib,
            Flag::CloseWrite,
            Flag::CloseNowrite,
            Flag::Modify,
            Flag::Open,
            Flag::Create,
            Flag::Delete,
            Flag::DeleteSelf,
            Flag::MovedFrom,
            Flag::MovedTo,
            Flag::MoveSelf,
        ];
        assert_eq!(decode(mask), expected);
        assert!(!decode(mask).contains(&Flag::AllEvents));
    }

    #[test]
    fn test_aliases_decode_to_constituents() {
        assert_eq!(
            decode(encode(["close"]).unwrap()),
            vec![Flag::CloseWrite, Flag::CloseNowrite]
        );
        assert_eq!(
            decode(encode(["move"]).unwrap()),
            vec![Flag::MovedFrom, Flag::MovedTo]
        );
    }

    #[test]
    fn test_unknown_flag_rejected() {
        match encode(["create", "bogus"]) {
            Err(Error::InvalidFlag(name)) => assert_eq!(name, "bogus"),
            other => panic!("expected InvalidFlag, got {other:?}"),
        }
    }

    #[test]
    fn test_symbols_are_case_sensitive() {
        assert!(matches!(encode(["Create"]), Err(Error::InvalidFlag(_))));
    }

    #[test]
    fn test_leading_colon_accepted() {
        assert_eq!(encode([":create", ":delete"]).unwrap(), encode(["create", "delete"]).unwrap());
    }

    #[test]
    fn test_encode_order_and_duplicates_irrelevant() {
        let a = encode(["modify", "create", "modify"]).unwrap();
        let b = encode(["create", "modify"]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, EventMask::IN_CREATE | EventMask::IN_MODIFY);
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(Vec::<&str>::new()).unwrap(), EventMask::empty());
    }

    #[test]
    fn test_encode_watch_rejects_result_flags() {
        match encode_watch(["create", "isdir"]) {
            Err(Error::InvalidFlag(name)) => assert_eq!(name, "isdir"),
            other => panic!("expected InvalidFlag, got {other:?}"),
        }
        assert_eq!(
            encode_watch(["create", "oneshot"]).unwrap(),
            EventMask::IN_CREATE | EventMask::IN_ONESHOT
        );
    }

    #[test]
    fn test_encode_flags_matches_encode() {
        let typed = encode_flags(&[Flag::Create, Flag::Delete, Flag::Onlydir]);
        let symbolic = encode(["create", "delete", "onlydir"]).unwrap();
        assert_eq!(typed, symbolic);
    }

    #[test]
    fn test_decode_order_is_table_order() {
        let mask = EventMask::IN_ISDIR | EventMask::IN_CREATE | EventMask::IN_ACCESS;
        assert_eq!(decode(mask), vec![Flag::Access, Flag::Create, Flag::Isdir]);
    }

    #[test]
    fn test_decode_ignores_unknown_bits() {
        let mask = EventMask::from_bits_retain(0x0000_1000) | EventMask::IN_MODIFY;
        assert_eq!(decode(mask), vec![Flag::Modify]);
    }

    #[test]
    fn test_names_unique_and_parse_back() {
        for flag in Flag::ALL {
            assert_eq!(flag.name().parse::<Flag>().unwrap(), flag);
            assert_eq!(flag.to_string(), flag.name());
        }
    }
}
