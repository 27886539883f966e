//! Kernel event records and the buffer decoder.
//!
//! A read from an inotify descriptor returns back-to-back records, each a
//! fixed 16-byte header followed by `len` bytes of NUL-padded name.

use crate::flags::{self, EventMask, Flag};
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};

/// Watch descriptor, as returned by `inotify_add_watch`.
pub type WatchDescriptor = i32;

/// Raw inotify event header.
///
/// Field layout matches the kernel's `struct inotify_event`; the name
/// follows the header in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Watch descriptor.
    pub wd: i32,
    /// Event mask.
    pub mask: u32,
    /// Unique cookie associating related events (for rename).
    pub cookie: u32,
    /// Length of the name field (including null terminator and padding).
    pub len: u32,
}

impl RawEvent {
    /// Size of the fixed portion of the event structure.
    pub const HEADER_SIZE: usize = 16;

    /// Calculate total size of this record including the name.
    #[must_use]
    pub const fn total_size(&self) -> usize {
        Self::HEADER_SIZE + self.len as usize
    }

    /// Serialize this event header to bytes.
    #[must_use]
    pub fn header_to_bytes(&self) -> [u8; Self::HEADER_SIZE] {
        let mut buf = [0u8; Self::HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.wd.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.mask.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.cookie.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.len.to_ne_bytes());
        buf
    }

    /// Parse an event header from the start of `buf`.
    ///
    /// Returns `None` if the buffer is too small.
    #[must_use]
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let header = buf.get(..Self::HEADER_SIZE)?;
        Some(Self {
            wd: i32::from_ne_bytes(header[0..4].try_into().ok()?),
            mask: u32::from_ne_bytes(header[4..8].try_into().ok()?),
            cookie: u32::from_ne_bytes(header[8..12].try_into().ok()?),
            len: u32::from_ne_bytes(header[12..16].try_into().ok()?),
        })
    }

    /// Get the event mask as an `EventMask` bitflags value.
    #[must_use]
    pub fn event_mask(&self) -> EventMask {
        EventMask::from_bits_retain(self.mask)
    }
}

/// One decoded inotify event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Watch that produced the event.
    pub wd: WatchDescriptor,
    /// Raw mask as reported by the kernel.
    pub mask: EventMask,
    /// Non-zero only for the two halves of a rename.
    pub cookie: u32,
    /// Entry name inside a watched directory. `None` when the event is
    /// about the watched object itself.
    pub name: Option<OsString>,
    /// Decoded flags, in table order.
    pub events: Vec<Flag>,
}

impl Event {
    /// Build an event from a raw header and the bytes of its name field.
    ///
    /// The name is cut at the first NUL. An empty name field yields `None`.
    #[must_use]
    pub fn from_raw(raw: RawEvent, name: &[u8]) -> Self {
        let name = (raw.len > 0).then(|| {
            let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
            OsString::from_vec(name[..end].to_vec())
        });
        let mask = raw.event_mask();

        Self {
            wd: raw.wd,
            mask,
            cookie: raw.cookie,
            name,
            events: flags::decode(mask),
        }
    }

    /// Whether `flag` is among the decoded events.
    #[must_use]
    pub fn contains(&self, flag: Flag) -> bool {
        self.events.contains(&flag)
    }

    /// Whether the subject of the event is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.mask.contains(EventMask::IN_ISDIR)
    }

    /// The name as a `&str`, if present and valid UTF-8.
    #[must_use]
    pub fn name_str(&self) -> Option<&str> {
        self.name.as_deref().and_then(OsStr::to_str)
    }

    /// Serialize this event in kernel framing.
    ///
    /// The name is null-terminated and padded to the next 4-byte boundary
    /// (matching kernel behavior).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let name = self.name.as_deref().map(OsStr::as_bytes);
        let padded_len = name.map_or(0, |n| padded_name_len(n.len()));

        let raw = RawEvent {
            wd: self.wd,
            mask: self.mask.bits(),
            cookie: self.cookie,
            len: padded_len as u32,
        };

        let mut buf = Vec::with_capacity(raw.total_size());
        buf.extend_from_slice(&raw.header_to_bytes());
        if let Some(name) = name {
            buf.extend_from_slice(name);
        }
        // Null terminator and padding
        buf.resize(raw.total_size(), 0);
        buf
    }
}

/// Length of a name field holding `name_len` bytes plus a NUL, rounded up
/// to 4-byte alignment.
#[must_use]
pub const fn padded_name_len(name_len: usize) -> usize {
    (name_len + 1 + 3) & !3
}

/// Iterator over the records in a buffer filled by one read.
///
/// The slice must hold exactly the valid bytes of the read. A record that
/// would run past the end of the slice ends iteration.
#[derive(Debug, Clone)]
pub struct Events<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Events<'a> {
    /// Decode the records in `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }
}

impl Iterator for Events<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        if self.offset >= self.buf.len() {
            return None;
        }

        let rest = &self.buf[self.offset..];
        let Some(raw) = RawEvent::from_bytes(rest) else {
            tracing::warn!(
                offset = self.offset,
                remaining = rest.len(),
                "Truncated inotify event header"
            );
            self.offset = self.buf.len();
            return None;
        };

        let Some(name) = rest.get(RawEvent::HEADER_SIZE..raw.total_size()) else {
            tracing::warn!(
                offset = self.offset,
                wd = raw.wd,
                len = raw.len,
                "Truncated inotify event name"
            );
            self.offset = self.buf.len();
            return None;
        };

        self.offset += raw.total_size();
        Some(Event::from_raw(raw, name))
    }
}

impl std::iter::FusedIterator for Events<'_> {}
