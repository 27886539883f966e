//! The inotify descriptor and its watch lifecycle.

use crate::error::Error;
use crate::event::{Event, Events, RawEvent, WatchDescriptor};
use crate::flags::{self, EventMask};
use bitflags::bitflags;
use std::ffi::CString;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Longest filename the kernel will put in a record, excluding the NUL.
const NAME_MAX: usize = 255;

/// Largest single record the kernel can produce.
pub const MAX_EVENT_SIZE: usize = RawEvent::HEADER_SIZE + NAME_MAX + 1;

/// Capacity of the buffer handed to each `read`.
///
/// Large enough that one read normally drains a whole burst.
pub const READ_BUFFER_SIZE: usize = 1024 * MAX_EVENT_SIZE;

bitflags! {
    /// Flags for `inotify_init1`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InitFlags: libc::c_int {
        /// Reads return `EAGAIN` instead of blocking.
        const NONBLOCK = libc::IN_NONBLOCK;
        /// Close the descriptor on `exec`.
        const CLOEXEC = libc::IN_CLOEXEC;
    }
}

/// Owner of one inotify descriptor.
///
/// A `Notifier` is open from construction until [`Notifier::close`]. Every
/// operation on a closed notifier fails with [`Error::InvalidState`].
/// Dropping an open notifier closes the descriptor.
#[derive(Debug)]
pub struct Notifier {
    fd: Option<OwnedFd>,
}

impl Notifier {
    /// Create a notifier with a blocking descriptor.
    pub fn new() -> Result<Self, Error> {
        Self::with_flags(InitFlags::empty())
    }

    /// Create a notifier, passing `flags` to `inotify_init1`.
    pub fn with_flags(flags: InitFlags) -> Result<Self, Error> {
        // SAFETY: inotify_init1 takes no pointers.
        let fd = unsafe { libc::inotify_init1(flags.bits()) };
        if fd == -1 {
            return Err(Error::last_os_error("inotify_init"));
        }

        // SAFETY: fd was just returned by the kernel and nothing else owns it.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        tracing::debug!(fd = fd.as_raw_fd(), flags = ?flags, "Notifier opened");

        Ok(Self { fd: Some(fd) })
    }

    /// Whether [`Notifier::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.fd.is_none()
    }

    fn raw_fd(&self) -> Result<RawFd, Error> {
        self.fd
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or(Error::InvalidState)
    }

    /// Watch `path` for the events named by `flags`.
    ///
    /// Returns the watch descriptor that later events carry. Watching a
    /// path that is already watched returns the existing descriptor.
    pub fn add_watch<P, I, S>(&self, path: P, flags: I) -> Result<WatchDescriptor, Error>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.raw_fd()?;
        let mask = flags::encode_watch(flags)?;
        self.add_watch_mask(path, mask)
    }

    /// Watch `path` with an already-encoded mask.
    pub fn add_watch_mask<P: AsRef<Path>>(
        &self,
        path: P,
        mask: EventMask,
    ) -> Result<WatchDescriptor, Error> {
        let fd = self.raw_fd()?;
        let path = path.as_ref();
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| Error::InvalidPath(path.to_path_buf()))?;

        // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
        let wd = unsafe { libc::inotify_add_watch(fd, c_path.as_ptr(), mask.bits()) };
        if wd == -1 {
            return Err(Error::last_os_error("inotify_add_watch"));
        }

        tracing::debug!(wd, path = %path.display(), mask = ?mask, "Watch added");
        Ok(wd)
    }

    /// Remove a watch.
    ///
    /// Fails if the kernel no longer knows `wd`, for example after an
    /// `ignored` event was delivered for it.
    pub fn remove_watch(&self, wd: WatchDescriptor) -> Result<(), Error> {
        let fd = self.raw_fd()?;

        // SAFETY: plain integer arguments.
        if unsafe { libc::inotify_rm_watch(fd, wd) } == -1 {
            return Err(Error::last_os_error("inotify_rm_watch"));
        }

        tracing::debug!(wd, "Watch removed");
        Ok(())
    }

    /// Perform one read and hand each decoded event to `handler`, in order.
    ///
    /// Blocks until at least one event is queued (unless the notifier was
    /// created with [`InitFlags::NONBLOCK`]). An error from `handler` stops
    /// dispatch and is returned; the rest of the batch is dropped.
    ///
    /// Returns the number of events dispatched.
    pub fn read_events<F, E>(&self, mut handler: F) -> Result<usize, E>
    where
        F: FnMut(Event) -> Result<(), E>,
        E: From<Error>,
    {
        let fd = self.raw_fd()?;
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        // SAFETY: buffer is valid for writes of buffer.len() bytes.
        let nread = unsafe { libc::read(fd, buffer.as_mut_ptr().cast(), buffer.len()) };
        if nread < 0 {
            return Err(Error::last_os_error("read").into());
        }

        let nread = nread as usize;
        tracing::trace!(fd, bytes = nread, "Read inotify buffer");

        let mut count = 0;
        for event in Events::new(&buffer[..nread]) {
            handler(event)?;
            count += 1;
        }
        Ok(count)
    }

    /// Perform one read and collect the decoded events.
    pub fn read_batch(&self) -> Result<Vec<Event>, Error> {
        let mut events = Vec::new();
        self.read_events(|event| {
            events.push(event);
            Ok::<_, Error>(())
        })?;
        Ok(events)
    }

    /// Close the descriptor.
    ///
    /// The notifier is closed afterwards even if the kernel reports an error.
    pub fn close(&mut self) -> Result<(), Error> {
        let fd = self.fd.take().ok_or(Error::InvalidState)?.into_raw_fd();

        // SAFETY: fd came out of an OwnedFd, so it is open and closed only here.
        if unsafe { libc::close(fd) } == -1 {
            return Err(Error::last_os_error("close"));
        }

        tracing::debug!(fd, "Notifier closed");
        Ok(())
    }
}

/// Exposes the descriptor for readiness polling. A closed notifier
/// reports `-1`.
impl AsRawFd for Notifier {
    fn as_raw_fd(&self) -> RawFd {
        self.raw_fd().unwrap_or(-1)
    }
}
