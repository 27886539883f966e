//! Per-watch callback dispatch.
//!
//! This module manages:
//! - The notifier descriptor
//! - The watch table (descriptor -> path, mask, callback)
//! - Routing each decoded event to the callback of the watch that produced it

use crate::error::WatchError;
use inotifier::{Event, EventMask, Flag, Notifier, WatchDescriptor, encode_watch};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Callback invoked for every event of a watch.
///
/// Shared so that all directories of one recursive watch can use the same
/// closure.
pub type Callback = Arc<Mutex<dyn FnMut(&WatchEvent) -> Result<(), WatchError> + Send>>;

/// An event together with the path of the watch that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// The decoded kernel event.
    pub event: Event,
    /// Path the watch was registered with.
    pub watched_path: PathBuf,
}

impl WatchEvent {
    /// Full path of the event subject.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        match &self.event.name {
            Some(name) => self.watched_path.join(name),
            None => self.watched_path.clone(),
        }
    }
}

/// A registered watch.
pub(crate) struct Watcher {
    pub(crate) path: PathBuf,
    pub(crate) mask: EventMask,
    pub(crate) recursive: bool,
    pub(crate) callback: Callback,
}

/// Handle that asks a running [`Dispatcher::run`] loop to return.
///
/// The flag is checked between batches, so a blocked read finishes first.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Request the loop to stop after the current batch.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns a [`Notifier`] and routes its events to per-watch callbacks.
pub struct Dispatcher {
    notifier: Notifier,
    pub(crate) watchers: HashMap<WatchDescriptor, Watcher>,
    stop: StopHandle,
    overflows: u64,
}

impl Dispatcher {
    /// Create a dispatcher over a new blocking notifier.
    pub fn new() -> Result<Self, WatchError> {
        Ok(Self::with_notifier(Notifier::new()?))
    }

    /// Create a dispatcher over an existing notifier.
    #[must_use]
    pub fn with_notifier(notifier: Notifier) -> Self {
        Self {
            notifier,
            watchers: HashMap::new(),
            stop: StopHandle::default(),
            overflows: 0,
        }
    }

    /// The underlying notifier.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// A handle that stops [`Dispatcher::run`].
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Watch `path` and call `callback` for each of its events.
    ///
    /// Watching a path that is already watched replaces its callback.
    pub fn watch<P, I, S, F>(
        &mut self,
        path: P,
        flags: I,
        callback: F,
    ) -> Result<WatchDescriptor, WatchError>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&WatchEvent) -> Result<(), WatchError> + Send + 'static,
    {
        let mask = encode_watch(flags)?;
        let callback: Callback = Arc::new(Mutex::new(callback));
        self.insert_watch(path.as_ref(), mask, callback, false)
    }

    pub(crate) fn insert_watch(
        &mut self,
        path: &Path,
        mask: EventMask,
        callback: Callback,
        recursive: bool,
    ) -> Result<WatchDescriptor, WatchError> {
        let wd = self.notifier.add_watch_mask(path, mask)?;
        self.watchers.insert(
            wd,
            Watcher {
                path: path.to_path_buf(),
                mask,
                recursive,
                callback,
            },
        );
        Ok(wd)
    }

    /// Remove a watch by descriptor.
    pub fn unwatch_by_wd(&mut self, wd: WatchDescriptor) -> Result<(), WatchError> {
        self.notifier.remove_watch(wd)?;
        self.watchers.remove(&wd);
        Ok(())
    }

    /// Remove the watch registered for `path`.
    pub fn unwatch_by_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), WatchError> {
        let path = path.as_ref();
        let wd = self
            .wd_for_path(path)
            .ok_or_else(|| WatchError::NotWatched(path.to_path_buf()))?;
        self.unwatch_by_wd(wd)
    }

    /// Path registered for `wd`.
    #[must_use]
    pub fn watched_path(&self, wd: WatchDescriptor) -> Option<&Path> {
        self.watchers.get(&wd).map(|w| w.path.as_path())
    }

    /// Descriptor registered for `path`.
    #[must_use]
    pub fn wd_for_path(&self, path: &Path) -> Option<WatchDescriptor> {
        self.watchers
            .iter()
            .find(|(_, w)| w.path == path)
            .map(|(&wd, _)| wd)
    }

    /// All registered watches.
    pub fn watches(&self) -> impl Iterator<Item = (WatchDescriptor, &Path)> {
        self.watchers.iter().map(|(&wd, w)| (wd, w.path.as_path()))
    }

    /// Number of `q_overflow` events seen so far.
    #[must_use]
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Number of registered watches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    /// Whether no watch is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Read one batch and dispatch it.
    ///
    /// Returns the number of events handed to callbacks. A callback error
    /// stops the batch.
    pub fn process(&mut self) -> Result<usize, WatchError> {
        let events = self.notifier.read_batch()?;
        tracing::trace!(count = events.len(), "Dispatching batch");

        let mut delivered = 0;
        for event in events {
            if self.dispatch(event)? {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Route one event to its watch. Returns `false` if no watch claims it.
    pub fn dispatch(&mut self, event: Event) -> Result<bool, WatchError> {
        if event.contains(Flag::QOverflow) {
            self.overflows += 1;
            tracing::warn!(overflows = self.overflows, "Event queue overflowed, events were lost");
        }

        let Some(watcher) = self.watchers.get(&event.wd) else {
            tracing::trace!(wd = event.wd, events = ?event.events, "Event for unknown watch");
            return Ok(false);
        };

        let watched_path = watcher.path.clone();
        let callback = Arc::clone(&watcher.callback);

        if watcher.recursive {
            let (mask, wd) = (watcher.mask, event.wd);
            self.follow_tree(&event, &watched_path, mask, &callback)?;
            if event.contains(Flag::DeleteSelf) {
                self.watchers.remove(&wd);
            }
        }

        let ignored = event.contains(Flag::Ignored);
        let wd = event.wd;
        let watch_event = WatchEvent {
            event,
            watched_path,
        };
        {
            let mut callback = callback.lock();
            (&mut *callback)(&watch_event)?;
        }

        if ignored {
            // The kernel already dropped the watch.
            self.watchers.remove(&wd);
        }
        Ok(true)
    }

    /// Process batches until [`StopHandle::stop`] is called.
    pub fn run(&mut self) -> Result<(), WatchError> {
        self.stop.reset();
        while !self.stop.is_stopped() {
            self.process()?;
        }
        Ok(())
    }

    /// Close the notifier and forget every watch.
    pub fn close(&mut self) -> Result<(), WatchError> {
        self.watchers.clear();
        self.notifier.close()?;
        Ok(())
    }
}

impl AsRawFd for Dispatcher {
    fn as_raw_fd(&self) -> RawFd {
        self.notifier.as_raw_fd()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("notifier", &self.notifier)
            .field("watches", &self.watchers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn event(wd: WatchDescriptor, mask: EventMask, name: Option<&str>) -> Event {
        Event {
            wd,
            mask,
            cookie: 0,
            name: name.map(OsString::from),
            events: inotifier::decode(mask),
        }
    }

    fn recorder() -> (Callback, Arc<Mutex<Vec<WatchEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: Callback =
            Arc::new(Mutex::new(move |ev: &WatchEvent| -> Result<(), WatchError> {
                sink.lock().push(ev.clone());
                Ok(())
            }));
        (callback, seen)
    }

    fn with_fake_watch(path: &str) -> (Dispatcher, Arc<Mutex<Vec<WatchEvent>>>) {
        let mut dispatcher = Dispatcher::new().unwrap();
        let (callback, seen) = recorder();
        dispatcher.watchers.insert(
            7,
            Watcher {
                path: PathBuf::from(path),
                mask: EventMask::IN_CREATE,
                recursive: false,
                callback,
            },
        );
        (dispatcher, seen)
    }

    #[test]
    fn test_watch_event_path() {
        let ev = WatchEvent {
            event: event(1, EventMask::IN_CREATE, Some("a.txt")),
            watched_path: PathBuf::from("/srv"),
        };
        assert_eq!(ev.path(), PathBuf::from("/srv/a.txt"));

        let ev = WatchEvent {
            event: event(1, EventMask::IN_DELETE_SELF, None),
            watched_path: PathBuf::from("/srv"),
        };
        assert_eq!(ev.path(), PathBuf::from("/srv"));
    }

    #[test]
    fn test_dispatch_routes_to_callback() {
        let (mut dispatcher, seen) = with_fake_watch("/srv");

        assert!(dispatcher.dispatch(event(7, EventMask::IN_CREATE, Some("x"))).unwrap());
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].watched_path, PathBuf::from("/srv"));
        assert_eq!(seen[0].event.name_str(), Some("x"));
    }

    #[test]
    fn test_dispatch_skips_unknown_wd() {
        let (mut dispatcher, seen) = with_fake_watch("/srv");
        assert!(!dispatcher.dispatch(event(99, EventMask::IN_CREATE, None)).unwrap());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_queue_overflow_counted() {
        let (mut dispatcher, seen) = with_fake_watch("/srv");
        assert_eq!(dispatcher.overflows(), 0);

        assert!(!dispatcher.dispatch(event(-1, EventMask::IN_Q_OVERFLOW, None)).unwrap());
        assert_eq!(dispatcher.overflows(), 1);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_ignored_drops_entry_after_callback() {
        let (mut dispatcher, seen) = with_fake_watch("/srv");
        dispatcher.dispatch(event(7, EventMask::IN_IGNORED, None)).unwrap();
        assert_eq!(seen.lock().len(), 1);
        assert!(dispatcher.watched_path(7).is_none());
    }

    #[test]
    fn test_callback_error_propagates() {
        let mut dispatcher = Dispatcher::new().unwrap();
        dispatcher.watchers.insert(
            3,
            Watcher {
                path: PathBuf::from("/srv"),
                mask: EventMask::IN_CREATE,
                recursive: false,
                callback: Arc::new(Mutex::new(|_: &WatchEvent| -> Result<(), WatchError> {
                    Err(WatchError::callback("boom"))
                })),
            },
        );
        let err = dispatcher.dispatch(event(3, EventMask::IN_CREATE, None)).unwrap_err();
        assert_eq!(err.to_string(), "callback failed: boom");
    }

    #[test]
    fn test_unwatch_unknown_path() {
        let mut dispatcher = Dispatcher::new().unwrap();
        assert!(matches!(
            dispatcher.unwatch_by_path("/nowhere"),
            Err(WatchError::NotWatched(_))
        ));
    }

    #[test]
    fn test_stop_handle() {
        let handle = StopHandle::default();
        assert!(!handle.is_stopped());
        handle.clone().stop();
        assert!(handle.is_stopped());
        handle.reset();
        assert!(!handle.is_stopped());
    }
}
