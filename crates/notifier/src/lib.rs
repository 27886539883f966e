//! inotifier - a minimal, faithful wrapper around Linux inotify.
//!
//! This crate provides:
//! - [`EventMask`] bitflags matching the kernel's mask values
//! - [`Flag`] symbolic names with [`encode`]/[`decode`] between symbols and masks
//! - [`Events`], a decoder over the buffer returned by one `read`
//! - [`Notifier`], owning one inotify descriptor: add/remove watches, read, close
//!
//! # Example
//!
//! ```no_run
//! use inotifier::{Flag, Notifier};
//!
//! let mut notifier = Notifier::new()?;
//! let wd = notifier.add_watch("/tmp", ["create", "delete"])?;
//!
//! notifier.read_events(|event| {
//!     if event.contains(Flag::Create) {
//!         println!("created {:?} under wd {}", event.name, event.wd);
//!     }
//!     Ok::<_, inotifier::Error>(())
//! })?;
//!
//! notifier.remove_watch(wd)?;
//! notifier.close()?;
//! # Ok::<_, inotifier::Error>(())
//! ```

mod error;
mod event;
mod flags;
mod notifier;

// Re-export main types at crate root
pub use error::Error;
pub use event::{Event, Events, RawEvent, WatchDescriptor, padded_name_len};
pub use flags::{EventMask, Flag, decode, encode, encode_flags, encode_watch};
pub use notifier::{InitFlags, MAX_EVENT_SIZE, Notifier, READ_BUFFER_SIZE};

