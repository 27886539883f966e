//! inotifier-watch - callback dispatch and recursive watches over [`inotifier`].
//!
//! [`Dispatcher`] keeps the association between watch descriptors, paths
//! and callbacks that the bare notifier leaves to its caller, and
//! [`Dispatcher::rwatch`] extends a watch to a whole directory tree.
//!
//! # Example
//!
//! ```no_run
//! use inotifier_watch::Dispatcher;
//!
//! let mut dispatcher = Dispatcher::new()?;
//! let stop = dispatcher.stop_handle();
//!
//! dispatcher.rwatch("/srv/data", ["create", "delete"], move |ev| {
//!     println!("{} {:?}", ev.path().display(), ev.event.events);
//!     stop.stop();
//!     Ok(())
//! })?;
//!
//! dispatcher.run()?;
//! # Ok::<_, inotifier_watch::WatchError>(())
//! ```

mod dispatcher;
mod error;
mod limits;
mod recursive;

pub use dispatcher::{Callback, Dispatcher, StopHandle, WatchEvent};
pub use error::WatchError;
pub use limits::{max_queued_events, max_user_instances, max_user_watches};
