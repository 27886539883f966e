//! Watching whole directory trees.
//!
//! A recursive watch registers every directory below a root and follows
//! the tree as it changes: new subdirectories are watched as soon as their
//! `create` or `moved_to` event is dispatched.

use crate::dispatcher::{Callback, Dispatcher, WatchEvent};
use crate::error::WatchError;
use crate::limits;
use inotifier::{Event, EventMask, Flag, WatchDescriptor, encode_watch};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Events a recursive watch always needs to keep the tree in sync.
const TREE_MASK: EventMask = EventMask::IN_CREATE
    .union(EventMask::IN_MOVED_TO)
    .union(EventMask::IN_DELETE_SELF);

impl Dispatcher {
    /// Watch `root` and every directory below it.
    ///
    /// `create`, `moved_to` and `delete_self` are added to `flags` so the
    /// tree can be followed; the callback sees those events too. Returns
    /// the descriptors registered now.
    pub fn rwatch<P, I, S, F>(
        &mut self,
        root: P,
        flags: I,
        callback: F,
    ) -> Result<Vec<WatchDescriptor>, WatchError>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&WatchEvent) -> Result<(), WatchError> + Send + 'static,
    {
        let mask = encode_watch(flags)? | TREE_MASK;
        let callback: Callback = Arc::new(Mutex::new(callback));
        self.watch_tree(root.as_ref(), mask, &callback)
    }

    fn watch_tree(
        &mut self,
        root: &Path,
        mask: EventMask,
        callback: &Callback,
    ) -> Result<Vec<WatchDescriptor>, WatchError> {
        let dirs = collect_dirs(root)?;
        check_limit(dirs.len(), limits::max_user_watches()?)?;

        let mut wds = Vec::with_capacity(dirs.len());
        for dir in dirs {
            match self.insert_watch(&dir, mask, Arc::clone(callback), true) {
                Ok(wd) => wds.push(wd),
                // Removed while we were walking the tree.
                Err(err) if err.is_not_found() => {
                    tracing::warn!(path = %dir.display(), "Directory vanished before watch");
                }
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(root = %root.display(), count = wds.len(), "Tree watched");
        Ok(wds)
    }

    /// Start watching a subdirectory that appeared under a recursive watch.
    pub(crate) fn follow_tree(
        &mut self,
        event: &Event,
        watched_path: &Path,
        mask: EventMask,
        callback: &Callback,
    ) -> Result<(), WatchError> {
        let appeared = event.contains(Flag::Create) || event.contains(Flag::MovedTo);
        let Some(name) = event.name.as_ref().filter(|_| appeared && event.is_dir()) else {
            return Ok(());
        };

        let child = watched_path.join(name);
        match self.watch_tree(&child, mask, callback) {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                tracing::warn!(path = %child.display(), "New directory vanished before watch");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Fail if `count` watches would exceed the per-user `limit`.
fn check_limit(count: usize, limit: u64) -> Result<(), WatchError> {
    if count as u64 > limit {
        return Err(WatchError::TooManyWatches { count, limit });
    }
    Ok(())
}

/// `root` followed by every directory below it, breadth first.
///
/// Symlinks are not followed. Subdirectories removed during the walk are
/// skipped; an unreadable root is an error.
fn collect_dirs(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut queue = VecDeque::from([root.to_path_buf()]);

    while let Some(dir) = queue.pop_front() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound && dir != root => continue,
            Err(err) => return Err(err),
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                queue.push_back(entry.path());
            }
        }
        dirs.push(dir);
    }

    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_dirs_breadth_first() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("a/b/c")).unwrap();
        fs::create_dir(root.path().join("d")).unwrap();
        fs::write(root.path().join("a/file"), b"").unwrap();

        let dirs = collect_dirs(root.path()).unwrap();
        assert_eq!(dirs.len(), 5);
        assert_eq!(dirs[0], root.path());
        assert!(dirs.contains(&root.path().join("a/b/c")));
        assert!(!dirs.contains(&root.path().join("a/file")));

        let depth = |p: &PathBuf| p.components().count();
        assert!(dirs.windows(2).all(|w| depth(&w[0]) <= depth(&w[1])));
    }

    #[test]
    fn test_collect_dirs_skips_symlinks() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("real")).unwrap();
        std::os::unix::fs::symlink(root.path().join("real"), root.path().join("link")).unwrap();

        let dirs = collect_dirs(root.path()).unwrap();
        assert_eq!(dirs.len(), 2);
        assert!(!dirs.contains(&root.path().join("link")));
    }

    #[test]
    fn test_collect_dirs_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let err = collect_dirs(&root.path().join("gone")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_check_limit() {
        assert!(check_limit(0, 0).is_ok());
        assert!(check_limit(8192, 8192).is_ok());
        assert!(matches!(
            check_limit(8193, 8192),
            Err(WatchError::TooManyWatches {
                count: 8193,
                limit: 8192
            })
        ));
    }

    #[test]
    fn test_tree_mask_contents() {
        assert!(TREE_MASK.contains(EventMask::IN_CREATE));
        assert!(TREE_MASK.contains(EventMask::IN_MOVED_TO));
        assert!(TREE_MASK.contains(EventMask::IN_DELETE_SELF));
    }
}
