//! The common walk skeleton shared by all three drivers, and the
//! `Created -> Started -> Walking -> Stopped` state machine each driver embeds.
//!
//! The traversal itself is built on `ignore::WalkBuilder` with every standard
//! ignore-file filter switched off — it is used purely as a recursive directory
//! walker, not for `.gitignore` semantics. Its `filter_entry` hook is where exclusion
//! prefixes prune whole subtrees, so an excluded directory is never descended into.

use ignore::WalkBuilder;

use crate::error::{Error, Result};
use crate::exclude::is_excluded;
use crate::record::FileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Started,
    Walking,
    Stopped,
}

/// Tracks one driver's position in the `Created -> Started -> Walking -> Stopped`
/// lifecycle and rejects out-of-order calls.
#[derive(Debug)]
pub struct WalkerState(Phase);

impl Default for WalkerState {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkerState {
    pub fn new() -> Self {
        WalkerState(Phase::Created)
    }

    /// Idempotent-failure: a second call returns `Error::AlreadyStarted`.
    pub fn start(&mut self) -> Result<()> {
        if self.0 != Phase::Created {
            return Err(Error::AlreadyStarted);
        }
        self.0 = Phase::Started;
        Ok(())
    }

    /// Only valid from `Started`.
    pub fn begin_walking(&mut self) -> Result<()> {
        if self.0 != Phase::Started {
            return Err(Error::InvalidState);
        }
        self.0 = Phase::Walking;
        Ok(())
    }

    /// Valid from `Walking` or `Started`; releases resources regardless of which.
    pub fn stop(&mut self) -> Result<()> {
        if !matches!(self.0, Phase::Walking | Phase::Started) {
            return Err(Error::InvalidState);
        }
        self.0 = Phase::Stopped;
        Ok(())
    }
}

/// Recursively walks `root`, skipping excluded subtrees entirely, and invokes
/// `on_entry` with a skeletal (digest-less) [`FileRecord`] for every surviving entry.
/// Per-entry traversal errors are logged and skipped, except `NotFound`, which is
/// silently ignored (the filesystem changed mid-walk).
pub fn walk_tree<F>(root: &str, excludes: &[String], verbose: bool, mut on_entry: F) -> Result<()>
where
    F: FnMut(FileRecord),
{
    let prune_excludes = excludes.to_vec();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| !is_excluded(&entry.path().to_string_lossy(), &prune_excludes))
        .build();

    for result in walker {
        match result {
            Ok(entry) => {
                let path = entry.path();
                if verbose {
                    log::debug!("visiting {}", path.display());
                }
                let meta = match entry.metadata() {
                    Ok(m) => m,
                    Err(e) => {
                        log_walk_error(&e);
                        continue;
                    }
                };
                let path_str = path.to_string_lossy().into_owned();
                on_entry(FileRecord::from_metadata(path_str, &meta));
            }
            Err(e) => log_walk_error(&e),
        }
    }
    Ok(())
}

fn log_walk_error(err: &ignore::Error) {
    if let Some(io_err) = err.io_error() {
        if io_err.kind() == std::io::ErrorKind::NotFound {
            return;
        }
    }
    log::warn!("walk error: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_rejects_out_of_order_calls() {
        let mut s = WalkerState::new();
        assert!(s.begin_walking().is_err());
        assert!(s.stop().is_err()); // stop is only valid from Started/Walking
    }

    #[test]
    fn start_is_idempotent_failure() {
        let mut s = WalkerState::new();
        s.start().unwrap();
        assert!(matches!(s.start(), Err(Error::AlreadyStarted)));
    }

    #[test]
    fn happy_path_transitions() {
        let mut s = WalkerState::new();
        s.start().unwrap();
        s.begin_walking().unwrap();
        s.stop().unwrap();
    }

    #[test]
    fn excluded_subtree_is_never_descended() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("skip_me");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("inner.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"y").unwrap();

        let exclude = sub.to_string_lossy().into_owned();
        let mut seen = Vec::new();
        walk_tree(&dir.path().to_string_lossy(), &[exclude], false, |r| {
            seen.push(r.path);
        })
        .unwrap();

        assert!(seen.iter().any(|p| p.ends_with("keep.txt")));
        assert!(!seen.iter().any(|p| p.contains("inner.txt")));
    }
}
