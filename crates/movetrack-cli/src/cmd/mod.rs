pub mod alerts;
pub mod config;
pub mod docs;
pub mod events;
pub mod init;
pub mod milestone;
pub mod moves;
pub mod serve;

use anyhow::Context;
use movetrack_core::tracker::Tracker;
use std::path::Path;

/// Open the tracker for the project at `root`.
pub(crate) fn open_tracker(root: &Path) -> anyhow::Result<Tracker> {
    Tracker::open(root).with_context(|| format!("failed to open tracker at {}", root.display()))
}
