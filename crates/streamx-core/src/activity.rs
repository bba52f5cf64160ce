use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use streamx_common::Snapshot;

/// One scheduler tick: the snapshots produced by one sampling cycle plus the
/// cycle's statistics snapshot.
#[derive(Debug)]
pub struct Activity {
    id: String,
    name: String,
    started_at: DateTime<Utc>,
    started: Instant,
    elapsed: Option<Duration>,
    noop: bool,
    snapshots: Vec<Snapshot>,
    aggregates: Vec<usize>,
}

impl Activity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: streamx_common::id::next_id(),
            name: name.into(),
            started_at: Utc::now(),
            started: Instant::now(),
            elapsed: None,
            noop: false,
            snapshots: Vec::new(),
            aggregates: Vec::new(),
        }
    }

    /// Tracking id, unique per process.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Marks the activity as a no-op; the handler then skips sampling.
    pub fn mark_noop(&mut self) {
        self.noop = true;
    }

    pub fn is_noop(&self) -> bool {
        self.noop
    }

    /// Freezes the elapsed time. Later calls keep the first value.
    pub fn stop(&mut self) {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.started.elapsed());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    pub fn add_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    /// Adds a snapshot computed from the other snapshots of this activity.
    pub fn add_aggregate(&mut self, snapshot: Snapshot) {
        self.aggregates.push(self.snapshots.len());
        self.snapshots.push(snapshot);
    }

    /// Snapshots added through [`add_aggregate`](Self::add_aggregate).
    pub fn aggregates(&self) -> impl Iterator<Item = &Snapshot> {
        self.aggregates.iter().filter_map(|&i| self.snapshots.get(i))
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn snapshot_mut(&mut self, category: &str, name: &str) -> Option<&mut Snapshot> {
        self.snapshots
            .iter_mut()
            .find(|s| s.category() == category && s.name() == name)
    }

    pub fn take_snapshots(&mut self) -> Vec<Snapshot> {
        self.aggregates.clear();
        std::mem::take(&mut self.snapshots)
    }
}
