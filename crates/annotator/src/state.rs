use crate::markers::{Marker, MarkerKind};
use crate::refs::CommitRef;

/// The latest commit seen by the previous successful pass. Owned by the reconciler and
/// threaded through every pass; empty until a pass finds a latest commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LatestState {
    latest: Option<CommitRef>,
}

impl LatestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_latest(&self) -> Option<&CommitRef> {
        self.latest.as_ref()
    }

    pub fn set_latest(&mut self, commit: CommitRef) {
        self.latest = Some(commit);
    }
}

/// The latest commit moved from `stale` to `current`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub stale: CommitRef,
    pub current: CommitRef,
}

impl Transition {
    /// Markers tagged with the old latest commit, of either kind, and diff markers that still
    /// point at it.
    pub fn is_stale(&self, marker: &Marker) -> bool {
        marker.commit == self.stale
            || (marker.kind == MarkerKind::Diff && marker.latest.as_ref() == Some(&self.stale))
    }
}

pub fn on_latest_changed(old: Option<&CommitRef>, new: &CommitRef) -> Option<Transition> {
    let old = old?;
    (old != new).then(|| Transition {
        stale: old.clone(),
        current: new.clone(),
    })
}
