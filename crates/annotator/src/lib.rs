//! Commit-diff annotation for pull-request pages.
//!
//! Each pass finds the latest commit of the pull request, enumerates the abbreviated hash
//! badges on the page, and places one marker after each badge: a diff marker that opens the
//! changes between that commit and the latest one, or a latest marker on the head commit
//! itself. Passes work against any [`ElementTree`].

pub mod config;
pub mod discovery;
pub mod markers;
pub mod page;
pub mod reconcile;
pub mod refs;
pub mod state;
pub mod tree;

pub use config::{Config, ConfigError, SelectorTable, Settings, Timing};
pub use discovery::{CommitMention, LatestSource, find_mentions, resolve_latest};
pub use markers::{
    Activation, MARKER_CLASS, Marker, MarkerError, MarkerKind, Navigator, activate_marker,
    make_diff_marker, make_latest_marker,
};
pub use page::{PageContext, extract_page_context, is_pr_page};
pub use reconcile::{PassOutcome, PassReport, Reconciler, SkipReason, reconcile};
pub use refs::{CommitRef, extract_commit_ref};
pub use state::{LatestState, Transition, on_latest_changed};
pub use tree::{ElementSpec, ElementTree};
