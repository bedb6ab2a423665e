//! One reconciliation pass: locate everything afresh, then make the markers on the page agree
//! with the current latest commit.
//!
//! A pass is idempotent. Running it again on an unchanged page edits nothing and leaves the
//! latest state as it was.

use crate::config::Settings;
use crate::discovery::{CommitMention, LatestSource, find_mentions, resolve_latest};
use crate::markers::{Marker, MarkerError, MarkerKind, make_diff_marker, make_latest_marker};
use crate::page::{PageContext, extract_page_context, is_pr_page};
use crate::refs::CommitRef;
use crate::state::{LatestState, Transition, on_latest_changed};
use crate::tree::ElementTree;
use std::fmt;

/// Why a pass left the page untouched. None of these are failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NotAPrPage,
    NoContextDerivable,
    NoLatestRefFound,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NotAPrPage => "not a pull request page",
            SkipReason::NoContextDerivable => "pull request context not derivable",
            SkipReason::NoLatestRefFound => "no latest commit found",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    pub latest: CommitRef,
    pub source: LatestSource,
    pub mentions: usize,
    pub inserted: usize,
    pub removed: usize,
    pub transition: Option<Transition>,
}

impl PassReport {
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.removed == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    Skipped(SkipReason),
    Reconciled(PassReport),
}

impl PassOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Reconciled(report) => Some(report),
            PassOutcome::Skipped(_) => None,
        }
    }
}

#[derive(Debug)]
enum MentionError<E> {
    Marker(MarkerError),
    Tree(E),
}

impl<E: fmt::Display> fmt::Display for MentionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MentionError::Marker(e) => write!(f, "{e}"),
            MentionError::Tree(e) => write!(f, "tree edit failed: {e}"),
        }
    }
}

#[derive(Default)]
struct Edits {
    inserted: usize,
    removed: usize,
}

/// Run one pass over `tree` for the page at `path`.
pub fn reconcile<T: ElementTree>(
    tree: &mut T,
    path: &str,
    settings: &Settings,
    state: &mut LatestState,
) -> PassOutcome {
    if !is_pr_page(path) {
        return PassOutcome::Skipped(SkipReason::NotAPrPage);
    }
    let Some(ctx) = extract_page_context(path) else {
        return PassOutcome::Skipped(SkipReason::NoContextDerivable);
    };
    let Some((latest, source)) = resolve_latest(&*tree, &settings.table) else {
        return PassOutcome::Skipped(SkipReason::NoLatestRefFound);
    };

    let mut edits = Edits::default();
    let transition = on_latest_changed(state.previous_latest(), &latest);
    if let Some(t) = &transition {
        log::debug!(
            target: "annotator.reconcile",
            "latest moved {} -> {}",
            t.stale.short(),
            t.current.short()
        );
        edits.removed += remove_stale(tree, settings, t);
    }
    state.set_latest(latest.clone());

    let mentions = find_mentions(&*tree, &settings.table);
    for mention in &mentions {
        match ensure_marker(tree, settings, &ctx, &latest, mention) {
            Ok(done) => {
                edits.inserted += done.inserted;
                edits.removed += done.removed;
            }
            Err(e) => log::warn!(
                target: "annotator.reconcile",
                "skipping mention of {}: {e}",
                mention.commit.short()
            ),
        }
    }

    PassOutcome::Reconciled(PassReport {
        latest,
        source,
        mentions: mentions.len(),
        inserted: edits.inserted,
        removed: edits.removed,
        transition,
    })
}

// Drop every marker that belongs to the old latest commit, anywhere in the document.
fn remove_stale<T: ElementTree>(tree: &mut T, settings: &Settings, transition: &Transition) -> usize {
    let stale: Vec<_> = tree
        .select_all(&settings.table.markers)
        .into_iter()
        .filter(|&node| Marker::read(&*tree, node).is_some_and(|m| transition.is_stale(&m)))
        .collect();
    let mut removed = 0;
    for node in stale {
        match tree.remove(node) {
            Ok(()) => removed += 1,
            Err(e) => log::warn!(target: "annotator.reconcile", "cannot remove stale marker: {e}"),
        }
    }
    removed
}

// Leave exactly one correctly kinded marker for this mention and drop strays of its commit
// under the same parent.
fn ensure_marker<T: ElementTree>(
    tree: &mut T,
    settings: &Settings,
    ctx: &PageContext,
    latest: &CommitRef,
    mention: &CommitMention<T::NodeRef>,
) -> Result<Edits, MentionError<T::Error>> {
    let wanted = if &mention.commit == latest {
        make_latest_marker(&mention.commit)
    } else {
        make_diff_marker(&mention.commit, latest, ctx, &settings.host).map_err(MentionError::Marker)?
    };
    let Some(parent) = tree.parent(mention.node) else {
        return Ok(Edits::default());
    };

    let mut edits = Edits::default();
    let mut present = false;
    let scoped: Vec<_> = tree
        .select_within(parent, &settings.table.markers)
        .into_iter()
        .filter_map(|node| Marker::read(&*tree, node).map(|m| (node, m)))
        .filter(|(_, m)| m.commit == mention.commit)
        .collect();
    for (node, marker) in scoped {
        if is_current(&marker, &wanted) {
            present = true;
        } else {
            tree.remove(node).map_err(MentionError::Tree)?;
            edits.removed += 1;
        }
    }

    let follows = tree
        .next_sibling(mention.node)
        .filter(|&next| tree.is_element(next))
        .and_then(|next| Marker::read(&*tree, next))
        .is_some_and(|m| is_current(&m, &wanted));
    if !(present || follows) {
        tree.insert_after(mention.node, &wanted.to_element())
            .map_err(MentionError::Tree)?;
        edits.inserted += 1;
    }
    Ok(edits)
}

// Same kind, and for diff markers the same latest commit and diff URL. The URL changes with the
// PR number and the host, so markers left behind by a navigation get rebuilt.
fn is_current(marker: &Marker, wanted: &Marker) -> bool {
    marker.kind == wanted.kind
        && (marker.kind == MarkerKind::Latest
            || (marker.latest == wanted.latest && marker.target == wanted.target))
}

/// The reconciler entry point every trigger calls. Owns the latest state between passes.
#[derive(Clone, Debug)]
pub struct Reconciler {
    settings: Settings,
    state: LatestState,
}

impl Reconciler {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            state: LatestState::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &LatestState {
        &self.state
    }

    pub fn run<T: ElementTree>(&mut self, tree: &mut T, path: &str) -> PassOutcome {
        let outcome = reconcile(tree, path, &self.settings, &mut self.state);
        match &outcome {
            PassOutcome::Skipped(reason) => {
                log::debug!(target: "annotator.reconcile", "pass skipped on {path}: {reason}")
            }
            PassOutcome::Reconciled(report) => log::debug!(
                target: "annotator.reconcile",
                "pass on {path}: latest {} via {}, {} mentions, +{} -{}",
                report.latest.short(),
                report.source,
                report.mentions,
                report.inserted,
                report.removed
            ),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::Document;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn settings() -> Settings {
        Settings::defaults().expect("defaults compile")
    }

    #[test]
    fn skips_leave_state_and_page_alone() {
        let html = format!(r#"<code><a href="/o/r/commit/{A}">aaaaaaa</a></code>"#);
        let mut doc = Document::parse_html(&html);
        let mut state = LatestState::new();
        let settings = settings();

        let cases = [
            ("/o/r/issues/3", SkipReason::NotAPrPage),
            ("/o/r/pull/0", SkipReason::NoContextDerivable),
        ];
        for (path, reason) in cases {
            assert_eq!(
                reconcile(&mut doc, path, &settings, &mut state),
                PassOutcome::Skipped(reason)
            );
        }
        let mut bare = Document::parse_html("<p>nothing here</p>");
        assert_eq!(
            reconcile(&mut bare, "/o/r/pull/3", &settings, &mut state),
            PassOutcome::Skipped(SkipReason::NoLatestRefFound)
        );
        assert_eq!(state.previous_latest(), None);
        assert_eq!(dom::to_html(&doc), html);
    }

    #[test]
    fn stray_marker_of_the_wrong_kind_is_replaced() {
        // A page saved while B was still a diff target, now B is the only commit.
        let html = format!(
            r##"<code><a href="/o/r/commit/{B}">bbbbbbb</a><a class="github-diff-icon" data-commit-sha="{B}" data-marker-kind="diff" data-latest-sha="{A}" href="#">x</a></code>"##
        );
        let mut doc = Document::parse_html(&html);
        let mut state = LatestState::new();
        let outcome = reconcile(&mut doc, "/o/r/pull/1", &settings(), &mut state);
        let report = outcome.report().expect("reconciled");
        assert_eq!(report.latest.as_str(), B);
        assert_eq!((report.inserted, report.removed), (1, 1));
        let markers = doc.select_all(&settings().table.markers);
        assert_eq!(markers.len(), 1);
        assert_eq!(doc.attribute(markers[0], "data-marker-kind"), Some("latest"));
    }

    #[test]
    fn invalid_host_skips_diff_markers_but_keeps_going() {
        let html = format!(
            r#"<div class="gh-header-meta"><code><a href="/o/r/commit/{B}">bbbbbbb</a></code></div>
               <code><a href="/o/r/commit/{A}">aaaaaaa</a></code>"#
        );
        let mut doc = Document::parse_html(&html);
        let mut settings = settings();
        settings.host = "bad host".to_string();
        let mut state = LatestState::new();
        let outcome = reconcile(&mut doc, "/o/r/pull/1", &settings, &mut state);
        let report = outcome.report().expect("reconciled");
        assert_eq!(report.mentions, 2);
        assert_eq!(report.inserted, 1, "only the latest marker can be built");
    }
}
