//! Commit discovery: which commit is the PR's latest, and which on-page hash badges to annotate.

use crate::config::SelectorTable;
use crate::refs::{CommitRef, extract_commit_ref};
use crate::tree::ElementTree;
use std::collections::HashSet;
use std::fmt;

/// Badges are short; anything longer is descriptive link text.
pub const MAX_HASH_LABEL_CHARS: usize = 12;

/// A commit-reference anchor found on the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitLink<N> {
    pub node: N,
    /// `None` when the href looks like a commit link but carries no valid id.
    pub commit: Option<CommitRef>,
}

/// One on-page hash badge eligible for a marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitMention<N> {
    pub commit: CommitRef,
    pub node: N,
}

/// Which strategy produced the latest ref.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatestSource {
    Header,
    Timeline,
    SingleCommit,
    CommitsSection,
    FirstLink,
}

impl fmt::Display for LatestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LatestSource::Header => "header",
            LatestSource::Timeline => "timeline",
            LatestSource::SingleCommit => "single-commit",
            LatestSource::CommitsSection => "commits-section",
            LatestSource::FirstLink => "first-link",
        })
    }
}

/// Commit links of one page, captured once and shared by every strategy.
pub struct PageSnapshot<'a, T: ElementTree> {
    pub tree: &'a T,
    pub table: &'a SelectorTable,
    /// All commit-reference anchors, document order.
    pub links: Vec<CommitLink<T::NodeRef>>,
}

impl<'a, T: ElementTree> PageSnapshot<'a, T> {
    pub fn capture(tree: &'a T, table: &'a SelectorTable) -> Self {
        let links = tree
            .select_all(&table.commit_links)
            .into_iter()
            .map(|node| CommitLink {
                node,
                commit: link_ref(tree, node),
            })
            .collect();
        Self { tree, table, links }
    }

    /// Distinct refs in order of first appearance.
    pub fn distinct_refs(&self) -> Vec<(&CommitRef, T::NodeRef)> {
        let mut seen = HashSet::new();
        self.links
            .iter()
            .filter_map(|link| link.commit.as_ref().map(|c| (c, link.node)))
            .filter(|(commit, _)| seen.insert(*commit))
            .collect()
    }
}

fn link_ref<T: ElementTree>(tree: &T, node: T::NodeRef) -> Option<CommitRef> {
    tree.attribute(node, "href").and_then(extract_commit_ref)
}

pub type Strategy<T> = fn(&PageSnapshot<'_, T>) -> Option<CommitRef>;

/// Latest-ref strategies in priority order.
pub fn latest_strategies<T: ElementTree>() -> [(LatestSource, Strategy<T>); 5] {
    [
        (LatestSource::Header, from_header),
        (LatestSource::Timeline, from_timeline),
        (LatestSource::SingleCommit, from_single_commit),
        (LatestSource::CommitsSection, from_commits_section),
        (LatestSource::FirstLink, from_first_link),
    ]
}

/// Run the strategies in order; the first hit wins and later ones are never evaluated.
pub fn resolve_latest<T: ElementTree>(
    tree: &T,
    table: &SelectorTable,
) -> Option<(CommitRef, LatestSource)> {
    let snapshot = PageSnapshot::capture(tree, table);
    latest_strategies::<T>()
        .into_iter()
        .find_map(|(source, strategy)| {
            let found = strategy(&snapshot);
            log::trace!(target: "annotator.discovery", "strategy {source}: {found:?}");
            found.map(|commit| (commit, source))
        })
}

// The first header/metadata container's first valid commit link.
fn from_header<T: ElementTree>(page: &PageSnapshot<'_, T>) -> Option<CommitRef> {
    let header = page.tree.select_first(&page.table.pr_header)?;
    page.tree
        .select_within(header, &page.table.commit_links)
        .into_iter()
        .find_map(|node| link_ref(page.tree, node))
}

// Refs deduplicated by first occurrence, kept only when that occurrence sits in the commit
// timeline. The host lists newest first.
fn from_timeline<T: ElementTree>(page: &PageSnapshot<'_, T>) -> Option<CommitRef> {
    page.distinct_refs()
        .into_iter()
        .find(|(_, node)| page.tree.closest(*node, &page.table.commit_timeline).is_some())
        .map(|(commit, _)| commit.clone())
}

fn from_single_commit<T: ElementTree>(page: &PageSnapshot<'_, T>) -> Option<CommitRef> {
    match page.distinct_refs().as_slice() {
        [(only, _)] => Some((*only).clone()),
        _ => None,
    }
}

// Only the first link of the first commits section counts.
fn from_commits_section<T: ElementTree>(page: &PageSnapshot<'_, T>) -> Option<CommitRef> {
    if page.links.is_empty() {
        return None;
    }
    let section = page.tree.select_first(&page.table.commits_section)?;
    let first = page
        .tree
        .select_within(section, &page.table.commit_links)
        .into_iter()
        .next()?;
    link_ref(page.tree, first)
}

fn from_first_link<T: ElementTree>(page: &PageSnapshot<'_, T>) -> Option<CommitRef> {
    page.links.first()?.commit.clone()
}

/// A hash badge, as opposed to a commit-message link: inside inline code, and the visible text
/// is a prefix of the ref (or exactly its 7-character abbreviation), at most 12 characters.
pub fn is_hash_label<T: ElementTree>(
    tree: &T,
    table: &SelectorTable,
    node: T::NodeRef,
    commit: &CommitRef,
) -> bool {
    if tree.closest(node, &table.inline_code).is_none() {
        return false;
    }
    let text = tree.text_content(node);
    let text = text.trim();
    if text.chars().count() > MAX_HASH_LABEL_CHARS {
        return false;
    }
    commit.as_str().starts_with(text) || text == commit.short()
}

/// Every hash badge on the page, document order, one entry per (ref, element) pair.
pub fn find_mentions<T: ElementTree>(
    tree: &T,
    table: &SelectorTable,
) -> Vec<CommitMention<T::NodeRef>> {
    let mut seen = HashSet::new();
    tree.select_all(&table.commit_links)
        .into_iter()
        .filter_map(|node| {
            let commit = link_ref(tree, node)?;
            is_hash_label(tree, table, node, &commit).then_some(CommitMention { commit, node })
        })
        .filter(|m| seen.insert((m.commit.clone(), m.node)))
        .collect()
}
