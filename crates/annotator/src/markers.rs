//! Marker elements placed after hash badges, and what activating one does.
//!
//! A marker is self-describing: its commit, kind and (for diff markers) the latest commit it
//! was built against are stored as attributes, so later passes can find and judge it without
//! remembering where it was put.

use crate::page::PageContext;
use crate::refs::CommitRef;
use crate::tree::{ElementSpec, ElementTree};
use std::fmt;
use url::Url;

pub const MARKER_CLASS: &str = "github-diff-icon";
pub const ATTR_COMMIT: &str = "data-commit-sha";
pub const ATTR_KIND: &str = "data-marker-kind";
pub const ATTR_LATEST: &str = "data-latest-sha";
pub const ATTR_DIFF_URL: &str = "data-diff-url";

const DIFF_GLYPH: &str = "\u{1F500}";
const LATEST_GLYPH: &str = "\u{1F4CD}";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Diff,
    Latest,
}

impl MarkerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerKind::Diff => "diff",
            MarkerKind::Latest => "latest",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "diff" => Some(MarkerKind::Diff),
            "latest" => Some(MarkerKind::Latest),
            _ => None,
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum MarkerError {
    InvalidHost { host: String, source: url::ParseError },
}

impl fmt::Display for MarkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerError::InvalidHost { host, source } => {
                write!(f, "cannot build a diff url on host `{host}`: {source}")
            }
        }
    }
}

impl std::error::Error for MarkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MarkerError::InvalidHost { source, .. } => Some(source),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub commit: CommitRef,
    /// Diff markers only: the latest commit the diff runs to.
    pub latest: Option<CommitRef>,
    /// Diff markers only: where activation navigates.
    pub target: Option<Url>,
}

/// `https://<host>/<owner>/<repo>/pull/<n>/files/<commit>..<latest>`
pub fn diff_url(
    commit: &CommitRef,
    latest: &CommitRef,
    ctx: &PageContext,
    host: &str,
) -> Result<Url, MarkerError> {
    let mut url = Url::parse(&format!("https://{host}/")).map_err(|source| {
        MarkerError::InvalidHost {
            host: host.to_string(),
            source,
        }
    })?;
    url.set_path(&format!(
        "/{}/{}/pull/{}/files/{commit}..{latest}",
        ctx.owner, ctx.repo, ctx.pr_number
    ));
    Ok(url)
}

pub fn make_diff_marker(
    commit: &CommitRef,
    latest: &CommitRef,
    ctx: &PageContext,
    host: &str,
) -> Result<Marker, MarkerError> {
    Ok(Marker {
        kind: MarkerKind::Diff,
        commit: commit.clone(),
        latest: Some(latest.clone()),
        target: Some(diff_url(commit, latest, ctx, host)?),
    })
}

pub fn make_latest_marker(commit: &CommitRef) -> Marker {
    Marker {
        kind: MarkerKind::Latest,
        commit: commit.clone(),
        latest: None,
        target: None,
    }
}

impl Marker {
    pub fn title(&self) -> String {
        match self.kind {
            MarkerKind::Diff => format!(
                "View diff between {} and latest commit",
                self.commit.short()
            ),
            MarkerKind::Latest => format!("Latest commit ({})", self.commit.short()),
        }
    }

    pub fn to_element(&self) -> ElementSpec {
        let attr = |name: &str, value: &str| (name.to_string(), Some(value.to_string()));
        let mut attributes = vec![
            attr("class", MARKER_CLASS),
            attr(ATTR_COMMIT, self.commit.as_str()),
            attr(ATTR_KIND, self.kind.as_str()),
        ];
        let (name, glyph) = match self.kind {
            MarkerKind::Diff => {
                if let Some(latest) = &self.latest {
                    attributes.push(attr(ATTR_LATEST, latest.as_str()));
                }
                if let Some(target) = &self.target {
                    attributes.push(attr(ATTR_DIFF_URL, target.as_str()));
                }
                attributes.push(attr("href", "#"));
                ("a", DIFF_GLYPH)
            }
            MarkerKind::Latest => ("span", LATEST_GLYPH),
        };
        attributes.push(attr("title", &self.title()));
        ElementSpec {
            name: name.to_string(),
            attributes,
            text: Some(glyph.to_string()),
        }
    }

    /// Decode a marker from its element. `None` if `node` is not one of ours or its tags are
    /// damaged.
    pub fn read<T: ElementTree>(tree: &T, node: T::NodeRef) -> Option<Marker> {
        let is_ours = tree
            .attribute(node, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == MARKER_CLASS));
        if !is_ours {
            return None;
        }
        let kind = MarkerKind::parse(tree.attribute(node, ATTR_KIND)?)?;
        let commit = CommitRef::parse(tree.attribute(node, ATTR_COMMIT)?)?;
        let (latest, target) = match kind {
            MarkerKind::Diff => (
                tree.attribute(node, ATTR_LATEST).and_then(CommitRef::parse),
                tree.attribute(node, ATTR_DIFF_URL)
                    .and_then(|u| Url::parse(u).ok()),
            ),
            MarkerKind::Latest => (None, None),
        };
        Some(Marker {
            kind,
            commit,
            latest,
            target,
        })
    }
}

/// Opens URLs outside the current page.
pub trait Navigator {
    fn open_in_new_context(&mut self, url: &Url);
}

/// What an activation (click) on a marker did to the event and the page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Activation {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    pub opened: Option<Url>,
}

/// Activate the marker at `node`. Diff markers swallow the event, so the commit link they sit
/// next to does not navigate, and open the diff view. Anything else is left alone.
pub fn activate_marker<T: ElementTree>(
    tree: &T,
    node: T::NodeRef,
    navigator: &mut dyn Navigator,
) -> Activation {
    let Some(marker) = Marker::read(tree, node) else {
        return Activation::default();
    };
    match marker.kind {
        MarkerKind::Diff => {
            if let Some(url) = &marker.target {
                log::debug!(target: "annotator.markers", "opening {url}");
                navigator.open_in_new_context(url);
            }
            Activation {
                default_prevented: true,
                propagation_stopped: true,
                opened: marker.target,
            }
        }
        MarkerKind::Latest => Activation::default(),
    }
}
