use regex::Regex;
use std::sync::LazyLock;

/// Identifies the pull request a page belongs to. Recomputed on every pass: client-side
/// navigation can change it without a reload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageContext {
    pub owner: String,
    pub repo: String,
    pub pr_number: String,
}

// `/{owner}/{repo}/pull/{number}`, optionally followed by a tab such as `/files`.
static PR_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([^/]+)/([^/]+)/pull/(\d+)(?:/|$)").expect("valid pull request path pattern")
});

pub fn is_pr_page(path: &str) -> bool {
    PR_PATH.is_match(path)
}

/// `None` for non-PR paths, and for PR-shaped paths whose number is not a usable PR number
/// (zero or out of range).
pub fn extract_page_context(path: &str) -> Option<PageContext> {
    let caps = PR_PATH.captures(path)?;
    let pr_number = caps.get(3)?.as_str();
    match pr_number.parse::<u64>() {
        Ok(n) if n > 0 => {}
        _ => return None,
    }
    Some(PageContext {
        owner: caps.get(1)?.as_str().to_string(),
        repo: caps.get(2)?.as_str().to_string(),
        pr_number: pr_number.to_string(),
    })
}
