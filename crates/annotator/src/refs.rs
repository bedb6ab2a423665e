use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

pub const COMMIT_REF_LEN: usize = 40;
pub const SHORT_REF_LEN: usize = 7;

/// Full 40-character lowercase hexadecimal commit id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitRef(String);

impl CommitRef {
    /// Accepts exactly 40 lowercase hex characters; no trimming, truncation or case folding.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == COMMIT_REF_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| CommitRef(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 7-character abbreviation the host site displays.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_REF_LEN]
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Ordered; the first pattern that matches wins. The trailing group rejects a longer hex run,
// so a 41-character id is not silently cut down to 40.
static COMMIT_HREF_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        // /commit/<ref> and /commits/<ref>
        Regex::new(r"/commits?/([a-f0-9]{40})(?:[^0-9a-fA-F]|$)").expect("valid commit pattern"),
        // /pull/<n>/commits/<ref>
        Regex::new(r"/pull/\d+/commits/([a-f0-9]{40})(?:[^0-9a-fA-F]|$)")
            .expect("valid pull commit pattern"),
    ]
});

/// Recover the commit id from an href-like string.
pub fn extract_commit_ref(href: &str) -> Option<CommitRef> {
    COMMIT_HREF_PATTERNS.iter().find_map(|pattern| {
        let capture = pattern.captures(href)?.get(1)?;
        CommitRef::parse(capture.as_str())
    })
}
