#![no_main]

use annotator::{CommitRef, extract_commit_ref};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(href) = std::str::from_utf8(data) else {
        return;
    };
    if let Some(commit) = extract_commit_ref(href) {
        assert!(href.contains(commit.as_str()));
        assert_eq!(CommitRef::parse(commit.as_str()).as_ref(), Some(&commit));
    }
});
