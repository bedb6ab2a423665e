#![no_main]

use annotator::{LatestState, Settings, reconcile};
use dom::Document;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(html) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(settings) = Settings::defaults() else {
        return;
    };
    let mut doc = Document::parse_html(html);
    let mut state = LatestState::new();
    for _ in 0..2 {
        reconcile(&mut doc, "/o/r/pull/1", &settings, &mut state);
    }
    let _ = dom::to_html(&doc);
});
