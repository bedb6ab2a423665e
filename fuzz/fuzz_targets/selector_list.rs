#![no_main]

use css::parse_selector_list;
use dom::Document;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(selectors) = parse_selector_list(input) {
        let doc = Document::parse_html(r#"<div id="a" class="x y"><code><a href="/o/r/commit/1">1</a></code></div>"#);
        let _ = doc.select_all(&selectors);
    }
});
