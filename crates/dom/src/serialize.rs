use crate::{Document, NodeKey, NodeKind};

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "param" | "source" | "track" | "wbr"
    )
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Serialize the document (root children only) back to markup.
pub fn to_html(doc: &Document) -> String {
    let mut out = String::new();
    if let Some(NodeKind::Document {
        doctype: Some(doctype),
    }) = doc.kind(doc.root())
    {
        out.push_str(&format!("<!{doctype}>"));
    }
    write_node(doc, doc.root(), &mut out);
    out
}

enum Step<'a> {
    Enter(NodeKey),
    Raw(&'a str),
    Close(&'a str),
}

fn write_node(doc: &Document, key: NodeKey, out: &mut String) {
    // Explicit stack: saved pages can nest deeper than the call stack allows.
    let mut stack = vec![Step::Enter(key)];
    while let Some(step) = stack.pop() {
        let key = match step {
            Step::Enter(key) => key,
            Step::Raw(text) => {
                out.push_str(text);
                continue;
            }
            Step::Close(name) => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
                continue;
            }
        };
        match doc.kind(key) {
            Some(NodeKind::Element { name, attributes }) => {
                out.push('<');
                out.push_str(name);
                for (k, v) in attributes {
                    out.push(' ');
                    out.push_str(k);
                    if let Some(v) = v {
                        out.push_str("=\"");
                        out.push_str(&escape(v, true));
                        out.push('"');
                    }
                }
                out.push('>');
                if is_void_element(name) {
                    continue;
                }
                stack.push(Step::Close(name));
                let raw = name == "script" || name == "style";
                for child in doc.children(key).iter().rev() {
                    match doc.kind(*child) {
                        Some(NodeKind::Text { text }) if raw => stack.push(Step::Raw(text)),
                        _ => stack.push(Step::Enter(*child)),
                    }
                }
            }
            Some(NodeKind::Text { text }) => out.push_str(&escape(text, false)),
            Some(NodeKind::Comment { text }) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Some(NodeKind::Document { .. }) => {
                stack.extend(doc.children(key).iter().rev().map(|c| Step::Enter(*c)));
            }
            None => {}
        }
    }
}

/// Indented one-line-per-node outline, at most `cap` lines.
pub fn outline(doc: &Document, cap: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![(doc.root(), 0usize)];
    while let Some((key, depth)) = stack.pop() {
        if out.len() >= cap {
            break;
        }
        let indent = "  ".repeat(depth);
        match doc.kind(key) {
            Some(NodeKind::Document { doctype }) => match doctype {
                Some(dt) => out.push(format!("{indent}<!{dt}>")),
                None => out.push(format!("{indent}#document")),
            },
            Some(NodeKind::Element { name, .. }) => {
                let mut line = format!("{indent}<{name}");
                for attr in ["id", "class", "data-commit-sha", "data-marker-kind"] {
                    if let Some(v) = doc.attribute(key, attr).filter(|v| !v.is_empty()) {
                        line.push_str(&format!(r#" {attr}="{v}""#));
                    }
                }
                line.push('>');
                out.push(line);
            }
            Some(NodeKind::Text { text }) => {
                let t = text.replace('\n', " ").trim().to_string();
                if !t.is_empty() {
                    out.push(format!("{indent}\"{}\"", shorten(&t)));
                }
            }
            Some(NodeKind::Comment { text }) => {
                out.push(format!("{indent}<!-- {} -->", shorten(&text.replace('\n', " "))));
            }
            None => {}
        }
        for child in doc.children(key).iter().rev() {
            stack.push((*child, depth + 1));
        }
    }
    out
}

fn shorten(t: &str) -> String {
    match t.char_indices().nth(40) {
        Some((cut, _)) => format!("{}…", &t[..cut]),
        None => t.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_html_round_trips_simple_markup() {
        let src = r#"<div class="a"><code><a href="/x?a=1&amp;b=2">abc</a></code><br><!--c--></div>"#;
        let doc = Document::parse_html(src);
        assert_eq!(to_html(&doc), src);
    }

    #[test]
    fn to_html_handles_very_deep_nesting() {
        let depth = 200_000;
        let src = "<div>".repeat(depth) + "x" + &"</div>".repeat(depth);
        let doc = Document::parse_html(&src);
        assert_eq!(to_html(&doc), src);
    }

    #[test]
    fn outline_shows_marker_attributes() {
        let doc = Document::parse_html(
            r#"<p><span class="github-diff-icon" data-commit-sha="abc" data-marker-kind="latest">x</span></p>"#,
        );
        let lines = outline(&doc, 10);
        assert_eq!(
            lines,
            vec![
                "#document".to_string(),
                "  <p>".to_string(),
                r#"    <span class="github-diff-icon" data-commit-sha="abc" data-marker-kind="latest">"#
                    .to_string(),
                "      \"x\"".to_string(),
            ]
        );
    }
}
