//! Simplified HTML tokenizer with a constrained, practical tag-name character set.
//!
//! Supported tag/attribute-name characters (ASCII only): `[A-Za-z0-9:_-]`.
//!
//! Known limitations (intentional):
//! - Not a full HTML5 tokenizer/state machine (no spec parse-error recovery).
//! - `<script>`/`<style>` bodies are raw text; their close tag accepts only ASCII whitespace
//!   before `>`.
use crate::entities::decode_entities;
use crate::types::Token;
use memchr::memchr;

const HTML_COMMENT_START: &str = "<!--";
const HTML_COMMENT_END: &str = "-->";

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

// Returns (start, end) of `</tag\s*>` inside `haystack`, `end` exclusive.
fn find_rawtext_close_tag(haystack: &str, tag: &str) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        i += memchr(b'<', &bytes[i..])?;
        if bytes.get(i + 1) == Some(&b'/')
            && starts_with_ignore_ascii_case_at(bytes, i + 2, tag.as_bytes())
        {
            let mut k = i + 2 + tag.len();
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < bytes.len() && bytes[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

struct Cursor<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    // Slice endpoints only ever land on ASCII structural bytes, so they stay char boundaries.
    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        let input = self.input;
        debug_assert!(input.is_char_boundary(start));
        debug_assert!(input.is_char_boundary(self.pos));
        &input[start..self.pos]
    }

    fn skip_past(&mut self, byte: u8) {
        match memchr(byte, &self.bytes[self.pos..]) {
            Some(rel) => self.pos += rel + 1,
            None => self.pos = self.bytes.len(),
        }
    }
}

pub fn tokenize(input: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut cur = Cursor::new(input);

    while !cur.at_end() {
        if cur.peek() != Some(b'<') {
            let text = cur.take_while(|b| b != b'<');
            let decoded = decode_entities(text);
            if !decoded.is_empty() {
                out.push(Token::Text(decoded));
            }
            continue;
        }

        let rest = &input[cur.pos..];
        if let Some(body) = rest.strip_prefix(HTML_COMMENT_START) {
            match body.find(HTML_COMMENT_END) {
                Some(end) => {
                    out.push(Token::Comment(body[..end].to_string()));
                    cur.pos += HTML_COMMENT_START.len() + end + HTML_COMMENT_END.len();
                    continue;
                }
                None => {
                    out.push(Token::Comment(body.to_string()));
                    break;
                }
            }
        }

        if starts_with_ignore_ascii_case_at(cur.bytes, cur.pos, b"<!doctype") {
            let Some(end) = rest.find('>') else {
                break;
            };
            out.push(Token::Doctype(rest[2..end].trim().to_string()));
            cur.pos += end + 1;
            continue;
        }

        if rest.starts_with("</") {
            cur.pos += 2;
            let name = cur.take_while(is_name_char).to_ascii_lowercase();
            cur.skip_past(b'>');
            out.push(Token::EndTag(name));
            continue;
        }

        cur.pos += 1;
        let name = cur.take_while(is_name_char).to_ascii_lowercase();
        if name.is_empty() {
            // A bare '<' is text.
            out.push(Token::Text("<".to_string()));
            continue;
        }
        let (attributes, mut self_closing) = read_attributes(&mut cur);
        if is_void_element(&name) {
            self_closing = true;
        }
        let rawtext = !self_closing && (name == "script" || name == "style");
        out.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });

        if rawtext {
            let body_start = cur.pos;
            let body = &input[body_start..];
            match find_rawtext_close_tag(body, &name) {
                Some((start, end)) => {
                    if start > 0 {
                        out.push(Token::Text(body[..start].to_string()));
                    }
                    out.push(Token::EndTag(name));
                    cur.pos = body_start + end;
                }
                None => {
                    log::trace!(target: "html.tokenizer", "unterminated <{name}>, treating rest as raw text");
                    if !body.is_empty() {
                        out.push(Token::Text(body.to_string()));
                    }
                    out.push(Token::EndTag(name));
                    break;
                }
            }
        }
    }
    out
}

fn read_attributes(cur: &mut Cursor<'_>) -> (Vec<(String, Option<String>)>, bool) {
    let mut attributes = Vec::new();
    loop {
        cur.skip_whitespace();
        match cur.peek() {
            None => return (attributes, false),
            Some(b'>') => {
                cur.pos += 1;
                return (attributes, false);
            }
            Some(b'/') => {
                cur.pos += 1;
                if cur.peek() == Some(b'>') {
                    cur.pos += 1;
                    return (attributes, true);
                }
                continue;
            }
            Some(_) => {}
        }

        let name = cur.take_while(is_name_char);
        if name.is_empty() {
            // Skip the whole character; it may be multi-byte.
            cur.pos += cur.input[cur.pos..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        let name = name.to_ascii_lowercase();

        cur.skip_whitespace();
        if cur.peek() != Some(b'=') {
            attributes.push((name, None));
            continue;
        }
        cur.pos += 1;
        cur.skip_whitespace();
        let value = match cur.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                cur.pos += 1;
                let raw = cur.take_while(|b| b != quote);
                if !cur.at_end() {
                    cur.pos += 1;
                }
                decode_entities(raw)
            }
            _ => {
                let start = cur.pos;
                while let Some(b) = cur.peek() {
                    if b.is_ascii_whitespace()
                        || b == b'>'
                        || (b == b'/' && cur.bytes.get(cur.pos + 1) == Some(&b'>'))
                    {
                        break;
                    }
                    cur.pos += 1;
                }
                decode_entities(&cur.input[start..cur.pos])
            }
        };
        attributes.push((name, Some(value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_reads_quoted_and_bare_attributes() {
        let tokens = tokenize(r#"<a href="/o/r/commit/abc" class=sha data-pjax>x</a>"#);
        assert_eq!(
            tokens[0],
            Token::StartTag {
                name: "a".to_string(),
                attributes: vec![
                    ("href".to_string(), Some("/o/r/commit/abc".to_string())),
                    ("class".to_string(), Some("sha".to_string())),
                    ("data-pjax".to_string(), None),
                ],
                self_closing: false,
            },
            "unexpected start tag: {tokens:?}"
        );
        assert_eq!(tokens[1], Token::Text("x".to_string()));
        assert_eq!(tokens[2], Token::EndTag("a".to_string()));
    }

    #[test]
    fn tokenize_lowercases_names_and_marks_void_elements() {
        let tokens = tokenize("<DIV><IMG SRC=x.png></DIV>");
        assert!(
            matches!(&tokens[1], Token::StartTag { name, self_closing: true, .. } if name == "img"),
            "expected void img, got: {tokens:?}"
        );
        assert_eq!(tokens[2], Token::EndTag("div".to_string()));
    }

    #[test]
    fn tokenize_handles_uppercase_doctype_and_comments() {
        let tokens = tokenize("<!DOCTYPE html><!-- hi --><p>a &amp; b</p>");
        assert_eq!(tokens[0], Token::Doctype("DOCTYPE html".to_string()));
        assert_eq!(tokens[1], Token::Comment(" hi ".to_string()));
        assert_eq!(tokens[3], Token::Text("a & b".to_string()));
    }

    #[test]
    fn tokenize_keeps_script_body_raw() {
        let tokens = tokenize("<script>if (a < b) {}</ScRiPt><p>x</p>");
        assert_eq!(tokens[1], Token::Text("if (a < b) {}".to_string()));
        assert_eq!(tokens[2], Token::EndTag("script".to_string()));
        assert!(
            matches!(&tokens[3], Token::StartTag { name, .. } if name == "p"),
            "expected tokenizing to resume after script, got: {tokens:?}"
        );
    }

    #[test]
    fn tokenize_skips_non_ascii_attribute_names() {
        let tokens = tokenize("<a é=x href=/o/r/commit/abc “y”>z</a>");
        assert_eq!(
            tokens[0],
            Token::StartTag {
                name: "a".to_string(),
                attributes: vec![
                    ("x".to_string(), None),
                    ("href".to_string(), Some("/o/r/commit/abc".to_string())),
                    ("y".to_string(), None),
                ],
                self_closing: false,
            },
            "unexpected start tag: {tokens:?}"
        );
        assert_eq!(tokens[1], Token::Text("z".to_string()));

        let tokens = tokenize("<p 🔀>é</p>");
        assert_eq!(tokens[1], Token::Text("é".to_string()));
    }

    #[test]
    fn tokenize_preserves_utf8_text() {
        let tokens = tokenize("<span>🔀 café</span>");
        assert_eq!(tokens[1], Token::Text("🔀 café".to_string()));
    }
}
