/// Decode the small entity subset that shows up in saved pull-request pages.
///
/// Named: `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;`. Numeric entities are decoded
/// only when semicolon-terminated; NUL, surrogates and values above U+10FFFF become U+FFFD.
/// Anything else passes through unchanged.
pub(crate) fn decode_entities(s: &str) -> String {
    if memchr::memchr(b'&', s.as_bytes()).is_none() {
        return s.to_string();
    }

    const NAMED: [(&str, char); 6] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&apos;", '\''),
        ("&nbsp;", '\u{00A0}'),
    ];

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        if let Some((entity, ch)) = NAMED.iter().find(|(entity, _)| rest.starts_with(entity)) {
            out.push(*ch);
            rest = &rest[entity.len()..];
            continue;
        }

        if let Some((ch, consumed)) = decode_numeric(rest) {
            out.push(ch);
            rest = &rest[consumed..];
            continue;
        }

        out.push('&');
        rest = &rest[1..];
    }
    out.push_str(rest);
    out
}

// `&#215;` or `&#xD7;`; returns the decoded char and the byte length consumed.
fn decode_numeric(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix("&#")?;
    let (digits, radix, prefix_len, max_digits) =
        match body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
            Some(hex) => (hex, 16, 3, 6),
            None => (body, 10, 2, 7),
        };
    let end = digits.find(';')?;
    let digits = &digits[..end];
    if digits.is_empty()
        || digits.len() > max_digits
        || !digits.chars().all(|c| c.is_digit(radix))
    {
        return None;
    }
    let code = u32::from_str_radix(digits, radix).ok()?;
    let ch = match code {
        0 => char::REPLACEMENT_CHARACTER,
        _ => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
    };
    Some((ch, prefix_len + end + 1))
}
