use std::fmt;

/// Comma-separated selector group: `.a, [data-x="y"], code`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}

/// Compound selectors joined by combinators, stored left to right.
///
/// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplexSelector {
    pub compounds: Vec<Compound>,
    pub combinators: Vec<Combinator>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant, // "a b"
    Child,      // "a > b"
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compound {
    pub simple: Vec<Selector>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Universal,
    Type(String),  // element/tag selector
    Id(String),    // #id selector
    Class(String), // .class selector
    Attribute(AttributeSelector),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<(AttributeOp, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeOp {
    Equals,    // [a=v]
    Includes,  // [a~=v]
    DashMatch, // [a|=v]
    Prefix,    // [a^=v]
    Suffix,    // [a$=v]
    Substring, // [a*=v]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectorError {
    Empty,
    UnexpectedChar { ch: char, offset: usize },
    ExpectedIdentifier { offset: usize },
    UnterminatedAttribute { offset: usize },
    UnterminatedString { offset: usize },
    DanglingCombinator { offset: usize },
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorError::Empty => write!(f, "empty selector"),
            SelectorError::UnexpectedChar { ch, offset } => {
                write!(f, "unexpected character {ch:?} at offset {offset}")
            }
            SelectorError::ExpectedIdentifier { offset } => {
                write!(f, "expected identifier at offset {offset}")
            }
            SelectorError::UnterminatedAttribute { offset } => {
                write!(f, "attribute selector starting at offset {offset} is not closed")
            }
            SelectorError::UnterminatedString { offset } => {
                write!(f, "string starting at offset {offset} is not closed")
            }
            SelectorError::DanglingCombinator { offset } => {
                write!(f, "combinator at offset {offset} has nothing on its right")
            }
        }
    }
}

impl std::error::Error for SelectorError {}

impl std::str::FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selector_list(s)
    }
}

// input: ".a, [data-testid=\"x\"], div > code a"
// output: SelectorList with one ComplexSelector per comma-separated entry
pub fn parse_selector_list(input: &str) -> Result<SelectorList, SelectorError> {
    let mut parser = Parser {
        input,
        chars: input.char_indices().collect(),
        pos: 0,
    };
    let mut selectors = Vec::new();
    loop {
        parser.skip_whitespace();
        selectors.push(parser.complex()?);
        parser.skip_whitespace();
        match parser.peek() {
            None => break,
            Some(',') => parser.pos += 1,
            Some(ch) => {
                return Err(SelectorError::UnexpectedChar {
                    ch,
                    offset: parser.offset(),
                });
            }
        }
    }
    Ok(SelectorList { selectors })
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len())
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(',') | None => break,
                Some(_) if had_space => Combinator::Descendant,
                Some(ch) => {
                    return Err(SelectorError::UnexpectedChar {
                        ch,
                        offset: self.offset(),
                    });
                }
            };
            if matches!(self.peek(), None | Some(',')) {
                return Err(SelectorError::DanglingCombinator {
                    offset: self.offset(),
                });
            }
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }
        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut simple = Vec::new();
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                simple.push(Selector::Universal);
            }
            Some(c) if is_ident_char(c) => {
                simple.push(Selector::Type(self.ident()?.to_ascii_lowercase()));
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    simple.push(Selector::Class(self.ident()?));
                }
                Some('#') => {
                    self.pos += 1;
                    simple.push(Selector::Id(self.ident()?));
                }
                Some('[') => simple.push(Selector::Attribute(self.attribute()?)),
                _ => break,
            }
        }
        if simple.is_empty() {
            return Err(match self.peek() {
                None => SelectorError::Empty,
                Some(ch) => SelectorError::UnexpectedChar {
                    ch,
                    offset: self.offset(),
                },
            });
        }
        Ok(Compound { simple })
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let offset = self.offset();
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            out.push(c);
            self.pos += 1;
        }
        if out.is_empty() {
            return Err(SelectorError::ExpectedIdentifier { offset });
        }
        Ok(out)
    }

    fn attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        let open = self.offset();
        self.pos += 1; // '['
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttributeSelector {
                    name,
                    matcher: None,
                });
            }
            Some('=') => {
                self.pos += 1;
                AttributeOp::Equals
            }
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.pos += 1;
                if self.peek() != Some('=') {
                    return Err(SelectorError::UnexpectedChar {
                        ch: c,
                        offset: self.offset(),
                    });
                }
                self.pos += 1;
                match c {
                    '~' => AttributeOp::Includes,
                    '|' => AttributeOp::DashMatch,
                    '^' => AttributeOp::Prefix,
                    '$' => AttributeOp::Suffix,
                    _ => AttributeOp::Substring,
                }
            }
            None => return Err(SelectorError::UnterminatedAttribute { offset: open }),
            Some(ch) => {
                return Err(SelectorError::UnexpectedChar {
                    ch,
                    offset: self.offset(),
                });
            }
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => self.string(quote)?,
            _ => self.ident()?,
        };
        self.skip_whitespace();
        if self.peek() != Some(']') {
            return Err(SelectorError::UnterminatedAttribute { offset: open });
        }
        self.pos += 1;
        Ok(AttributeSelector {
            name,
            matcher: Some((op, value)),
        })
    }

    fn string(&mut self, quote: char) -> Result<String, SelectorError> {
        let offset = self.offset();
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(SelectorError::UnterminatedString { offset }),
                Some('\\') => {
                    self.pos += 1;
                    if let Some(c) = self.peek() {
                        out.push(c);
                        self.pos += 1;
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str, op: AttributeOp, value: &str) -> Selector {
        Selector::Attribute(AttributeSelector {
            name: name.to_string(),
            matcher: Some((op, value.to_string())),
        })
    }

    #[test]
    fn parses_comma_separated_group() {
        let list =
            parse_selector_list(r#".gh-header-meta, [data-test-selector="pr-header-actions"]"#)
                .expect("valid selector list");
        assert_eq!(list.selectors.len(), 2);
        assert_eq!(
            list.selectors[0].compounds[0].simple,
            vec![Selector::Class("gh-header-meta".to_string())]
        );
        assert_eq!(
            list.selectors[1].compounds[0].simple,
            vec![attr("data-test-selector", AttributeOp::Equals, "pr-header-actions")]
        );
    }

    #[test]
    fn parses_type_with_substring_attribute() {
        let list = parse_selector_list(r#"A[href*="/commit"]"#).expect("valid selector");
        assert_eq!(
            list.selectors[0].compounds[0].simple,
            vec![
                Selector::Type("a".to_string()),
                attr("href", AttributeOp::Substring, "/commit"),
            ]
        );
    }

    #[test]
    fn parses_combinators() {
        let list = parse_selector_list("div > code  a.sha").expect("valid selector");
        let complex = &list.selectors[0];
        assert_eq!(complex.compounds.len(), 3);
        assert_eq!(
            complex.combinators,
            vec![Combinator::Child, Combinator::Descendant]
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_selector_list(""), Err(SelectorError::Empty));
        assert!(matches!(
            parse_selector_list(r#"[href*="/commit"#),
            Err(SelectorError::UnterminatedString { .. })
        ));
        assert!(matches!(
            parse_selector_list("[href"),
            Err(SelectorError::UnterminatedAttribute { .. })
        ));
        assert!(matches!(
            parse_selector_list("div >"),
            Err(SelectorError::DanglingCombinator { .. })
        ));
        assert!(matches!(
            parse_selector_list("a, , b"),
            Err(SelectorError::UnexpectedChar { ch: ',', .. })
        ));
    }
}
