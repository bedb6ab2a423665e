use crate::types::{Node, Token};

/// Build an owned tree from a token stream.
///
/// End tags close the nearest open element with the same name (and everything opened after
/// it); unmatched end tags are ignored. Elements still open at the end are closed implicitly.
pub fn build_dom(tokens: &[Token]) -> Node {
    let mut doctype = None;
    // Open element stack; index 0 is a sentinel holding the document's children.
    let mut stack: Vec<OpenElement> = vec![OpenElement {
        name: String::new(),
        attributes: Vec::new(),
        children: Vec::new(),
    }];

    for token in tokens {
        match token {
            Token::Doctype(s) => doctype = Some(s.clone()),
            Token::Comment(c) => current(&mut stack).push(Node::Comment { text: c.clone() }),
            Token::Text(t) => {
                if !t.is_empty() {
                    current(&mut stack).push(Node::Text { text: t.clone() });
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                if *self_closing {
                    current(&mut stack).push(Node::Element {
                        name: name.clone(),
                        attributes: attributes.clone(),
                        children: Vec::new(),
                    });
                } else {
                    stack.push(OpenElement {
                        name: name.clone(),
                        attributes: attributes.clone(),
                        children: Vec::new(),
                    });
                }
            }
            Token::EndTag(name) => {
                let Some(depth) = stack.iter().skip(1).rposition(|open| open.name == *name) else {
                    log::trace!(target: "html.dom_builder", "ignoring unmatched </{name}>");
                    continue;
                };
                // `depth` is relative to the skipped sentinel.
                while stack.len() > depth + 1 {
                    close_top(&mut stack);
                }
            }
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    let root = stack.pop().map(|open| open.children).unwrap_or_default();
    Node::Document {
        doctype,
        children: root,
    }
}

struct OpenElement {
    name: String,
    attributes: Vec<(String, Option<String>)>,
    children: Vec<Node>,
}

fn current(stack: &mut [OpenElement]) -> &mut Vec<Node> {
    let top = stack.len() - 1;
    &mut stack[top].children
}

fn close_top(stack: &mut Vec<OpenElement>) {
    let Some(open) = stack.pop() else {
        return;
    };
    current(stack).push(Node::Element {
        name: open.name,
        attributes: open.attributes,
        children: open.children,
    });
}
