#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

/// Owned markup tree produced by [`crate::build_dom`].
///
/// Names are ASCII-lowercase; attribute order and duplicates are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Document {
        doctype: Option<String>,
        children: Vec<Node>,
    },
    Element {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        children: Vec<Node>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl Node {
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document { children, .. } | Node::Element { children, .. } => children,
            Node::Text { .. } | Node::Comment { .. } => &[],
        }
    }

    pub fn element_name(&self) -> Option<&str> {
        match self {
            Node::Element { name, .. } => Some(name),
            _ => None,
        }
    }
}

// Deep trees would overflow the stack with the derived recursive drop.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = match self {
            Node::Document { children, .. } | Node::Element { children, .. } => {
                std::mem::take(children)
            }
            Node::Text { .. } | Node::Comment { .. } => return,
        };
        while let Some(mut node) = pending.pop() {
            if let Node::Document { children, .. } | Node::Element { children, .. } = &mut node {
                pending.append(children);
            }
        }
    }
}
