use crate::NodeKey;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomError {
    InvalidKey(NodeKey),
    DuplicateKey(NodeKey),
    MissingKey(NodeKey),
    WrongNodeKind(NodeKey),
    InvalidParent(NodeKey),
    InvalidSibling { parent: NodeKey, before: NodeKey },
    CycleDetected { parent: NodeKey, child: NodeKey },
    Detached(NodeKey),
    RootRemoval,
    KeySpaceExhausted,
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomError::InvalidKey(key) => write!(f, "node key {} is reserved", key.0),
            DomError::DuplicateKey(key) => write!(f, "node key {} is already allocated", key.0),
            DomError::MissingKey(key) => write!(f, "node {} does not exist", key.0),
            DomError::WrongNodeKind(key) => {
                write!(f, "node {} has the wrong kind for this operation", key.0)
            }
            DomError::InvalidParent(key) => write!(f, "node {} cannot take this child", key.0),
            DomError::InvalidSibling { parent, before } => {
                write!(f, "node {} is not a child of {}", before.0, parent.0)
            }
            DomError::CycleDetected { parent, child } => {
                write!(f, "inserting {} under {} would create a cycle", child.0, parent.0)
            }
            DomError::Detached(key) => write!(f, "node {} has no parent", key.0),
            DomError::RootRemoval => write!(f, "the document root cannot be removed"),
            DomError::KeySpaceExhausted => write!(f, "no node keys left to allocate"),
        }
    }
}

impl std::error::Error for DomError {}
