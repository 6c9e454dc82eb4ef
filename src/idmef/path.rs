//! Dotted IDMEF field paths such as `alert.source(0).node.name`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::MessageKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("path must start with 'alert' or 'heartbeat', found '{0}'")]
    UnknownRoot(String),

    #[error("path '{0}' names no field")]
    NoField(String),

    #[error("invalid path element '{0}'")]
    InvalidElement(String),
}

/// One element of a field path: a name and an optional list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathElement {
    pub name: String,
    pub index: Option<i64>,
}

impl PathElement {
    fn parse(element: &str) -> Result<Self, PathError> {
        let invalid = || PathError::InvalidElement(element.to_string());

        let (name, index) = match element.find('(') {
            Some(open) => {
                let inner = element[open + 1..].strip_suffix(')').ok_or_else(invalid)?;
                let index: i64 = inner.parse().map_err(|_| invalid())?;
                (&element[..open], Some(index))
            }
            None => (element, None),
        };

        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            index,
        })
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}({})", self.name, index),
            None => f.write_str(&self.name),
        }
    }
}

/// A validated field path rooted at a message class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    kind: MessageKind,
    elements: Vec<PathElement>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(PathError::Empty);
        }

        let mut parts = path.split('.');
        let root = parts.next().unwrap_or_default();
        let kind = match root {
            "alert" => MessageKind::Alert,
            "heartbeat" => MessageKind::Heartbeat,
            other => return Err(PathError::UnknownRoot(other.to_string())),
        };

        let elements = parts.map(PathElement::parse).collect::<Result<Vec<_>, _>>()?;
        if elements.is_empty() {
            return Err(PathError::NoField(path.to_string()));
        }

        Ok(Self { kind, elements })
    }

    /// Message class the path belongs to.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Elements below the message root.
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// The single element name when the path is one level deep and unindexed.
    pub fn top_level_name(&self) -> Option<&str> {
        match self.elements.as_slice() {
            [PathElement { name, index: None }] => Some(name),
            _ => None,
        }
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        for element in &self.elements {
            write!(f, ".{}", element)?;
        }
        Ok(())
    }
}
