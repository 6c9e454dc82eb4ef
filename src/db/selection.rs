//! Object selection: the ordered list of fields a value query projects.
//!
//! A selected path is written `[function(]path[)][/flag[,flag...]]`, for
//! example `count(alert.classification.text)/group_by,order_desc`.

use std::fmt;
use std::str::FromStr;

use crate::idmef::{FieldPath, MessageKind};

use super::DbError;

/// Aggregate applied to a selected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Min,
    Max,
    Avg,
    Std,
    Count,
}

impl Aggregate {
    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Avg => "avg",
            Aggregate::Std => "std",
            Aggregate::Count => "count",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Aggregate::Min),
            "max" => Some(Aggregate::Max),
            "avg" => Some(Aggregate::Avg),
            "std" => Some(Aggregate::Std),
            "count" => Some(Aggregate::Count),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One projected field with its aggregate and flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectedPath {
    pub path: FieldPath,
    pub aggregate: Option<Aggregate>,
    pub group_by: bool,
    pub order: Option<SortOrder>,
}

impl SelectedPath {
    pub fn new(path: FieldPath) -> Self {
        Self {
            path,
            aggregate: None,
            group_by: false,
            order: None,
        }
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn group_by(mut self) -> Self {
        self.group_by = true;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// The column label: the path, wrapped in its aggregate if any.
    pub fn label(&self) -> String {
        match self.aggregate {
            Some(aggregate) => format!("{}({})", aggregate.name(), self.path),
            None => self.path.to_string(),
        }
    }

    fn parse_flags(input: &str, flags: &str, selected: &mut Self) -> Result<(), DbError> {
        let invalid = |reason: String| DbError::InvalidSelection {
            input: input.to_string(),
            reason,
        };

        for flag in flags.split(',').map(str::trim) {
            let order = match flag {
                "group_by" => {
                    selected.group_by = true;
                    continue;
                }
                "order_asc" => SortOrder::Asc,
                "order_desc" => SortOrder::Desc,
                "" => return Err(invalid("empty flag".to_string())),
                other => return Err(invalid(format!("unknown flag '{}'", other))),
            };
            if selected.order.is_some_and(|existing| existing != order) {
                return Err(invalid("both order_asc and order_desc given".to_string()));
            }
            selected.order = Some(order);
        }
        Ok(())
    }
}

impl FromStr for SelectedPath {
    type Err = DbError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| DbError::InvalidSelection {
            input: input.to_string(),
            reason,
        };

        let trimmed = input.trim();
        let (head, flags) = match trimmed.split_once('/') {
            Some((head, flags)) => (head.trim(), Some(flags)),
            None => (trimmed, None),
        };

        // A function call is `name(...)` where name contains no dot; a path
        // element with an index such as `source(0)` always follows a dot.
        let (aggregate, path) = match head.split_once('(') {
            Some((name, rest)) if !name.contains('.') => {
                let aggregate = Aggregate::from_name(name)
                    .ok_or_else(|| invalid(format!("unknown function '{}'", name)))?;
                let inner = rest
                    .strip_suffix(')')
                    .ok_or_else(|| invalid(format!("missing ')' after {}(", name)))?;
                (Some(aggregate), inner)
            }
            _ => (None, head),
        };

        let path = FieldPath::parse(path).map_err(|e| invalid(e.to_string()))?;

        let mut selected = SelectedPath::new(path);
        selected.aggregate = aggregate;
        if let Some(flags) = flags {
            Self::parse_flags(input, flags, &mut selected)?;
        }
        Ok(selected)
    }
}

impl fmt::Display for SelectedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())?;

        let mut flags = Vec::new();
        if self.group_by {
            flags.push("group_by");
        }
        match self.order {
            Some(SortOrder::Asc) => flags.push("order_asc"),
            Some(SortOrder::Desc) => flags.push("order_desc"),
            None => {}
        }
        if !flags.is_empty() {
            write!(f, "/{}", flags.join(","))?;
        }
        Ok(())
    }
}

/// Ordered list of selected paths. Insertion order is output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    paths: Vec<SelectedPath>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse each string as a selected path, keeping their order.
    pub fn parse<S: AsRef<str>>(paths: &[S]) -> Result<Self, DbError> {
        paths
            .iter()
            .map(|p| p.as_ref().parse::<SelectedPath>())
            .collect::<Result<Vec<_>, _>>()
            .map(|paths| Self { paths })
    }

    pub fn push(&mut self, path: SelectedPath) {
        self.paths.push(path);
    }

    pub fn with(mut self, path: SelectedPath) -> Self {
        self.push(path);
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SelectedPath> {
        self.paths.iter()
    }

    pub fn has_aggregate(&self) -> bool {
        self.paths.iter().any(|p| p.aggregate.is_some())
    }

    pub fn has_group_by(&self) -> bool {
        self.paths.iter().any(|p| p.group_by)
    }

    pub fn has_order(&self) -> bool {
        self.paths.iter().any(|p| p.order.is_some())
    }

    /// The message class every path targets, or `None` when the selection
    /// is empty or mixes classes.
    pub fn kind(&self) -> Option<MessageKind> {
        let first = self.paths.first()?.path.kind();
        self.paths
            .iter()
            .all(|p| p.path.kind() == first)
            .then_some(first)
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a SelectedPath;
    type IntoIter = std::slice::Iter<'a, SelectedPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

impl FromIterator<SelectedPath> for Selection {
    fn from_iter<I: IntoIterator<Item = SelectedPath>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}
