//! IDMEF message model: messages, field paths and filter criteria.

mod criteria;
mod message;
mod path;

pub use criteria::{Criteria, Criterion, CriterionValue, Relation};
pub use message::{Message, MessageKind};
pub use path::{FieldPath, PathElement, PathError};
