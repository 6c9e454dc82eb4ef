//! Filter trees over message fields.
//!
//! `Criteria` is built by the caller and handed to the database by shared
//! reference. The database never inspects it; the format translates it to
//! SQL.

use std::fmt;
use std::ops::Not;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Comparison between a field and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Lesser,
    LesserOrEqual,
    /// Field contains the value as a substring.
    Substr,
    IsNull,
    IsNotNull,
}

impl Relation {
    /// Whether the relation compares against a value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, Relation::IsNull | Relation::IsNotNull)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Equal => "==",
            Relation::NotEqual => "!=",
            Relation::Greater => ">",
            Relation::GreaterOrEqual => ">=",
            Relation::Lesser => "<",
            Relation::LesserOrEqual => "<=",
            Relation::Substr => "~",
            Relation::IsNull => "is null",
            Relation::IsNotNull => "is not null",
        }
    }
}

/// Right-hand side of a criterion.
#[derive(Debug, Clone, PartialEq)]
pub enum CriterionValue {
    Text(String),
    Integer(i64),
    /// Integer above `i64::MAX`, such as a large analyzer identifier.
    Unsigned(u64),
    Float(f64),
    Time(DateTime<Utc>),
}

impl fmt::Display for CriterionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriterionValue::Text(s) => f.write_str(s),
            CriterionValue::Integer(i) => write!(f, "{}", i),
            CriterionValue::Unsigned(u) => write!(f, "{}", u),
            CriterionValue::Float(x) => write!(f, "{}", x),
            CriterionValue::Time(t) => f.write_str(&t.to_rfc3339()),
        }
    }
}

impl From<&str> for CriterionValue {
    fn from(s: &str) -> Self {
        CriterionValue::Text(s.to_string())
    }
}

impl From<String> for CriterionValue {
    fn from(s: String) -> Self {
        CriterionValue::Text(s)
    }
}

impl From<i64> for CriterionValue {
    fn from(i: i64) -> Self {
        CriterionValue::Integer(i)
    }
}

impl From<u64> for CriterionValue {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => CriterionValue::Integer(i),
            Err(_) => CriterionValue::Unsigned(u),
        }
    }
}

impl From<f64> for CriterionValue {
    fn from(x: f64) -> Self {
        CriterionValue::Float(x)
    }
}

impl From<DateTime<Utc>> for CriterionValue {
    fn from(t: DateTime<Utc>) -> Self {
        CriterionValue::Time(t)
    }
}

/// A single `path relation value` test.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub path: String,
    pub relation: Relation,
    pub value: Option<CriterionValue>,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} {}", self.path, self.relation.symbol(), value),
            None => write!(f, "{} {}", self.path, self.relation.symbol()),
        }
    }
}

/// Relation symbols in match order: two-character symbols first.
const SYMBOLS: [(&str, Relation); 7] = [
    ("==", Relation::Equal),
    ("!=", Relation::NotEqual),
    (">=", Relation::GreaterOrEqual),
    ("<=", Relation::LesserOrEqual),
    (">", Relation::Greater),
    ("<", Relation::Lesser),
    ("~", Relation::Substr),
];

fn parse_value(raw: &str) -> CriterionValue {
    let raw = raw.trim();
    if let Some(quoted) = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
    {
        return CriterionValue::Text(quoted.to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return CriterionValue::Integer(i);
    }
    if let Ok(u) = raw.parse::<u64>() {
        return CriterionValue::from(u);
    }
    if let Ok(x) = raw.parse::<f64>() {
        return CriterionValue::Float(x);
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return CriterionValue::Time(t.with_timezone(&Utc));
    }
    CriterionValue::Text(raw.to_string())
}

/// Parse `path OP value`, `path is null` or `path is not null`.
///
/// `OP` is one of `==`, `!=`, `>`, `>=`, `<`, `<=` or `~` (substring).
/// Quoted values are always text; unquoted values are read as integer,
/// float or RFC 3339 time when they parse as one.
impl FromStr for Criterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();

        for (suffix, relation) in [(" is not null", Relation::IsNotNull), (" is null", Relation::IsNull)] {
            if lower.ends_with(suffix) {
                let path = s[..s.len() - suffix.len()].trim();
                if path.is_empty() {
                    return Err(format!("missing field path in '{}'", s));
                }
                return Ok(Criterion {
                    path: path.to_string(),
                    relation,
                    value: None,
                });
            }
        }

        let (pos, symbol, relation) = SYMBOLS
            .iter()
            .filter_map(|(symbol, relation)| s.find(symbol).map(|pos| (pos, *symbol, *relation)))
            .min_by_key(|(pos, symbol, _)| (*pos, usize::MAX - symbol.len()))
            .ok_or_else(|| format!("no relation found in '{}'", s))?;

        let path = s[..pos].trim();
        if path.is_empty() {
            return Err(format!("missing field path in '{}'", s));
        }

        Ok(Criterion {
            path: path.to_string(),
            relation,
            value: Some(parse_value(&s[pos + symbol.len()..])),
        })
    }
}

/// Boolean combination of criteria.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    Criterion(Criterion),
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
    Not(Box<Criteria>),
}

impl Criteria {
    pub fn criterion(path: impl Into<String>, relation: Relation, value: impl Into<CriterionValue>) -> Self {
        Criteria::Criterion(Criterion {
            path: path.into(),
            relation,
            value: Some(value.into()),
        })
    }

    pub fn equal(path: impl Into<String>, value: impl Into<CriterionValue>) -> Self {
        Self::criterion(path, Relation::Equal, value)
    }

    pub fn is_null(path: impl Into<String>) -> Self {
        Criteria::Criterion(Criterion {
            path: path.into(),
            relation: Relation::IsNull,
            value: None,
        })
    }

    pub fn is_not_null(path: impl Into<String>) -> Self {
        Criteria::Criterion(Criterion {
            path: path.into(),
            relation: Relation::IsNotNull,
            value: None,
        })
    }

    /// Combine with AND, flattening nested conjunctions.
    pub fn and(self, other: Criteria) -> Self {
        match (self, other) {
            (Criteria::And(mut left), Criteria::And(right)) => {
                left.extend(right);
                Criteria::And(left)
            }
            (Criteria::And(mut left), other) => {
                left.push(other);
                Criteria::And(left)
            }
            (this, other) => Criteria::And(vec![this, other]),
        }
    }

    /// Combine with OR, flattening nested disjunctions.
    pub fn or(self, other: Criteria) -> Self {
        match (self, other) {
            (Criteria::Or(mut left), Criteria::Or(right)) => {
                left.extend(right);
                Criteria::Or(left)
            }
            (Criteria::Or(mut left), other) => {
                left.push(other);
                Criteria::Or(left)
            }
            (this, other) => Criteria::Or(vec![this, other]),
        }
    }

    /// Every criterion in the tree, depth first.
    pub fn criteria(&self) -> Vec<&Criterion> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Criterion>) {
        match self {
            Criteria::Criterion(c) => out.push(c),
            Criteria::And(list) | Criteria::Or(list) => list.iter().for_each(|c| c.collect(out)),
            Criteria::Not(inner) => inner.collect(out),
        }
    }
}

impl Not for Criteria {
    type Output = Criteria;

    fn not(self) -> Criteria {
        match self {
            Criteria::Not(inner) => *inner,
            other => Criteria::Not(Box::new(other)),
        }
    }
}

impl From<Criterion> for Criteria {
    fn from(c: Criterion) -> Self {
        Criteria::Criterion(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("alert.classification.text == 'Ping'", Relation::Equal, Some(CriterionValue::Text("Ping".into())))]
    #[case("alert.analyzerid!=7", Relation::NotEqual, Some(CriterionValue::Integer(7)))]
    #[case("alert.assessment.confidence >= 0.5", Relation::GreaterOrEqual, Some(CriterionValue::Float(0.5)))]
    #[case("alert.create_time < 2024-01-01T00:00:00Z", Relation::Lesser, Some(CriterionValue::Time("2024-01-01T00:00:00Z".parse().unwrap())))]
    #[case("alert.classification.text ~ scan", Relation::Substr, Some(CriterionValue::Text("scan".into())))]
    #[case("alert.source IS NULL", Relation::IsNull, None)]
    #[case("alert.source is not null", Relation::IsNotNull, None)]
    fn test_parse_criterion(
        #[case] input: &str,
        #[case] relation: Relation,
        #[case] value: Option<CriterionValue>,
    ) {
        let c: Criterion = input.parse().unwrap();
        assert!(c.path.starts_with("alert."));
        assert_eq!(c.relation, relation);
        assert_eq!(c.value, value);
    }

    #[rstest]
    fn test_parse_quoted_number_stays_text() {
        let c: Criterion = "alert.ident == \"42\"".parse().unwrap();
        assert_eq!(c.value, Some(CriterionValue::Text("42".into())));
    }

    #[rstest]
    #[case("alert.ident")]
    #[case("== 5")]
    #[case(" is null")]
    fn test_parse_criterion_errors(#[case] input: &str) {
        assert!(input.parse::<Criterion>().is_err());
    }

    #[rstest]
    fn test_and_flattens() {
        let c = Criteria::equal("alert.a", 1i64)
            .and(Criteria::equal("alert.b", 2i64))
            .and(Criteria::equal("alert.c", 3i64));
        match c {
            Criteria::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[rstest]
    fn test_double_negation_cancels() {
        let c = Criteria::is_null("alert.a");
        assert_eq!(!!c.clone(), c);
    }

    #[rstest]
    fn test_criteria_lists_every_leaf() {
        let c = Criteria::equal("alert.a", "x").or(!Criteria::is_null("alert.b"));
        let paths: Vec<&str> = c.criteria().iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["alert.a", "alert.b"]);
    }

    #[rstest]
    #[case(7, CriterionValue::Integer(7))]
    #[case(i64::MAX as u64, CriterionValue::Integer(i64::MAX))]
    #[case(1 << 63, CriterionValue::Unsigned(1 << 63))]
    #[case(u64::MAX, CriterionValue::Unsigned(u64::MAX))]
    fn test_u64_value_keeps_magnitude(#[case] u: u64, #[case] expected: CriterionValue) {
        assert_eq!(CriterionValue::from(u), expected);
    }

    #[rstest]
    #[case("alert.analyzerid == 18446744073709551615", CriterionValue::Unsigned(u64::MAX))]
    #[case("alert.analyzerid == 9223372036854775808", CriterionValue::Unsigned(1 << 63))]
    #[case("alert.analyzerid == 9223372036854775807", CriterionValue::Integer(i64::MAX))]
    fn test_parse_large_integers(#[case] input: &str, #[case] expected: CriterionValue) {
        let c: Criterion = input.parse().unwrap();
        assert_eq!(c.value, Some(expected));
        assert_eq!(c.to_string(), input);
    }

    #[rstest]
    fn test_parse_beyond_u64_is_float() {
        let c: Criterion = "alert.analyzerid == 18446744073709551616".parse().unwrap();
        assert!(matches!(c.value, Some(CriterionValue::Float(_))));
    }
}
