//! Predicate-based catalog search.

use serde_json::Value;

/// A single field predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact equality on the field's string form.
    Eq { field: String, value: String },
    /// Case-insensitive SQL `LIKE` with `%` and `_` wildcards.
    ILike { field: String, pattern: String },
    /// Field value is one of the listed values.
    In { field: String, values: Vec<String> },
}

impl Predicate {
    /// Check the predicate against an encoded record.
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Predicate::Eq { field, value } => {
                field_text(record, field).is_some_and(|v| &v == value)
            }
            Predicate::ILike { field, pattern } => {
                field_text(record, field).is_some_and(|v| ilike(&v, pattern))
            }
            Predicate::In { field, values } => {
                field_text(record, field).is_some_and(|v| values.contains(&v))
            }
        }
    }
}

/// A conjunction of predicates with an optional result cap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    predicates: Vec<Predicate>,
    max_results: Option<usize>,
}

impl Criteria {
    /// Criteria matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn eq(mut self, field: &str, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Eq {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    /// Require a boolean field to be set or clear.
    pub fn flag(self, field: &str, value: bool) -> Self {
        self.eq(field, flag_text(value))
    }

    /// Require `field ILIKE pattern`.
    pub fn ilike(mut self, field: &str, pattern: impl Into<String>) -> Self {
        self.predicates.push(Predicate::ILike {
            field: field.to_string(),
            pattern: pattern.into(),
        });
        self
    }

    /// Require `field` to equal `value`, ignoring case.
    pub fn same_name(self, field: &str, value: &str) -> Self {
        self.ilike(field, escape_like(value))
    }

    /// Require `field IN (values)`.
    pub fn any_of<I, S>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predicates.push(Predicate::In {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Cap the number of results.
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    /// The result cap, if any.
    pub fn limit(&self) -> Option<usize> {
        self.max_results
    }

    /// Check every predicate against an encoded record.
    pub fn matches(&self, record: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

/// `Y`/`N` text of a boolean field.
pub fn flag_text(value: bool) -> &'static str {
    if value {
        "Y"
    } else {
        "N"
    }
}

fn field_text(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(flag_text(*b).to_string()),
        other => Some(other.to_string()),
    }
}

/// Escape `%`, `_` and `\` so `value` matches itself under `ILIKE`.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    AnyRun,
    AnyOne,
    Literal(char),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::AnyRun,
            '_' => Token::AnyOne,
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            c => Token::Literal(c),
        });
    }
    tokens
}

/// SQL `ILIKE` with `\` as the escape character.
fn ilike(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.to_lowercase().chars().collect();
    let pattern = tokenize(&pattern.to_lowercase());

    // Wildcard matching, backtracking to the last `%`.
    let (mut v, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while v < value.len() {
        match pattern.get(p) {
            Some(Token::AnyRun) => {
                star = Some((p, v));
                p += 1;
            }
            Some(Token::AnyOne) => {
                v += 1;
                p += 1;
            }
            Some(Token::Literal(c)) if *c == value[v] => {
                v += 1;
                p += 1;
            }
            _ => match star {
                Some((sp, sv)) => {
                    p = sp + 1;
                    v = sv + 1;
                    star = Some((sp, sv + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|t| *t == Token::AnyRun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ilike_wildcards() {
        assert!(ilike("TEST_Orders", "test_orders"));
        assert!(ilike("test_orders", "test%"));
        assert!(ilike("test_orders", "%ord%"));
        assert!(ilike("abc", "a_c"));
        assert!(!ilike("abcd", "a_c"));
        assert!(ilike("", "%"));
        assert!(!ilike("orders", "test%"));
    }

    #[test]
    fn test_escaped_underscore_is_literal() {
        let pattern = escape_like("test_my_table");
        assert_eq!(pattern, "test\\_my\\_table");
        assert!(ilike("TEST_MY_TABLE", &pattern));
        assert!(!ilike("testXmyXtable", &pattern));
        assert!(ilike("testXmyXtable", "test_my_table"));
    }

    #[test]
    fn test_criteria_conjunction() {
        let record = json!({
            "id": "1",
            "db_table_name": "test_orders",
            "is_view": false,
            "access_level": "4",
            "window_id": null,
        });

        assert!(Criteria::new().matches(&record));
        assert!(Criteria::new()
            .ilike("db_table_name", "TEST_ORDERS")
            .flag("is_view", false)
            .matches(&record));
        assert!(!Criteria::new()
            .eq("db_table_name", "TEST_ORDERS")
            .matches(&record));
        assert!(Criteria::new()
            .any_of("access_level", ["3", "4"])
            .matches(&record));
        assert!(!Criteria::new().eq("window_id", "null").matches(&record));
        assert!(!Criteria::new().eq("missing", "x").matches(&record));
    }
}
