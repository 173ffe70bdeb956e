//! Query predicates and the builder that assembles them from a request.
//!
//! Predicates form a small AST rendered in Lucene syntax:
//!
//! ```text
//! AND( OR(isWork, isAnchor, isTombstoned),
//!      formatAdditionalQuery?, setPredicate?, NOT(restrictions)?, dateWindow? )
//! ```
//!
//! The tombstone branch keeps deleted records in every result set so
//! deletions are reported through the same paging path as live records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{AccessRestriction, ProviderConfig};
use crate::fields;
use crate::format::FormatDescriptor;
use crate::window::Window;

/// Width range values are padded to so that lexicographic and numeric
/// ordering of millisecond timestamps agree.
pub const RANGE_VALUE_WIDTH: usize = 13;

/// Placeholder in restriction conditions replaced by the current year.
pub const YEAR_PLACEHOLDER: &str = "$YEAR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// `FIELD:value`
    Term { field: String, value: String },
    /// `FIELD:"value"`
    Phrase { field: String, value: String },
    /// `FIELD:*`
    Exists { field: String },
    /// `FIELD:[from TO until]`, bounds padded to [`RANGE_VALUE_WIDTH`].
    Range {
        field: String,
        from: String,
        until: String,
    },
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
    /// Literal query text, always parenthesized when nested.
    Literal(String),
    /// Restriction condition. Rendered bare when it starts with a negation,
    /// since a parenthesized purely negative clause matches nothing.
    Condition(String),
}

impl Query {
    pub fn term(field: &str, value: impl Into<String>) -> Self {
        Query::Term {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn phrase(field: &str, value: impl Into<String>) -> Self {
        Query::Phrase {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn exists(field: &str) -> Self {
        Query::Exists {
            field: field.to_string(),
        }
    }

    pub fn range(field: &str, from: i64, until: i64) -> Self {
        Query::Range {
            field: field.to_string(),
            from: pad_range_value(&from.to_string()),
            until: pad_range_value(&until.to_string()),
        }
    }

    /// `isWork OR isAnchor OR isTombstoned`
    pub fn publishable_or_tombstone() -> Self {
        Query::Or(vec![
            Query::term(fields::IS_WORK, "true"),
            Query::term(fields::IS_ANCHOR, "true"),
            Query::exists(fields::DATE_DELETED),
        ])
    }

    fn is_composite(&self) -> bool {
        matches!(self, Query::And(_) | Query::Or(_) | Query::Literal(_))
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_composite() {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Query], op: &str) -> fmt::Result {
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                write!(f, " {op} ")?;
            }
            part.write_operand(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term { field, value } => write!(f, "{field}:{}", escape_term(value)),
            Query::Phrase { field, value } => {
                write!(f, "{field}:\"{}\"", value.replace('"', "\\\""))
            }
            Query::Exists { field } => write!(f, "{field}:*"),
            Query::Range { field, from, until } => write!(f, "{field}:[{from} TO {until}]"),
            Query::And(parts) => Query::write_joined(f, parts, "AND"),
            Query::Or(parts) => Query::write_joined(f, parts, "OR"),
            Query::Not(inner) => {
                f.write_str("NOT ")?;
                inner.write_operand(f)
            }
            Query::Literal(text) => f.write_str(text),
            Query::Condition(text) => {
                if is_negated(text) {
                    f.write_str(text)
                } else {
                    write!(f, "({text})")
                }
            }
        }
    }
}

fn escape_term(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_whitespace() || "\\+-!():^[]\"{}~*?|&/".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn is_negated(text: &str) -> bool {
    let text = text.trim_start();
    text.starts_with('-') || text.starts_with("NOT ")
}

/// Left-pads non-negative values shorter than 13 digits with zeros.
pub fn pad_range_value(value: &str) -> String {
    if value.starts_with('-') || value.len() >= RANGE_VALUE_WIDTH {
        return value.to_string();
    }
    format!("{value:0>width$}", width = RANGE_VALUE_WIDTH)
}

/// How a `set` argument modifies the base predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetSelection {
    /// The set's literal query replaces the base predicate.
    Replace(Query),
    /// The clause is ANDed with the base predicate.
    Refine(Query),
}

/// Assembles predicates from the provider configuration.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    config: &'a ProviderConfig,
    current_year: i32,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(config: &'a ProviderConfig, current_year: i32) -> Self {
        Self {
            config,
            current_year,
        }
    }

    /// Full predicate for a list request.
    ///
    /// `window` is ignored for formats flagged as timestamp-irrelevant.
    pub fn build(
        &self,
        format: &FormatDescriptor,
        set_spec: Option<&str>,
        window: Option<Window>,
    ) -> Query {
        let mut base = Query::publishable_or_tombstone();
        let mut refinement = None;
        if let Some(spec) = set_spec {
            match self.resolve_set(spec) {
                SetSelection::Replace(literal) => base = literal,
                SetSelection::Refine(clause) => refinement = Some(clause),
            }
        }

        let mut clauses = vec![base];
        if let Some(extra) = format.additional_query.as_deref() {
            clauses.push(Query::Literal(extra.to_string()));
        }
        clauses.extend(refinement);
        clauses.extend(self.restriction_clause());
        if !format.ignore_dates {
            if let Some(window) = window {
                clauses.push(Query::range(
                    fields::DATE_UPDATED,
                    window.from_millis,
                    window.until_millis,
                ));
            }
        }
        Query::And(clauses)
    }

    /// Predicate selecting one record by identifier, for GetRecord and
    /// ListMetadataFormats.
    pub fn build_identifier(&self, identifier: &str) -> Query {
        let mut clauses = vec![
            Query::phrase(fields::PI, identifier),
            Query::publishable_or_tombstone(),
        ];
        clauses.extend(self.restriction_clause());
        Query::And(clauses)
    }

    /// Base predicate with access restrictions, no set or window.
    pub fn build_base(&self) -> Query {
        let mut clauses = vec![Query::publishable_or_tombstone()];
        clauses.extend(self.restriction_clause());
        Query::And(clauses)
    }

    pub fn resolve_set(&self, spec: &str) -> SetSelection {
        if let Some(literal) = self.config.find_set(spec).and_then(|s| s.query.as_deref()) {
            return SetSelection::Replace(Query::Literal(literal.to_string()));
        }
        if let Some((field, _)) = spec.split_once(':') {
            if self.config.all_values_sets.iter().any(|name| name == field) {
                return SetSelection::Refine(Query::Literal(spec.to_string()));
            }
        }
        SetSelection::Refine(Query::term(fields::PRIMARY_CLASSIFICATION, spec))
    }

    /// `NOT (r1 OR r2 ...)`, or `None` when no restrictions are configured.
    pub fn restriction_clause(&self) -> Option<Query> {
        let restrictions: Vec<Query> = self
            .config
            .restrictions
            .iter()
            .map(|r| self.restriction(r))
            .collect();
        match restrictions.len() {
            0 => None,
            1 => restrictions
                .into_iter()
                .next()
                .map(|r| Query::Not(Box::new(r))),
            _ => Some(Query::Not(Box::new(Query::Or(restrictions)))),
        }
    }

    fn restriction(&self, restriction: &AccessRestriction) -> Query {
        let matched = Query::phrase(&restriction.field, restriction.value.clone());
        match restriction.condition.as_deref().map(str::trim) {
            Some(condition) if !condition.is_empty() => Query::And(vec![
                matched,
                Query::Condition(self.substitute_year(condition)),
            ]),
            _ => matched,
        }
    }

    fn substitute_year(&self, condition: &str) -> String {
        if condition.contains(fields::ABSOLUTE_DATE_PREFIX) {
            return condition.to_string();
        }
        condition.replace(YEAR_PLACEHOLDER, &self.current_year.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_values_are_padded() {
        assert_eq!(pad_range_value("0"), "0000000000000");
        assert_eq!(pad_range_value("1420156799999"), "1420156799999");
        assert_eq!(pad_range_value("253402300799999"), "253402300799999");
        assert_eq!(pad_range_value("-5"), "-5");
        assert_eq!(pad_range_value("86400000"), "0000086400000");
    }

    #[test]
    fn term_values_are_escaped() {
        assert_eq!(Query::term("DC", "x:y").to_string(), "DC:x\\:y");
        assert_eq!(Query::term("DC", "a.b c").to_string(), "DC:a.b\\ c");
        assert_eq!(Query::term("ISWORK", "true").to_string(), "ISWORK:true");
    }

    #[test]
    fn nested_composites_are_parenthesized() {
        let query = Query::And(vec![
            Query::publishable_or_tombstone(),
            Query::term("DC", "x"),
        ]);
        assert_eq!(
            query.to_string(),
            "(ISWORK:true OR ISANCHOR:true OR DATEDELETED:*) AND DC:x"
        );
    }

    #[test]
    fn negated_condition_is_not_wrapped() {
        let positive = Query::And(vec![
            Query::phrase("ACCESS", "restricted"),
            Query::Condition("YEAR:[* TO 2020]".into()),
        ]);
        assert_eq!(positive.to_string(), "ACCESS:\"restricted\" AND (YEAR:[* TO 2020])");

        let negative = Query::And(vec![
            Query::phrase("ACCESS", "restricted"),
            Query::Condition("-YEAR:[* TO 2020]".into()),
        ]);
        assert_eq!(negative.to_string(), "ACCESS:\"restricted\" AND -YEAR:[* TO 2020]");
    }
}
