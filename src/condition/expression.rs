use std::fmt;

use crate::error::RoutingError;

/// `name`, `!name`, `name=value` or `name!=value`.
///
/// Shared by the params and headers conditions; header names are
/// lower-cased by the caller before construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameValueExpression {
    name: String,
    value: Option<String>,
    negated: bool,
}

impl NameValueExpression {
    pub fn parse(expression: &str) -> Result<Self, RoutingError> {
        let invalid = |reason: &str| RoutingError::InvalidMapping {
            value: expression.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = expression.trim();
        let (name, value, negated) = if let Some((name, value)) = trimmed.split_once("!=") {
            (name, Some(value), true)
        } else if let Some((name, value)) = trimmed.split_once('=') {
            (name, Some(value), false)
        } else if let Some(name) = trimmed.strip_prefix('!') {
            (name, None, true)
        } else {
            (trimmed, None, false)
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("expression has no name"));
        }
        Ok(Self {
            name: name.to_string(),
            value: value.map(|v| v.trim().to_string()),
            negated,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub(crate) fn with_lowercase_name(mut self) -> Self {
        self.name = self.name.to_ascii_lowercase();
        self
    }

    /// Evaluate against the values present for `name` on the request
    /// (empty when the name is absent).
    pub fn matches<'a, I>(&self, mut present: I, name_present: bool) -> bool
    where
        I: Iterator<Item = &'a str>,
    {
        let matched = match &self.value {
            None => name_present,
            Some(expected) => present.any(|v| v == expected),
        };
        matched != self.negated
    }
}

impl fmt::Display for NameValueExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, self.negated) {
            (None, false) => write!(f, "{}", self.name),
            (None, true) => write!(f, "!{}", self.name),
            (Some(v), false) => write!(f, "{}={}", self.name, v),
            (Some(v), true) => write!(f, "{}!={}", self.name, v),
        }
    }
}
