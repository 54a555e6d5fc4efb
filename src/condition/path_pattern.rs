//! Compiled path patterns.
//!
//! Patterns are translated into an anchored [`Regex`] once at construction.
//! Supported syntax per segment:
//!
//! - literal text (regex metacharacters are escaped)
//! - `?` matches exactly one character
//! - `*` matches zero or more characters within the segment
//! - `**` as a whole segment matches zero or more segments
//! - `{name}` captures one segment
//! - `{name:regex}` captures text matching `regex` (may not span `/` unless the regex says so)
//! - `{*name}` captures the rest of the path, including its leading `/`; last segment only
//!
//! Trailing slashes are significant: `/items` does not match `/items/`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use regex::Regex;

use crate::error::RoutingError;
use crate::request::ParamVec;

#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: Arc<str>,
    regex: Regex,
    /// Variable names in order of appearance, with their generated group names.
    variables: Vec<(Arc<str>, String)>,
    /// Count of `*`, `**` and `?` wildcards.
    wildcards: usize,
    catch_all: bool,
    /// Length with every variable counted as a single character.
    normalized_len: usize,
}

impl PathPattern {
    /// Compile a pattern. A leading `/` is added when missing, except for the
    /// empty pattern which matches only `""` and `"/"`.
    pub fn parse(pattern: &str) -> Result<Self, RoutingError> {
        let raw: String = if pattern.is_empty() || pattern.starts_with('/') {
            pattern.to_string()
        } else {
            format!("/{pattern}")
        };
        let invalid = |reason: String| RoutingError::InvalidPattern {
            pattern: raw.clone(),
            reason,
        };

        if raw.is_empty() {
            let regex = Regex::new("^/?$").map_err(|e| invalid(e.to_string()))?;
            return Ok(Self {
                raw: Arc::from(""),
                regex,
                variables: Vec::new(),
                wildcards: 0,
                catch_all: false,
                normalized_len: 0,
            });
        }

        let mut regex_src = String::with_capacity(raw.len() * 2 + 2);
        regex_src.push('^');
        let mut variables: Vec<(Arc<str>, String)> = Vec::new();
        let mut wildcards = 0;
        let mut catch_all = false;
        let mut normalized_len = 0;

        let segments: Vec<&str> = raw[1..].split('/').collect();
        let last = segments.len() - 1;
        for (index, segment) in segments.iter().enumerate() {
            if catch_all {
                return Err(invalid("a `{*name}` capture must be the last segment".into()));
            }
            if *segment == "**" {
                regex_src.push_str("(?:/[^/]*)*");
                wildcards += 1;
                normalized_len += 3;
                if index == last {
                    catch_all = true;
                }
                continue;
            }
            if let Some(name) = segment
                .strip_prefix("{*")
                .and_then(|rest| rest.strip_suffix('}'))
            {
                let group = push_variable(&mut variables, name).map_err(invalid)?;
                regex_src.push_str(&format!("(?P<{group}>(?:/.*)?)"));
                catch_all = true;
                normalized_len += 2;
                continue;
            }
            regex_src.push('/');
            normalized_len += 1;
            let (seg_wildcards, seg_len) =
                compile_segment(segment, &mut regex_src, &mut variables).map_err(invalid)?;
            wildcards += seg_wildcards;
            normalized_len += seg_len;
        }
        regex_src.push('$');

        let regex = Regex::new(&regex_src).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            raw: Arc::from(raw.as_str()),
            regex,
            variables,
            wildcards,
            catch_all,
            normalized_len,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a full request path, returning the captured variables.
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        let captures = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (name, group) in &self.variables {
            let value = captures.name(group).map_or("", |m| m.as_str());
            params.push((Arc::clone(name), value.to_string()));
        }
        Some(params)
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// True when the pattern has no variables or wildcards.
    pub fn is_literal(&self) -> bool {
        self.variables.is_empty() && self.wildcards == 0
    }

    /// True for patterns that end in `/**` or `{*name}`.
    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(name, _)| name.as_ref())
    }

    fn score(&self) -> usize {
        self.variables.len() + 100 * self.wildcards
    }

    /// `Less` when `self` is the more specific pattern.
    ///
    /// Catch-all patterns sort last, then the lower score wins, then the
    /// longer pattern.
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        self.catch_all
            .cmp(&other.catch_all)
            .then_with(|| self.score().cmp(&other.score()))
            .then_with(|| other.normalized_len.cmp(&self.normalized_len))
    }

    /// Concatenate a type-level pattern with a method-level one.
    ///
    /// A trailing `/*` on `self` is replaced by `other`; slashes at the seam
    /// are collapsed.
    pub fn combine(&self, other: &Self) -> Result<Self, RoutingError> {
        if self.raw.is_empty() {
            return Ok(other.clone());
        }
        if other.raw.is_empty() {
            return Ok(self.clone());
        }
        let prefix = self.raw.strip_suffix("/*").unwrap_or(&self.raw);
        let prefix = prefix.trim_end_matches('/');
        let suffix = other.raw.trim_start_matches('/');
        if suffix.is_empty() {
            return Self::parse(&format!("{prefix}/"));
        }
        Self::parse(&format!("{prefix}/{suffix}"))
    }
}

fn push_variable(variables: &mut Vec<(Arc<str>, String)>, name: &str) -> Result<String, String> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(format!("invalid variable name `{name}`"));
    }
    if variables.iter().any(|(existing, _)| existing.as_ref() == name) {
        return Err(format!("variable `{name}` appears more than once"));
    }
    let group = format!("v{}", variables.len());
    variables.push((Arc::from(name), group.clone()));
    Ok(group)
}

/// Compile one `/`-free segment. Returns (wildcards, normalized length).
fn compile_segment(
    segment: &str,
    out: &mut String,
    variables: &mut Vec<(Arc<str>, String)>,
) -> Result<(usize, usize), String> {
    let mut wildcards = 0;
    let mut len = 0;
    let mut literal = String::new();
    let mut chars = segment.char_indices().peekable();

    let flush = |literal: &mut String, out: &mut String| {
        if !literal.is_empty() {
            out.push_str(&regex::escape(literal));
            literal.clear();
        }
    };

    while let Some((start, c)) = chars.next() {
        match c {
            '?' => {
                flush(&mut literal, out);
                out.push_str("[^/]");
                wildcards += 1;
                len += 1;
            }
            '*' => {
                if chars.peek().is_some_and(|(_, n)| *n == '*') {
                    return Err("`**` must be a whole segment".into());
                }
                flush(&mut literal, out);
                out.push_str("[^/]*");
                wildcards += 1;
                len += 1;
            }
            '{' => {
                flush(&mut literal, out);
                let mut depth = 1;
                let mut end = None;
                for (i, ch) in chars.by_ref() {
                    match ch {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(i);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let end = end.ok_or_else(|| "unclosed `{`".to_string())?;
                let body = &segment[start + 1..end];
                if body.starts_with('*') {
                    return Err("a `{*name}` capture must fill its whole segment".into());
                }
                let (name, constraint) = match body.split_once(':') {
                    Some((name, re)) => (name, Some(re)),
                    None => (body, None),
                };
                let group = push_variable(variables, name)?;
                match constraint {
                    Some(re) if !re.is_empty() => out.push_str(&format!("(?P<{group}>{re})")),
                    Some(_) => return Err(format!("empty regex for variable `{name}`")),
                    None => out.push_str(&format!("(?P<{group}>[^/]+)")),
                }
                len += 1;
            }
            '}' => return Err("unmatched `}`".into()),
            _ => {
                literal.push(c);
                len += 1;
            }
        }
    }
    flush(&mut literal, out);
    Ok((wildcards, len))
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PathPattern {}

impl Hash for PathPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for PathPattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathPattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
