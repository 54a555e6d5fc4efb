//! Media types and the `[!]type/subtype` expressions used by consumes and
//! produces conditions.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const WILDCARD: &str = "*";

/// Quality factor scaled to thousandths (`q=0.8` is stored as `800`).
const MAX_QUALITY: u16 = 1000;

/// Reason a media type string could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("media type must not be empty")]
    Empty,
    #[error("does not contain '/'")]
    MissingSlash,
    #[error("does not contain a subtype after '/'")]
    MissingSubtype,
    #[error("wildcard type is legal only in '*/*' (all media types)")]
    WildcardTypeWithSubtype,
    #[error("illegal character in token '{0}'")]
    IllegalToken(String),
    #[error("invalid parameter '{0}'")]
    InvalidParameter(String),
    #[error("invalid quality value '{0}'")]
    InvalidQuality(String),
}

/// A parsed `type/subtype;param=value` media type.
///
/// Type, subtype and parameter names are lower-cased at parse time so that
/// derived equality and hashing follow RFC 7231 case-insensitivity. The `q`
/// parameter is lifted out into [`MediaType::quality`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    type_: String,
    subtype: String,
    params: BTreeMap<String, String>,
    quality: u16,
}

impl MediaType {
    /// Construct from already-valid type and subtype tokens.
    pub fn new(type_: &str, subtype: &str) -> Self {
        Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: BTreeMap::new(),
            quality: MAX_QUALITY,
        }
    }

    /// `*/*`
    pub fn all() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    /// `application/octet-stream`, assumed when a request carries no Content-Type.
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Parse a single media type.
    pub fn parse(value: &str) -> Result<Self, MediaTypeError> {
        let mut parts = split_unquoted(value, ';').into_iter();
        let full = parts.next().map(str::trim).unwrap_or_default();
        if full.is_empty() {
            return Err(MediaTypeError::Empty);
        }
        // A bare "*" is sent by some clients in place of "*/*".
        let full = if full == WILDCARD { "*/*" } else { full };

        let (type_, subtype) = full.split_once('/').ok_or(MediaTypeError::MissingSlash)?;
        let type_ = type_.trim();
        let subtype = subtype.trim();
        if subtype.is_empty() {
            return Err(MediaTypeError::MissingSubtype);
        }
        check_token(type_)?;
        check_token(subtype)?;
        if type_ == WILDCARD && subtype != WILDCARD {
            return Err(MediaTypeError::WildcardTypeWithSubtype);
        }

        let mut media_type = Self::new(type_, subtype);
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, raw) = param
                .split_once('=')
                .ok_or_else(|| MediaTypeError::InvalidParameter(param.to_string()))?;
            let name = name.trim().to_ascii_lowercase();
            check_token(&name).map_err(|_| MediaTypeError::InvalidParameter(param.to_string()))?;
            let raw = raw.trim();
            let unquoted = raw
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(raw);
            if name == "q" {
                media_type.quality = parse_quality(unquoted)?;
            } else {
                media_type.params.insert(name, unquoted.to_string());
            }
        }
        Ok(media_type)
    }

    /// Parse a comma-separated header value such as `Accept`.
    ///
    /// Empty elements are skipped; an empty header yields an empty list.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, MediaTypeError> {
        split_unquoted(value, ',')
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Quality factor in thousandths (1000 when no `q` parameter was given).
    pub fn quality(&self) -> u16 {
        self.quality
    }

    pub fn is_wildcard_type(&self) -> bool {
        self.type_ == WILDCARD
    }

    /// `*` or a suffixed wildcard such as `*+json`.
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD || self.subtype.starts_with("*+")
    }

    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard_type() && !self.is_wildcard_subtype()
    }

    /// Structured syntax suffix, e.g. `json` for `application/problem+json`.
    pub fn suffix(&self) -> Option<&str> {
        self.subtype.rsplit_once('+').map(|(_, suffix)| suffix)
    }

    /// Copy without parameters or quality, as used for equality by type only.
    pub fn without_params(&self) -> Self {
        Self::new(&self.type_, &self.subtype)
    }

    /// Whether `self` includes `other`. Not symmetric:
    /// `text/*` includes `text/plain`, but not the other way around.
    pub fn includes(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() {
            return true;
        }
        if self.type_ != other.type_ {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if !self.is_wildcard_subtype() {
            return false;
        }
        match self.subtype.split_once('+') {
            // "*" includes every subtype of the same type.
            None => true,
            // "*+json" includes "problem+json".
            Some((prefix, suffix)) => prefix == WILDCARD && other.suffix() == Some(suffix),
        }
    }

    /// Symmetric relaxation of [`MediaType::includes`].
    pub fn is_compatible_with(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() || other.is_wildcard_type() {
            return true;
        }
        if self.type_ != other.type_ {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if self.is_wildcard_subtype() || other.is_wildcard_subtype() {
            let this_suffix = self.suffix();
            let other_suffix = other.suffix();
            if self.subtype == WILDCARD || other.subtype == WILDCARD {
                return true;
            }
            if self.is_wildcard_subtype() && this_suffix.is_some() {
                return this_suffix == other_suffix || Some(other.subtype.as_str()) == this_suffix;
            }
            if other.is_wildcard_subtype() && other_suffix.is_some() {
                return this_suffix == other_suffix || Some(self.subtype.as_str()) == other_suffix;
            }
        }
        false
    }

    /// Parameters declared on `self` must be present with equal values on
    /// `other`. `charset` compares case-insensitively.
    pub fn params_match(&self, other: &MediaType) -> bool {
        self.params.iter().all(|(name, value)| match other.params.get(name) {
            Some(theirs) if name == "charset" => theirs.eq_ignore_ascii_case(value),
            Some(theirs) => theirs == value,
            None => false,
        })
    }

    /// Specificity ordering: `Less` when `self` is the more specific type.
    ///
    /// Concrete types beat wildcard types, concrete subtypes beat wildcard
    /// subtypes of the same type, and among equal types more parameters win.
    /// Unrelated concrete types are considered equally specific.
    pub fn specificity_cmp(&self, other: &MediaType) -> Ordering {
        match (self.is_wildcard_type(), other.is_wildcard_type()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        if self.type_ != other.type_ {
            return Ordering::Equal;
        }
        match (self.is_wildcard_subtype(), other.is_wildcard_subtype()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        if self.subtype != other.subtype {
            return Ordering::Equal;
        }
        other.params.len().cmp(&self.params.len())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (name, value) in &self.params {
            write!(f, ";{name}={value}")?;
        }
        if self.quality != MAX_QUALITY {
            write!(f, ";q={}", f64::from(self.quality) / 1000.0)?;
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Sort accepted media types by quality, highest first.
///
/// The sort is stable, so types with equal quality keep the order the
/// client declared them in. Types with `q=0` are "not acceptable" and are
/// dropped.
pub fn sort_by_quality(types: &mut Vec<MediaType>) {
    types.retain(|t| t.quality > 0);
    types.sort_by(|a, b| b.quality.cmp(&a.quality));
}

/// A declared `type/subtype` with an optional `!` negation prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaTypeExpression {
    media_type: MediaType,
    negated: bool,
}

impl MediaTypeExpression {
    pub fn new(media_type: MediaType, negated: bool) -> Self {
        Self { media_type, negated }
    }

    pub fn parse(value: &str) -> Result<Self, MediaTypeError> {
        let value = value.trim();
        match value.strip_prefix('!') {
            Some(rest) => Ok(Self::new(MediaType::parse(rest)?, true)),
            None => Ok(Self::new(MediaType::parse(value)?, false)),
        }
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Match against a request Content-Type using "includes" semantics.
    pub fn matches_content_type(&self, content_type: &MediaType) -> bool {
        let matched = self.media_type.includes(content_type) && self.media_type.params_match(content_type);
        matched != self.negated
    }

    /// Match against the accepted types of a request using "compatible" semantics.
    pub fn matches_accepted(&self, accepted: &[MediaType]) -> bool {
        let matched = accepted
            .iter()
            .any(|a| self.media_type.is_compatible_with(a) && self.media_type.params_match(a));
        matched != self.negated
    }
}

impl fmt::Display for MediaTypeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        write!(f, "{}", self.media_type)
    }
}

fn check_token(token: &str) -> Result<(), MediaTypeError> {
    let valid = !token.is_empty()
        && token.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        });
    if valid {
        Ok(())
    } else {
        Err(MediaTypeError::IllegalToken(token.to_string()))
    }
}

fn parse_quality(raw: &str) -> Result<u16, MediaTypeError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| MediaTypeError::InvalidQuality(raw.to_string()))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(MediaTypeError::InvalidQuality(raw.to_string()));
    }
    Ok((value * 1000.0).round() as u16)
}

/// Split on `sep`, ignoring separators inside double quotes.
fn split_unquoted(value: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}
