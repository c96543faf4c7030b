//! Media types and `Accept` list handling.
//!
//! Parsing goes through the [`mime`] crate; the parsed value is stored in an
//! owned form that supports the wildcard rules used by negotiation
//! (`*/*`, `type/*` and structured suffixes such as `application/*+json`).

use std::fmt;
use std::str::FromStr;

use crate::error::MediaTypeError;

/// `application/json`
pub const APPLICATION_JSON: &str = "application/json";
/// `application/octet-stream`
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";
/// `application/x-www-form-urlencoded`
pub const APPLICATION_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// `text/plain`
pub const TEXT_PLAIN: &str = "text/plain";
/// `*/*`
pub const WILDCARD: &str = "*/*";

/// Full quality, `q=1`.
const MAX_QUALITY: u16 = 1000;

/// A parsed media type with its parameters and quality factor.
///
/// # Example
///
/// ```rust
/// use meridian_router::MediaType;
///
/// let accept = MediaType::parse("text/*;q=0.5").unwrap();
/// let plain = MediaType::parse("text/plain").unwrap();
///
/// assert!(accept.is_compatible(&plain));
/// assert!(accept.is_wildcard_subtype());
/// assert_eq!(accept.quality(), 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    type_: String,
    subtype: String,
    params: Vec<(String, String)>,
    quality: u16,
}

impl MediaType {
    /// Creates a media type from its parts, with `q=1` and no parameters.
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into().to_ascii_lowercase(),
            subtype: subtype.into().to_ascii_lowercase(),
            params: Vec::new(),
            quality: MAX_QUALITY,
        }
    }

    /// The `*/*` media type.
    #[must_use]
    pub fn wildcard() -> Self {
        Self::new("*", "*")
    }

    /// Parses a single media type such as `application/json; charset=utf-8; q=0.8`.
    ///
    /// A bare `*` is accepted as `*/*`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaTypeError`] when the input is not a valid media type.
    pub fn parse(input: &str) -> Result<Self, MediaTypeError> {
        let trimmed = input.trim();
        if trimmed == "*" {
            return Ok(Self::wildcard());
        }
        let parsed: mime::Mime = trimmed
            .parse()
            .map_err(|e: mime::FromStrError| MediaTypeError::new(input, e.to_string()))?;

        let (type_, subtype) = parsed
            .essence_str()
            .split_once('/')
            .ok_or_else(|| MediaTypeError::new(input, "missing subtype"))?;

        let mut media = Self::new(type_, subtype);
        for (name, value) in parsed.params() {
            if name.as_str().eq_ignore_ascii_case("q") {
                media.quality = parse_quality(value.as_str());
            } else {
                media
                    .params
                    .push((name.as_str().to_string(), value.as_str().to_string()));
            }
        }
        Ok(media)
    }

    /// Parses a comma separated list, as found in `Accept`.
    ///
    /// The result is sorted by quality (highest first) and, for equal quality,
    /// concrete types come before wildcards. The sort is stable, so header
    /// order decides the remaining ties. A missing or blank header yields
    /// `*/*`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaTypeError`] if any entry fails to parse.
    pub fn parse_list(header: Option<&str>) -> Result<Vec<Self>, MediaTypeError> {
        let mut list = header
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(Self::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if list.is_empty() {
            list.push(Self::wildcard());
        }
        list.sort_by(|a, b| {
            b.quality
                .cmp(&a.quality)
                .then_with(|| b.specificity().cmp(&a.specificity()))
        });
        Ok(list)
    }

    /// The primary type, e.g. `application`.
    #[must_use]
    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// The subtype, including any structured suffix, e.g. `vnd.api+json`.
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Returns the value of a parameter other than `q`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// The quality factor in `0.0..=1.0`.
    #[must_use]
    pub fn quality(&self) -> f32 {
        f32::from(self.quality) / f32::from(MAX_QUALITY)
    }

    /// The quality factor in thousandths, `0..=1000`.
    #[must_use]
    pub fn weight(&self) -> u16 {
        self.quality
    }

    /// The same type at full quality, as used on a response.
    #[must_use]
    pub fn without_quality(&self) -> Self {
        Self {
            quality: MAX_QUALITY,
            ..self.clone()
        }
    }

    /// Returns true when `q=0`, meaning "not acceptable".
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.quality == 0
    }

    /// Returns true for `*/…`.
    #[must_use]
    pub fn is_wildcard_type(&self) -> bool {
        self.type_ == "*"
    }

    /// Returns true for `…/*` and suffix wildcards like `…/*+json`.
    #[must_use]
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype.starts_with('*')
    }

    /// Returns true if neither part is a wildcard.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard_type() && !self.is_wildcard_subtype()
    }

    /// Ranks how specific the type is: `*/*` is 0, `type/*` is 1,
    /// `type/*+suffix` is 2 and a concrete type is 3.
    #[must_use]
    pub fn specificity(&self) -> u8 {
        if self.is_wildcard_type() {
            0
        } else if self.subtype == "*" {
            1
        } else if self.is_wildcard_subtype() {
            2
        } else {
            3
        }
    }

    /// Returns true if the two types can describe the same representation.
    /// The relation is symmetric and ignores parameters.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        let types =
            self.is_wildcard_type() || other.is_wildcard_type() || self.type_ == other.type_;
        types && subtypes_compatible(&self.subtype, &other.subtype)
    }

    /// Of two compatible types, returns the more specific one.
    /// Ties go to `self`.
    #[must_use]
    pub fn most_specific<'a>(&'a self, other: &'a Self) -> &'a Self {
        if other.specificity() > self.specificity() {
            other
        } else {
            self
        }
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (k, v) in &self.params {
            write!(f, ";{k}={v}")?;
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

fn subtypes_compatible(a: &str, b: &str) -> bool {
    if a == "*" || b == "*" || a == b {
        return true;
    }
    let suffix_match = |pattern: &str, concrete: &str| {
        pattern.strip_prefix("*+").is_some_and(|suffix| {
            concrete == suffix
                || concrete
                    .rsplit_once('+')
                    .is_some_and(|(_, s)| s == suffix)
        })
    };
    suffix_match(a, b) || suffix_match(b, a)
}

fn parse_quality(value: &str) -> u16 {
    let value = value.trim();
    let normalized = if value.starts_with('.') {
        format!("0{value}")
    } else {
        value.to_string()
    };
    normalized.parse::<f32>().map_or(MAX_QUALITY, |q| {
        let clamped = q.clamp(0.0, 1.0);
        // In range 0..=1000 after clamping.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let thousandths = (clamped * f32::from(MAX_QUALITY)).round() as u16;
        thousandths
    })
}
