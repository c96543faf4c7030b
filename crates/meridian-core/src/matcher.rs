//! Request matching.
//!
//! [`RouteTable::match_route`] turns method, path and negotiation headers
//! into one [`MatchCandidate`] or a [`DispatchError`]:
//!
//! 1. Collect every method whose template matches the whole path. Locators
//!    match a prefix; the remainder is matched against the sub-resource
//!    class they declare.
//! 2. Keep methods with the request verb (`HEAD` falls back to `GET`),
//!    otherwise `405` with the allowed set.
//! 3. Keep methods that consume the request media type, otherwise `415`.
//! 4. Keep methods that produce an acceptable media type, otherwise `406`.
//! 5. Pick the best by [`Specificity`].

use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

use http::Method;
use meridian_router::{MediaType, MethodSet, Params, RequestPath};

use crate::error::DispatchError;
use crate::request::RequestParts;
use crate::registry::RouteTable;
use crate::resource::{MethodKind, ResourceMethod};

/// Locator hops followed before giving up on a path.
const MAX_LOCATOR_DEPTH: usize = 32;

/// How specifically a candidate matched. Greater is better.
///
/// Fields are compared in declaration order; for `regex_captures`, `hops`
/// and `order` smaller values rank higher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specificity {
    /// Path segments without captures, summed over the locator chain.
    pub literal_segments: usize,
    /// Characters outside captures.
    pub literal_chars: usize,
    /// Captures with a custom regular expression.
    pub regex_captures: usize,
    /// All captures.
    pub captures: usize,
    /// Specificity of the consumes entry that matched the request type.
    pub consumes: u8,
    /// Locators between the root class and the method.
    pub hops: usize,
    /// Accept quality, Accept entry specificity and produces specificity.
    pub media: (u16, u8, u8),
    /// Registration ids along the chain.
    pub order: Vec<usize>,
}

impl Ord for Specificity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.literal_segments
            .cmp(&other.literal_segments)
            .then_with(|| self.literal_chars.cmp(&other.literal_chars))
            .then_with(|| other.regex_captures.cmp(&self.regex_captures))
            .then_with(|| self.captures.cmp(&other.captures))
            .then_with(|| self.consumes.cmp(&other.consumes))
            .then_with(|| other.hops.cmp(&self.hops))
            .then_with(|| self.media.cmp(&other.media))
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What one element of a locator chain matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainMatch {
    /// Raw values captured by this element's template.
    pub values: Params,
    /// Indexes of the request path segments this element's template consumed.
    pub segments: Range<usize>,
}

/// The selected method and everything matching learned about it.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    /// Locators to run first, then the method itself last.
    pub chain: Vec<Arc<ResourceMethod>>,
    /// Per-element matches, aligned with `chain`.
    pub matched: Vec<ChainMatch>,
    /// Raw captured values from every template in the chain, in chain order.
    pub values: Params,
    /// The score that selected this candidate.
    pub specificity: Specificity,
    /// The request media type, when the request has one.
    pub request_type: Option<MediaType>,
    /// The response media type chosen from produces and `Accept`.
    pub response_type: MediaType,
    /// Set when a `HEAD` request is served by a `GET` method.
    pub head_fallback: bool,
}

impl MatchCandidate {
    /// The method that produces the response.
    #[must_use]
    pub fn method(&self) -> &Arc<ResourceMethod> {
        &self.chain[self.chain.len() - 1]
    }

    /// The locators preceding the method.
    #[must_use]
    pub fn locators(&self) -> &[Arc<ResourceMethod>] {
        &self.chain[..self.chain.len() - 1]
    }

    /// The class owning the first element of the chain.
    #[must_use]
    pub fn root_class(&self) -> usize {
        self.chain[0].class()
    }

    /// Where `method` sits in the chain. The last occurrence wins when a
    /// locator chain passes through the same method twice.
    #[must_use]
    pub fn position(&self, method: &ResourceMethod) -> Option<usize> {
        self.chain.iter().rposition(|m| m.id() == method.id())
    }

    /// A captured path value as seen by the chain element at `position`.
    ///
    /// The element's own captures shadow those of the locators before it.
    /// Captures made further down the chain are not visible.
    #[must_use]
    pub fn path_value(&self, position: usize, name: &str) -> Option<&str> {
        self.visible(position)
            .iter()
            .rev()
            .find_map(|m| m.values.get(name))
    }

    /// Path segment indexes visible to the chain element at `position`:
    /// its own segments last first, then those of each earlier locator.
    pub fn segment_scope(&self, position: usize) -> impl Iterator<Item = usize> + '_ {
        self.visible(position)
            .iter()
            .rev()
            .flat_map(|m| m.segments.clone().rev())
    }

    fn visible(&self, position: usize) -> &[ChainMatch] {
        let end = position.saturating_add(1).min(self.matched.len());
        &self.matched[..end]
    }

    /// The matched template with locator templates joined in.
    #[must_use]
    pub fn template(&self) -> String {
        let joined: String = self
            .chain
            .iter()
            .map(|m| m.template().as_str().trim_end_matches('/'))
            .collect();
        if joined.is_empty() {
            "/".to_string()
        } else {
            joined
        }
    }
}

/// One full-path match before verb and media filtering.
#[derive(Clone)]
struct PathMatch {
    chain: Vec<Arc<ResourceMethod>>,
    matched: Vec<ChainMatch>,
}

impl PathMatch {
    fn method(&self) -> &ResourceMethod {
        &self.chain[self.chain.len() - 1]
    }

    fn path_score(&self) -> (usize, usize, usize, usize) {
        self.chain.iter().fold((0, 0, 0, 0), |acc, m| {
            let t = m.template();
            (
                acc.0 + t.literal_segments(),
                acc.1 + t.literal_chars(),
                acc.2 + t.regex_captures(),
                acc.3 + t.capture_count(),
            )
        })
    }
}

impl RouteTable {
    /// Matches a request.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `MethodNotAllowed`, `UnsupportedMediaType` or
    /// `NotAcceptable` as described in the module docs.
    pub fn match_route(
        &self,
        method: &Method,
        path: &RequestPath,
        accept: Option<&str>,
        content_type: Option<&str>,
        has_body: bool,
    ) -> Result<MatchCandidate, DispatchError> {
        let mut matches = Vec::new();
        let root = ChainPrefix {
            chain: &[],
            matched: &[],
            offset: 0,
            depth: 0,
        };
        self.collect_matches(
            self.index.candidates(path.matching_path()),
            path.matching_path(),
            &root,
            &mut matches,
        );
        if matches.is_empty() {
            tracing::debug!(path = path.raw(), "no template matched");
            return Err(DispatchError::not_found(path.raw()));
        }

        let (by_verb, head_fallback) = filter_verb(&matches, method)?;

        let request_type = request_media_type(content_type, has_body)?;
        let consumed: Vec<(&PathMatch, u8)> = by_verb
            .into_iter()
            .filter_map(|m| match &request_type {
                Some(req) => m
                    .method()
                    .consumes()
                    .iter()
                    .filter(|c| c.is_compatible(req))
                    .map(MediaType::specificity)
                    .max()
                    .map(|score| (m, score)),
                None => Some((m, 0)),
            })
            .collect();
        if consumed.is_empty() {
            let shown = content_type.unwrap_or(meridian_router::media::APPLICATION_OCTET_STREAM);
            return Err(DispatchError::unsupported_media_type(shown));
        }

        let accepted = MediaType::parse_list(accept)
            .map_err(|_| DispatchError::not_acceptable(accept.unwrap_or_default()))?;
        let mut best: Option<(Specificity, &PathMatch, MediaType)> = None;
        for (m, consumes) in consumed {
            let Some((media, response_type)) = negotiate(m.method().produces(), &accepted) else {
                continue;
            };
            let (literal_segments, literal_chars, regex_captures, captures) = m.path_score();
            let specificity = Specificity {
                literal_segments,
                literal_chars,
                regex_captures,
                captures,
                consumes,
                hops: m.chain.len() - 1,
                media,
                order: m.chain.iter().map(|c| c.id()).collect(),
            };
            if best.as_ref().map_or(true, |(b, _, _)| specificity > *b) {
                best = Some((specificity, m, response_type));
            }
        }

        let Some((specificity, chosen, response_type)) = best else {
            return Err(DispatchError::not_acceptable(accept.unwrap_or("*/*")));
        };
        tracing::debug!(
            class = chosen.method().class_name(),
            method = chosen.method().name(),
            response_type = %response_type,
            "route matched"
        );
        let mut values = Params::new();
        for element in &chosen.matched {
            values.extend(element.values.clone());
        }
        Ok(MatchCandidate {
            chain: chosen.chain.clone(),
            matched: chosen.matched.clone(),
            values,
            specificity,
            request_type,
            response_type,
            head_fallback,
        })
    }

    /// Matches a request given as [`RequestParts`].
    ///
    /// # Errors
    ///
    /// See [`RouteTable::match_route`].
    pub fn match_request(&self, request: &RequestParts) -> Result<MatchCandidate, DispatchError> {
        self.match_route(
            request.method(),
            request.path(),
            request.accept().as_deref(),
            request.content_type(),
            request.has_body(),
        )
    }

    fn collect_matches(
        &self,
        ids: impl IntoIterator<Item = usize>,
        path: &str,
        prefix: &ChainPrefix<'_>,
        out: &mut Vec<PathMatch>,
    ) {
        let path_segments = segment_count(path);
        for id in ids {
            let method = &self.methods[id];
            let Some(found) = method.template().match_path(path) else {
                continue;
            };
            let mut chain = prefix.chain.to_vec();
            chain.push(Arc::clone(method));
            let mut matched = prefix.matched.to_vec();

            match method.kind() {
                MethodKind::Verb(_) => {
                    if found.is_full() {
                        matched.push(ChainMatch {
                            values: found.values,
                            segments: prefix.offset..prefix.offset + path_segments,
                        });
                        out.push(PathMatch { chain, matched });
                    }
                }
                MethodKind::Locator(target) => {
                    let remainder = if found.remainder.is_empty() {
                        "/"
                    } else {
                        found.remainder.as_str()
                    };
                    if prefix.depth >= MAX_LOCATOR_DEPTH || remainder.len() >= path.len() {
                        continue;
                    }
                    let Some(&class) = self.sub_resources.get(&target.id) else {
                        continue;
                    };
                    let consumed = path_segments - segment_count(&found.remainder);
                    matched.push(ChainMatch {
                        values: found.values,
                        segments: prefix.offset..prefix.offset + consumed,
                    });
                    let next = ChainPrefix {
                        chain: &chain,
                        matched: &matched,
                        offset: prefix.offset + consumed,
                        depth: prefix.depth + 1,
                    };
                    let sub_methods = self.classes[class].methods.iter().copied();
                    self.collect_matches(sub_methods, remainder, &next, out);
                }
            }
        }
    }
}

/// The locators already matched on the way to a sub-resource.
struct ChainPrefix<'a> {
    chain: &'a [Arc<ResourceMethod>],
    matched: &'a [ChainMatch],
    offset: usize,
    depth: usize,
}

/// Number of segments in a path as [`RequestPath`] splits it.
fn segment_count(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.trim_start_matches('/').split('/').count()
    }
}

fn filter_verb<'a>(
    matches: &'a [PathMatch],
    method: &Method,
) -> Result<(Vec<&'a PathMatch>, bool), DispatchError> {
    let with_verb = |verb: &Method| -> Vec<&'a PathMatch> {
        matches
            .iter()
            .filter(|m| m.method().verb() == Some(verb))
            .collect()
    };
    let exact = with_verb(method);
    if !exact.is_empty() {
        return Ok((exact, false));
    }
    if method == Method::HEAD {
        let get = with_verb(&Method::GET);
        if !get.is_empty() {
            return Ok((get, true));
        }
    }
    let allowed: MethodSet = matches
        .iter()
        .filter_map(|m| m.method().verb().cloned())
        .collect();
    Err(DispatchError::method_not_allowed(method.clone(), allowed))
}

fn request_media_type(
    content_type: Option<&str>,
    has_body: bool,
) -> Result<Option<MediaType>, DispatchError> {
    match content_type {
        Some(raw) => MediaType::parse(raw)
            .map(Some)
            .map_err(|_| DispatchError::unsupported_media_type(raw)),
        None if has_body => Ok(Some(MediaType::new("application", "octet-stream"))),
        None => Ok(None),
    }
}

/// Finds the best (Accept, produces) pairing.
///
/// Returns the ranking key and the media type to answer with.
fn negotiate(produces: &[MediaType], accepted: &[MediaType]) -> Option<((u16, u8, u8), MediaType)> {
    let mut best: Option<((u16, u8, u8), MediaType)> = None;
    for accept in accepted.iter().filter(|a| !a.is_rejected()) {
        for produce in produces.iter().filter(|p| p.is_compatible(accept)) {
            let key = (accept.weight(), accept.specificity(), produce.specificity());
            if best.as_ref().map_or(true, |(b, _)| key > *b) {
                best = Some((key, produce.most_specific(accept).without_quality()));
            }
        }
    }
    best
}
