//! Binding of declared parameters to request values.
//!
//! The binder reads only the request and the route table. It never calls
//! resource code, so binding the same request twice yields equal
//! [`Arguments`].

use std::sync::Arc;

use http::header::HeaderName;
use meridian_codec::CodecRegistry;
use meridian_core::{
    Argument, Arguments, ContextKind, Entity, MatchCandidate, ParamSource, ParamType,
    ParameterSpec, RequestParts, ResourceMethod, RouteTable, TypeDescriptor, UriInfo,
};
use meridian_router::media::APPLICATION_FORM_URLENCODED;
use meridian_router::{percent_decode, MediaType, Params};
use serde_json::{Map, Value};

use crate::coerce::coerce_param;
use crate::cookie::Cookies;
use crate::error::BindingError;

/// Binds resource method parameters.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use http::{HeaderMap, Method, Uri};
/// use meridian_codec::CodecRegistry;
/// use meridian_core::{
///     Entity, Operation, ParamType, ParameterSpec, RequestParts, ResourceClass,
///     ResourceResponse, RouteRegistry,
/// };
/// use meridian_extract::Binder;
/// use std::sync::Arc;
///
/// struct Catalog;
///
/// let mut registry = RouteRegistry::new();
/// registry
///     .register(
///         ResourceClass::new("/catalog")
///             .singleton(Arc::new(Catalog))
///             .operation(
///                 Operation::get("/items/{id}")
///                     .param(ParameterSpec::path("id", ParamType::I64))
///                     .param(ParameterSpec::query("limit", ParamType::U32).default_value("10"))
///                     .handle(|_: Arc<Catalog>, _, _| async {
///                         Ok(ResourceResponse::ok(Entity::text("item")))
///                     }),
///             ),
///     )
///     .unwrap();
/// let table = registry.freeze().unwrap();
/// let binder = Binder::new(Arc::clone(&table), Arc::new(CodecRegistry::with_defaults(false)));
///
/// let request = RequestParts::new(
///     Method::GET,
///     Uri::from_static("/catalog/items/7"),
///     HeaderMap::new(),
///     Bytes::new(),
/// );
/// let candidate = table.match_request(&request).unwrap();
/// let args = binder.bind(candidate.method(), &candidate, &request).unwrap();
///
/// assert_eq!(args.value::<i64>("id").unwrap(), 7);
/// assert_eq!(args.value::<u32>("limit").unwrap(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct Binder {
    table: Arc<RouteTable>,
    codecs: Arc<CodecRegistry>,
}

impl Binder {
    /// Creates a binder over a frozen table and its codecs.
    #[must_use]
    pub fn new(table: Arc<RouteTable>, codecs: Arc<CodecRegistry>) -> Self {
        Self { table, codecs }
    }

    /// Binds the parameters of one method in the candidate's chain.
    ///
    /// Path and matrix values are scoped to what `method` and the locators
    /// before it matched. A method outside the chain binds as the last one.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError`] for a missing required value, a value that
    /// does not coerce, or a body no reader accepts.
    pub fn bind(
        &self,
        method: &ResourceMethod,
        candidate: &MatchCandidate,
        request: &RequestParts,
    ) -> Result<Arguments, BindingError> {
        let position = candidate
            .position(method)
            .unwrap_or_else(|| candidate.chain.len().saturating_sub(1));
        self.bind_at(position, method, candidate, request)
    }

    /// Binds every method in the chain, locators first.
    ///
    /// # Errors
    ///
    /// Returns the first [`BindingError`] in chain order.
    pub fn bind_chain(
        &self,
        candidate: &MatchCandidate,
        request: &RequestParts,
    ) -> Result<Vec<Arguments>, BindingError> {
        candidate
            .chain
            .iter()
            .enumerate()
            .map(|(position, method)| self.bind_at(position, method, candidate, request))
            .collect()
    }

    fn bind_at(
        &self,
        position: usize,
        method: &ResourceMethod,
        candidate: &MatchCandidate,
        request: &RequestParts,
    ) -> Result<Arguments, BindingError> {
        let sources = RequestSources::new(request, candidate, position)?;
        let mut arguments = Arguments::new();
        for spec in method.params() {
            let argument = self.bind_param(spec, &sources)?;
            arguments.push(spec.key(), argument);
        }
        tracing::trace!(
            method = method.name(),
            bound = arguments.len(),
            "parameters bound"
        );
        Ok(arguments)
    }

    fn bind_param(
        &self,
        spec: &ParameterSpec,
        sources: &RequestSources<'_>,
    ) -> Result<Argument, BindingError> {
        match (spec.source(), spec.target()) {
            (ParamSource::Body, ParamType::Entity(descriptor)) => {
                self.read_body(spec, descriptor, sources).map(Argument::Entity)
            }
            (ParamSource::Context, ParamType::Context(kind)) => Ok(sources.context(*kind)),
            _ => self.bind_value(spec, sources).map(Argument::Value),
        }
    }

    /// Binds a parameter to a plain value. Beans recurse through their
    /// members and become JSON objects.
    fn bind_value(
        &self,
        spec: &ParameterSpec,
        sources: &RequestSources<'_>,
    ) -> Result<Value, BindingError> {
        match spec.source() {
            ParamSource::Bean => self.bind_bean(spec, sources),
            ParamSource::Body => {
                let ParamType::Entity(descriptor) = spec.target() else {
                    return Err(BindingError::invalid(
                        ParamSource::Body,
                        spec.name(),
                        "body parameters must declare an entity type",
                    ));
                };
                let entity = self.read_body(spec, descriptor, sources)?;
                entity.to_value::<Value>().map_err(|e| {
                    BindingError::invalid(ParamSource::Body, spec.name(), e.to_string())
                })
            }
            ParamSource::Context => Err(BindingError::invalid(
                ParamSource::Context,
                spec.name(),
                "context values cannot be bean members",
            )),
            _ => {
                let raw = sources.raw_values(spec)?;
                coerce_param(spec, &raw, self.table.converters())
            }
        }
    }

    fn bind_bean(
        &self,
        spec: &ParameterSpec,
        sources: &RequestSources<'_>,
    ) -> Result<Value, BindingError> {
        let name = spec.bean_name().unwrap_or_else(|| spec.name());
        let bean = self.table.beans().get(name).ok_or_else(|| {
            BindingError::invalid(ParamSource::Bean, name, "bean is not registered")
        })?;
        let mut object = Map::new();
        for member in bean.members() {
            let value = self.bind_value(member, sources)?;
            object.insert(member.key().to_string(), value);
        }
        Ok(Value::Object(object))
    }

    fn read_body(
        &self,
        spec: &ParameterSpec,
        descriptor: &TypeDescriptor,
        sources: &RequestSources<'_>,
    ) -> Result<Entity, BindingError> {
        let request = sources.request;
        if !request.has_body() {
            return if spec.is_required() {
                Err(BindingError::missing(ParamSource::Body, body_name(spec)))
            } else {
                Ok(Entity::empty().with_descriptor(descriptor.clone()))
            };
        }
        let media_type = sources
            .candidate
            .request_type
            .clone()
            .unwrap_or_else(|| MediaType::new("application", "octet-stream"));
        let reader = self
            .codecs
            .select_reader(&media_type, descriptor)
            .map_err(|e| BindingError::from_codec(body_name(spec), e))?;
        reader
            .codec
            .read(request.body(), &reader.media_type, descriptor)
            .map_err(|e| BindingError::from_codec(body_name(spec), e))
    }
}

fn body_name(spec: &ParameterSpec) -> &str {
    if spec.name().is_empty() {
        "body"
    } else {
        spec.name()
    }
}

/// Request values parsed once per bind.
struct RequestSources<'a> {
    request: &'a RequestParts,
    candidate: &'a MatchCandidate,
    position: usize,
    query: Vec<(String, String)>,
    raw_query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    raw_form: Vec<(String, String)>,
    cookies: Cookies,
}

impl<'a> RequestSources<'a> {
    fn new(
        request: &'a RequestParts,
        candidate: &'a MatchCandidate,
        position: usize,
    ) -> Result<Self, BindingError> {
        let query_string = request.query().unwrap_or("");
        let query = serde_urlencoded::from_str(query_string)
            .map_err(|e| BindingError::invalid(ParamSource::Query, "query", e.to_string()))?;

        let is_form = candidate
            .request_type
            .as_ref()
            .is_some_and(|media| media.essence() == APPLICATION_FORM_URLENCODED);
        let (form, raw_form) = if is_form {
            let body = std::str::from_utf8(request.body())
                .map_err(|e| BindingError::invalid(ParamSource::Form, "form", e.to_string()))?;
            let form = serde_urlencoded::from_str(body)
                .map_err(|e| BindingError::invalid(ParamSource::Form, "form", e.to_string()))?;
            (form, split_pairs(body))
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Self {
            request,
            candidate,
            position,
            query,
            raw_query: split_pairs(query_string),
            form,
            raw_form,
            cookies: Cookies::from_headers(request.headers()),
        })
    }

    /// Every raw value for a string-sourced parameter, in request order.
    fn raw_values(&self, spec: &ParameterSpec) -> Result<Vec<String>, BindingError> {
        let name = spec.name();
        let decode = |value: &str| {
            if spec.is_encoded() {
                value.to_string()
            } else {
                percent_decode(value).into_owned()
            }
        };
        let values = match spec.source() {
            ParamSource::Path => self
                .candidate
                .path_value(self.position, name)
                .map(decode)
                .into_iter()
                .collect(),
            ParamSource::Query => {
                let pairs = if spec.is_encoded() {
                    &self.raw_query
                } else {
                    &self.query
                };
                values_named(pairs, name)
            }
            ParamSource::Form => {
                let pairs = if spec.is_encoded() {
                    &self.raw_form
                } else {
                    &self.form
                };
                values_named(pairs, name)
            }
            ParamSource::Matrix => self
                .request
                .path()
                .matrix_values_at(self.candidate.segment_scope(self.position), name)
                .map(decode)
                .collect(),
            ParamSource::Cookie => self.cookies.get_all(name).map(str::to_string).collect(),
            ParamSource::Header => {
                let Ok(header) = HeaderName::from_bytes(name.as_bytes()) else {
                    return Err(BindingError::invalid(
                        ParamSource::Header,
                        name,
                        "not a valid header name",
                    ));
                };
                self.request
                    .headers()
                    .get_all(header)
                    .iter()
                    .filter_map(|value| value.to_str().ok())
                    .map(str::to_string)
                    .collect()
            }
            ParamSource::Body | ParamSource::Bean | ParamSource::Context => Vec::new(),
        };
        Ok(values)
    }

    fn context(&self, kind: ContextKind) -> Argument {
        match kind {
            ContextKind::Headers => Argument::Headers(self.request.headers().clone()),
            ContextKind::UriInfo => {
                let mut path_params = Params::with_capacity(self.candidate.values.len());
                for (name, value) in self.candidate.values.iter() {
                    path_params.push(name, percent_decode(value).into_owned());
                }
                Argument::Uri(UriInfo {
                    path: self.request.path().raw().to_string(),
                    query: self.request.query().map(str::to_string),
                    path_params,
                    template: self.candidate.template(),
                })
            }
        }
    }
}

fn values_named(pairs: &[(String, String)], name: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
        .collect()
}

/// Splits `a=1&b=2` without decoding values. Keys are decoded so encoded
/// parameters are still found by name.
fn split_pairs(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = percent_decode(&key.replace('+', " ")).into_owned();
            (key, value.to_string())
        })
        .collect()
}
