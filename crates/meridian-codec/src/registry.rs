//! Codec registry and selection.
//!
//! Readers and writers are consulted in registration order. Among those
//! whose media type patterns fit, a concrete pattern beats a wildcard one;
//! registration order settles the rest.

use std::fmt;
use std::sync::Arc;

use meridian_core::{Entity, TypeDescriptor};
use meridian_router::MediaType;

use crate::codec::{MessageReader, MessageWriter};
use crate::codecs::{FormCodec, JsonCodec, OctetStreamCodec, TextCodec};
use crate::error::CodecError;

/// A codec chosen for one request together with the resolved media type.
pub struct NegotiatedRepresentation<C: ?Sized> {
    /// The media type the body is read or written as.
    pub media_type: MediaType,
    /// The codec.
    pub codec: Arc<C>,
}

impl<C: ?Sized> Clone for NegotiatedRepresentation<C> {
    fn clone(&self) -> Self {
        Self {
            media_type: self.media_type.clone(),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<C: ?Sized> fmt::Debug for NegotiatedRepresentation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiatedRepresentation")
            .field("media_type", &self.media_type.to_string())
            .finish_non_exhaustive()
    }
}

/// A negotiated reader.
pub type NegotiatedReader = NegotiatedRepresentation<dyn MessageReader>;

/// A negotiated writer.
pub type NegotiatedWriter = NegotiatedRepresentation<dyn MessageWriter>;

/// Registered readers and writers.
///
/// # Example
///
/// ```
/// use meridian_codec::CodecRegistry;
/// use meridian_core::{Entity, TypeDescriptor};
/// use meridian_router::MediaType;
///
/// let codecs = CodecRegistry::with_defaults(false);
///
/// let json = MediaType::parse("application/json").unwrap();
/// let book = TypeDescriptor::single("Book");
/// let reader = codecs.select_reader(&json, &book).unwrap();
/// let body = bytes::Bytes::from_static(br#"{"id":1}"#);
/// let entity = reader.codec.read(&body, &json, &book).unwrap();
///
/// let writer = codecs.select_writer(&MediaType::wildcard(), &entity).unwrap();
/// assert_eq!(writer.media_type.essence(), "application/json");
/// ```
#[derive(Clone, Default)]
pub struct CodecRegistry {
    readers: Vec<Arc<dyn MessageReader>>,
    writers: Vec<Arc<dyn MessageWriter>>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the JSON, text, form and octet-stream codecs.
    ///
    /// `wrap_collections` makes the JSON codec wrap collections under their
    /// element type name.
    #[must_use]
    pub fn with_defaults(wrap_collections: bool) -> Self {
        let json = Arc::new(JsonCodec::new().wrap_collections(wrap_collections));
        let text = Arc::new(TextCodec::new());
        let form = Arc::new(FormCodec::new());
        let octet = Arc::new(OctetStreamCodec::new());

        let mut registry = Self::new();
        registry.register_reader(json.clone());
        registry.register_reader(text.clone());
        registry.register_reader(form.clone());
        registry.register_reader(octet.clone());
        registry.register_writer(json);
        registry.register_writer(text);
        registry.register_writer(form);
        registry.register_writer(octet);
        registry
    }

    /// Adds a reader after the existing ones.
    pub fn register_reader(&mut self, reader: Arc<dyn MessageReader>) {
        self.readers.push(reader);
    }

    /// Adds a writer after the existing ones.
    pub fn register_writer(&mut self, writer: Arc<dyn MessageWriter>) {
        self.writers.push(writer);
    }

    /// Number of readers.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Number of writers.
    #[must_use]
    pub fn writer_count(&self) -> usize {
        self.writers.len()
    }

    /// Chooses the reader for a request body.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedMediaType`] when no reader fits.
    pub fn select_reader(
        &self,
        media_type: &MediaType,
        target: &TypeDescriptor,
    ) -> Result<NegotiatedReader, CodecError> {
        let best = best_match(&self.readers, media_type, |r| r.media_types(), |r| {
            r.can_read(target, media_type)
        });
        match best {
            Some((reader, _)) => {
                tracing::trace!(
                    reader = reader.name(),
                    media_type = %media_type,
                    "reader selected"
                );
                Ok(NegotiatedRepresentation {
                    media_type: media_type.without_quality(),
                    codec: Arc::clone(reader),
                })
            }
            None => Err(CodecError::UnsupportedMediaType {
                media_type: media_type.to_string(),
                type_name: target.display_name(),
            }),
        }
    }

    /// Chooses the writer for a response entity.
    ///
    /// When `media_type` is a wildcard, the writer's own most specific
    /// compatible type is used.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotAcceptable`] when no writer fits.
    pub fn select_writer(
        &self,
        media_type: &MediaType,
        entity: &Entity,
    ) -> Result<NegotiatedWriter, CodecError> {
        let best = best_match(&self.writers, media_type, |w| w.media_types(), |w| {
            w.can_write(entity, media_type)
        });
        match best {
            Some((writer, pattern)) => {
                let resolved = if media_type.is_concrete() {
                    media_type.without_quality()
                } else {
                    resolve_wildcard(writer.media_types(), media_type, pattern)
                };
                tracing::trace!(writer = writer.name(), media_type = %resolved, "writer selected");
                Ok(NegotiatedRepresentation {
                    media_type: resolved,
                    codec: Arc::clone(writer),
                })
            }
            None => Err(CodecError::NotAcceptable {
                media_type: media_type.to_string(),
                type_name: entity.descriptor().display_name(),
            }),
        }
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field(
                "readers",
                &self.readers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field(
                "writers",
                &self.writers.iter().map(|w| w.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Picks the codec whose best compatible pattern is most specific.
/// Earlier registrations win ties.
fn best_match<'a, C: ?Sized>(
    codecs: &'a [Arc<C>],
    media_type: &MediaType,
    patterns: impl Fn(&C) -> &[MediaType],
    accepts: impl Fn(&C) -> bool,
) -> Option<(&'a Arc<C>, &'a MediaType)> {
    let mut best: Option<(&'a Arc<C>, &'a MediaType)> = None;
    for codec in codecs {
        let Some(pattern) = patterns(codec.as_ref())
            .iter()
            .filter(|p| p.is_compatible(media_type))
            .max_by_key(|p| p.specificity())
        else {
            continue;
        };
        if !accepts(codec.as_ref()) {
            continue;
        }
        if best.map_or(true, |(_, b)| pattern.specificity() > b.specificity()) {
            best = Some((codec, pattern));
        }
    }
    best
}

fn resolve_wildcard(
    patterns: &[MediaType],
    requested: &MediaType,
    matched: &MediaType,
) -> MediaType {
    patterns
        .iter()
        .find(|p| p.is_concrete() && p.is_compatible(requested))
        .unwrap_or_else(|| matched.most_specific(requested))
        .without_quality()
}
