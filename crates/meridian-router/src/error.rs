//! Error types for template compilation and media type parsing.

use thiserror::Error;

/// Errors raised while compiling a URI template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{` was never closed, or a `}` appeared without a matching `{`.
    #[error("unbalanced braces in template '{template}' at offset {offset}")]
    UnbalancedBraces {
        /// The offending template.
        template: String,
        /// Byte offset of the unmatched brace.
        offset: usize,
    },

    /// A capture group has no name (`{}` or `{:\d+}`).
    #[error("empty capture name in template '{template}'")]
    EmptyName {
        /// The offending template.
        template: String,
    },

    /// The same capture name appears twice in one template.
    #[error("duplicate capture name '{name}' in template '{template}'")]
    DuplicateName {
        /// The offending template.
        template: String,
        /// The repeated capture name.
        name: String,
    },

    /// A capture's custom regular expression does not compile.
    #[error("invalid regex for capture '{name}' in template '{template}': {reason}")]
    InvalidRegex {
        /// The offending template.
        template: String,
        /// The capture whose pattern failed.
        name: String,
        /// Compiler message.
        reason: String,
    },
}

impl TemplateError {
    /// Returns the template text that failed to compile.
    #[must_use]
    pub fn template(&self) -> &str {
        match self {
            Self::UnbalancedBraces { template, .. }
            | Self::EmptyName { template }
            | Self::DuplicateName { template, .. }
            | Self::InvalidRegex { template, .. } => template,
        }
    }
}

/// Error raised when a media type string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid media type '{input}': {reason}")]
pub struct MediaTypeError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

impl MediaTypeError {
    /// Creates a new media type error.
    pub fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
