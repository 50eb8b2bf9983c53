//! Error types for the hubform-protocol crate.
//!
//! This module defines the errors that can occur when working with records,
//! identities and schemas, before any remote call is made.

use thiserror::Error;

use crate::validation::Diagnostics;

/// Errors that can occur during protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An identity string did not have the expected shape.
    #[error("invalid identity '{id}': expected {expected}")]
    InvalidIdentity {
        /// The identity that failed to parse.
        id: String,
        /// A human-readable description of the expected format.
        expected: String,
    },

    /// Attribute validation failed.
    #[error("invalid configuration: {0}")]
    Validation(Diagnostics),

    /// Failed to convert record attributes to or from a typed model.
    #[error("failed to decode record attributes: {0}")]
    Decode(#[source] serde_json::Error),

    /// A typed model did not serialize into a JSON object.
    #[error("record attributes must be a JSON object")]
    NotAnObject,
}

/// A specialized Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
