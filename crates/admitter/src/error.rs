//! Error types for admission reviews
//!
//! Every failure inside a review is terminal for that request. The engine
//! never lets one of these escape: each is converted into a denial by
//! [`crate::response::to_denial`].

use thiserror::Error;

/// Which side of the diff a serialization failure happened on
pub const ORIGINAL_SIDE: &str = "original";

/// Which side of the diff a serialization failure happened on
pub const MUTATED_SIDE: &str = "mutated";

/// Failure reported by a [`crate::Mutator`]
///
/// The message is surfaced verbatim in the denial's `status.message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct MutationError {
    message: String,
}

impl MutationError {
    /// Create a mutation error with the given message
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }

    /// The message reported by the mutator
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for MutationError {
    fn from(msg: &str) -> Self {
        Self::new(msg)
    }
}

impl From<String> for MutationError {
    fn from(msg: String) -> Self {
        Self::new(msg)
    }
}

/// Failure taxonomy of a single admission review
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewError {
    /// Raw object bytes were malformed or named an unrecognized kind
    #[error("error deserializing request raw object: {message}")]
    Decode {
        /// Description of what failed
        message: String,
        /// The kind descriptor found in the payload (if any)
        kind: Option<String>,
    },

    /// The mutated object no longer has the identity of the original
    #[error("impossible to type assert the mutated object to {expected}: got {actual}")]
    TypeAssertion {
        /// `apiVersion/kind` of the decoded original
        expected: String,
        /// `apiVersion/kind` of the object returned by the mutator
        actual: String,
    },

    /// The mutator rejected or failed the mutation
    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// Canonical JSON encoding of an object failed
    #[error("error serializing {side} object: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// Which object failed ("original" or "mutated")
        side: &'static str,
    },

    /// The JSON patch could not be computed or encoded
    #[error("error building json patch: {message}")]
    PatchBuild {
        /// Description of what failed
        message: String,
    },

    /// The caller cancelled the review while the mutator was running
    #[error("mutation cancelled by caller")]
    Cancelled,

    /// The review deadline passed while the mutator was running
    #[error("mutation exceeded its deadline")]
    DeadlineExceeded,

    /// Object code outside the mutator (clone, serialize, ...) panicked
    #[error("internal error during review: {message}")]
    Internal {
        /// Description of what failed
        message: String,
    },
}

impl ReviewError {
    /// Create a decode error with the given message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a decode error for a payload naming `kind`
    pub fn decode_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a type assertion error
    pub fn type_assertion(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeAssertion {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a serialization error for one side of the diff
    pub fn serialization(side: &'static str, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            side,
        }
    }

    /// Create a patch build error with the given message
    pub fn patch_build(msg: impl Into<String>) -> Self {
        Self::PatchBuild {
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
        }
    }

    /// Short, stable name of the failure category, used as a log field
    pub fn category(&self) -> &'static str {
        match self {
            ReviewError::Decode { .. } => "decode",
            ReviewError::TypeAssertion { .. } => "type_assertion",
            ReviewError::Mutation(_) => "mutation",
            ReviewError::Serialization { .. } => "serialization",
            ReviewError::PatchBuild { .. } => "patch_build",
            ReviewError::Cancelled => "cancelled",
            ReviewError::DeadlineExceeded => "deadline_exceeded",
            ReviewError::Internal { .. } => "internal",
        }
    }
}
