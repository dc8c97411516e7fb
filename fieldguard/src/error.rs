//! Error taxonomy.
//!
//! - [`CompileError`]: a directive names an unknown capability parameter, or a
//!   nested record chain is recursive. Raised when a processor is constructed.
//! - [`ValidationError`]: a required capability is not registered and the type
//!   has no override for the action. Memoized per processor.
//! - [`CodecError`]: the external codec failed, or none is configured.
//! - [`TransformError`]: a field-level transform failed. The first one aborts
//!   the remaining plan for the call.
//!
//! Nothing is retried internally.

use std::fmt;

use thiserror::Error;

use crate::boundary::{Action, Boundary};

/// Boxed error used for causes coming from capabilities and codecs.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which registry a capability lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Encryptor,
    Hasher,
    Masker,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Encryptor => "encryptor",
            Self::Hasher => "hasher",
            Self::Masker => "masker",
        })
    }
}

/// Errors raised while compiling field plans for a type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("invalid {action} parameter {parameter:?} for field {field}")]
    InvalidParameter {
        field: String,
        action: Action,
        parameter: String,
    },
    #[error("nested record {type_name} at field {field} contains itself")]
    RecursiveType {
        field: String,
        type_name: &'static str,
    },
}

/// A directive needs a capability that is not registered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("missing {kind} for {parameter:?} (field {field})")]
pub struct ValidationError {
    kind: CapabilityKind,
    parameter: String,
    field: String,
}

impl ValidationError {
    pub(crate) fn new(kind: CapabilityKind, parameter: &str, field: &str) -> Self {
        Self {
            kind,
            parameter: parameter.to_string(),
            field: field.to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// The capability parameter named by the directive (e.g. `"aes"`).
    #[must_use]
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Dotted name of the field carrying the directive.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Failures of the external codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("no codec configured")]
    NotConfigured,
    #[error("encode failed: {0}")]
    Encode(#[source] BoxError),
    #[error("decode failed: {0}")]
    Decode(#[source] BoxError),
}

/// The category of a field-level transform failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformErrorKind {
    /// Stored ciphertext text is not valid base64.
    EncodingInvalid,
    EncryptFailed,
    DecryptFailed,
    HashFailed,
    MaskFailed,
    RedactFailed,
}

impl TransformErrorKind {
    /// The failure kind reported when the capability behind `action` errors.
    #[must_use]
    pub const fn for_action(action: Action) -> Self {
        match action {
            Action::Hash => Self::HashFailed,
            Action::Decrypt => Self::DecryptFailed,
            Action::Encrypt => Self::EncryptFailed,
            Action::Mask => Self::MaskFailed,
            Action::Redact => Self::RedactFailed,
        }
    }
}

impl fmt::Display for TransformErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EncodingInvalid => "encoding-invalid",
            Self::EncryptFailed => "encrypt-failed",
            Self::DecryptFailed => "decrypt-failed",
            Self::HashFailed => "hash-failed",
            Self::MaskFailed => "mask-failed",
            Self::RedactFailed => "redact-failed",
        })
    }
}

/// A field transform failed.
///
/// For overrides the field is the record's type name, since the override
/// owns the whole value.
#[derive(Debug, Error)]
#[error("{action} field {field} on {boundary}: {kind}: {source}")]
pub struct TransformError {
    kind: TransformErrorKind,
    action: Action,
    boundary: Boundary,
    field: String,
    #[source]
    source: BoxError,
}

impl TransformError {
    pub(crate) fn new(
        kind: TransformErrorKind,
        action: Action,
        field: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            action,
            boundary: action.boundary(),
            field: field.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> TransformErrorKind {
        self.kind
    }

    /// The operation that failed.
    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The underlying capability or decoding error.
    #[must_use]
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

/// Any error returned by a [`crate::Processor`] operation.
///
/// Construction returns [`CompileError`] on its own. The `Compile` variant
/// exists so that construction and calls compose under one `?` in caller code.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl Error {
    /// Returns the transform failure, if this is one.
    #[must_use]
    pub fn as_transform(&self) -> Option<&TransformError> {
        match self {
            Self::Transform(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn validation_error_names_field_and_parameter() {
        let err = ValidationError::new(CapabilityKind::Encryptor, "aes", "profile.email");
        assert_eq!(
            err.to_string(),
            "missing encryptor for \"aes\" (field profile.email)"
        );
        assert_eq!(err.parameter(), "aes");
        assert_eq!(err.field(), "profile.email");
    }

    #[test]
    fn transform_error_reports_operation_field_and_cause() {
        let err = TransformError::new(
            TransformErrorKind::DecryptFailed,
            Action::Decrypt,
            "ssn",
            "bad tag",
        );
        assert_eq!(
            err.to_string(),
            "decrypt field ssn on load: decrypt-failed: bad tag"
        );
        assert_eq!(err.boundary(), Boundary::Load);
        assert_eq!(err.source().map(ToString::to_string), Some("bad tag".into()));
    }

    #[test]
    fn compile_error_display() {
        let err = CompileError::InvalidParameter {
            field: "email".into(),
            action: Action::Mask,
            parameter: "emial".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid mask parameter \"emial\" for field email"
        );
    }

    #[test]
    fn kinds_follow_their_action() {
        assert_eq!(
            TransformErrorKind::for_action(Action::Redact),
            TransformErrorKind::RedactFailed
        );
        assert_eq!(TransformErrorKind::EncodingInvalid.to_string(), "encoding-invalid");
    }
}
