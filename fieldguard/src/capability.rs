//! Capability contracts and the identifiers that select them.
//!
//! A capability is a pluggable transform: an [`Encryptor`], a [`Hasher`] or a
//! [`Masker`]. Directives name a capability by its identifier (`"aes"`,
//! `"sha256"`, `"email"`, ...). The plan compiler checks identifiers against
//! the enumerations below, so an unknown name fails construction rather than a
//! later call.
//!
//! Redaction has no capability: the directive carries its replacement literal.

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use thiserror::Error;

use crate::error::{BoxError, CapabilityKind};

/// Symmetric or asymmetric encryption.
///
/// Implementations must be safe to call from many threads at once.
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CapabilityError>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CapabilityError>;
}

/// One-way hashing. The output is always printable text.
pub trait Hasher: Send + Sync {
    fn hash(&self, plaintext: &[u8]) -> Result<String, CapabilityError>;
}

/// Format-aware masking.
///
/// Returns [`CapabilityError::InvalidFormat`] when the value does not look
/// like the format the masker handles.
pub trait Masker: Send + Sync {
    fn mask(&self, value: &str) -> Result<String, CapabilityError>;
}

/// Registered encryptors, keyed by algorithm.
pub type EncryptorMap = HashMap<EncryptAlgo, Arc<dyn Encryptor>>;
/// Registered hashers, keyed by algorithm.
pub type HasherMap = HashMap<HashAlgo, Arc<dyn Hasher>>;
/// Registered maskers, keyed by format.
pub type MaskerMap = HashMap<MaskType, Arc<dyn Masker>>;

/// Errors produced by capability implementations and overrides.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("invalid key size: must be 16, 24, or 32 bytes, got {0}")]
    InvalidKeySize(usize),
    #[error("ciphertext too short")]
    CiphertextTooShort,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("{0} key required")]
    MissingKey(&'static str),
    #[error("no {kind} registered for {parameter:?}")]
    NotRegistered {
        kind: CapabilityKind,
        parameter: String,
    },
    #[error("hash failed: {0}")]
    Hash(String),
    #[error("invalid {format} value: {reason}")]
    InvalidFormat { format: MaskType, reason: String },
    #[error("{0} encryptors cannot be built from a symmetric key")]
    UnsupportedKey(EncryptAlgo),
    #[error(transparent)]
    Other(#[from] BoxError),
}

impl CapabilityError {
    pub(crate) fn invalid_format(format: MaskType, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format,
            reason: reason.into(),
        }
    }
}

/// Returned when parsing an identifier that is not recognized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} identifier {value:?}")]
pub struct UnknownIdentifier {
    kind: CapabilityKind,
    value: String,
}

macro_rules! identifier {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:expr, $is_valid:ident {
            $($(#[$variant_meta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$variant_meta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownIdentifier;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownIdentifier {
                        kind: $kind,
                        value: value.to_string(),
                    }),
                }
            }
        }

        #[doc = concat!("Whether `value` names a known [`", stringify!($name), "`].")]
        #[must_use]
        pub fn $is_valid(value: &str) -> bool {
            value.parse::<$name>().is_ok()
        }
    };
}

identifier! {
    /// Encryption algorithm identifiers.
    EncryptAlgo, CapabilityKind::Encryptor, is_valid_encrypt_algo {
        /// AES-GCM with a 16, 24 or 32-byte key.
        Aes => "aes",
        /// RSA-OAEP with SHA-256.
        Rsa => "rsa",
        /// AES-GCM data key per message, wrapped by a master key.
        Envelope => "envelope",
    }
}

identifier! {
    /// Hash algorithm identifiers.
    HashAlgo, CapabilityKind::Hasher, is_valid_hash_algo {
        Argon2 => "argon2",
        Bcrypt => "bcrypt",
        Sha256 => "sha256",
        Sha512 => "sha512",
    }
}

identifier! {
    /// Mask format identifiers.
    MaskType, CapabilityKind::Masker, is_valid_mask_type {
        Ssn => "ssn",
        Email => "email",
        Phone => "phone",
        Card => "card",
        Ip => "ip",
        Uuid => "uuid",
        Iban => "iban",
        Name => "name",
    }
}
