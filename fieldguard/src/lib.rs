//! Boundary-aware field transformation for structured records.
//!
//! A record type declares, per field, what happens when a value crosses a
//! trust boundary:
//!
//! | Boundary  | Direction                | Actions            |
//! |-----------|--------------------------|--------------------|
//! | `receive` | inbound from a client    | `hash`             |
//! | `load`    | inbound from storage     | `decrypt`          |
//! | `store`   | outbound to storage      | `encrypt`          |
//! | `send`    | outbound to a client     | `mask`, `redact`   |
//!
//! ```ignore
//! #[derive(Clone, Default, Serialize, Deserialize, Guarded)]
//! struct User {
//!     name: String,
//!     #[guard(store(encrypt = "aes"), load(decrypt = "aes"), send(mask = "ssn"))]
//!     ssn: String,
//!     #[guard(receive(hash = "argon2"), send(redact = "[REDACTED]"))]
//!     password: String,
//! }
//!
//! let processor = Processor::<User>::new()?.with_codec(JsonCodec);
//! processor.with_key(EncryptAlgo::Aes, &key)?;
//! let row = processor.write(&user)?;
//! ```
//!
//! Key rules:
//! - Directives are parsed once per type and cached for the life of the
//!   process. An unknown algorithm or mask format fails processor creation.
//! - Every processor owns its capability registries. Hashers and maskers
//!   start with the built-ins; encryptors must be registered.
//! - Outbound operations (`store`, `send`) work on a clone; the caller's
//!   value is never touched. Inbound operations consume and return the value.
//! - `send` masks before it redacts, so a field carrying both ends up with
//!   the redaction literal.
//! - The first failing field aborts the operation.
//! - Nested records are marked with a bare `#[guard]`. Optional nested
//!   records that are `None` are skipped.
//!
//! A type can take over an action entirely with `#[guard(overrides(...))]`
//! and an implementation of the matching trait, e.g. [`Encryptable`].

// <https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html>
#![warn(
    anonymous_parameters,
    bare_trait_objects,
    elided_lifetimes_in_paths,
    missing_copy_implementations,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]
// <https://rust-lang.github.io/rust-clippy/stable>
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::dbg_macro,
    clippy::float_cmp_const,
    clippy::get_unwrap,
    clippy::mem_forget,
    clippy::nursery,
    clippy::pedantic,
    clippy::todo,
    clippy::unwrap_used,
    clippy::uninlined_format_args
)]
// Allow some clippy lints
#![allow(
    clippy::default_trait_access,
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::cargo_common_metadata,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::result_large_err,
    clippy::option_if_let_else
)]
// Allow some lints while testing
#![cfg_attr(test, allow(clippy::non_ascii_literal, clippy::unwrap_used))]

pub use fieldguard_derive::Guarded;

#[allow(unused_extern_crates)]
extern crate self as fieldguard;

// Module declarations
mod boundary;
mod cache;
mod capability;
mod codec;
mod encrypt;
mod error;
mod hash;
mod mask;
mod overrides;
mod plan;
mod processor;
mod registry;
mod schema;
pub mod slog;
mod traverse;

// Re-exports
pub use boundary::{Action, Boundary};
#[cfg(any(test, feature = "testing"))]
pub use cache::reset_plan_cache;
pub use cache::plan_cache_len;
pub use capability::{
    is_valid_encrypt_algo, is_valid_hash_algo, is_valid_mask_type, CapabilityError,
    EncryptAlgo, Encryptor, EncryptorMap, HashAlgo, Hasher, HasherMap, MaskType, Masker,
    MaskerMap, UnknownIdentifier,
};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use encrypt::{AesEncryptor, EnvelopeEncryptor, RsaEncryptor};
pub use error::{
    BoxError, CapabilityKind, CodecError, CompileError, Error, TransformError,
    TransformErrorKind, ValidationError,
};
pub use hash::{Argon2Hasher, Argon2Params, BcryptHasher, Sha256Hasher, Sha512Hasher};
pub use mask::{
    CardMasker, EmailMasker, IbanMasker, IpMasker, NameMasker, PhoneMasker, SsnMasker,
    UuidMasker,
};
pub use overrides::{Decryptable, Encryptable, Hashable, Maskable, Redactable};
pub use plan::{FieldPlan, Parameter, TypePlans};
pub use processor::Processor;
pub use registry::Capabilities;
pub use schema::{
    FieldAccess, FieldKind, FieldMeta, FieldSlot, Guarded, RawDirective, Schema, Shape,
    TextMapping,
};
