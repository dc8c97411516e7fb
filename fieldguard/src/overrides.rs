//! Type-level overrides.
//!
//! A type that implements one of these traits and lists the action in
//! `#[guard(overrides(...))]` takes over that action entirely: the traversal
//! engine is not run for it, even when fields carry directives. Overrides
//! receive the processor's registered capabilities so they can reuse them.
//!
//! Outbound overrides (`encrypt`, `mask`, `redact`) run on a clone of the
//! caller's value.

use crate::capability::{CapabilityError, EncryptorMap, HasherMap, MaskerMap};

/// Replaces `store.encrypt`.
pub trait Encryptable {
    fn encrypt(&mut self, encryptors: &EncryptorMap) -> Result<(), CapabilityError>;
}

/// Replaces `load.decrypt`.
pub trait Decryptable {
    fn decrypt(&mut self, encryptors: &EncryptorMap) -> Result<(), CapabilityError>;
}

/// Replaces `receive.hash`.
pub trait Hashable {
    fn hash(&mut self, hashers: &HasherMap) -> Result<(), CapabilityError>;
}

/// Replaces `send.mask`.
pub trait Maskable {
    fn mask(&mut self, maskers: &MaskerMap) -> Result<(), CapabilityError>;
}

/// Replaces `send.redact`.
pub trait Redactable {
    fn redact(&mut self) -> Result<(), CapabilityError>;
}
