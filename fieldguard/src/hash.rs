//! Built-in hashers.
//!
//! `argon2` and `bcrypt` are salted password hashes and produce a different
//! string on every call. `sha256` and `sha512` are deterministic and hex
//! encoded.

use std::sync::Arc;

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use argon2::{password_hash::SaltString, Algorithm, Argon2, Params, PasswordHasher, Version};
use sha2::{Digest, Sha256, Sha512};

use crate::capability::{CapabilityError, HashAlgo, Hasher, HasherMap};

/// Tuning for [`Argon2Hasher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Argon2Params {
    /// Iterations.
    pub time: u32,
    /// Memory in KiB.
    pub memory: u32,
    /// Degree of parallelism.
    pub threads: u32,
    /// Output length in bytes.
    pub key_len: usize,
    /// Salt length in bytes.
    pub salt_len: usize,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time: 1,
            memory: 64 * 1024,
            threads: 4,
            key_len: 32,
            salt_len: 16,
        }
    }
}

/// Argon2id, encoded as a PHC string (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
#[derive(Clone, Copy, Debug, Default)]
pub struct Argon2Hasher {
    params: Argon2Params,
}

impl Argon2Hasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_params(params: Argon2Params) -> Self {
        Self { params }
    }
}

impl Hasher for Argon2Hasher {
    fn hash(&self, plaintext: &[u8]) -> Result<String, CapabilityError> {
        let Argon2Params {
            time,
            memory,
            threads,
            key_len,
            salt_len,
        } = self.params;
        let params = Params::new(memory, time, threads, Some(key_len))
            .map_err(|err| CapabilityError::Hash(err.to_string()))?;
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut salt = vec![0u8; salt_len];
        OsRng.fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)
            .map_err(|err| CapabilityError::Hash(format!("salt: {err}")))?;

        argon
            .hash_password(plaintext, &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| CapabilityError::Hash(err.to_string()))
    }
}

/// bcrypt with a configurable cost.
#[derive(Clone, Copy, Debug)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    #[must_use]
    pub fn new() -> Self {
        Self::with_cost(Self::DEFAULT_COST)
    }

    /// Costs outside bcrypt's 4..=31 range fail at hash time.
    #[must_use]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for BcryptHasher {
    fn hash(&self, plaintext: &[u8]) -> Result<String, CapabilityError> {
        bcrypt::hash(plaintext, self.cost).map_err(|err| CapabilityError::Hash(err.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash(&self, plaintext: &[u8]) -> Result<String, CapabilityError> {
        Ok(hex::encode(Sha256::digest(plaintext)))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Sha512Hasher;

impl Hasher for Sha512Hasher {
    fn hash(&self, plaintext: &[u8]) -> Result<String, CapabilityError> {
        Ok(hex::encode(Sha512::digest(plaintext)))
    }
}

/// Hashers every processor starts with.
pub(crate) fn builtin_hashers() -> HasherMap {
    let mut hashers = HasherMap::new();
    for algo in HashAlgo::ALL {
        let hasher: Arc<dyn Hasher> = match algo {
            HashAlgo::Argon2 => Arc::new(Argon2Hasher::new()),
            HashAlgo::Bcrypt => Arc::new(BcryptHasher::new()),
            HashAlgo::Sha256 => Arc::new(Sha256Hasher),
            HashAlgo::Sha512 => Arc::new(Sha512Hasher),
        };
        hashers.insert(*algo, hasher);
    }
    hashers
}
