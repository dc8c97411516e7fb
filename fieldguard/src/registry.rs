//! Per-processor capability registries and directive validation.

use std::{fmt, sync::Arc};

use crate::{
    boundary::Action,
    capability::{
        EncryptAlgo, Encryptor, EncryptorMap, HashAlgo, Hasher, HasherMap, MaskType, Masker,
        MaskerMap,
    },
    error::ValidationError,
    hash::builtin_hashers,
    mask::builtin_maskers,
    plan::{Parameter, TypePlans},
};

/// The capabilities a processor can call.
///
/// Hashers and maskers start with the built-ins; encryptors start empty
/// because they need key material.
#[derive(Clone)]
pub struct Capabilities {
    encryptors: EncryptorMap,
    hashers: HasherMap,
    maskers: MaskerMap,
}

impl Capabilities {
    #[must_use]
    pub fn new() -> Self {
        Self {
            encryptors: EncryptorMap::new(),
            hashers: builtin_hashers(),
            maskers: builtin_maskers(),
        }
    }

    #[must_use]
    pub fn encryptors(&self) -> &EncryptorMap {
        &self.encryptors
    }

    #[must_use]
    pub fn hashers(&self) -> &HasherMap {
        &self.hashers
    }

    #[must_use]
    pub fn maskers(&self) -> &MaskerMap {
        &self.maskers
    }

    pub(crate) fn insert_encryptor(&mut self, algo: EncryptAlgo, encryptor: Arc<dyn Encryptor>) {
        self.encryptors.insert(algo, encryptor);
    }

    pub(crate) fn insert_hasher(&mut self, algo: HashAlgo, hasher: Arc<dyn Hasher>) {
        self.hashers.insert(algo, hasher);
    }

    pub(crate) fn insert_masker(&mut self, format: MaskType, masker: Arc<dyn Masker>) {
        self.maskers.insert(format, masker);
    }

    /// Whether a capability is registered for `parameter`. Literals always are.
    #[must_use]
    pub fn provides(&self, parameter: &Parameter) -> bool {
        match parameter {
            Parameter::Encryptor(algo) => self.encryptors.contains_key(algo),
            Parameter::Hasher(algo) => self.hashers.contains_key(algo),
            Parameter::Masker(format) => self.maskers.contains_key(format),
            Parameter::Literal(_) => true,
        }
    }

    /// Checks every planned directive against the registries, skipping
    /// actions the type overrides. Reports the first gap, in boundary order.
    pub(crate) fn validate(
        &self,
        plans: &TypePlans,
        overrides: &[Action],
    ) -> Result<(), ValidationError> {
        for action in Action::ALL {
            if action == Action::Redact || overrides.contains(&action) {
                continue;
            }
            for plan in plans.for_action(action) {
                let parameter = plan.parameter();
                let Some(kind) = parameter.capability_kind() else {
                    continue;
                };
                if !self.provides(parameter) {
                    return Err(ValidationError::new(
                        kind,
                        &parameter.to_string(),
                        plan.name(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encryptors: Vec<_> = self.encryptors.keys().collect();
        let mut hashers: Vec<_> = self.hashers.keys().collect();
        let mut maskers: Vec<_> = self.maskers.keys().collect();
        encryptors.sort();
        hashers.sort();
        maskers.sort();
        f.debug_struct("Capabilities")
            .field("encryptors", &encryptors)
            .field("hashers", &hashers)
            .field("maskers", &maskers)
            .finish()
    }
}
