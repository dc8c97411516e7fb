//! The per-configuration runtime unit.
//!
//! A [`Processor`] pairs the shared, immutable plans of a record type with its
//! own capability registries. Processors are `Send + Sync`; registries may be
//! changed through a shared reference while other threads run boundary
//! operations.
//!
//! Every boundary operation holds the registry read lock while it transforms,
//! so a capability cannot be swapped out halfway through one value. An
//! operation racing a `set_*` call may observe either the old or the new
//! capability.

use std::{
    fmt,
    sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Instant,
};

use slog::{debug, o, warn, Discard, Logger};

use crate::{
    boundary::{Action, Boundary},
    cache,
    capability::{CapabilityError, EncryptAlgo, Encryptor, HashAlgo, Hasher, MaskType, Masker},
    codec::Codec,
    encrypt,
    error::{CodecError, CompileError, Error, TransformError, TransformErrorKind, ValidationError},
    plan::TypePlans,
    registry::Capabilities,
    schema::Guarded,
    traverse,
};

/// Applies a record type's boundary directives.
///
/// ```ignore
/// let processor = Processor::<User>::new()?.with_codec(JsonCodec);
/// processor.with_key(EncryptAlgo::Aes, &key)?;
///
/// let bytes = processor.write(&user)?; // encrypt, then encode
/// let user = processor.read(&bytes)?;  // decode, then decrypt
/// ```
pub struct Processor<T: Guarded> {
    plans: Arc<TypePlans>,
    capabilities: RwLock<Capabilities>,
    validation: OnceLock<Result<(), ValidationError>>,
    codec: Option<Arc<dyn Codec<T>>>,
    logger: Logger,
}

fn micros_since(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}

impl<T: Guarded> Processor<T> {
    /// Creates a processor that logs nowhere.
    pub fn new() -> Result<Self, CompileError> {
        Self::with_logger(Logger::root(Discard, o!()))
    }

    /// Creates a processor logging to a child of `logger`.
    ///
    /// Fails when a directive names an unknown capability or nested records
    /// contain themselves.
    pub fn with_logger(logger: Logger) -> Result<Self, CompileError> {
        let plans = match cache::plans_for::<T>() {
            Ok(plans) => plans,
            Err(err) => {
                warn!(logger, "plan compilation failed"; "error" => %err);
                return Err(err);
            }
        };
        let logger = logger.new(o!("type" => plans.type_name()));
        debug!(logger, "processor created";
            "hash" => plans.for_action(Action::Hash).len(),
            "decrypt" => plans.for_action(Action::Decrypt).len(),
            "encrypt" => plans.for_action(Action::Encrypt).len(),
            "mask" => plans.for_action(Action::Mask).len(),
            "redact" => plans.for_action(Action::Redact).len(),
            "overrides" => T::OVERRIDES.len()
        );
        Ok(Self {
            plans,
            capabilities: RwLock::new(Capabilities::new()),
            validation: OnceLock::new(),
            codec: None,
            logger,
        })
    }

    /// Attaches the codec used by [`Self::decode`], [`Self::read`],
    /// [`Self::write`] and [`Self::encode`].
    #[must_use]
    pub fn with_codec(mut self, codec: impl Codec<T> + 'static) -> Self {
        debug!(self.logger, "codec attached"; "content_type" => codec.content_type().to_string());
        self.codec = Some(Arc::new(codec));
        self
    }

    fn read_capabilities(&self) -> RwLockReadGuard<'_, Capabilities> {
        self.capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_capabilities(&self) -> RwLockWriteGuard<'_, Capabilities> {
        self.capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `encryptor` for `algo`, replacing any previous one.
    pub fn set_encryptor(&self, algo: EncryptAlgo, encryptor: impl Encryptor + 'static) -> &Self {
        self.write_capabilities()
            .insert_encryptor(algo, Arc::new(encryptor));
        debug!(self.logger, "capability registered"; "kind" => "encryptor", "parameter" => algo.as_str());
        self
    }

    /// Registers `hasher` for `algo`, replacing the built-in.
    pub fn set_hasher(&self, algo: HashAlgo, hasher: impl Hasher + 'static) -> &Self {
        self.write_capabilities().insert_hasher(algo, Arc::new(hasher));
        debug!(self.logger, "capability registered"; "kind" => "hasher", "parameter" => algo.as_str());
        self
    }

    /// Registers `masker` for `format`, replacing the built-in.
    pub fn set_masker(&self, format: MaskType, masker: impl Masker + 'static) -> &Self {
        self.write_capabilities().insert_masker(format, Arc::new(masker));
        debug!(self.logger, "capability registered"; "kind" => "masker", "parameter" => format.as_str());
        self
    }

    /// Builds the built-in `aes` or `envelope` encryptor from `key` and
    /// registers it.
    pub fn with_key(&self, algo: EncryptAlgo, key: &[u8]) -> Result<&Self, CapabilityError> {
        let encryptor = encrypt::symmetric(algo, key)?;
        self.write_capabilities().insert_encryptor(algo, encryptor);
        debug!(self.logger, "capability registered"; "kind" => "encryptor", "parameter" => algo.as_str());
        Ok(self)
    }

    /// Checks that every directive has a registered capability, unless the
    /// type overrides the action.
    ///
    /// The first result is kept for the life of the processor: registering a
    /// capability after a failed validation does not clear the error. Build a
    /// new processor instead.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validation
            .get_or_init(|| {
                let result = self
                    .read_capabilities()
                    .validate(&self.plans, T::OVERRIDES);
                if let Err(err) = &result {
                    warn!(self.logger, "validation failed"; "error" => %err);
                }
                result
            })
            .clone()
    }

    /// Inbound from an external source: applies `receive.hash`.
    pub fn receive(&self, value: T) -> Result<T, Error> {
        self.process(Boundary::Receive, value)
    }

    /// Inbound from storage: applies `load.decrypt`.
    pub fn load(&self, value: T) -> Result<T, Error> {
        self.process(Boundary::Load, value)
    }

    /// Outbound to storage: applies `store.encrypt` to a clone of `value`.
    pub fn store(&self, value: &T) -> Result<T, Error> {
        self.process(Boundary::Store, value.clone())
    }

    /// Outbound to an external destination: applies `send.mask`, then
    /// `send.redact`, to a clone of `value`.
    pub fn send(&self, value: &T) -> Result<T, Error> {
        self.process(Boundary::Send, value.clone())
    }

    fn process(&self, boundary: Boundary, mut value: T) -> Result<T, Error> {
        let started = Instant::now();
        debug!(self.logger, "boundary started"; "boundary" => boundary);

        let result = self
            .validate()
            .map_err(Error::from)
            .and_then(|()| self.transform(boundary, &mut value).map_err(Error::from));

        match result {
            Ok(fields) => {
                debug!(self.logger, "boundary completed";
                    "boundary" => boundary,
                    "fields" => fields,
                    "duration_us" => micros_since(started)
                );
                Ok(value)
            }
            Err(err) => {
                warn!(self.logger, "boundary failed";
                    "boundary" => boundary,
                    "duration_us" => micros_since(started),
                    "error" => %err
                );
                Err(err)
            }
        }
    }

    fn transform(&self, boundary: Boundary, value: &mut T) -> Result<usize, TransformError> {
        let capabilities = self.read_capabilities();
        let mut transformed = 0;
        for &action in boundary.actions() {
            transformed += self.apply(action, value, &capabilities)?;
        }
        Ok(transformed)
    }

    fn apply(
        &self,
        action: Action,
        value: &mut T,
        capabilities: &Capabilities,
    ) -> Result<usize, TransformError> {
        if T::OVERRIDES.contains(&action) {
            if let Some(result) = value.run_override(action, capabilities) {
                debug!(self.logger, "override applied"; "action" => action);
                return result.map(|()| 0).map_err(|err| {
                    TransformError::new(
                        TransformErrorKind::for_action(action),
                        action,
                        self.plans.type_name(),
                        err,
                    )
                });
            }
        }
        traverse::apply(self.plans.for_action(action), action, value, capabilities)
    }

    fn codec(&self) -> Result<&Arc<dyn Codec<T>>, CodecError> {
        self.codec.as_ref().ok_or(CodecError::NotConfigured)
    }

    fn unmarshal(&self, data: &[u8]) -> Result<T, Error>
    where
        T: Default,
    {
        let codec = self.codec()?;
        let mut value = T::default();
        if let Err(err) = codec.decode(data, &mut value) {
            warn!(self.logger, "decode failed"; "bytes" => data.len(), "error" => %err);
            return Err(CodecError::Decode(err).into());
        }
        Ok(value)
    }

    fn marshal(&self, boundary: Boundary, value: &T) -> Result<Vec<u8>, Error> {
        let codec = self.codec()?;
        match codec.encode(value) {
            Ok(bytes) => {
                debug!(self.logger, "encoded"; "boundary" => boundary, "bytes" => bytes.len());
                Ok(bytes)
            }
            Err(err) => {
                warn!(self.logger, "encode failed"; "boundary" => boundary, "error" => %err);
                Err(CodecError::Encode(err).into())
            }
        }
    }

    /// Decodes external input, then applies `receive.hash`.
    pub fn decode(&self, data: &[u8]) -> Result<T, Error>
    where
        T: Default,
    {
        let value = self.unmarshal(data)?;
        self.receive(value)
    }

    /// Decodes stored bytes, then applies `load.decrypt`.
    pub fn read(&self, data: &[u8]) -> Result<T, Error>
    where
        T: Default,
    {
        let value = self.unmarshal(data)?;
        self.load(value)
    }

    /// Applies `store.encrypt` to a clone of `value`, then encodes it.
    pub fn write(&self, value: &T) -> Result<Vec<u8>, Error> {
        let stored = self.store(value)?;
        self.marshal(Boundary::Store, &stored)
    }

    /// Applies `send.mask` and `send.redact` to a clone of `value`, then
    /// encodes it.
    pub fn encode(&self, value: &T) -> Result<Vec<u8>, Error> {
        let sent = self.send(value)?;
        self.marshal(Boundary::Send, &sent)
    }

    /// Name of the record type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.plans.type_name()
    }

    /// The compiled plans, shared with every other processor of `T`.
    #[must_use]
    pub fn plans(&self) -> &Arc<TypePlans> {
        &self.plans
    }

    /// Content type of the attached codec.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.codec.as_deref().map(Codec::content_type)
    }

    #[cfg(feature = "json")]
    pub(crate) fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl<T: Guarded> fmt::Debug for Processor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("type", &self.plans.type_name())
            .field("plans", &self.plans.len())
            .field("capabilities", &*self.read_capabilities())
            .field("validated", &self.validation.get().map(Result::is_ok))
            .field("content_type", &self.content_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encrypt::AesEncryptor, error::CapabilityKind, Guarded};

    #[derive(Clone, Debug, Default, PartialEq, Guarded)]
    struct Card {
        #[guard(store(encrypt = "aes"), load(decrypt = "aes"))]
        number: String,
        #[guard(send(mask = "name"))]
        holder: String,
    }

    fn card() -> Card {
        Card {
            number: "4111111111111111".into(),
            holder: "Ada Lovelace".into(),
        }
    }

    #[test]
    fn validation_is_memoized() {
        let processor = Processor::<Card>::new().unwrap();
        let first = processor.validate().unwrap_err();
        assert_eq!(first.kind(), CapabilityKind::Encryptor);

        processor.set_encryptor(EncryptAlgo::Aes, AesEncryptor::new(&[1u8; 32]).unwrap());
        assert_eq!(processor.validate().unwrap_err(), first);
        assert!(matches!(processor.send(&card()), Err(Error::Validation(_))));
    }

    #[test]
    fn store_and_load_round_trip() {
        let processor = Processor::<Card>::new().unwrap();
        processor.with_key(EncryptAlgo::Aes, &[4u8; 16]).unwrap();

        let original = card();
        let stored = processor.store(&original).unwrap();
        assert_ne!(stored.number, original.number);
        assert_eq!(stored.holder, original.holder);
        assert_eq!(processor.load(stored).unwrap(), original);
    }

    #[test]
    fn codec_operations_require_a_codec() {
        let processor = Processor::<Card>::new().unwrap();
        processor.with_key(EncryptAlgo::Aes, &[4u8; 16]).unwrap();
        assert!(matches!(
            processor.write(&card()),
            Err(Error::Codec(CodecError::NotConfigured))
        ));
        assert!(matches!(
            processor.read(b"{}"),
            Err(Error::Codec(CodecError::NotConfigured))
        ));
        assert_eq!(processor.content_type(), None);
    }

    #[test]
    fn rsa_cannot_be_keyed_with_raw_bytes() {
        let processor = Processor::<Card>::new().unwrap();
        assert!(matches!(
            processor.with_key(EncryptAlgo::Rsa, &[0u8; 32]),
            Err(CapabilityError::UnsupportedKey(EncryptAlgo::Rsa))
        ));
    }

    #[test]
    fn processors_share_plans() {
        let a = Processor::<Card>::new().unwrap();
        let b = Processor::<Card>::new().unwrap();
        assert_eq!(a.plans(), b.plans());
        assert_eq!(a.type_name(), "Card");
        assert_eq!(a.plans().for_action(Action::Encrypt).len(), 1);
    }
}
