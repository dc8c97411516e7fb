//! Applies compiled field plans to a live value.
//!
//! Every plan is resolved by walking its index path through
//! [`FieldAccess::field_mut`]. An absent optional record anywhere on the path
//! skips the plan. The first failing field aborts the action; fields already
//! transformed stay transformed.
//!
//! Ciphertext stored in text fields is standard base64. Byte buffers carry raw
//! ciphertext.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    boundary::Action,
    capability::{CapabilityError, Encryptor, Hasher, Masker},
    error::{BoxError, CapabilityKind, TransformError, TransformErrorKind},
    plan::{FieldPlan, Parameter},
    registry::Capabilities,
    schema::{FieldAccess, FieldSlot},
};

/// A transform bound to its capability for the duration of one plan.
enum Op<'c> {
    Encrypt(&'c dyn Encryptor),
    Decrypt(&'c dyn Encryptor),
    Hash(&'c dyn Hasher),
    Mask(&'c dyn Masker),
    Redact(&'c str),
}

/// A field-level failure before the field name is attached.
struct Failure {
    kind: TransformErrorKind,
    source: BoxError,
}

impl Failure {
    fn capability(action: Action, err: CapabilityError) -> Self {
        Self {
            kind: TransformErrorKind::for_action(action),
            source: err.into(),
        }
    }

    fn at(self, action: Action, field: impl Into<String>) -> TransformError {
        TransformError::new(self.kind, action, field, self.source)
    }
}

impl<'c> Op<'c> {
    fn bind(
        action: Action,
        parameter: &'c Parameter,
        capabilities: &'c Capabilities,
    ) -> Result<Self, CapabilityError> {
        let not_registered = |kind| CapabilityError::NotRegistered {
            kind,
            parameter: parameter.to_string(),
        };
        Ok(match parameter {
            Parameter::Encryptor(algo) => {
                let encryptor = capabilities
                    .encryptors()
                    .get(algo)
                    .ok_or_else(|| not_registered(CapabilityKind::Encryptor))?;
                if action == Action::Decrypt {
                    Self::Decrypt(encryptor.as_ref())
                } else {
                    Self::Encrypt(encryptor.as_ref())
                }
            }
            Parameter::Hasher(algo) => Self::Hash(
                capabilities
                    .hashers()
                    .get(algo)
                    .ok_or_else(|| not_registered(CapabilityKind::Hasher))?
                    .as_ref(),
            ),
            Parameter::Masker(format) => Self::Mask(
                capabilities
                    .maskers()
                    .get(format)
                    .ok_or_else(|| not_registered(CapabilityKind::Masker))?
                    .as_ref(),
            ),
            Parameter::Literal(text) => Self::Redact(text),
        })
    }

    fn action(&self) -> Action {
        match self {
            Self::Encrypt(_) => Action::Encrypt,
            Self::Decrypt(_) => Action::Decrypt,
            Self::Hash(_) => Action::Hash,
            Self::Mask(_) => Action::Mask,
            Self::Redact(_) => Action::Redact,
        }
    }

    fn text(&self, value: &str) -> Result<String, Failure> {
        let action = self.action();
        match self {
            Self::Encrypt(encryptor) => encryptor
                .encrypt(value.as_bytes())
                .map(|ciphertext| STANDARD.encode(ciphertext))
                .map_err(|err| Failure::capability(action, err)),
            Self::Decrypt(encryptor) => {
                let ciphertext = STANDARD.decode(value).map_err(|err| Failure {
                    kind: TransformErrorKind::EncodingInvalid,
                    source: err.into(),
                })?;
                let plaintext = encryptor
                    .decrypt(&ciphertext)
                    .map_err(|err| Failure::capability(action, err))?;
                String::from_utf8(plaintext).map_err(|err| Failure {
                    kind: TransformErrorKind::DecryptFailed,
                    source: err.into(),
                })
            }
            Self::Hash(hasher) => hasher
                .hash(value.as_bytes())
                .map_err(|err| Failure::capability(action, err)),
            Self::Mask(masker) => masker
                .mask(value)
                .map_err(|err| Failure::capability(action, err)),
            Self::Redact(literal) => Ok((*literal).to_string()),
        }
    }

    fn bytes(&self, value: &[u8]) -> Result<Vec<u8>, Failure> {
        let action = self.action();
        match self {
            Self::Encrypt(encryptor) => encryptor
                .encrypt(value)
                .map_err(|err| Failure::capability(action, err)),
            Self::Decrypt(encryptor) => encryptor
                .decrypt(value)
                .map_err(|err| Failure::capability(action, err)),
            Self::Hash(hasher) => hasher
                .hash(value)
                .map(String::into_bytes)
                .map_err(|err| Failure::capability(action, err)),
            Self::Mask(masker) => {
                let text = std::str::from_utf8(value).map_err(|err| Failure {
                    kind: TransformErrorKind::MaskFailed,
                    source: err.into(),
                })?;
                masker
                    .mask(text)
                    .map(String::into_bytes)
                    .map_err(|err| Failure::capability(action, err))
            }
            Self::Redact(literal) => Ok(literal.as_bytes().to_vec()),
        }
    }
}

/// Walks `path` from `root`. Returns `None` when an optional record on the
/// way is absent or the path does not match the value.
fn resolve<'v>(root: &'v mut dyn FieldAccess, path: &[usize]) -> Option<FieldSlot<'v>> {
    let (&leaf, parents) = path.split_last()?;
    let mut current = root;
    for &index in parents {
        match current.field_mut(index)? {
            FieldSlot::Record(next) => current = next,
            _ => return None,
        }
    }
    match current.field_mut(leaf)? {
        FieldSlot::Absent | FieldSlot::Record(_) => None,
        slot => Some(slot),
    }
}

/// Applies `plans` for `action` to `value`, returning how many fields were
/// transformed.
pub(crate) fn apply(
    plans: &[FieldPlan],
    action: Action,
    value: &mut dyn FieldAccess,
    capabilities: &Capabilities,
) -> Result<usize, TransformError> {
    let mut transformed = 0;
    for plan in plans {
        let Some(slot) = resolve(value, plan.path()) else {
            continue;
        };
        let op = Op::bind(action, plan.parameter(), capabilities).map_err(|err| {
            TransformError::new(
                TransformErrorKind::for_action(action),
                action,
                plan.name(),
                err,
            )
        })?;

        match slot {
            FieldSlot::Text(text) => {
                *text = op.text(text).map_err(|f| f.at(action, plan.name()))?;
            }
            FieldSlot::Bytes(bytes) => {
                *bytes = op.bytes(bytes).map_err(|f| f.at(action, plan.name()))?;
            }
            FieldSlot::TextSequence(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    *item = op
                        .text(item)
                        .map_err(|f| f.at(action, format!("{}[{i}]", plan.name())))?;
                }
            }
            FieldSlot::TextMapping(map) => {
                for (key, item) in map.entries_mut() {
                    *item = op
                        .text(item)
                        .map_err(|f| f.at(action, format!("{}[{key:?}]", plan.name())))?;
                }
            }
            FieldSlot::Record(_) | FieldSlot::Absent => continue,
        }
        transformed += 1;
    }
    Ok(transformed)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        capability::EncryptAlgo,
        encrypt::AesEncryptor,
        plan::TypePlans,
        schema::{FieldMeta, Guarded, RawDirective, Schema, Shape},
    };

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Inner {
        code: String,
    }

    impl FieldAccess for Inner {
        fn field_mut(&mut self, index: usize) -> Option<FieldSlot<'_>> {
            match index {
                0 => Some(FieldSlot::Text(&mut self.code)),
                _ => None,
            }
        }
    }

    impl Guarded for Inner {
        fn schema() -> Schema {
            Schema::new::<Self>(
                "Inner",
                vec![FieldMeta::leaf(0, "code", Shape::Text, vec![RawDirective::new(Action::Redact, "[code]")])],
            )
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Outer {
        note: String,
        blob: Vec<u8>,
        names: Vec<String>,
        labels: BTreeMap<String, String>,
        inner: Option<Inner>,
    }

    impl FieldAccess for Outer {
        fn field_mut(&mut self, index: usize) -> Option<FieldSlot<'_>> {
            match index {
                0 => Some(FieldSlot::Text(&mut self.note)),
                1 => Some(FieldSlot::Bytes(&mut self.blob)),
                2 => Some(FieldSlot::TextSequence(&mut self.names)),
                3 => Some(FieldSlot::TextMapping(&mut self.labels)),
                4 => Some(match self.inner.as_mut() {
                    Some(inner) => FieldSlot::Record(inner),
                    None => FieldSlot::Absent,
                }),
                _ => None,
            }
        }
    }

    impl Guarded for Outer {
        fn schema() -> Schema {
            let both = |a: Action, p: &'static str| vec![RawDirective::new(a, p)];
            Schema::new::<Self>(
                "Outer",
                vec![
                    FieldMeta::leaf(0, "note", Shape::Text, both(Action::Encrypt, "aes")),
                    FieldMeta::leaf(1, "blob", Shape::Bytes, both(Action::Encrypt, "aes")),
                    FieldMeta::leaf(2, "names", Shape::TextSequence, both(Action::Mask, "name")),
                    FieldMeta::leaf(3, "labels", Shape::TextMapping, both(Action::Mask, "email")),
                    FieldMeta::nested(4, "inner", true, Inner::schema),
                ],
            )
        }
    }

    fn sample() -> Outer {
        Outer {
            note: "hello".into(),
            blob: b"raw".to_vec(),
            names: vec!["John Smith".into(), "Ada".into()],
            labels: BTreeMap::from([
                ("home".into(), "john@example.com".into()),
                ("work".into(), "ada@corp.io".into()),
            ]),
            inner: Some(Inner { code: "1234".into() }),
        }
    }

    fn caps() -> Capabilities {
        let mut caps = Capabilities::new();
        caps.insert_encryptor(
            EncryptAlgo::Aes,
            std::sync::Arc::new(AesEncryptor::new(&[5u8; 32]).unwrap()),
        );
        caps
    }

    fn plans() -> TypePlans {
        TypePlans::compile(&Outer::schema()).unwrap()
    }

    fn run(action: Action, value: &mut Outer, caps: &Capabilities) -> Result<usize, TransformError> {
        apply(plans().for_action(action), action, value, caps)
    }

    #[test]
    fn encrypt_then_decrypt_restores_text_and_bytes() {
        let caps = caps();
        let mut value = sample();
        assert_eq!(run(Action::Encrypt, &mut value, &caps).unwrap(), 2);
        assert_ne!(value.note, "hello");
        assert!(STANDARD.decode(&value.note).is_ok());
        assert_eq!(value.blob.len(), 12 + 3 + 16);

        let encrypted = plans();
        // Decrypt reuses the encrypt plans' paths.
        apply(encrypted.for_action(Action::Encrypt), Action::Decrypt, &mut value, &caps).unwrap();
        assert_eq!(value, sample());
    }

    #[test]
    fn masking_preserves_sequence_order_and_mapping_keys() {
        let caps = caps();
        let mut value = sample();
        assert_eq!(run(Action::Mask, &mut value, &caps).unwrap(), 2);
        assert_eq!(value.names, vec!["J*** S****", "A**"]);
        assert_eq!(
            value.labels,
            BTreeMap::from([
                ("home".into(), "j***@example.com".into()),
                ("work".into(), "a***@corp.io".into()),
            ])
        );
    }

    #[test]
    fn absent_optional_record_is_skipped() {
        let caps = caps();
        let mut value = Outer {
            inner: None,
            ..sample()
        };
        assert_eq!(run(Action::Redact, &mut value, &caps).unwrap(), 0);

        let mut present = sample();
        assert_eq!(run(Action::Redact, &mut present, &caps).unwrap(), 1);
        assert_eq!(present.inner.unwrap().code, "[code]");
    }

    #[test]
    fn malformed_ciphertext_text_is_an_encoding_error() {
        let caps = caps();
        let mut value = Outer {
            note: "not base64!".into(),
            ..sample()
        };
        let err = apply(plans().for_action(Action::Encrypt), Action::Decrypt, &mut value, &caps)
            .unwrap_err();
        assert_eq!(err.kind(), TransformErrorKind::EncodingInvalid);
        assert_eq!(err.field(), "note");
    }

    #[test]
    fn first_failure_names_element_and_stops() {
        let caps = caps();
        let mut value = Outer {
            names: vec!["Ada".into(), "   ".into(), "Bob".into()],
            ..sample()
        };
        let err = run(Action::Mask, &mut value, &caps).unwrap_err();
        assert_eq!(err.kind(), TransformErrorKind::MaskFailed);
        assert_eq!(err.field(), "names[1]");
        assert_eq!(value.names[0], "A**");
        assert_eq!(value.names[2], "Bob");
        // The mapping comes after the failing field and is untouched.
        assert_eq!(value.labels, sample().labels);
    }

    #[test]
    fn mapping_failures_name_the_key() {
        let caps = caps();
        let mut value = Outer {
            labels: BTreeMap::from([("bad".into(), "nobody".into())]),
            ..sample()
        };
        let err = run(Action::Mask, &mut value, &caps).unwrap_err();
        assert_eq!(err.field(), "labels[\"bad\"]");
    }

    #[test]
    fn unregistered_capability_fails_the_field() {
        let mut value = sample();
        let err = run(Action::Encrypt, &mut value, &Capabilities::new()).unwrap_err();
        assert_eq!(err.kind(), TransformErrorKind::EncryptFailed);
        assert_eq!(value.note, "hello");
    }
}
