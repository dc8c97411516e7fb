//! Built-in encryptors.
//!
//! All AES output carries its 12-byte nonce as a prefix. Envelope output is
//! laid out as `[u16 BE wrapped-key length][wrapped key][nonce | ciphertext]`,
//! where the wrapped key is itself `nonce | sealed data key`.

use std::{fmt, sync::Arc};

use aes_gcm::{
    aead::{
        consts::U12, generic_array::typenum::Unsigned, Aead, AeadCore, KeyInit, Nonce, OsRng,
    },
    Aes128Gcm, Aes256Gcm, AesGcm,
};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::capability::{CapabilityError, EncryptAlgo, Encryptor};

type Aes192Gcm = AesGcm<aes_gcm::aes::Aes192, U12>;

fn seal<C: Aead + AeadCore>(cipher: &C, plaintext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
    let nonce = C::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CapabilityError::EncryptionFailed)?;
    let mut sealed = Vec::with_capacity(nonce.len() + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open<C: Aead + AeadCore>(cipher: &C, sealed: &[u8]) -> Result<Vec<u8>, CapabilityError> {
    let nonce_len = C::NonceSize::USIZE;
    if sealed.len() < nonce_len {
        return Err(CapabilityError::CiphertextTooShort);
    }
    let (nonce, ciphertext) = sealed.split_at(nonce_len);
    cipher
        .decrypt(Nonce::<C>::from_slice(nonce), ciphertext)
        .map_err(|_| CapabilityError::DecryptionFailed)
}

/// AES-GCM keyed by 128, 192 or 256 bits.
enum AesCipher {
    Aes128(Box<Aes128Gcm>),
    Aes192(Box<Aes192Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl AesCipher {
    fn new(key: &[u8]) -> Result<Self, CapabilityError> {
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key).map(|c| Self::Aes128(Box::new(c))),
            24 => Aes192Gcm::new_from_slice(key).map(|c| Self::Aes192(Box::new(c))),
            32 => Aes256Gcm::new_from_slice(key).map(|c| Self::Aes256(Box::new(c))),
            len => return Err(CapabilityError::InvalidKeySize(len)),
        }
        .map_err(|_| CapabilityError::InvalidKeySize(key.len()))
    }

    fn bits(&self) -> usize {
        match self {
            Self::Aes128(_) => 128,
            Self::Aes192(_) => 192,
            Self::Aes256(_) => 256,
        }
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        match self {
            Self::Aes128(cipher) => seal(cipher.as_ref(), plaintext),
            Self::Aes192(cipher) => seal(cipher.as_ref(), plaintext),
            Self::Aes256(cipher) => seal(cipher.as_ref(), plaintext),
        }
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        match self {
            Self::Aes128(cipher) => open(cipher.as_ref(), sealed),
            Self::Aes192(cipher) => open(cipher.as_ref(), sealed),
            Self::Aes256(cipher) => open(cipher.as_ref(), sealed),
        }
    }
}

/// AES-GCM with a random nonce per message.
pub struct AesEncryptor {
    cipher: AesCipher,
}

impl AesEncryptor {
    /// Builds an encryptor from a 16, 24 or 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, CapabilityError> {
        Ok(Self {
            cipher: AesCipher::new(key)?,
        })
    }
}

impl fmt::Debug for AesEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesEncryptor")
            .field("bits", &self.cipher.bits())
            .finish_non_exhaustive()
    }
}

impl Encryptor for AesEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        self.cipher.seal(plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        self.cipher.open(ciphertext)
    }
}

/// Envelope encryption: every message gets a fresh AES-256 data key, sealed
/// under the master key and stored alongside the ciphertext.
pub struct EnvelopeEncryptor {
    master: AesCipher,
}

impl EnvelopeEncryptor {
    /// Builds an encryptor from a 16, 24 or 32-byte master key.
    pub fn new(master_key: &[u8]) -> Result<Self, CapabilityError> {
        Ok(Self {
            master: AesCipher::new(master_key)?,
        })
    }
}

impl fmt::Debug for EnvelopeEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeEncryptor")
            .field("master_bits", &self.master.bits())
            .finish_non_exhaustive()
    }
}

impl Encryptor for EnvelopeEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        let data_key = Aes256Gcm::generate_key(&mut OsRng);
        let data = seal(&Aes256Gcm::new(&data_key), plaintext)?;
        let wrapped = self.master.seal(&data_key)?;
        let wrapped_len =
            u16::try_from(wrapped.len()).map_err(|_| CapabilityError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(2 + wrapped.len() + data.len());
        out.extend_from_slice(&wrapped_len.to_be_bytes());
        out.extend_from_slice(&wrapped);
        out.extend_from_slice(&data);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        let Some((len_bytes, rest)) = ciphertext.split_first_chunk::<2>() else {
            return Err(CapabilityError::CiphertextTooShort);
        };
        let wrapped_len = usize::from(u16::from_be_bytes(*len_bytes));
        if rest.len() < wrapped_len {
            return Err(CapabilityError::CiphertextTooShort);
        }
        let (wrapped, data) = rest.split_at(wrapped_len);

        let data_key = self.master.open(wrapped)?;
        let cipher =
            Aes256Gcm::new_from_slice(&data_key).map_err(|_| CapabilityError::DecryptionFailed)?;
        open(&cipher, data)
    }
}

/// RSA-OAEP with SHA-256.
///
/// Either half of the key pair may be absent: a public-only encryptor can
/// store but not load, and the reverse.
pub struct RsaEncryptor {
    public: Option<RsaPublicKey>,
    private: Option<RsaPrivateKey>,
}

impl RsaEncryptor {
    #[must_use]
    pub fn new(public: Option<RsaPublicKey>, private: Option<RsaPrivateKey>) -> Self {
        Self { public, private }
    }

    /// Uses the private key for decryption and its public half for encryption.
    #[must_use]
    pub fn from_private_key(private: RsaPrivateKey) -> Self {
        Self {
            public: Some(private.to_public_key()),
            private: Some(private),
        }
    }
}

impl fmt::Debug for RsaEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaEncryptor")
            .field("has_public", &self.public.is_some())
            .field("has_private", &self.private.is_some())
            .finish()
    }
}

impl Encryptor for RsaEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        let public = self
            .public
            .as_ref()
            .ok_or(CapabilityError::MissingKey("public"))?;
        public
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
            .map_err(|err| CapabilityError::Other(err.into()))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CapabilityError> {
        let private = self
            .private
            .as_ref()
            .ok_or(CapabilityError::MissingKey("private"))?;
        private
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|_| CapabilityError::DecryptionFailed)
    }
}

/// Builds the built-in symmetric encryptor for `algo` from raw key material.
///
/// RSA keys are structured and must be registered through [`RsaEncryptor`].
pub(crate) fn symmetric(algo: EncryptAlgo, key: &[u8]) -> Result<Arc<dyn Encryptor>, CapabilityError> {
    match algo {
        EncryptAlgo::Aes => Ok(Arc::new(AesEncryptor::new(key)?)),
        EncryptAlgo::Envelope => Ok(Arc::new(EnvelopeEncryptor::new(key)?)),
        EncryptAlgo::Rsa => Err(CapabilityError::UnsupportedKey(algo)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_round_trips_for_every_key_size() {
        for len in [16, 24, 32] {
            let enc = AesEncryptor::new(&vec![7u8; len]).unwrap();
            let sealed = enc.encrypt(b"secret").unwrap();
            assert_eq!(sealed.len(), 12 + 6 + 16);
            assert_eq!(enc.decrypt(&sealed).unwrap(), b"secret");
        }
    }

    #[test]
    fn aes_rejects_bad_key_sizes() {
        assert!(matches!(
            AesEncryptor::new(&[0u8; 20]),
            Err(CapabilityError::InvalidKeySize(20))
        ));
    }

    #[test]
    fn aes_nonce_differs_per_message() {
        let enc = AesEncryptor::new(&[1u8; 32]).unwrap();
        assert_ne!(enc.encrypt(b"x").unwrap(), enc.encrypt(b"x").unwrap());
    }

    #[test]
    fn aes_detects_tampering_and_truncation() {
        let enc = AesEncryptor::new(&[1u8; 16]).unwrap();
        let mut sealed = enc.encrypt(b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        assert!(matches!(
            enc.decrypt(&sealed),
            Err(CapabilityError::DecryptionFailed)
        ));
        assert!(matches!(
            enc.decrypt(&[0u8; 5]),
            Err(CapabilityError::CiphertextTooShort)
        ));
    }

    #[test]
    fn envelope_round_trip_and_layout() {
        let enc = EnvelopeEncryptor::new(&[9u8; 32]).unwrap();
        let sealed = enc.encrypt(b"payload").unwrap();
        let wrapped_len = usize::from(u16::from_be_bytes([sealed[0], sealed[1]]));
        // nonce + 32-byte data key + tag
        assert_eq!(wrapped_len, 12 + 32 + 16);
        assert_eq!(enc.decrypt(&sealed).unwrap(), b"payload");
    }

    #[test]
    fn envelope_with_other_master_key_fails() {
        let sealed = EnvelopeEncryptor::new(&[1u8; 32])
            .unwrap()
            .encrypt(b"payload")
            .unwrap();
        let other = EnvelopeEncryptor::new(&[2u8; 32]).unwrap();
        assert!(matches!(
            other.decrypt(&sealed),
            Err(CapabilityError::DecryptionFailed)
        ));
        assert!(matches!(
            other.decrypt(&[0u8]),
            Err(CapabilityError::CiphertextTooShort)
        ));
        assert!(matches!(
            other.decrypt(&[0, 200, 1, 2]),
            Err(CapabilityError::CiphertextTooShort)
        ));
    }

    #[test]
    fn rsa_round_trip_and_missing_halves() {
        let private = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let public = private.to_public_key();

        let full = RsaEncryptor::from_private_key(private);
        let sealed = full.encrypt(b"card").unwrap();
        assert_eq!(full.decrypt(&sealed).unwrap(), b"card");

        let public_only = RsaEncryptor::new(Some(public), None);
        assert!(public_only.encrypt(b"card").is_ok());
        assert!(matches!(
            public_only.decrypt(&sealed),
            Err(CapabilityError::MissingKey("private"))
        ));

        let empty = RsaEncryptor::new(None, None);
        assert!(matches!(
            empty.encrypt(b"card"),
            Err(CapabilityError::MissingKey("public"))
        ));
    }

    #[test]
    fn symmetric_builder_refuses_rsa() {
        assert!(symmetric(EncryptAlgo::Aes, &[0u8; 32]).is_ok());
        assert!(symmetric(EncryptAlgo::Envelope, &[0u8; 16]).is_ok());
        assert!(matches!(
            symmetric(EncryptAlgo::Rsa, &[0u8; 32]),
            Err(CapabilityError::UnsupportedKey(EncryptAlgo::Rsa))
        ));
    }
}
