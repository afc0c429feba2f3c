//! # Key Management
//!
//! This module owns the account keypair: generation, public key exchange
//! formats, password sealing of the private half, and capability-scoped
//! handles for using it.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │  KeyPair (RSA-2048, e = 65537)                                   │   │
//! │  │  ─────────────────────────────                                   │   │
//! │  │                                                                  │   │
//! │  │  One keypair per account.                                        │   │
//! │  │  • Public half: SPKI DER, base64 on the wire, shared freely      │   │
//! │  │  • Private half: PKCS#8 DER, only ever stored sealed             │   │
//! │  │                                                                  │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │  SealedPrivateKey                                                │   │
//! │  │  ────────────────                                                │   │
//! │  │                                                                  │   │
//! │  │  AES-256-GCM(PBKDF2(password, salt), iv, pkcs8_der)              │   │
//! │  │  { ciphertext, salt (16 bytes), iv (12 bytes) }                  │   │
//! │  │  Salt and iv are drawn fresh on every sealing.                   │   │
//! │  │                                                                  │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌──────────────────────────────┐  ┌──────────────────────────────┐     │
//! │  │  SigningKeyHandle            │  │  DecryptionKeyHandle         │     │
//! │  │  ────────────────            │  │  ───────────────────         │     │
//! │  │                              │  │                              │     │
//! │  │  RSASSA-PKCS1-v1.5/SHA-256   │  │  RSA-OAEP/SHA-256            │     │
//! │  │  can ONLY sign               │  │  can ONLY decrypt            │     │
//! │  └──────────────────────────────┘  └──────────────────────────────┘     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Capability Separation
//!
//! Opening a sealed private key binds it to exactly one capability, and the
//! two handle types share no conversion path. Code that holds a
//! [`SigningKeyHandle`] cannot decrypt; code that holds a
//! [`DecryptionKeyHandle`] cannot sign. For callers that store handles
//! behind one field, [`PrivateKeyHandle`] carries the capability tag and its
//! accessors fail with `UnsupportedKeyUsage` instead of silently crossing
//! over. Neither handle exposes the raw private key.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rsa::pkcs1v15;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

use super::encryption::{aead_encrypt, aead_open, Nonce};
use super::kdf::{derive_password_key, generate_password_salt, PASSWORD_SALT_SIZE};

/// RSA modulus size in bits
pub const RSA_MODULUS_BITS: usize = 2048;

/// The capability a private key handle was opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    /// RSASSA-PKCS1-v1.5 signing
    Signing,
    /// RSA-OAEP decryption
    Messaging,
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyUsage::Signing => write!(f, "signing"),
            KeyUsage::Messaging => write!(f, "messaging"),
        }
    }
}

/// An account RSA keypair
///
/// The private half is zeroized on drop by the `rsa` crate. Outside a live
/// session it exists only as a [`SealedPrivateKey`].
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generate a new random 2048-bit keypair
    ///
    /// Uses the operating system's secure random number generator. Every
    /// call produces an independent keypair.
    pub fn generate() -> Result<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_MODULUS_BITS)
            .map_err(|e| Error::KeyGenerationFailed(e.to_string()))?;
        let public = RsaPublicKey::from(&private);

        Ok(Self { private, public })
    }

    /// Get the public half for sharing with others
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Bind the private half to the signing capability
    ///
    /// Fresh-session path: right after generation the keypair is still in
    /// memory, so a handle can be taken without opening a sealed record.
    pub fn signing_handle(&self) -> SigningKeyHandle {
        SigningKeyHandle::new(self.private.clone())
    }

    /// Bind the private half to the messaging (decrypt) capability
    pub fn messaging_handle(&self) -> DecryptionKeyHandle {
        DecryptionKeyHandle::new(self.private.clone())
    }
}

// Prevent accidental logging
impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair([REDACTED])")
    }
}

/// The account private key, sealed under a password-derived key
///
/// This is what gets persisted and uploaded at registration. Without the
/// password it is an opaque AES-256-GCM blob; the salt and iv are public.
#[derive(Debug, Clone)]
pub struct SealedPrivateKey {
    /// AES-256-GCM ciphertext of the PKCS#8 DER private key (tag included)
    pub ciphertext: Vec<u8>,
    /// PBKDF2 salt drawn for this sealing
    pub salt: [u8; PASSWORD_SALT_SIZE],
    /// AES-GCM nonce drawn for this sealing
    pub iv: Nonce,
}

/// A private key opened for signing only
///
/// Wraps the key pre-bound to RSASSA-PKCS1-v1.5/SHA-256. There is no way to
/// decrypt with it and no way to extract the raw key.
pub struct SigningKeyHandle {
    key: pkcs1v15::SigningKey<Sha256>,
    public: RsaPublicKey,
}

impl SigningKeyHandle {
    fn new(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        Self {
            key: pkcs1v15::SigningKey::new(private),
            public,
        }
    }

    /// The public counterpart, for sharing or local verification
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub(crate) fn signing_key(&self) -> &pkcs1v15::SigningKey<Sha256> {
        &self.key
    }
}

// Prevent accidental logging
impl fmt::Debug for SigningKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKeyHandle([REDACTED])")
    }
}

/// A private key opened for message decryption only
///
/// Performs RSA-OAEP/SHA-256 decryption of wrapped message keys and nothing
/// else.
pub struct DecryptionKeyHandle {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl DecryptionKeyHandle {
    fn new(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        Self { private, public }
    }

    /// The public counterpart, for sharing or local verification
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// OAEP-decrypt a wrapped blob
    ///
    /// Failures are cause-free: a blob wrapped for a different key and a
    /// tampered blob are indistinguishable.
    pub(crate) fn decrypt_oaep(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.private
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|_| Error::DecryptionFailed)
    }
}

// Prevent accidental logging
impl fmt::Debug for DecryptionKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecryptionKeyHandle([REDACTED])")
    }
}

/// A private key handle tagged with its capability
///
/// For callers that keep "whatever handle the user unlocked" in one place.
/// The accessors enforce the capability at runtime; the underlying handle
/// types enforce it at compile time.
pub enum PrivateKeyHandle {
    /// Opened for signing
    Signing(SigningKeyHandle),
    /// Opened for message decryption
    Messaging(DecryptionKeyHandle),
}

impl PrivateKeyHandle {
    /// The capability this handle was opened with
    pub fn usage(&self) -> KeyUsage {
        match self {
            PrivateKeyHandle::Signing(_) => KeyUsage::Signing,
            PrivateKeyHandle::Messaging(_) => KeyUsage::Messaging,
        }
    }

    /// Use as a signing handle
    pub fn as_signing(&self) -> Result<&SigningKeyHandle> {
        match self {
            PrivateKeyHandle::Signing(handle) => Ok(handle),
            PrivateKeyHandle::Messaging(_) => Err(Error::UnsupportedKeyUsage {
                expected: KeyUsage::Signing,
                actual: KeyUsage::Messaging,
            }),
        }
    }

    /// Use as a messaging handle
    pub fn as_messaging(&self) -> Result<&DecryptionKeyHandle> {
        match self {
            PrivateKeyHandle::Messaging(handle) => Ok(handle),
            PrivateKeyHandle::Signing(_) => Err(Error::UnsupportedKeyUsage {
                expected: KeyUsage::Messaging,
                actual: KeyUsage::Signing,
            }),
        }
    }
}

impl From<SigningKeyHandle> for PrivateKeyHandle {
    fn from(handle: SigningKeyHandle) -> Self {
        PrivateKeyHandle::Signing(handle)
    }
}

impl From<DecryptionKeyHandle> for PrivateKeyHandle {
    fn from(handle: DecryptionKeyHandle) -> Self {
        PrivateKeyHandle::Messaging(handle)
    }
}

/// Export a public key as SPKI DER bytes
///
/// Base64 of this is the wire form correspondents exchange.
pub fn export_public_key_der(public: &RsaPublicKey) -> Result<Vec<u8>> {
    let doc = public
        .to_public_key_der()
        .map_err(|e| Error::KeyEncodingFailed(format!("SPKI export failed: {}", e)))?;
    Ok(doc.as_bytes().to_vec())
}

/// Import a public key from base64 SPKI, with or without PEM armor
///
/// Accepts both the bare base64 form and the PEM form some exporters
/// produce. Armor lines and all whitespace are stripped before decoding.
pub fn import_public_key(text: &str) -> Result<RsaPublicKey> {
    let cleaned = strip_pem_armor(text);

    let der = BASE64
        .decode(cleaned.as_bytes())
        .map_err(|e| Error::MalformedInput(format!("Invalid public key base64: {}", e)))?;

    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| Error::MalformedInput(format!("Invalid SPKI public key: {}", e)))
}

fn strip_pem_armor(text: &str) -> String {
    text.replace("-----BEGIN PUBLIC KEY-----", "")
        .replace("-----END PUBLIC KEY-----", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Seal the private half of a keypair under a password
///
/// Exports the private key as PKCS#8 DER and encrypts it with AES-256-GCM
/// under a PBKDF2-derived key. A fresh salt and a fresh iv are drawn on
/// every call, so sealing the same key twice never repeats any output.
pub fn seal_private_key(keypair: &KeyPair, password: &str) -> Result<SealedPrivateKey> {
    let pkcs8 = keypair
        .private
        .to_pkcs8_der()
        .map_err(|e| Error::KeyEncodingFailed(format!("PKCS#8 export failed: {}", e)))?;

    let salt = generate_password_salt();
    let key = derive_password_key(password, &salt)?;

    let (iv, ciphertext) = aead_encrypt(key.as_bytes(), pkcs8.as_bytes())?;

    Ok(SealedPrivateKey {
        ciphertext,
        salt,
        iv,
    })
}

/// Open a sealed private key for signing
///
/// Any failure to authenticate the record, whether from a wrong password or
/// a modified record, is the same [`Error::DecryptionFailed`].
pub fn open_private_key_for_signing(
    record: &SealedPrivateKey,
    password: &str,
) -> Result<SigningKeyHandle> {
    let private = open_sealed(record, password)?;
    Ok(SigningKeyHandle::new(private))
}

/// Open a sealed private key for message decryption
///
/// Same record, same password, different capability: the returned handle
/// can only OAEP-decrypt.
pub fn open_private_key_for_messaging(
    record: &SealedPrivateKey,
    password: &str,
) -> Result<DecryptionKeyHandle> {
    let private = open_sealed(record, password)?;
    Ok(DecryptionKeyHandle::new(private))
}

fn open_sealed(record: &SealedPrivateKey, password: &str) -> Result<RsaPrivateKey> {
    let key = derive_password_key(password, &record.salt)?;

    let plaintext = Zeroizing::new(aead_open(key.as_bytes(), &record.iv, &record.ciphertext)?);

    RsaPrivateKey::from_pkcs8_der(&plaintext)
        .map_err(|e| Error::MalformedInput(format!("Sealed payload is not PKCS#8: {}", e)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    // RSA keygen is expensive; share one keypair across the module's tests.
    fn test_keypair() -> &'static KeyPair {
        static KEYPAIR: OnceLock<KeyPair> = OnceLock::new();
        KEYPAIR.get_or_init(|| KeyPair::generate().unwrap())
    }

    #[test]
    fn test_keypair_generation_is_random() {
        let other = KeyPair::generate().unwrap();
        assert_ne!(test_keypair().public_key(), other.public_key());
    }

    #[test]
    fn test_keypair_debug_is_redacted() {
        let debug = format!("{:?}", test_keypair());
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_seal_open_roundtrip_both_capabilities() {
        let record = seal_private_key(test_keypair(), "correct horse").unwrap();

        let signing = open_private_key_for_signing(&record, "correct horse").unwrap();
        let messaging = open_private_key_for_messaging(&record, "correct horse").unwrap();

        // Both handles recover the same key material.
        assert_eq!(signing.public_key(), test_keypair().public_key());
        assert_eq!(messaging.public_key(), test_keypair().public_key());
    }

    #[test]
    fn test_wrong_password_rejected() {
        let record = seal_private_key(test_keypair(), "correct horse").unwrap();

        let err = open_private_key_for_signing(&record, "correct-horse").unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }

    #[test]
    fn test_tampered_record_indistinguishable_from_wrong_password() {
        let record = seal_private_key(test_keypair(), "pw").unwrap();

        let mut bad_ct = record.clone();
        bad_ct.ciphertext[0] ^= 0x01;
        let ct_err = open_private_key_for_messaging(&bad_ct, "pw").unwrap_err();

        let mut bad_salt = record.clone();
        bad_salt.salt[0] ^= 0x01;
        let salt_err = open_private_key_for_messaging(&bad_salt, "pw").unwrap_err();

        let mut bad_iv = record.clone();
        let mut iv_bytes = *record.iv.as_bytes();
        iv_bytes[0] ^= 0x01;
        bad_iv.iv = Nonce::from_bytes(iv_bytes);
        let iv_err = open_private_key_for_messaging(&bad_iv, "pw").unwrap_err();

        let pw_err = open_private_key_for_messaging(&record, "wrong").unwrap_err();

        // Same variant, same message, nothing to tell the cases apart.
        for err in [&ct_err, &salt_err, &iv_err] {
            assert!(matches!(err, Error::DecryptionFailed));
            assert_eq!(err.to_string(), pw_err.to_string());
        }
    }

    #[test]
    fn test_sealing_is_randomized() {
        let record1 = seal_private_key(test_keypair(), "pw").unwrap();
        let record2 = seal_private_key(test_keypair(), "pw").unwrap();

        assert_ne!(record1.salt, record2.salt);
        assert_ne!(record1.iv.as_bytes(), record2.iv.as_bytes());
        assert_ne!(record1.ciphertext, record2.ciphertext);
    }

    #[test]
    fn test_empty_password_is_valid() {
        let record = seal_private_key(test_keypair(), "").unwrap();
        open_private_key_for_signing(&record, "").unwrap();

        let err = open_private_key_for_signing(&record, " ").unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }

    #[test]
    fn test_public_key_export_import_roundtrip() {
        let der = export_public_key_der(test_keypair().public_key()).unwrap();
        let b64 = BASE64.encode(&der);

        let imported = import_public_key(&b64).unwrap();
        assert_eq!(&imported, test_keypair().public_key());
    }

    #[test]
    fn test_import_accepts_pem_armor() {
        let der = export_public_key_der(test_keypair().public_key()).unwrap();
        let b64 = BASE64.encode(&der);

        // Re-wrap at 64 columns the way PEM exporters do.
        let wrapped: Vec<&str> = b64
            .as_bytes()
            .chunks(64)
            .map(|chunk| std::str::from_utf8(chunk).unwrap())
            .collect();
        let pem = format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----\n",
            wrapped.join("\n")
        );

        let imported = import_public_key(&pem).unwrap();
        assert_eq!(&imported, test_keypair().public_key());
    }

    #[test]
    fn test_import_rejects_garbage() {
        let err = import_public_key("not base64 at all!!!").unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));

        // Valid base64, but not an SPKI document.
        let err = import_public_key(&BASE64.encode(b"hello world")).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_handle_usage_enforcement() {
        let record = seal_private_key(test_keypair(), "pw").unwrap();

        let signing: PrivateKeyHandle = open_private_key_for_signing(&record, "pw")
            .unwrap()
            .into();
        let messaging: PrivateKeyHandle = open_private_key_for_messaging(&record, "pw")
            .unwrap()
            .into();

        assert_eq!(signing.usage(), KeyUsage::Signing);
        assert_eq!(messaging.usage(), KeyUsage::Messaging);

        assert!(signing.as_signing().is_ok());
        assert!(messaging.as_messaging().is_ok());

        let err = signing.as_messaging().unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedKeyUsage {
                expected: KeyUsage::Messaging,
                actual: KeyUsage::Signing,
            }
        ));

        let err = messaging.as_signing().unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedKeyUsage {
                expected: KeyUsage::Signing,
                actual: KeyUsage::Messaging,
            }
        ));
    }

    #[test]
    fn test_fresh_session_handles() {
        let signing = test_keypair().signing_handle();
        let messaging = test_keypair().messaging_handle();

        assert_eq!(signing.public_key(), test_keypair().public_key());
        assert_eq!(messaging.public_key(), test_keypair().public_key());
    }
}
