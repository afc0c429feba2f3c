//! # Message Encryption Module
//!
//! Hybrid per-message encryption: every message body is sealed with a fresh
//! AES-256-GCM key, and that key is wrapped separately for each party that
//! may read it.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE ENCRYPTION FLOW                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SENDER (Alice)                                                         │
//! │  ─────────────────────────────────────────────────────────────────      │
//! │                                                                         │
//! │  Step 1: Generate Message Key (unique per message)                      │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  Random 32 bytes from CSPRNG                                │        │
//! │  │  Never reused, never derived from anything                  │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  Step 2: Encrypt Body                                                   │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  AES-256-GCM(                                               │        │
//! │  │    key   = message_key,                                     │        │
//! │  │    nonce = random 12 bytes,                                 │        │
//! │  │    plaintext = utf8(body)                                   │        │
//! │  │  )                                                          │        │
//! │  │           ↓                                                 │        │
//! │  │  Ciphertext + 16-byte Auth Tag                              │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  Step 3: Wrap the Message Key for the Recipient                         │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  RSA-OAEP-SHA256(recipient_public_key, message_key)         │        │
//! │  │  Randomized padding: same key wraps differently every time  │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  (The relay's copy is wrapped symmetrically under a                     │
//! │   challenge-derived key; see the messaging module.)                     │
//! │                                                                         │
//! │  RECIPIENT (Bob)                                                        │
//! │  ─────────────────────────────────────────────────────────────────      │
//! │                                                                         │
//! │  Step 1: Unwrap  RSA-OAEP-Decrypt(own private key, wrapped copy)        │
//! │  Step 2: Decrypt AES-256-GCM-Decrypt(message_key, nonce, ciphertext)    │
//! │          → Plaintext (or a cause-free error if anything is off)         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//!
//! | Property | Guarantee |
//! |----------|-----------|
//! | Confidentiality | Only holders of an unwrapped copy can read the body |
//! | Integrity | Any bit flip in nonce or ciphertext is detected |
//! | Key isolation | Compromise of one message key exposes one message |
//! | No oracle | Every decryption failure is the same detail-free error |

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

use super::keys::DecryptionKeyHandle;
use super::SYMMETRIC_KEY_SIZE;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// A nonce (number used once) for AES-GCM encryption
///
/// ## Critical Security Requirement
///
/// **NEVER reuse a nonce with the same key!**
///
/// Every encryption in this crate draws a fresh random nonce. Random 96-bit
/// nonces are safe for up to 2^32 messages per key, and message keys here
/// are used exactly once anyway.
#[derive(Clone, Copy, Debug)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Ok(Self(bytes))
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; NONCE_SIZE] = bytes.try_into().map_err(|_| {
            Error::MalformedInput(format!(
                "Nonce must be {} bytes, got {}",
                NONCE_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// A single-use AES-256-GCM message key
///
/// Generated fresh for every message, used to encrypt exactly one body,
/// then wrapped for each party that may read it. Zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct MessageKey([u8; SYMMETRIC_KEY_SIZE]);

impl MessageKey {
    /// Generate a fresh random message key
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Ok(Self(bytes))
    }

    pub(crate) fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

// Prevent accidental logging
impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageKey([REDACTED])")
    }
}

/// Encrypt a message body using AES-256-GCM
///
/// Draws a fresh nonce, so encrypting the same body under the same key twice
/// yields different ciphertexts. The returned ciphertext carries the 16-byte
/// authentication tag at the end.
pub fn encrypt_body(key: &MessageKey, plaintext: &str) -> Result<(Nonce, Vec<u8>)> {
    aead_encrypt(key.as_bytes(), plaintext.as_bytes())
}

/// Decrypt a message body using AES-256-GCM
///
/// ## Errors
///
/// - [`Error::DecryptionFailed`] if the key is wrong or the nonce/ciphertext
///   was tampered with. The error does not say which.
/// - [`Error::MalformedInput`] if the recovered bytes are not valid UTF-8;
///   the recovered bytes are not included in the error.
pub fn decrypt_body(key: &MessageKey, nonce: &Nonce, ciphertext: &[u8]) -> Result<String> {
    let plaintext = aead_open(key.as_bytes(), nonce, ciphertext)?;

    String::from_utf8(plaintext)
        .map_err(|_| Error::MalformedInput("Message body is not valid UTF-8".into()))
}

/// Wrap a message key for a recipient using RSA-OAEP-SHA256
///
/// Encrypts the raw 32 key bytes under the recipient's public key. OAEP
/// padding is randomized: wrapping the same key for the same recipient twice
/// produces different ciphertexts.
pub fn wrap_key_for_recipient(key: &MessageKey, recipient: &RsaPublicKey) -> Result<Vec<u8>> {
    recipient
        .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| Error::EncryptionFailed(format!("RSA-OAEP key wrap failed: {}", e)))
}

/// Unwrap a message key with a messaging-capability private key handle
///
/// ## Errors
///
/// - [`Error::DecryptionFailed`] if the wrapped blob was not produced for
///   this key or was modified in transit.
/// - [`Error::MalformedInput`] if the unwrapped payload is not exactly
///   32 bytes.
pub fn unwrap_key(wrapped: &[u8], handle: &DecryptionKeyHandle) -> Result<MessageKey> {
    let mut recovered = handle.decrypt_oaep(wrapped)?;

    if recovered.len() != SYMMETRIC_KEY_SIZE {
        recovered.zeroize();
        return Err(Error::MalformedInput(format!(
            "Unwrapped key must be {} bytes, got {}",
            SYMMETRIC_KEY_SIZE,
            recovered.len()
        )));
    }

    let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
    bytes.copy_from_slice(&recovered);
    recovered.zeroize();

    Ok(MessageKey::from_bytes(bytes))
}

/// Encrypt raw bytes under a raw 256-bit key with a fresh nonce
///
/// Shared AEAD core for the body, the sealed private key, and the relay's
/// wrapped key copy.
pub(crate) fn aead_encrypt(
    key: &[u8; SYMMETRIC_KEY_SIZE],
    plaintext: &[u8],
) -> Result<(Nonce, Vec<u8>)> {
    let nonce = Nonce::random()?;
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let ciphertext = cipher
        .encrypt(AesNonce::from_slice(&nonce.0), plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    Ok((nonce, ciphertext))
}

/// Open raw bytes sealed by [`aead_encrypt`]
///
/// Every failure, including an invalid key length, maps to the same
/// [`Error::DecryptionFailed`]: this function must not act as an oracle for
/// why a ciphertext was rejected.
pub(crate) fn aead_open(
    key: &[u8; SYMMETRIC_KEY_SIZE],
    nonce: &Nonce,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::DecryptionFailed)?;

    cipher
        .decrypt(AesNonce::from_slice(&nonce.0), ciphertext)
        .map_err(|_| Error::DecryptionFailed)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::keys::{open_private_key_for_messaging, seal_private_key, KeyPair};
    use super::*;
    use std::sync::OnceLock;

    // RSA keygen is expensive; share one keypair across the module's tests.
    fn test_keypair() -> &'static KeyPair {
        static KEYPAIR: OnceLock<KeyPair> = OnceLock::new();
        KEYPAIR.get_or_init(|| KeyPair::generate().unwrap())
    }

    fn test_handle() -> DecryptionKeyHandle {
        let record = seal_private_key(test_keypair(), "pw").unwrap();
        open_private_key_for_messaging(&record, "pw").unwrap()
    }

    #[test]
    fn test_body_roundtrip() {
        let key = MessageKey::generate().unwrap();

        let (nonce, ciphertext) = encrypt_body(&key, "Hello, Bob!").unwrap();
        let plaintext = decrypt_body(&key, &nonce, &ciphertext).unwrap();

        assert_eq!(plaintext, "Hello, Bob!");
        assert_eq!(ciphertext.len(), "Hello, Bob!".len() + TAG_SIZE);
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let key = MessageKey::generate().unwrap();
        let (nonce, mut ciphertext) = encrypt_body(&key, "Hello, Bob!").unwrap();

        ciphertext[0] ^= 0x01;

        let err = decrypt_body(&key, &nonce, &ciphertext).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }

    #[test]
    fn test_tampered_nonce_rejected() {
        let key = MessageKey::generate().unwrap();
        let (nonce, ciphertext) = encrypt_body(&key, "Hello, Bob!").unwrap();

        let mut bad = *nonce.as_bytes();
        bad[3] ^= 0x80;

        let err = decrypt_body(&key, &Nonce::from_bytes(bad), &ciphertext).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let key = MessageKey::generate().unwrap();
        let (nonce, ciphertext) = encrypt_body(&key, "Hello, Bob!").unwrap();

        let err = decrypt_body(&key, &nonce, &ciphertext[..ciphertext.len() - 1]).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let key = MessageKey::generate().unwrap();
        let other = MessageKey::generate().unwrap();
        let (nonce, ciphertext) = encrypt_body(&key, "Hello, Bob!").unwrap();

        let err = decrypt_body(&other, &nonce, &ciphertext).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }

    #[test]
    fn test_encryption_is_randomized() {
        let key = MessageKey::generate().unwrap();

        let (nonce1, ct1) = encrypt_body(&key, "same text").unwrap();
        let (nonce2, ct2) = encrypt_body(&key, "same text").unwrap();

        assert_ne!(nonce1.as_bytes(), nonce2.as_bytes());
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_message_keys_are_unique() {
        let key1 = MessageKey::generate().unwrap();
        let key2 = MessageKey::generate().unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_non_utf8_body_rejected_without_leaking() {
        let key = MessageKey::generate().unwrap();
        let (nonce, ciphertext) = aead_encrypt(key.as_bytes(), &[0xff, 0xfe, 0x00]).unwrap();

        let err = decrypt_body(&key, &nonce, &ciphertext).unwrap_err();
        match err {
            Error::MalformedInput(msg) => assert!(!msg.contains('\u{fffd}')),
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_key_wrap_roundtrip() {
        let handle = test_handle();
        let key = MessageKey::generate().unwrap();

        let wrapped = wrap_key_for_recipient(&key, test_keypair().public_key()).unwrap();
        let unwrapped = unwrap_key(&wrapped, &handle).unwrap();

        assert_eq!(key.as_bytes(), unwrapped.as_bytes());
    }

    #[test]
    fn test_key_wrap_is_randomized() {
        let key = MessageKey::generate().unwrap();

        let wrapped1 = wrap_key_for_recipient(&key, test_keypair().public_key()).unwrap();
        let wrapped2 = wrap_key_for_recipient(&key, test_keypair().public_key()).unwrap();

        assert_ne!(wrapped1, wrapped2);
    }

    #[test]
    fn test_unwrap_with_wrong_key_rejected() {
        let key = MessageKey::generate().unwrap();
        let outsider = KeyPair::generate().unwrap();

        let wrapped = wrap_key_for_recipient(&key, outsider.public_key()).unwrap();

        let err = unwrap_key(&wrapped, &test_handle()).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }

    #[test]
    fn test_tampered_wrap_rejected() {
        let key = MessageKey::generate().unwrap();
        let mut wrapped = wrap_key_for_recipient(&key, test_keypair().public_key()).unwrap();

        wrapped[10] ^= 0x01;

        let err = unwrap_key(&wrapped, &test_handle()).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }

    #[test]
    fn test_unwrap_rejects_wrong_payload_length() {
        // A well-formed OAEP blob whose payload is not a 32-byte key.
        let wrapped = test_keypair()
            .public_key()
            .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), &[0u8; 16])
            .unwrap();

        let err = unwrap_key(&wrapped, &test_handle()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_nonce_from_slice_length_check() {
        assert!(Nonce::from_slice(&[0u8; NONCE_SIZE]).is_ok());
        assert!(matches!(
            Nonce::from_slice(&[0u8; 11]),
            Err(Error::MalformedInput(_))
        ));
    }
}
