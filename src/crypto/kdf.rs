//! # Key Derivation Functions
//!
//! This module derives the two symmetric keys that are never stored or
//! transmitted directly: the password key that seals the account's private
//! key, and the challenge-bound wrapping key that protects the relay's copy
//! of a message key.
//!
//! ## Password Key Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    PASSWORD → SEALING KEY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    USER PASSWORD                                │    │
//! │  │                                                                 │    │
//! │  │  Never stored, never transmitted, never logged.                 │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │                                ▼                                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    PBKDF2 STRETCHING                            │    │
//! │  │                                                                 │    │
//! │  │  PBKDF2-HMAC-SHA256(                                            │    │
//! │  │    password  = utf8(password),                                  │    │
//! │  │    salt      = 16 random bytes (fresh per sealing),             │    │
//! │  │    rounds    = 100,000 (hard floor),                            │    │
//! │  │    out_len   = 32 bytes                                         │    │
//! │  │  )                                                              │    │
//! │  │                                                                 │    │
//! │  │  → 256-bit AES-GCM key, zeroized on drop                        │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Server Wrapping Key Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 CHALLENGE + SIGNATURE → WRAPPING KEY                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  challengeString (canonical JSON, exact bytes)                          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  digest = SHA-256(challengeString)                                      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ikm = HMAC-SHA256(key = signature bytes, msg = digest)                 │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  HKDF-SHA256(                                                           │
//! │    ikm  = ikm,                                                          │
//! │    salt = 32 random bytes (fresh per send),                             │
//! │    info = "velum-server-wrap-v1"                                        │
//! │  )                                                                      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  → 256-bit AES-GCM wrapping key                                         │
//! │                                                                         │
//! │  The relay, holding the same challengeString, signature, and salt,      │
//! │  re-derives the identical key. Nobody else can: the derivation is       │
//! │  keyed by the sender's signature over this exact challenge.             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Considerations
//!
//! | Aspect | Measure |
//! |--------|---------|
//! | Password KDF | PBKDF2-HMAC-SHA256, 100,000 iterations minimum |
//! | Salt freshness | New random salt per sealing and per send |
//! | Domain separation | HKDF `info = "velum-server-wrap-v1"` |
//! | Key material | Derived keys zeroized on drop |

use std::fmt;

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

use super::signing::Signature;
use super::SYMMETRIC_KEY_SIZE;

/// PBKDF2 iteration count, also the hard floor for caller-supplied counts
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Size of the random salt used for password key derivation, in bytes
pub const PASSWORD_SALT_SIZE: usize = 16;

/// Size of the random salt used for server wrapping key derivation, in bytes
pub const WRAP_SALT_SIZE: usize = 32;

/// Domain separation strings for HKDF
///
/// These ensure that keys derived for different purposes are cryptographically
/// independent, even if the same input material ever recurs.
pub mod domain {
    /// Domain for server wrapping key derivation
    pub const SERVER_WRAP: &[u8] = b"velum-server-wrap-v1";
}

/// A password-derived AES-256-GCM key
///
/// Only ever used to seal and open the account's private key. Lives in
/// memory for the duration of one sealing or opening operation and is
/// zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct PasswordKey([u8; SYMMETRIC_KEY_SIZE]);

impl PasswordKey {
    pub(crate) fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

// Prevent accidental logging
impl fmt::Debug for PasswordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordKey([REDACTED])")
    }
}

/// A challenge-bound AES-256-GCM key wrapping key
///
/// Derived per send from the challenge string and its signature; protects
/// the relay's copy of the message key. Zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct WrappingKey([u8; SYMMETRIC_KEY_SIZE]);

impl WrappingKey {
    pub(crate) fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

// Prevent accidental logging
impl fmt::Debug for WrappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrappingKey([REDACTED])")
    }
}

/// Generate a fresh random salt for password key derivation
///
/// Called once per sealing operation. Salts are public; freshness is what
/// matters, so the same password sealed twice yields unrelated keys.
pub fn generate_password_salt() -> [u8; PASSWORD_SALT_SIZE] {
    let mut salt = [0u8; PASSWORD_SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive an AES-256-GCM key from a password and salt
///
/// Uses PBKDF2-HMAC-SHA256 with [`PBKDF2_ITERATIONS`] rounds. Deterministic:
/// the same password and salt always produce the same key, which is what
/// makes the sealed private key recoverable at login.
///
/// The salt must be 16 or 32 bytes. Empty passwords are accepted; password
/// policy is the caller's concern.
pub fn derive_password_key(password: &str, salt: &[u8]) -> Result<PasswordKey> {
    derive_password_key_with_iterations(password, salt, PBKDF2_ITERATIONS)
}

/// Derive a password key with a caller-chosen iteration count
///
/// Counts below [`PBKDF2_ITERATIONS`] are rejected; the floor is part of the
/// wire contract, not a tunable.
pub fn derive_password_key_with_iterations(
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<PasswordKey> {
    if salt.len() != PASSWORD_SALT_SIZE && salt.len() != WRAP_SALT_SIZE {
        return Err(Error::MalformedInput(format!(
            "Password salt must be {} or {} bytes, got {}",
            PASSWORD_SALT_SIZE,
            WRAP_SALT_SIZE,
            salt.len()
        )));
    }
    if iterations < PBKDF2_ITERATIONS {
        return Err(Error::MalformedInput(format!(
            "PBKDF2 iteration count {} is below the {} floor",
            iterations, PBKDF2_ITERATIONS
        )));
    }

    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);

    Ok(PasswordKey::from_bytes(key))
}

/// Derive a fresh server wrapping key for one send
///
/// Returns the key together with the salt that was drawn for it; the salt
/// travels in the envelope so the relay can re-derive the same key with
/// [`rederive_server_wrapping_key`].
///
/// ## Process
///
/// ```text
/// digest = SHA-256(challenge_string)
/// ikm    = HMAC-SHA256(key = signature, msg = digest)
/// key    = HKDF-SHA256(ikm, fresh 32-byte salt, "velum-server-wrap-v1")
/// ```
pub fn derive_server_wrapping_key(
    challenge_string: &str,
    signature: &Signature,
) -> Result<(WrappingKey, [u8; WRAP_SALT_SIZE])> {
    let mut salt = [0u8; WRAP_SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let key = rederive_server_wrapping_key(challenge_string, signature, &salt)?;
    Ok((key, salt))
}

/// Re-derive a server wrapping key from a known salt
///
/// The receive-side counterpart of [`derive_server_wrapping_key`]: given the
/// exact challenge string, the signature over it, and the salt carried in the
/// envelope, this reproduces the send-side key. The salt must be 32 bytes.
pub fn rederive_server_wrapping_key(
    challenge_string: &str,
    signature: &Signature,
    salt: &[u8],
) -> Result<WrappingKey> {
    if salt.len() != WRAP_SALT_SIZE {
        return Err(Error::MalformedInput(format!(
            "Wrap salt must be {} bytes, got {}",
            WRAP_SALT_SIZE,
            salt.len()
        )));
    }

    let digest = Sha256::digest(challenge_string.as_bytes());

    let mut mac = Hmac::<Sha256>::new_from_slice(signature.as_bytes())
        .map_err(|e| Error::KeyDerivationFailed(format!("Invalid HMAC key: {}", e)))?;
    mac.update(digest.as_slice());
    let ikm = mac.finalize().into_bytes();

    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm.as_slice());

    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    hkdf.expand(domain::SERVER_WRAP, &mut key)
        .map_err(|_| Error::KeyDerivationFailed("Failed to derive server wrapping key".into()))?;

    Ok(WrappingKey::from_bytes(key))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signature() -> Signature {
        Signature::from_bytes(vec![0x5a; 256])
    }

    #[test]
    fn test_password_key_deterministic() {
        let salt = [7u8; PASSWORD_SALT_SIZE];

        let key1 = derive_password_key("correct horse", &salt).unwrap();
        let key2 = derive_password_key("correct horse", &salt).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_password_key_salt_sensitivity() {
        let key1 = derive_password_key("hunter2", &[1u8; 16]).unwrap();
        let key2 = derive_password_key("hunter2", &[2u8; 16]).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_password_key_password_sensitivity() {
        let salt = [7u8; PASSWORD_SALT_SIZE];

        let key1 = derive_password_key("hunter2", &salt).unwrap();
        let key2 = derive_password_key("hunter3", &salt).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_empty_password_accepted() {
        let salt = [7u8; PASSWORD_SALT_SIZE];
        derive_password_key("", &salt).unwrap();
    }

    #[test]
    fn test_bad_salt_length_rejected() {
        let err = derive_password_key("pw", &[0u8; 8]).unwrap_err();
        assert!(matches!(err, crate::Error::MalformedInput(_)));
    }

    #[test]
    fn test_iteration_floor_enforced() {
        let salt = [7u8; PASSWORD_SALT_SIZE];

        let err =
            derive_password_key_with_iterations("pw", &salt, PBKDF2_ITERATIONS - 1).unwrap_err();
        assert!(matches!(err, crate::Error::MalformedInput(_)));

        // At or above the floor is fine, and the count changes the key.
        let at_floor = derive_password_key_with_iterations("pw", &salt, PBKDF2_ITERATIONS).unwrap();
        let above = derive_password_key_with_iterations("pw", &salt, PBKDF2_ITERATIONS + 1).unwrap();
        assert_ne!(at_floor.as_bytes(), above.as_bytes());
    }

    #[test]
    fn test_password_salt_uniqueness() {
        let salt1 = generate_password_salt();
        let salt2 = generate_password_salt();

        assert_ne!(salt1, salt2);
    }

    #[test]
    fn test_wrapping_key_rederivation() {
        let sig = test_signature();
        let challenge = r#"{"nonce":"abc","messageId":1}"#;

        let (key, salt) = derive_server_wrapping_key(challenge, &sig).unwrap();
        let rederived = rederive_server_wrapping_key(challenge, &sig, &salt).unwrap();

        assert_eq!(key.as_bytes(), rederived.as_bytes());
    }

    #[test]
    fn test_wrapping_key_salt_freshness() {
        let sig = test_signature();
        let challenge = r#"{"nonce":"abc","messageId":1}"#;

        let (key1, salt1) = derive_server_wrapping_key(challenge, &sig).unwrap();
        let (key2, salt2) = derive_server_wrapping_key(challenge, &sig).unwrap();

        assert_ne!(salt1, salt2);
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_wrapping_key_challenge_sensitivity() {
        let sig = test_signature();
        let salt = [9u8; WRAP_SALT_SIZE];

        let key1 = rederive_server_wrapping_key(r#"{"nonce":"a","messageId":1}"#, &sig, &salt)
            .unwrap();
        let key2 = rederive_server_wrapping_key(r#"{"nonce":"b","messageId":1}"#, &sig, &salt)
            .unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_wrapping_key_signature_sensitivity() {
        let salt = [9u8; WRAP_SALT_SIZE];
        let challenge = r#"{"nonce":"abc","messageId":1}"#;

        let sig1 = Signature::from_bytes(vec![1u8; 256]);
        let sig2 = Signature::from_bytes(vec![2u8; 256]);

        let key1 = rederive_server_wrapping_key(challenge, &sig1, &salt).unwrap();
        let key2 = rederive_server_wrapping_key(challenge, &sig2, &salt).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_rederive_rejects_bad_salt_length() {
        let sig = test_signature();
        let err = rederive_server_wrapping_key("{}", &sig, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, crate::Error::MalformedInput(_)));
    }
}
