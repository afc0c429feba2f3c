//! # Digital Signatures Module
//!
//! RSASSA-PKCS1-v1.5 signatures over SHA-256, used to prove that a challenge
//! string was produced by the holder of an account's private key.
//!
//! ## Signature Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SIGNING FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SENDER (Alice)                                                         │
//! │  ─────────────────────────────────────────────────────────────────      │
//! │                                                                         │
//! │  ┌──────────────────────┐                                               │
//! │  │  Payload bytes       │   e.g. the exact UTF-8 bytes of a             │
//! │  │                      │   canonical challenge string                  │
//! │  └──────────┬───────────┘                                               │
//! │             ▼                                                           │
//! │  ┌──────────────────────────────────────────┐                           │
//! │  │      RSASSA-PKCS1-v1.5 Sign              │                           │
//! │  │                                          │                           │
//! │  │  1. Hash payload with SHA-256            │                           │
//! │  │  2. Pad deterministically (PKCS#1 v1.5)  │                           │
//! │  │  3. Sign with the 2048-bit private key   │                           │
//! │  │                                          │                           │
//! │  │  Key: SigningKeyHandle (sign-only)       │                           │
//! │  └──────────────┬───────────────────────────┘                           │
//! │                 ▼                                                       │
//! │  ┌──────────────────────────────────────────┐                           │
//! │  │   Signature: 256 bytes (key-sized)       │                           │
//! │  │   Deterministic: same key + payload      │                           │
//! │  │   always produce the same bytes          │                           │
//! │  └──────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  VERIFIER (relay, or anyone with the public key)                        │
//! │  ─────────────────────────────────────────────────────────────────      │
//! │                                                                         │
//! │  verify(payload, signature, public_key) → bool                          │
//! │                                                                         │
//! │  ✓ true:  payload is byte-identical to what the key holder signed       │
//! │  ✗ false: any changed byte, wrong key, or malformed signature           │
//! │           (never an error; verification has no failure modes to leak)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//!
//! | Property | Description |
//! |----------|-------------|
//! | Authenticity | Only the private key holder can produce a valid signature |
//! | Exact binding | One whitespace change in the payload fails verification |
//! | Determinism | Re-signing the same payload yields identical bytes |
//! | Public verification | Anyone holding the SPKI public key can verify |

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::pkcs1v15;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::RsaPublicKey;
use sha2::Sha256;

use crate::error::{Error, Result};

use super::keys::SigningKeyHandle;

/// An RSASSA-PKCS1-v1.5 signature
///
/// The length matches the key modulus (256 bytes for the 2048-bit account
/// keys). Signatures are public values; they travel base64-encoded in
/// envelopes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Create from raw bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode as base64 for transport
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    /// Decode from base64
    pub fn from_base64(text: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(text.as_bytes())
            .map_err(|e| Error::MalformedInput(format!("Invalid signature base64: {}", e)))?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Sign a payload with a signing-capability handle
///
/// The payload is signed as raw bytes; callers signing strings pass their
/// UTF-8 encoding. PKCS#1 v1.5 padding is deterministic, so the same handle
/// and payload always produce the same signature.
pub fn sign(payload: &[u8], handle: &SigningKeyHandle) -> Result<Signature> {
    let signature = handle
        .signing_key()
        .try_sign(payload)
        .map_err(|e| Error::SigningFailed(e.to_string()))?;

    Ok(Signature::from_bytes(signature.to_vec()))
}

/// Verify a signature against a payload and public key
///
/// Returns `true` only when the signature was produced by the private
/// counterpart of `public` over exactly these payload bytes. Every mismatch,
/// including a signature of impossible length, returns `false`; verification
/// never errors.
pub fn verify(payload: &[u8], signature: &Signature, public: &RsaPublicKey) -> bool {
    let parsed = match pkcs1v15::Signature::try_from(signature.as_bytes()) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    let verifying_key = pkcs1v15::VerifyingKey::<Sha256>::new(public.clone());
    verifying_key.verify(payload, &parsed).is_ok()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::keys::KeyPair;
    use super::*;
    use std::sync::OnceLock;

    // RSA keygen is expensive; share one keypair across the module's tests.
    fn test_keypair() -> &'static KeyPair {
        static KEYPAIR: OnceLock<KeyPair> = OnceLock::new();
        KEYPAIR.get_or_init(|| KeyPair::generate().unwrap())
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let handle = test_keypair().signing_handle();

        let signature = sign(b"challenge payload", &handle).unwrap();

        assert!(verify(
            b"challenge payload",
            &signature,
            test_keypair().public_key()
        ));
    }

    #[test]
    fn test_verify_binds_exact_bytes() {
        let handle = test_keypair().signing_handle();
        let signature = sign(br#"{"nonce":"abc","messageId":1}"#, &handle).unwrap();

        // One inserted space is a different payload.
        assert!(!verify(
            br#"{"nonce": "abc","messageId":1}"#,
            &signature,
            test_keypair().public_key()
        ));
    }

    #[test]
    fn test_verify_rejects_modified_signature() {
        let handle = test_keypair().signing_handle();
        let signature = sign(b"payload", &handle).unwrap();

        let mut bytes = signature.as_bytes().to_vec();
        bytes[17] ^= 0x01;
        let tampered = Signature::from_bytes(bytes);

        assert!(!verify(b"payload", &tampered, test_keypair().public_key()));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let handle = test_keypair().signing_handle();
        let other = KeyPair::generate().unwrap();

        let signature = sign(b"payload", &handle).unwrap();

        assert!(!verify(b"payload", &signature, other.public_key()));
    }

    #[test]
    fn test_verify_never_errors_on_malformed_signature() {
        // 3 bytes cannot be an RSA-2048 signature; verify must say false,
        // not panic or error.
        let nonsense = Signature::from_bytes(vec![1, 2, 3]);
        assert!(!verify(b"payload", &nonsense, test_keypair().public_key()));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let handle = test_keypair().signing_handle();

        let sig1 = sign(b"same payload", &handle).unwrap();
        let sig2 = sign(b"same payload", &handle).unwrap();

        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_signature_base64_roundtrip() {
        let handle = test_keypair().signing_handle();
        let signature = sign(b"payload", &handle).unwrap();

        let restored = Signature::from_base64(&signature.to_base64()).unwrap();
        assert_eq!(signature, restored);

        let err = Signature::from_base64("%%%not-base64%%%").unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }
}
