//! # Identity Module
//!
//! Account key custody: the key bundle created at signup and unlocked at
//! login.
//!
//! ## Key Bundle Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ACCOUNT KEY BUNDLE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  What the client stores and uploads at registration. Every field is     │
//! │  base64; none of them is secret without the password.                   │
//! │                                                                         │
//! │  {                                                                      │
//! │    "publicKey":           base64(SPKI DER of the RSA public key),       │
//! │    "encryptedPrivateKey": base64(AES-256-GCM ciphertext of PKCS#8),     │
//! │    "salt":                base64(16-byte PBKDF2 salt),                  │
//! │    "iv":                  base64(12-byte AES-GCM nonce)                 │
//! │  }                                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Signup and Login Flows
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SIGNUP / LOGIN FLOWS                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SIGNUP                                                                 │
//! │  ──────                                                                 │
//! │  1. Generate RSA-2048 keypair                                           │
//! │  2. Seal private key: PBKDF2(password, fresh salt) → AES-GCM(fresh iv)  │
//! │  3. Encode bundle; upload it; keep the live keypair for this session    │
//! │                                                                         │
//! │  LOGIN (new device or restart)                                          │
//! │  ─────                                                                  │
//! │  1. Fetch the bundle                                                    │
//! │  2. unlock_for_signing(password)    → SigningKeyHandle                  │
//! │     unlock_for_messaging(password)  → DecryptionKeyHandle               │
//! │     (wrong password → the same cause-free error as a tampered bundle)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    export_public_key_der, import_public_key, open_private_key_for_messaging,
    open_private_key_for_signing, seal_private_key, DecryptionKeyHandle, KeyPair, KeyUsage,
    Nonce, SealedPrivateKey, SigningKeyHandle, PASSWORD_SALT_SIZE,
};
use crate::error::{Error, Result};

/// An account's key bundle in wire form
///
/// Produced at signup, persisted locally, and uploaded at registration so
/// other devices can log in. Safe to store anywhere: recovering the private
/// key from it requires the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBundle {
    /// Base64 SPKI DER public key
    pub public_key: String,
    /// Base64 AES-256-GCM ciphertext of the PKCS#8 private key
    pub encrypted_private_key: String,
    /// Base64 16-byte PBKDF2 salt
    pub salt: String,
    /// Base64 12-byte AES-GCM nonce
    pub iv: String,
}

impl KeyBundle {
    /// Create a fresh account key bundle
    ///
    /// Generates a keypair, seals its private half under the password, and
    /// returns the encoded bundle together with the still-live keypair so
    /// the session that just signed up can use it without re-opening the
    /// sealed record.
    pub fn create(password: &str) -> Result<(Self, KeyPair)> {
        let keypair = KeyPair::generate()?;
        let record = seal_private_key(&keypair, password)?;

        let public_der = export_public_key_der(keypair.public_key())?;

        let bundle = Self {
            public_key: BASE64.encode(public_der),
            encrypted_private_key: BASE64.encode(&record.ciphertext),
            salt: BASE64.encode(record.salt),
            iv: BASE64.encode(record.iv.as_bytes()),
        };

        tracing::info!("Created account key bundle");

        Ok((bundle, keypair))
    }

    /// Unlock the private key for signing
    pub fn unlock_for_signing(&self, password: &str) -> Result<SigningKeyHandle> {
        let record = self.sealed_record()?;
        let handle = open_private_key_for_signing(&record, password)?;

        tracing::debug!("Unlocked account private key for {}", KeyUsage::Signing);

        Ok(handle)
    }

    /// Unlock the private key for message decryption
    pub fn unlock_for_messaging(&self, password: &str) -> Result<DecryptionKeyHandle> {
        let record = self.sealed_record()?;
        let handle = open_private_key_for_messaging(&record, password)?;

        tracing::debug!("Unlocked account private key for {}", KeyUsage::Messaging);

        Ok(handle)
    }

    /// The account public key, parsed from the bundle
    ///
    /// Accepts both bare base64 and PEM-armored values; bundles written by
    /// other client versions sometimes carry the armored form.
    pub fn public_key(&self) -> Result<RsaPublicKey> {
        import_public_key(&self.public_key)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::MalformedInput(format!("Invalid key bundle JSON: {}", e)))
    }

    /// Decode the bundle's record fields back into byte form
    fn sealed_record(&self) -> Result<SealedPrivateKey> {
        let ciphertext = BASE64.decode(self.encrypted_private_key.as_bytes()).map_err(|e| {
            Error::MalformedInput(format!("Invalid encryptedPrivateKey base64: {}", e))
        })?;

        let salt_bytes = BASE64
            .decode(self.salt.as_bytes())
            .map_err(|e| Error::MalformedInput(format!("Invalid salt base64: {}", e)))?;
        let salt: [u8; PASSWORD_SALT_SIZE] = salt_bytes.as_slice().try_into().map_err(|_| {
            Error::MalformedInput(format!(
                "Salt must be {} bytes, got {}",
                PASSWORD_SALT_SIZE,
                salt_bytes.len()
            ))
        })?;

        let iv_bytes = BASE64
            .decode(self.iv.as_bytes())
            .map_err(|e| Error::MalformedInput(format!("Invalid iv base64: {}", e)))?;
        let iv = Nonce::from_slice(&iv_bytes)?;

        Ok(SealedPrivateKey { ciphertext, salt, iv })
    }
}

// ============================================================================
// TESTS
// ============================================================================
