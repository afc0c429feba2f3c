//! # Cryptography Module
//!
//! This module provides all cryptographic primitives used by Velum Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    KEY HIERARCHY                                │    │
//! │  ├─────────────────────────────────────────────────────────────────┤    │
//! │  │                                                                 │    │
//! │  │  Password (user-chosen, never stored)                           │    │
//! │  │                          │                                      │    │
//! │  │                          ▼                                      │    │
//! │  │  ┌─────────────────────────────────────────────────────────┐    │    │
//! │  │  │           Password Key (AES-256, in memory only)        │    │    │
//! │  │  │      Derived via PBKDF2-SHA256 (100,000 rounds)         │    │    │
//! │  │  └─────────────────────────────────────────────────────────┘    │    │
//! │  │                          │ seals                                │    │
//! │  │                          ▼                                      │    │
//! │  │  ┌─────────────────────────────────────────────────────────┐    │    │
//! │  │  │        Account Keypair (RSA-2048, e = 65537)            │    │    │
//! │  │  │   public half: SPKI, shared    private half: PKCS#8,    │    │    │
//! │  │  │   with every correspondent     sealed at rest           │    │    │
//! │  │  └─────────────────────────────────────────────────────────┘    │    │
//! │  │            │ opened per capability                              │    │
//! │  │            ▼                                                    │    │
//! │  │  ┌─────────────────┐         ┌─────────────────┐                │    │
//! │  │  │ SigningKeyHandle│         │DecryptionKey-   │                │    │
//! │  │  │                 │         │Handle           │                │    │
//! │  │  │ • PKCS#1 v1.5   │         │ • RSA-OAEP      │                │    │
//! │  │  │ • sign only     │         │ • decrypt only  │                │    │
//! │  │  └─────────────────┘         └─────────────────┘                │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 MESSAGE ENCRYPTION SCHEME                       │    │
//! │  ├─────────────────────────────────────────────────────────────────┤    │
//! │  │                                                                 │    │
//! │  │  Hybrid per-message encryption                                  │    │
//! │  │  ─────────────────────────────                                  │    │
//! │  │                                                                 │    │
//! │  │  1. Fresh random message key (AES-256, one per message)         │    │
//! │  │                                                                 │    │
//! │  │  2. Body: AES-256-GCM                                           │    │
//! │  │     • 256-bit key                                               │    │
//! │  │     • 96-bit nonce (random per message)                         │    │
//! │  │     • 128-bit authentication tag                                │    │
//! │  │                                                                 │    │
//! │  │  3. Key wrapping, twice:                                        │    │
//! │  │     • recipient copy: RSA-OAEP(recipient public key)            │    │
//! │  │     • relay copy: AES-256-GCM under a challenge-derived key     │    │
//! │  │       (SHA-256 → HMAC keyed by signature → HKDF-SHA256)         │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Notes |
//! |-----------|---------|-------|
//! | RSA-2048 / OAEP-SHA256 | Message key wrapping | Randomized padding |
//! | RSA-2048 / PKCS#1 v1.5-SHA256 | Challenge signatures | Deterministic |
//! | AES-256-GCM | Body + key sealing | AEAD, tamper-evident |
//! | PBKDF2-HMAC-SHA256 | Password key derivation | 100,000 round floor |
//! | HKDF-SHA256 | Server wrapping key | Domain-separated label |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: All symmetric key material is zeroized when dropped
//! 2. **Secure Random**: `rand::rngs::OsRng` for keys, salts, nonces, challenges
//! 3. **No Nonce Reuse**: Every encryption draws a fresh random nonce
//! 4. **No Decryption Oracle**: Every authenticated-decryption failure maps to
//!    the same cause-free [`Error::DecryptionFailed`](crate::Error::DecryptionFailed)

mod keys;
mod encryption;
mod signing;
mod kdf;

pub use keys::{
    export_public_key_der, import_public_key, open_private_key_for_messaging,
    open_private_key_for_signing, seal_private_key, DecryptionKeyHandle, KeyPair, KeyUsage,
    PrivateKeyHandle, SealedPrivateKey, SigningKeyHandle, RSA_MODULUS_BITS,
};
pub use encryption::{
    decrypt_body, encrypt_body, unwrap_key, wrap_key_for_recipient, MessageKey, Nonce,
    NONCE_SIZE, TAG_SIZE,
};
pub use signing::{sign, verify, Signature};
pub use kdf::{
    derive_password_key, derive_password_key_with_iterations, derive_server_wrapping_key,
    generate_password_salt, rederive_server_wrapping_key, PasswordKey, WrappingKey,
    PASSWORD_SALT_SIZE, PBKDF2_ITERATIONS, WRAP_SALT_SIZE,
};

pub(crate) use encryption::{aead_encrypt, aead_open};

/// Size of symmetric keys in bytes (256 bits)
pub const SYMMETRIC_KEY_SIZE: usize = 32;
