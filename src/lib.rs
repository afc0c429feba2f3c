//! # Velum Core
//!
//! The client-side cryptographic core for end-to-end encrypted messaging
//! through an untrusted relay.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VELUM CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────────────────┐   │
//! │  │      Identity        │        │            Messaging             │   │
//! │  │                      │        │                                  │   │
//! │  │ - Key bundle create  │        │ - Challenge build + sign         │   │
//! │  │ - Password unlock    │        │ - Relay wrapping key derivation  │   │
//! │  │ - Wire encoding      │        │ - send / receive pipeline        │   │
//! │  └──────────┬───────────┘        └────────────────┬─────────────────┘   │
//! │             │                                     │                     │
//! │             └──────────────────┬──────────────────┘                     │
//! │                                │                                        │
//! │  ┌─────────────────────────────┴────────────────────────────────────┐   │
//! │  │                           Crypto                                 │   │
//! │  │                                                                  │   │
//! │  │  - RSA-2048 keypairs, capability-split handles (sign / decrypt)  │   │
//! │  │  - AES-256-GCM body encryption, RSA-OAEP key wrapping            │   │
//! │  │  - PBKDF2 password keys, HKDF challenge-bound wrapping keys      │   │
//! │  │  - RSASSA-PKCS1-v1.5 signatures                                  │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Cryptographic primitives (key derivation, keys, encryption, signing)
//! - [`identity`] - Account key custody (bundle creation, password unlock)
//! - [`messaging`] - The send/receive pipeline and wire envelope
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Private Key Custody (PBKDF2 + AES-256-GCM)                    │
//! │  ────────────────────────────────────────────────────                   │
//! │  The account private key is stored only sealed under a password-        │
//! │  derived key. The sealed record is useless without the password,        │
//! │  so it can live on any server.                                          │
//! │                                                                         │
//! │  Layer 2: Message Confidentiality (AES-256-GCM + RSA-OAEP)              │
//! │  ──────────────────────────────────────────────────────────             │
//! │  Every message body is encrypted under a fresh one-message key;         │
//! │  only that short key crosses the asymmetric boundary, wrapped to        │
//! │  the recipient's public key.                                            │
//! │                                                                         │
//! │  Layer 3: Send Authorization (RSASSA-PKCS1-v1.5)                        │
//! │  ────────────────────────────────────────────────                       │
//! │  Each send signs a fresh random challenge, proving the account          │
//! │  holder authorized exactly this message.                                │
//! │                                                                         │
//! │  Layer 4: Scoped Relay Access (HMAC + HKDF)                             │
//! │  ──────────────────────────────────────────                             │
//! │  The relay's copy of the message key is wrapped under a key derived     │
//! │  from the challenge signature. It opens this one envelope and           │
//! │  nothing else; the relay never holds a long-lived secret.               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use velum_core::{receive, send, KeyBundle};
//!
//! // Signup: create and persist Alice's bundle, keep the live keypair.
//! let (bundle, keypair) = KeyBundle::create("correct horse battery staple")?;
//!
//! // Later, on any device: unlock from the bundle with the password.
//! let signing = bundle.unlock_for_signing("correct horse battery staple")?;
//!
//! // Send to Bob. The envelope is self-contained; hand it to transport.
//! let envelope = send("Hello Bob!", &bob_public_key, &signing, 1)?;
//!
//! // Bob's side.
//! let messaging = bob_bundle.unlock_for_messaging(bob_password)?;
//! let plaintext = receive(&envelope, &messaging)?;
//! ```
//!
//! The core is stateless: every function takes what it needs and returns
//! owned results. There is no global instance to initialize and no shared
//! mutable state, so concurrent sends and receives need no coordination.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod error;
pub mod identity;
pub mod messaging;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{
    DecryptionKeyHandle, KeyPair, MessageKey, SealedPrivateKey, Signature, SigningKeyHandle,
};
pub use error::{Error, Result};
pub use identity::KeyBundle;
pub use messaging::{build_challenge, receive, send, Challenge, MessageEnvelope};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Velum Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
