//! # Error Handling
//!
//! This module provides the error types for Velum Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                      │
//! │  │                                                                      │
//! │  ├── Input & Encoding Errors                                            │
//! │  │   └── MalformedInput        - Bad base64/PEM/JSON or wrong length    │
//! │  │                                                                      │
//! │  ├── Key Management Errors                                              │
//! │  │   ├── KeyGenerationFailed   - RSA keypair generation failed          │
//! │  │   ├── KeyEncodingFailed     - PKCS#8 / SPKI export or import failed  │
//! │  │   ├── KeyDerivationFailed   - PBKDF2 / HKDF derivation failed        │
//! │  │   └── UnsupportedKeyUsage   - Handle used for the wrong capability   │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                      │
//! │  │   ├── EncryptionFailed      - AEAD or RSA-OAEP encryption failed     │
//! │  │   ├── DecryptionFailed      - Authenticated decryption failed        │
//! │  │   └── SigningFailed         - RSA signing failed                     │
//! │  │                                                                      │
//! │  └── Internal Errors                                                    │
//! │      └── SerializationError    - JSON encoding failed                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decryption failures carry no cause
//!
//! [`Error::DecryptionFailed`] is a unit variant with a fixed message. A wrong
//! password, a wrong key, and a tampered ciphertext all produce the exact same
//! error, so a caller (or an attacker driving the caller) cannot tell the
//! cases apart. UIs surface it as "wrong password or corrupted data".
//!
//! Signature verification is not an error path at all: [`verify`] returns
//! `bool`, and a well-formed-but-wrong signature is simply `false`.
//!
//! [`verify`]: crate::crypto::verify

use thiserror::Error;

use crate::crypto::KeyUsage;

/// Result type alias for Velum Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Velum Core
///
/// All errors are categorized by domain to make error handling clearer and
/// to provide meaningful error messages to callers. Messages never contain
/// key material, passwords, or plaintext.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Input & Encoding Errors (100-199)
    // ========================================================================

    /// Input that should be base64, PEM, JSON, or a fixed-length field
    /// could not be decoded
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    // ========================================================================
    // Key Management Errors (200-299)
    // ========================================================================

    /// RSA keypair generation failed
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// PKCS#8 or SPKI encoding/decoding of a key failed
    #[error("Key encoding failed: {0}")]
    KeyEncodingFailed(String),

    /// Key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    /// A private key handle was used for a capability it was not opened for
    #[error("Unsupported key usage: handle opened for {actual} cannot be used for {expected}")]
    UnsupportedKeyUsage {
        /// The capability the operation required
        expected: KeyUsage,
        /// The capability the handle was opened with
        actual: KeyUsage,
    },

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Authenticated decryption failed
    ///
    /// Fixed message, no cause. Wrong password, wrong key, and tampered
    /// ciphertext are indistinguishable through this variant.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Input & encoding
    /// - 200-299: Key management
    /// - 300-399: Crypto
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Input & encoding (100-199)
            Error::MalformedInput(_) => 100,

            // Key management (200-299)
            Error::KeyGenerationFailed(_) => 200,
            Error::KeyEncodingFailed(_) => 201,
            Error::KeyDerivationFailed(_) => 202,
            Error::UnsupportedKeyUsage { .. } => 203,

            // Crypto (300-399)
            Error::EncryptionFailed(_) => 300,
            Error::DecryptionFailed => 301,
            Error::SigningFailed(_) => 302,

            // Internal (900-999)
            Error::SerializationError(_) => 900,
        }
    }

    /// Check if this error requires user action
    ///
    /// [`Error::DecryptionFailed`] is the re-enter-your-password case; the
    /// rest indicate bad data or caller bugs that retyping cannot fix.
    pub fn requires_user_action(&self) -> bool {
        matches!(self, Error::DecryptionFailed)
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::MalformedInput("test".into()).code(), 100);
        assert_eq!(Error::KeyGenerationFailed("test".into()).code(), 200);
        assert_eq!(Error::EncryptionFailed("test".into()).code(), 300);
        assert_eq!(Error::DecryptionFailed.code(), 301);
        assert_eq!(Error::SerializationError("test".into()).code(), 900);
    }

    #[test]
    fn test_decryption_failed_is_cause_free() {
        // The display string is fixed; nothing about the failure leaks.
        assert_eq!(Error::DecryptionFailed.to_string(), "Decryption failed");
        assert!(Error::DecryptionFailed.requires_user_action());
    }

    #[test]
    fn test_usage_mismatch_message() {
        let err = Error::UnsupportedKeyUsage {
            expected: KeyUsage::Signing,
            actual: KeyUsage::Messaging,
        };
        assert_eq!(err.code(), 203);
        assert!(err.to_string().contains("signing"));
        assert!(err.to_string().contains("messaging"));
        assert!(!err.requires_user_action());
    }
}
