//! # Messaging Module
//!
//! The send and receive pipeline: one envelope per message, readable by the
//! intended recipient and, for exactly one challenge, by the relay.
//!
//! ## Send Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SEND PIPELINE                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Sender (Alice)                                                         │
//! │  ──────────────                                                         │
//! │                                                                         │
//! │  Input: "Hello Bob!"                                                    │
//! │                                                                         │
//! │  1. Build challenge                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  {"nonce": random_32_bytes_b64, "messageId": N}             │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  2. Sign the exact challenge bytes                                      │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  RSA_sign(alice_signing_key, challenge_string)              │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  3. Derive the relay wrapping key                                       │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  HKDF(HMAC(signature, SHA-256(challenge_string)), salt)     │        │
//! │  │  → wrapping_key (usable for this challenge only)            │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  4. Generate a fresh message key                                        │
//! │                                                                         │
//! │  5. Encrypt the body                                                    │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  AES-256-GCM(message_key, iv, "Hello Bob!")                 │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  6. Wrap the message key for the relay                                  │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  AES-256-GCM(wrapping_key, wrap_iv, message_key)            │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  7. Wrap the message key for the recipient                              │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  RSA-OAEP(bob_public_key, message_key)                      │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  8. Output: MessageEnvelope                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any step failing aborts the whole send; no partial envelope is returned.
//! A retry starts over from step 1 so that every key, IV, and nonce is fresh.
//!
//! ## Receive Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RECEIVE PIPELINE                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Recipient (Bob)                                                        │
//! │  ───────────────                                                        │
//! │                                                                         │
//! │  Input: MessageEnvelope from Alice                                      │
//! │                                                                         │
//! │  1. Unwrap the message key                                              │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  RSA-OAEP_decrypt(bob_private_key, wrappedKeyClient)        │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  2. Decrypt the body                                                    │
//! │  ┌─────────────────────────────────────────────────────────────┐        │
//! │  │  AES-256-GCM_decrypt(message_key, iv, ciphertext)           │        │
//! │  │  → "Hello Bob!"                                             │        │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │  The relay's path is the mirror image: verify the signature over        │
//! │  challengeString, re-derive the wrapping key from it plus salt, and     │
//! │  open wrappedKeyServer. Neither copy helps with the other.              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Protocol
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE ENVELOPE FORMAT                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  MessageEnvelope (JSON serialized)                                      │
//! │  ─────────────────────────────────                                      │
//! │  {                                                                      │
//! │    "ciphertext":       "base64...",  // AES-GCM encrypted body          │
//! │    "iv":               "base64...",  // 12-byte body nonce              │
//! │    "wrappedKeyServer": "base64...",  // message key, AES-wrapped        │
//! │    "wrappedKeyClient": "base64...",  // message key, RSA-OAEP-wrapped   │
//! │    "challengeString":  "{...}",      // canonical challenge JSON        │
//! │    "signature":        "base64...",  // RSA signature over challenge    │
//! │    "salt":             "base64...",  // 32-byte HKDF salt               │
//! │    "wrapIv":           "base64..."   // 12-byte key-wrap nonce          │
//! │  }                                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::{
    aead_encrypt, aead_open, decrypt_body, derive_server_wrapping_key, encrypt_body, sign,
    unwrap_key, wrap_key_for_recipient, DecryptionKeyHandle, MessageKey, Nonce,
    SigningKeyHandle, WrappingKey, SYMMETRIC_KEY_SIZE,
};
use crate::error::{Error, Result};

/// Size of the random challenge nonce in bytes
pub const CHALLENGE_NONCE_SIZE: usize = 32;

/// A single-use value the sender signs to authorize one send
///
/// The relay derives its wrapping key from the signature over this
/// challenge, so the signature doubles as proof that the account holder
/// authorized exactly this message.
///
/// Field order is the wire order. The signature binds the exact serialized
/// bytes, so serialization must be deterministic; reordering or reformatting
/// the JSON invalidates the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// Base64 32-byte random nonce
    pub nonce: String,
    /// Caller-assigned message identifier, carried opaquely
    pub message_id: u64,
}

impl Challenge {
    /// The canonical JSON form, which is what gets signed
    pub fn challenge_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Build a challenge with a fresh random nonce
pub fn build_challenge(message_id: u64) -> Challenge {
    let mut nonce = [0u8; CHALLENGE_NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    Challenge {
        nonce: BASE64.encode(nonce),
        message_id,
    }
}

/// Encrypted message envelope for wire transmission
///
/// This is what gets handed to the transport layer. It is self-contained:
/// the recipient needs only their private key, and the relay needs only the
/// sender's public key, to process it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// Encrypted message body (base64)
    pub ciphertext: String,
    /// AES-GCM nonce for the body (base64, 12 bytes)
    pub iv: String,
    /// Message key wrapped under the challenge-derived relay key (base64)
    pub wrapped_key_server: String,
    /// Message key wrapped under the recipient's public key (base64)
    pub wrapped_key_client: String,
    /// Canonical challenge JSON, carried verbatim
    pub challenge_string: String,
    /// RSA signature over `challenge_string` (base64)
    pub signature: String,
    /// HKDF salt for the relay wrapping key (base64, 32 bytes)
    pub salt: String,
    /// AES-GCM nonce for the relay key wrap (base64, 12 bytes)
    pub wrap_iv: String,
}

impl MessageEnvelope {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::MalformedInput(format!("Invalid envelope JSON: {}", e)))
    }
}

/// Wrap a message key under a challenge-derived relay key
///
/// Uses a fresh nonce, distinct from the message body IV. The returned pair
/// becomes the envelope's `wrapIv` and `wrappedKeyServer` fields.
pub fn wrap_key_for_server(
    key: &MessageKey,
    wrapping_key: &WrappingKey,
) -> Result<(Nonce, Vec<u8>)> {
    aead_encrypt(wrapping_key.as_bytes(), key.as_bytes())
}

/// Unwrap a relay-wrapped message key
///
/// The relay side of [`wrap_key_for_server`]: whoever re-derived the
/// wrapping key from the challenge and its signature can recover the
/// message key. Anyone else gets [`Error::DecryptionFailed`].
pub fn unwrap_key_for_server(
    wrapped: &[u8],
    wrap_iv: &Nonce,
    wrapping_key: &WrappingKey,
) -> Result<MessageKey> {
    let mut recovered = aead_open(wrapping_key.as_bytes(), wrap_iv, wrapped)?;

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

/// Encrypt a message and produce its wire envelope
///
/// Runs the full pipeline: challenge, signature, relay key derivation, body
/// encryption, and both key wraps. Every cryptographic value is fresh; two
/// sends of the same plaintext to the same recipient share nothing.
pub fn send(
    plaintext: &str,
    recipient: &RsaPublicKey,
    signing: &SigningKeyHandle,
    message_id: u64,
) -> Result<MessageEnvelope> {
    // The signature over the challenge is what lets the relay re-derive the
    // wrapping key, so the challenge comes first.
    let challenge = build_challenge(message_id);
    let challenge_string = challenge.challenge_string()?;
    let signature = sign(challenge_string.as_bytes(), signing)?;

    let (wrapping_key, salt) = derive_server_wrapping_key(&challenge_string, &signature)?;

    let message_key = MessageKey::generate()?;
    let (iv, ciphertext) = encrypt_body(&message_key, plaintext)?;

    let (wrap_iv, wrapped_key_server) = wrap_key_for_server(&message_key, &wrapping_key)?;
    let wrapped_key_client = wrap_key_for_recipient(&message_key, recipient)?;

    tracing::debug!("Sealed message {} into a transport envelope", message_id);

    Ok(MessageEnvelope {
        ciphertext: BASE64.encode(&ciphertext),
        iv: BASE64.encode(iv.as_bytes()),
        wrapped_key_server: BASE64.encode(&wrapped_key_server),
        wrapped_key_client: BASE64.encode(&wrapped_key_client),
        challenge_string,
        signature: signature.to_base64(),
        salt: BASE64.encode(salt),
        wrap_iv: BASE64.encode(wrap_iv.as_bytes()),
    })
}

/// Decrypt a received envelope
///
/// Unwraps the recipient copy of the message key and decrypts the body.
/// The relay has already validated the challenge signature before
/// forwarding; a recipient who wants to check it anyway can call
/// [`verify`](crate::crypto::verify) against `challenge_string` directly.
pub fn receive(envelope: &MessageEnvelope, handle: &DecryptionKeyHandle) -> Result<String> {
    let wrapped = BASE64
        .decode(envelope.wrapped_key_client.as_bytes())
        .map_err(|e| Error::MalformedInput(format!("Invalid wrappedKeyClient base64: {}", e)))?;

    let message_key = unwrap_key(&wrapped, handle)?;

    let iv_bytes = BASE64
        .decode(envelope.iv.as_bytes())
        .map_err(|e| Error::MalformedInput(format!("Invalid iv base64: {}", e)))?;
    let iv = Nonce::from_slice(&iv_bytes)?;

    let ciphertext = BASE64
        .decode(envelope.ciphertext.as_bytes())
        .map_err(|e| Error::MalformedInput(format!("Invalid ciphertext base64: {}", e)))?;

    let plaintext = decrypt_body(&message_key, &iv, &ciphertext)?;

    tracing::debug!("Opened received message body");

    Ok(plaintext)
}

// ============================================================================
// TESTS
// ============================================================================
