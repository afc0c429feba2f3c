//! # Send/Receive Demo
//!
//! Walks a message from Alice through the relay to Bob, showing both key
//! wraps: the recipient copy only Bob can open, and the relay copy that
//! works for exactly this one envelope.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example send_receive_demo
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use velum_core::crypto::{decrypt_body, rederive_server_wrapping_key, verify, Nonce, Signature};
use velum_core::messaging::unwrap_key_for_server;
use velum_core::{receive, send, KeyBundle};

fn main() {
    println!("=== Velum Core: Send/Receive Demo ===\n");

    // Step 1: Two accounts
    println!("Step 1: Creating accounts for Alice and Bob...");

    let (alice_bundle, alice_keys) =
        KeyBundle::create("alice-password").expect("Failed to create Alice's bundle");
    let (bob_bundle, _bob_keys) =
        KeyBundle::create("bob-password").expect("Failed to create Bob's bundle");

    println!("  Alice's public key: {}...", &alice_bundle.public_key[..24]);
    println!("  Bob's public key:   {}...", &bob_bundle.public_key[..24]);
    println!();

    // Step 2: The envelope's two locks
    println!("Step 2: How one message key gets two wrappings...");
    println!();
    println!("  ┌─────────────────────────────────────────────────────────────┐");
    println!("  │                 THE ENVELOPE'S TWO LOCKS                    │");
    println!("  ├─────────────────────────────────────────────────────────────┤");
    println!("  │                                                             │");
    println!("  │              ┌──────────────────┐                           │");
    println!("  │              │   message key    │ (fresh, one message)      │");
    println!("  │              └────────┬─────────┘                           │");
    println!("  │            ┌──────────┴──────────┐                          │");
    println!("  │            ▼                     ▼                          │");
    println!("  │  ┌───────────────────┐ ┌───────────────────────┐            │");
    println!("  │  │ wrappedKeyClient  │ │ wrappedKeyServer      │            │");
    println!("  │  │                   │ │                       │            │");
    println!("  │  │ RSA-OAEP under    │ │ AES-GCM under a key   │            │");
    println!("  │  │ Bob's public key  │ │ derived from Alice's  │            │");
    println!("  │  │                   │ │ challenge signature   │            │");
    println!("  │  └───────────────────┘ └───────────────────────┘            │");
    println!("  │                                                             │");
    println!("  │  Neither copy opens the other. The relay copy dies with     │");
    println!("  │  its challenge; Bob's copy needs Bob's private key.         │");
    println!("  │                                                             │");
    println!("  └─────────────────────────────────────────────────────────────┘");
    println!();

    // Step 3: Alice sends
    println!("Step 3: Alice encrypts a message for Bob...");

    let plaintext = "Hello Bob! Meet me at the usual place.";
    let signing = alice_keys.signing_handle();
    let bob_public = bob_bundle.public_key().expect("Failed to parse Bob's key");

    let envelope = send(plaintext, &bob_public, &signing, 1).expect("Send failed");

    println!("  Plaintext: \"{}\"", plaintext);
    println!("  Challenge: {}", envelope.challenge_string);
    println!("  Ciphertext: {}...", &envelope.ciphertext[..24]);
    println!("  Client copy: {}...", &envelope.wrapped_key_client[..24]);
    println!("  Server copy: {}...", &envelope.wrapped_key_server[..24]);
    println!();

    // Step 4: The relay's view
    println!("Step 4: The relay validates and unwraps its copy...");

    let signature =
        Signature::from_base64(&envelope.signature).expect("Failed to parse signature");
    let alice_public = alice_bundle
        .public_key()
        .expect("Failed to parse Alice's key");

    println!(
        "  Signature bytes: {}...",
        hex::encode(&signature.as_bytes()[..8])
    );

    if verify(envelope.challenge_string.as_bytes(), &signature, &alice_public) {
        println!("  [OK] Alice authorized this exact challenge!");
    } else {
        println!("  [FAILED] Challenge signature did not verify!");
        return;
    }

    let salt = BASE64
        .decode(envelope.salt.as_bytes())
        .expect("Failed to decode salt");
    let wrapping_key =
        rederive_server_wrapping_key(&envelope.challenge_string, &signature, &salt)
            .expect("Failed to re-derive wrapping key");

    let wrapped = BASE64
        .decode(envelope.wrapped_key_server.as_bytes())
        .expect("Failed to decode server copy");
    let wrap_iv = Nonce::from_slice(
        &BASE64
            .decode(envelope.wrap_iv.as_bytes())
            .expect("Failed to decode wrap IV"),
    )
    .expect("Bad wrap IV");

    let message_key = unwrap_key_for_server(&wrapped, &wrap_iv, &wrapping_key)
        .expect("Relay failed to unwrap its copy");

    let iv = Nonce::from_slice(&BASE64.decode(envelope.iv.as_bytes()).expect("Bad IV"))
        .expect("Bad IV");
    let body = BASE64
        .decode(envelope.ciphertext.as_bytes())
        .expect("Bad ciphertext");
    let relay_view = decrypt_body(&message_key, &iv, &body).expect("Relay decrypt failed");

    println!("  [OK] Relay recovered the message key for this envelope!");
    println!("  Relay's view of the body: \"{}\"", relay_view);
    println!();

    // Step 5: The relay key is scoped to one challenge
    println!("Step 5: That wrapping key is useless elsewhere...");

    let second = send("A different message.", &bob_public, &signing, 2).expect("Send failed");
    let second_wrapped = BASE64
        .decode(second.wrapped_key_server.as_bytes())
        .expect("Failed to decode server copy");
    let second_iv = Nonce::from_slice(
        &BASE64
            .decode(second.wrap_iv.as_bytes())
            .expect("Failed to decode wrap IV"),
    )
    .expect("Bad wrap IV");

    match unwrap_key_for_server(&second_wrapped, &second_iv, &wrapping_key) {
        Ok(_) => println!("  [FAILED] Old wrapping key opened a new envelope!"),
        Err(_) => println!("  [OK] The first envelope's key does not open the second!"),
    }
    println!();

    // Step 6: Bob receives
    println!("Step 6: Bob unlocks his key and reads the message...");

    let messaging = bob_bundle
        .unlock_for_messaging("bob-password")
        .expect("Failed to unlock Bob's key");
    let received = receive(&envelope, &messaging).expect("Receive failed");

    println!("  Decrypted: \"{}\"", received);
    if received == plaintext {
        println!("  [OK] Bob got exactly what Alice sent!");
    } else {
        println!("  [FAILED] Plaintext mismatch!");
    }
    println!();

    // Step 7: Tamper detection
    println!("Step 7: Tamper detection (AEAD integrity)...");

    let mut body = BASE64
        .decode(envelope.ciphertext.as_bytes())
        .expect("Bad ciphertext");
    body[0] ^= 0xFF;
    let mut tampered = envelope.clone();
    tampered.ciphertext = BASE64.encode(body);

    match receive(&tampered, &messaging) {
        Ok(_) => println!("  [FAILED] Tampered envelope was accepted!"),
        Err(e) => println!("  [OK] Tampered envelope rejected: {}", e),
    }

    println!();
    println!("=== Example Complete ===");
}
