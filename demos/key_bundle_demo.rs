//! # Key Bundle Demo
//!
//! Demonstrates the account key lifecycle: create a bundle at signup,
//! unlock it at login, and see what happens with the wrong password.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example key_bundle_demo
//! ```

use velum_core::crypto::{sign, verify, PrivateKeyHandle};
use velum_core::KeyBundle;

fn main() {
    println!("=== Velum Core: Account Key Bundle Demo ===\n");

    // Step 1: Signup
    println!("Step 1: Creating an account key bundle...");

    let password = "correct horse battery staple";
    let (bundle, _keypair) =
        KeyBundle::create(password).expect("Failed to create key bundle");

    println!("  Password: \"{}\"", password);
    println!("  Public key (base64, first 32 chars): {}...", &bundle.public_key[..32]);
    println!(
        "  Sealed private key: {} base64 chars",
        bundle.encrypted_private_key.len()
    );
    println!("  Salt: {}", bundle.salt);
    println!("  IV: {}", bundle.iv);
    println!();

    // Step 2: The wire form
    println!("Step 2: The bundle as stored/uploaded (JSON)...");
    println!();
    println!("  ┌─────────────────────────────────────────────────────────────┐");
    println!("  │  Everything here is safe to hand to the server: without     │");
    println!("  │  the password, the sealed private key is just noise.        │");
    println!("  └─────────────────────────────────────────────────────────────┘");
    println!();

    let json = bundle.to_json().expect("Failed to serialize bundle");
    println!("  {} bytes of JSON", json.len());
    println!();

    // Step 3: Login on a new device
    println!("Step 3: Unlocking the bundle (login)...");

    let restored = KeyBundle::from_json(&json).expect("Failed to parse bundle");
    let signing = restored
        .unlock_for_signing(password)
        .expect("Failed to unlock for signing");

    let payload = b"prove it's really me";
    let signature = sign(payload, &signing).expect("Signing failed");
    let public = restored.public_key().expect("Failed to parse public key");

    if verify(payload, &signature, &public) {
        println!("  [OK] Unlocked signing key produces valid signatures!");
    } else {
        println!("  [FAILED] Signature did not verify!");
    }
    println!();

    // Step 4: Wrong password
    println!("Step 4: Trying the wrong password...");

    match restored.unlock_for_signing("correct horse battery stable") {
        Ok(_) => println!("  [FAILED] Wrong password was accepted!"),
        Err(e) => {
            println!("  [OK] Rejected: {} (code {})", e, e.code());
            println!("  Note: the error says nothing about WHY. Wrong password");
            println!("  and tampered record are deliberately indistinguishable.");
        }
    }
    println!();

    // Step 5: Capability split
    println!("Step 5: Capability-split handles...");

    let messaging = restored
        .unlock_for_messaging(password)
        .expect("Failed to unlock for messaging");

    let handle = PrivateKeyHandle::from(messaging);
    println!("  Opened a {} handle", handle.usage());

    match handle.as_signing() {
        Ok(_) => println!("  [FAILED] Messaging handle was accepted for signing!"),
        Err(e) => println!("  [OK] Rejected for signing: {}", e),
    }

    println!();
    println!("=== Example Complete ===");
}
