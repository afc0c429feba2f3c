//! Benchmarks for the operations callers hit per login and per message.
//!
//! Password derivation and RSA keygen are meant to be slow; these numbers
//! exist to catch regressions, not to be minimized.

use criterion::{criterion_group, criterion_main, Criterion};
use velum_core::crypto::{derive_password_key, generate_password_salt, KeyPair};
use velum_core::{receive, send};

fn bench_password_derivation(c: &mut Criterion) {
    let salt = generate_password_salt();

    let mut group = c.benchmark_group("kdf");
    group.sample_size(20);
    group.bench_function("derive_password_key", |b| {
        b.iter(|| derive_password_key("correct horse battery staple", &salt).unwrap())
    });
    group.finish();
}

fn bench_keypair_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("keygen");
    group.sample_size(10);
    group.bench_function("rsa_2048", |b| b.iter(|| KeyPair::generate().unwrap()));
    group.finish();
}

fn bench_send(c: &mut Criterion) {
    let alice = KeyPair::generate().unwrap();
    let bob = KeyPair::generate().unwrap();
    let signing = alice.signing_handle();

    c.bench_function("send", |b| {
        b.iter(|| send("Hello Bob!", bob.public_key(), &signing, 1).unwrap())
    });
}

fn bench_receive(c: &mut Criterion) {
    let alice = KeyPair::generate().unwrap();
    let bob = KeyPair::generate().unwrap();
    let envelope = send("Hello Bob!", bob.public_key(), &alice.signing_handle(), 1).unwrap();
    let messaging = bob.messaging_handle();

    c.bench_function("receive", |b| b.iter(|| receive(&envelope, &messaging).unwrap()));
}

criterion_group!(
    benches,
    bench_password_derivation,
    bench_keypair_generation,
    bench_send,
    bench_receive
);
criterion_main!(benches);
