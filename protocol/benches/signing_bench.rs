// Signing & verification benchmarks for the mandate protocol.
//
// Covers identity generation, raw Ed25519 sign/verify, mandate canonical
// encoding and signing at several cart sizes, and RFC 9421 request signing.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use mandate_protocol::identity::AgentIdentity;
use mandate_protocol::mandate::{CartItem, CartMandate, IntentMandate, Mandate};
use mandate_protocol::rfc9421::{HttpMessageSigner, HttpMessageVerifier, RequestComponents};

fn bench_identity_generation(c: &mut Criterion) {
    c.bench_function("identity/generate", |b| {
        b.iter(|| AgentIdentity::generate().unwrap());
    });
}

fn bench_sign_message(c: &mut Criterion) {
    let identity = AgentIdentity::generate().unwrap();
    let message = b"pay 4200 USD to merchant-1; mandate=p-42";

    c.bench_function("ed25519/sign_message", |b| {
        b.iter(|| identity.sign(message).unwrap());
    });
}

fn bench_verify_signature(c: &mut Criterion) {
    let identity = AgentIdentity::generate().unwrap();
    let message = b"pay 4200 USD to merchant-1; mandate=p-42";
    let signature = identity.sign(message).unwrap();
    let public_key = identity.public_key();

    c.bench_function("ed25519/verify_signature", |b| {
        b.iter(|| AgentIdentity::verify(&signature, message, &public_key));
    });
}

fn bench_sign_intent(c: &mut Criterion) {
    let identity = AgentIdentity::generate().unwrap();

    c.bench_function("mandate/sign_intent", |b| {
        b.iter(|| {
            let mut intent = IntentMandate::new("cust-1", "merchant-1", "weekly groceries", 25_000, "USD");
            intent.sign(&identity).unwrap();
        });
    });
}

fn bench_cart_canonical_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("mandate/cart_canonical_bytes");

    for size in [1, 10, 100, 1_000] {
        let items = (0..size)
            .map(|i| CartItem::new(format!("SKU-{:05}", i), "item", 1 + i % 5, 199))
            .collect();
        let cart = CartMandate::new("cust-1", "merchant-1", items, "USD");

        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &cart, |b, cart| {
            b.iter(|| cart.canonical_bytes());
        });
    }

    group.finish();
}

fn bench_http_signature(c: &mut Criterion) {
    let identity = AgentIdentity::generate().unwrap();
    let public_key = identity.public_key();
    let signer = HttpMessageSigner::from_identity(identity);
    let verifier = HttpMessageVerifier::default();
    let request = RequestComponents::new("POST", "merchant.example", "/checkout")
        .with_body(br#"{"cart":"c-1","amount":4200}"#)
        .header("x-agent-session", "s-1");

    c.bench_function("rfc9421/sign", |b| {
        b.iter(|| signer.sign(&request).unwrap());
    });

    let signed = signer.sign(&request).unwrap();
    c.bench_function("rfc9421/verify", |b| {
        b.iter(|| verifier.verify(&request, &signed, &public_key));
    });
}

criterion_group!(
    benches,
    bench_identity_generation,
    bench_sign_message,
    bench_verify_signature,
    bench_sign_intent,
    bench_cart_canonical_bytes,
    bench_http_signature,
);
criterion_main!(benches);
