//! End-to-end integration tests for the mandate protocol.
//!
//! These tests drive the public API the way an agent runtime would: create
//! identities, issue and sign mandates, verify them through a consensus pool,
//! consult revocations, authorize, then fold the executor's response back
//! into the payment lifecycle. Each test builds its own pool and store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use mandate_protocol::authorization::ExecutionGuard;
use mandate_protocol::consensus::{
    ConsensusError, SignatureVerifier, VerificationRequest, VerificationSystem, VerificationSystemBuilder,
};
use mandate_protocol::error::{ErrorCode, ProtocolError};
use mandate_protocol::identity::{is_did_key, AgentIdentity};
use mandate_protocol::mandate::{
    CartItem, CartMandate, IntentMandate, Mandate, PaymentMandate, PaymentResponse, PaymentStatus,
};
use mandate_protocol::revocation::RevocationStore;
use mandate_protocol::rfc9421::{HttpMessageSigner, HttpMessageVerifier, RequestComponents};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Always votes `false`.
struct Saboteur;

#[async_trait]
impl SignatureVerifier for Saboteur {
    fn agent_id(&self) -> &str {
        "saboteur"
    }
    async fn verify(&self, _: &VerificationRequest) -> bool {
        false
    }
}

fn honest_pool(n: usize) -> VerificationSystem {
    (0..n)
        .fold(VerificationSystemBuilder::new(), |b, _| {
            b.agent(AgentIdentity::generate().expect("keygen"))
        })
        .build()
        .expect("pool")
}

// ---------------------------------------------------------------------------
// Full flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn intent_cart_payment_flow_is_authorized_and_settled() {
    let holder = AgentIdentity::generate().unwrap();
    assert!(is_did_key(holder.did()));

    let mut intent = IntentMandate::new("cust-7", "shoe-shop", "running shoes under 150", 15_000, "USD");
    intent.sign(&holder).unwrap();
    assert!(intent.validate().is_valid());

    let mut cart = CartMandate::new(
        "cust-7",
        "shoe-shop",
        vec![
            CartItem::new("SHOE-42", "trail runner", 1, 12_000),
            CartItem::new("SOCK-3P", "socks 3-pack", 1, 1_500),
        ],
        "USD",
    );
    cart.sign(&holder).unwrap();
    assert_eq!(cart.total(), 13_500);
    assert!(cart.validate().is_valid());

    let mut payment =
        PaymentMandate::new("cust-7", "card:tok_visa", "shoe-shop", cart.total(), "USD").with_cart(cart.id.clone());
    payment.sign(&holder).unwrap();

    let mut pool = honest_pool(5);
    let result = pool.verify_mandate(&payment, &holder.public_key()).await.unwrap();
    assert!(result.is_valid);
    assert_eq!(result.votes.len(), 5);

    let store = Arc::new(RevocationStore::new());
    let guard = ExecutionGuard::new(Arc::clone(&store));
    let auth = guard.authorize_within_intent(&payment, &intent, &result).unwrap();
    assert_eq!(auth.amount, 13_500);

    let at = Utc.timestamp_millis_opt(1_900_000_000_000).unwrap();
    for status in [PaymentStatus::Submitted, PaymentStatus::Captured] {
        payment
            .apply_response(&PaymentResponse {
                transaction_id: "tx-001".into(),
                status,
                amount: 13_500,
                currency: "USD".into(),
                timestamp: at,
            })
            .unwrap();
    }
    assert!(payment.is_complete());
    assert_eq!(payment.processed_at(), Some(at));
    // Lifecycle fields are unsigned; the holder's signature still stands.
    assert!(payment.verify(&holder));
}

#[tokio::test]
async fn mandate_survives_json_transport_and_still_verifies_by_consensus() {
    let holder = AgentIdentity::generate().unwrap();
    let mut cart = CartMandate::new("c", "m", vec![CartItem::new("A", "apple", 4, 25)], "EUR");
    cart.sign(&holder).unwrap();

    let wire = cart.to_json().unwrap();
    let received = CartMandate::from_json(&wire).unwrap();

    let mut pool = honest_pool(3);
    let result = pool.verify_mandate(&received, &holder.public_key()).await.unwrap();
    assert!(result.is_valid);
}

// ---------------------------------------------------------------------------
// Canonical encoding
// ---------------------------------------------------------------------------

#[test]
fn intent_canonical_bytes_match_documented_layout() {
    let expires = Utc.timestamp_millis_opt(1_750_000_000_123).unwrap();
    let intent = IntentMandate {
        id: "i-1".into(),
        customer: "alice".into(),
        merchant: "bob".into(),
        description: "tea".into(),
        max_amount: 500,
        currency: "GBP".into(),
        expires_at: expires,
        proof: None,
    };

    fn chunk(out: &mut Vec<u8>, bytes: &[u8]) {
        out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(bytes);
    }

    let mut expected = Vec::new();
    chunk(&mut expected, b"ap2.mandate.intent.v1");
    chunk(&mut expected, b"id");
    chunk(&mut expected, b"i-1");
    chunk(&mut expected, b"customer");
    chunk(&mut expected, b"alice");
    chunk(&mut expected, b"merchant");
    chunk(&mut expected, b"bob");
    chunk(&mut expected, b"description");
    chunk(&mut expected, b"tea");
    chunk(&mut expected, b"max_amount");
    chunk(&mut expected, &500u64.to_le_bytes());
    chunk(&mut expected, b"currency");
    chunk(&mut expected, b"GBP");
    chunk(&mut expected, b"expires_at");
    let mut expires_value = 1_750_000_000i64.to_le_bytes().to_vec();
    expires_value.extend_from_slice(&123_000_000u32.to_le_bytes());
    chunk(&mut expected, &expires_value);

    assert_eq!(intent.canonical_bytes(), expected);
}

#[test]
fn identical_mandates_sign_identically() {
    let holder = AgentIdentity::from_secret_bytes(&[42u8; 32]).unwrap();
    let expires = Utc.timestamp_millis_opt(1_750_000_000_000).unwrap();
    let make = || {
        let mut p = PaymentMandate::new("h", "s", "m", 10, "USD").with_expiry(expires);
        p.id = "fixed-id".into();
        p
    };
    let (mut a, mut b) = (make(), make());
    a.sign(&holder).unwrap();
    b.sign(&holder).unwrap();
    assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    assert_eq!(a.proof, b.proof);
}

// ---------------------------------------------------------------------------
// Byzantine behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_saboteur_in_four_cannot_block_a_valid_mandate() {
    let holder = AgentIdentity::generate().unwrap();
    let mut intent = IntentMandate::new("c", "m", "d", 100, "USD");
    intent.sign(&holder).unwrap();

    let mut pool = VerificationSystemBuilder::new()
        .agent(AgentIdentity::generate().unwrap())
        .agent(AgentIdentity::generate().unwrap())
        .agent(AgentIdentity::generate().unwrap())
        .verifier(Arc::new(Saboteur))
        .build()
        .unwrap();

    let result = pool.verify_mandate(&intent, &holder.public_key()).await.unwrap();
    assert_eq!(result.votes_for, 3);
    assert_eq!(result.votes[3].agent_id, "saboteur");
    assert!(result.is_valid);
}

#[tokio::test]
async fn one_saboteur_in_three_blocks_at_default_threshold() {
    let holder = AgentIdentity::generate().unwrap();
    let mut intent = IntentMandate::new("c", "m", "d", 100, "USD");
    intent.sign(&holder).unwrap();

    let mut pool = VerificationSystemBuilder::new()
        .agent(AgentIdentity::generate().unwrap())
        .agent(AgentIdentity::generate().unwrap())
        .verifier(Arc::new(Saboteur))
        .build()
        .unwrap();

    let result = pool.verify_mandate(&intent, &holder.public_key()).await.unwrap();
    assert!(!result.consensus_reached);
    assert!(!result.is_valid);
}

#[test]
fn undersized_builder_reports_insufficient_agents() {
    let err = VerificationSystemBuilder::new()
        .agent(AgentIdentity::generate().unwrap())
        .build()
        .err()
        .unwrap();
    let err: ProtocolError = err.into();
    assert_eq!(err.code(), ErrorCode::InsufficientAgents);
}

#[tokio::test]
async fn unsigned_mandate_is_refused_before_voting() {
    let holder = AgentIdentity::generate().unwrap();
    let payment = PaymentMandate::new("h", "s", "m", 10, "USD");
    let mut pool = honest_pool(3);

    let err = pool.verify_mandate(&payment, &holder.public_key()).await.unwrap_err();
    assert!(matches!(err, ConsensusError::Mandate(_)));
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
    assert_eq!(pool.metrics().total_verifications, 0);
}

#[tokio::test]
async fn relabelled_signer_is_refused_before_voting() {
    let holder = AgentIdentity::generate().unwrap();
    let impostor = AgentIdentity::generate().unwrap();
    let mut intent = IntentMandate::new("c", "m", "d", 100, "USD");
    intent.sign(&holder).unwrap();
    intent.proof.as_mut().unwrap().signer = impostor.did().to_string();

    let mut pool = honest_pool(3);
    let err = pool.verify_mandate(&intent, &holder.public_key()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
    assert_eq!(pool.metrics().total_verifications, 0);
}

// ---------------------------------------------------------------------------
// Revocation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn revocation_overrides_a_valid_consensus_result() {
    let holder = AgentIdentity::generate().unwrap();
    let mut payment = PaymentMandate::new("h", "s", "m", 10, "USD");
    payment.sign(&holder).unwrap();

    let mut pool = honest_pool(3);
    let result = pool.verify_mandate(&payment, &holder.public_key()).await.unwrap();
    assert!(result.is_valid);

    let store = Arc::new(RevocationStore::new());
    store.revoke(&payment.id, "holder request");
    store.revoke(&payment.id, "holder request, confirmed");

    let guard = ExecutionGuard::new(Arc::clone(&store));
    let err = guard.authorize(&payment, &result).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidMandate);
    assert_eq!(store.get(&payment.id).unwrap().reason, "holder request, confirmed");
}

// ---------------------------------------------------------------------------
// HTTP message signing
// ---------------------------------------------------------------------------

#[test]
fn agent_request_signature_respects_replay_window() {
    let agent = AgentIdentity::generate().unwrap();
    let pk = agent.public_key();
    let signer = HttpMessageSigner::new(agent, "agent-key-1");
    let verifier = HttpMessageVerifier::default();
    let body = br#"{"mandate_id":"p-1"}"#;
    let request = || RequestComponents::new("POST", "pay.example", "/v1/payments").with_body(body);

    let created = 1_800_000_000;
    let signed = signer.sign_at(&request(), created).unwrap();

    assert!(verifier.verify_at(&request(), &signed, &pk, created + 299));
    assert!(!verifier.verify_at(&request(), &signed, &pk, created + 301));

    let tampered = RequestComponents::new("POST", "pay.example", "/v1/payments").with_body(b"{}");
    assert!(!verifier.verify_at(&tampered, &signed, &pk, created));
}
