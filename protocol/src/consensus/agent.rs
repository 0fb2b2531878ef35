//! Verification agents: the voters of the consensus round.
//!
//! Any type implementing [`SignatureVerifier`] can vote. The honest
//! implementation is [`VerificationAgent`], which re-runs the Ed25519 check
//! with no shortcuts. Other implementations exist to model faulty or
//! adversarial voters; the system tolerates a minority of them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::keys::{AgentPublicKey, AgentSignature};
use crate::identity::AgentIdentity;

/// The claim every agent is asked to check.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub signature: AgentSignature,
    pub message: Vec<u8>,
    pub public_key: AgentPublicKey,
}

/// A voter. `verify` returns the agent's opinion on the claim; it cannot
/// fail, only vote `false`.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Stable identifier reported with each vote.
    fn agent_id(&self) -> &str;

    async fn verify(&self, request: &VerificationRequest) -> bool;
}

/// Stable position of an agent in the pool. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentIndex(pub usize);

impl fmt::Display for AgentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An honest verifier backed by its own identity. The identity names the
/// agent (its DID is the agent id); the check itself uses only the public
/// key in the request.
pub struct VerificationAgent {
    identity: AgentIdentity,
}

impl VerificationAgent {
    pub fn new(identity: AgentIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }
}

#[async_trait]
impl SignatureVerifier for VerificationAgent {
    fn agent_id(&self) -> &str {
        self.identity.did()
    }

    async fn verify(&self, request: &VerificationRequest) -> bool {
        AgentIdentity::verify(&request.signature, &request.message, &request.public_key)
    }
}

/// Cumulative per-agent counters, updated on every consensus call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub verifications: u64,
    pub votes_for: u64,
    pub votes_against: u64,
    pub timeouts: u64,
    pub total_latency_ms: f64,
    pub last_latency_ms: f64,
}

impl AgentStats {
    pub(crate) fn record(&mut self, vote: bool, timed_out: bool, latency_ms: f64) {
        self.verifications += 1;
        if vote {
            self.votes_for += 1;
        } else {
            self.votes_against += 1;
        }
        if timed_out {
            self.timeouts += 1;
        }
        self.total_latency_ms += latency_ms;
        self.last_latency_ms = latency_ms;
    }

    pub fn average_latency_ms(&self) -> f64 {
        if self.verifications == 0 {
            0.0
        } else {
            self.total_latency_ms / self.verifications as f64
        }
    }
}
