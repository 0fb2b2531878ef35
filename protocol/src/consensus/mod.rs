//! # Byzantine Consensus Verification
//!
//! A single Ed25519 check is only as trustworthy as the process running it.
//! This module asks several independent agents to run the identical check
//! and accepts a claim only when a threshold fraction of them agree, so a
//! minority of faulty, slow or lying agents cannot flip the outcome.
//!
//! 1. **Agents** ([`agent`]) — the voters and their statistics.
//! 2. **System** ([`system`]) — the pool, the round and the tally.
//! 3. **Builder** ([`builder`]) — validated construction.

pub mod agent;
pub mod builder;
pub mod system;

pub use agent::{AgentIndex, AgentStats, SignatureVerifier, VerificationAgent, VerificationRequest};
pub use builder::VerificationSystemBuilder;
pub use system::{AgentVote, ConsensusConfig, ConsensusError, SystemMetrics, VerificationResult, VerificationSystem};
