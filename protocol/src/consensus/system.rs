//! # Verification System
//!
//! Runs one claim `(signature, message, public_key)` past every registered
//! agent and tallies the votes against a threshold.
//!
//! ## Round
//!
//! 1. **Precondition**: the pool holds at least `min_agents` voters, checked
//!    before any cryptographic work.
//! 2. **Collect**: each agent check runs as its own tokio task, raced
//!    against `timeout_ms`. Parallel mode spawns all of them and waits for
//!    all of them (no early exit on a decided outcome). Sequential mode runs
//!    them one at a time in registration order.
//! 3. **Tally**: `consensus_percentage = votes_for / total`. Consensus is
//!    reached when the percentage meets the threshold, and the claim is
//!    valid only if consensus is reached *and* votes for outnumber votes
//!    against. Ties reject.
//!
//! An agent that times out votes `false`. An agent task that panics aborts
//! the round with a `CONSENSUS_ERROR` after the failure is counted.
//!
//! ## Pool
//!
//! Agents live in a fixed-capacity arena sized to `max_agents` at
//! construction. An agent's [`AgentIndex`] is its slot and never changes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::agent::{AgentIndex, AgentStats, SignatureVerifier, VerificationAgent, VerificationRequest};
use crate::config::{DEFAULT_AGENT_TIMEOUT_MS, DEFAULT_CONSENSUS_THRESHOLD, DEFAULT_MAX_AGENTS, DEFAULT_MIN_AGENTS};
use crate::crypto::keys::{AgentPublicKey, AgentSignature};
use crate::error::ErrorCode;
use crate::identity::AgentIdentity;
use crate::mandate::{Mandate, MandateError};
use crate::metrics::ConsensusMetrics;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("invalid consensus configuration: {0}")]
    Configuration(String),

    /// Raised at call time, before any agent runs.
    #[error("insufficient agents: have {have}, need at least {need}")]
    InsufficientAgents { have: usize, need: usize },

    /// Raised by the builder when asked to build an undersized pool.
    #[error("cannot build verification system: {registered} agents registered, minimum is {min_agents}")]
    PoolBelowMinimum { registered: usize, min_agents: usize },

    #[error("agent pool is full (max {max})")]
    PoolFull { max: usize },

    #[error("consensus orchestration failed: {0}")]
    Orchestration(String),

    #[error(transparent)]
    Mandate(#[from] MandateError),
}

impl ConsensusError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::ConfigurationError,
            Self::InsufficientAgents { .. } | Self::Orchestration(_) => ErrorCode::ConsensusError,
            Self::PoolBelowMinimum { .. } => ErrorCode::InsufficientAgents,
            Self::PoolFull { .. } => ErrorCode::SystemError,
            Self::Mandate(e) => e.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Fraction of agents that must vote for a claim, in (0, 1].
    pub consensus_threshold: f64,
    pub min_agents: usize,
    /// Arena capacity.
    pub max_agents: usize,
    /// Per-agent check timeout. 0 disables the timeout.
    pub timeout_ms: u64,
    /// Run agent checks concurrently (true) or in registration order.
    pub parallel: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            consensus_threshold: DEFAULT_CONSENSUS_THRESHOLD,
            min_agents: DEFAULT_MIN_AGENTS,
            max_agents: DEFAULT_MAX_AGENTS,
            timeout_ms: DEFAULT_AGENT_TIMEOUT_MS,
            parallel: true,
        }
    }
}

impl ConsensusConfig {
    pub fn validate(&self) -> Result<(), ConsensusError> {
        let t = self.consensus_threshold;
        if !t.is_finite() || t <= 0.0 || t > 1.0 {
            return Err(ConsensusError::Configuration(format!(
                "consensus_threshold must be in (0, 1], got {}",
                t
            )));
        }
        if self.min_agents == 0 {
            return Err(ConsensusError::Configuration("min_agents must be at least 1".into()));
        }
        if self.max_agents < self.min_agents {
            return Err(ConsensusError::Configuration(format!(
                "max_agents ({}) must be >= min_agents ({})",
                self.max_agents, self.min_agents
            )));
        }
        Ok(())
    }

    fn agent_timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One agent's vote in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVote {
    pub agent_id: String,
    pub agent_index: AgentIndex,
    pub vote: bool,
    pub timed_out: bool,
    pub timestamp: DateTime<Utc>,
    pub latency_ms: f64,
}

/// Outcome of one consensus call. Returned to the caller, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub is_valid: bool,
    pub consensus_reached: bool,
    pub consensus_percentage: f64,
    pub threshold: f64,
    pub votes_for: usize,
    pub votes_against: usize,
    pub total_agents: usize,
    /// In registration order.
    pub votes: Vec<AgentVote>,
    pub total_latency_ms: f64,
    pub avg_latency_ms: f64,
    pub timestamp: DateTime<Utc>,
}

/// Cumulative counters across every call on one system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub total_verifications: u64,
    pub successful_verifications: u64,
    pub failed_verifications: u64,
    /// Running mean of per-call wall-clock latency.
    pub average_latency_ms: f64,
}

impl SystemMetrics {
    fn record(&mut self, is_valid: bool, latency_ms: f64) {
        self.total_verifications += 1;
        if is_valid {
            self.successful_verifications += 1;
        } else {
            self.failed_verifications += 1;
        }
        let n = self.total_verifications as f64;
        self.average_latency_ms += (latency_ms - self.average_latency_ms) / n;
    }
}

struct AgentOutcome {
    vote: bool,
    timed_out: bool,
    latency: Duration,
    timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// VerificationSystem
// ---------------------------------------------------------------------------

pub struct VerificationSystem {
    config: ConsensusConfig,
    agents: Vec<Arc<dyn SignatureVerifier>>,
    stats: Vec<AgentStats>,
    metrics: SystemMetrics,
    prometheus: Option<ConsensusMetrics>,
}

impl VerificationSystem {
    pub fn new(config: ConsensusConfig) -> Result<Self, ConsensusError> {
        config.validate()?;
        info!(
            threshold = config.consensus_threshold,
            min_agents = config.min_agents,
            max_agents = config.max_agents,
            timeout_ms = config.timeout_ms,
            parallel = config.parallel,
            "verification system created"
        );
        Ok(Self {
            agents: Vec::with_capacity(config.max_agents),
            stats: Vec::with_capacity(config.max_agents),
            config,
            metrics: SystemMetrics::default(),
            prometheus: None,
        })
    }

    /// Also report every call to the given Prometheus handles.
    pub fn with_metrics(mut self, metrics: ConsensusMetrics) -> Self {
        self.prometheus = Some(metrics);
        self
    }

    /// Register an honest agent backed by `identity`.
    pub fn add_agent(&mut self, identity: AgentIdentity) -> Result<AgentIndex, ConsensusError> {
        self.add_verifier(Arc::new(VerificationAgent::new(identity)))
    }

    /// Register any voter.
    pub fn add_verifier(&mut self, verifier: Arc<dyn SignatureVerifier>) -> Result<AgentIndex, ConsensusError> {
        if self.agents.len() >= self.config.max_agents {
            return Err(ConsensusError::PoolFull {
                max: self.config.max_agents,
            });
        }
        let index = AgentIndex(self.agents.len());
        debug!(agent_id = verifier.agent_id(), index = %index, "agent registered");
        self.agents.push(verifier);
        self.stats.push(AgentStats::default());
        Ok(index)
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn metrics(&self) -> &SystemMetrics {
        &self.metrics
    }

    pub fn agent_stats(&self, index: AgentIndex) -> Option<&AgentStats> {
        self.stats.get(index.0)
    }

    pub fn agent_id(&self, index: AgentIndex) -> Option<&str> {
        self.agents.get(index.0).map(|a| a.agent_id())
    }

    /// Ask every agent whether `signature` is a valid signature of `message`
    /// under `public_key`, and tally the answers.
    pub async fn verify_with_consensus(
        &mut self,
        signature: &AgentSignature,
        message: &[u8],
        public_key: &AgentPublicKey,
    ) -> Result<VerificationResult, ConsensusError> {
        if self.agents.len() < self.config.min_agents {
            warn!(
                have = self.agents.len(),
                need = self.config.min_agents,
                "consensus refused: insufficient agents"
            );
            return Err(ConsensusError::InsufficientAgents {
                have: self.agents.len(),
                need: self.config.min_agents,
            });
        }

        let started = Instant::now();
        let request = Arc::new(VerificationRequest {
            signature: signature.clone(),
            message: message.to_vec(),
            public_key: public_key.clone(),
        });
        debug!(agents = self.agents.len(), parallel = self.config.parallel, "consensus round started");

        let checks = self.collect(&request).await;
        let mut outcomes = Vec::with_capacity(checks.len());
        let mut failure = None;
        for (i, check) in checks.into_iter().enumerate() {
            match check {
                Ok(outcome) => {
                    self.stats[i].record(outcome.vote, outcome.timed_out, as_millis_f64(outcome.latency));
                    outcomes.push(outcome);
                }
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        if let Some(e) = failure {
            let elapsed_ms = as_millis_f64(started.elapsed());
            self.metrics.record(false, elapsed_ms);
            if let Some(m) = &self.prometheus {
                m.observe_failure(elapsed_ms / 1000.0);
            }
            warn!(error = %e, completed = outcomes.len(), "consensus round aborted");
            return Err(e);
        }

        let total_agents = outcomes.len();
        let mut votes = Vec::with_capacity(total_agents);
        let mut latency_sum_ms = 0.0;
        let mut timeouts = 0u64;
        for (i, outcome) in outcomes.into_iter().enumerate() {
            let latency_ms = as_millis_f64(outcome.latency);
            latency_sum_ms += latency_ms;
            if outcome.timed_out {
                timeouts += 1;
            }
            votes.push(AgentVote {
                agent_id: self.agents[i].agent_id().to_string(),
                agent_index: AgentIndex(i),
                vote: outcome.vote,
                timed_out: outcome.timed_out,
                timestamp: outcome.timestamp,
                latency_ms,
            });
        }

        let votes_for = votes.iter().filter(|v| v.vote).count();
        let votes_against = total_agents - votes_for;
        let consensus_percentage = votes_for as f64 / total_agents as f64;
        let consensus_reached = consensus_percentage >= self.config.consensus_threshold;
        let is_valid = consensus_reached && votes_for > votes_against;

        let total_latency_ms = as_millis_f64(started.elapsed());
        self.metrics.record(is_valid, total_latency_ms);
        if let Some(m) = &self.prometheus {
            m.observe(is_valid, timeouts, total_latency_ms / 1000.0);
        }

        info!(
            is_valid,
            consensus_reached,
            votes_for,
            votes_against,
            percentage = consensus_percentage,
            latency_ms = total_latency_ms,
            "consensus round finished"
        );

        Ok(VerificationResult {
            is_valid,
            consensus_reached,
            consensus_percentage,
            threshold: self.config.consensus_threshold,
            votes_for,
            votes_against,
            total_agents,
            votes,
            total_latency_ms,
            avg_latency_ms: latency_sum_ms / total_agents as f64,
            timestamp: Utc::now(),
        })
    }

    /// Run consensus over a signed mandate's canonical bytes.
    ///
    /// A missing or malformed stored signature, or a recorded signer that is
    /// not the DID of `public_key`, is a `VALIDATION_FAILED` error raised
    /// before any agent runs.
    pub async fn verify_mandate(
        &mut self,
        mandate: &dyn Mandate,
        public_key: &AgentPublicKey,
    ) -> Result<VerificationResult, ConsensusError> {
        let signature = mandate.signature_for(public_key)?;
        let message = mandate.canonical_bytes();
        debug!(kind = %mandate.kind(), mandate_id = mandate.id(), "verifying mandate by consensus");
        self.verify_with_consensus(&signature, &message, public_key).await
    }

    /// One entry per agent that was run, in registration order. Sequential
    /// mode stops after the first failed task.
    async fn collect(&self, request: &Arc<VerificationRequest>) -> Vec<Result<AgentOutcome, ConsensusError>> {
        let timeout = self.config.agent_timeout();

        if self.config.parallel {
            let handles: Vec<_> = self
                .agents
                .iter()
                .map(|agent| spawn_check(Arc::clone(agent), Arc::clone(request), timeout))
                .collect();
            join_all(handles)
                .await
                .into_iter()
                .enumerate()
                .map(|(i, r)| r.map_err(|e| orchestration_error(i, e)))
                .collect()
        } else {
            let mut checks = Vec::with_capacity(self.agents.len());
            for (i, agent) in self.agents.iter().enumerate() {
                let check = spawn_check(Arc::clone(agent), Arc::clone(request), timeout)
                    .await
                    .map_err(|e| orchestration_error(i, e));
                let failed = check.is_err();
                checks.push(check);
                if failed {
                    break;
                }
            }
            checks
        }
    }
}

fn spawn_check(
    agent: Arc<dyn SignatureVerifier>,
    request: Arc<VerificationRequest>,
    timeout: Option<Duration>,
) -> JoinHandle<AgentOutcome> {
    tokio::spawn(async move {
        let timestamp = Utc::now();
        let started = Instant::now();
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, agent.verify(&request)).await {
                Ok(vote) => AgentOutcome {
                    vote,
                    timed_out: false,
                    latency: started.elapsed(),
                    timestamp,
                },
                Err(_) => {
                    warn!(agent_id = agent.agent_id(), timeout_ms = limit.as_millis() as u64, "agent timed out");
                    AgentOutcome {
                        vote: false,
                        timed_out: true,
                        latency: limit,
                        timestamp,
                    }
                }
            },
            None => {
                let vote = agent.verify(&request).await;
                AgentOutcome {
                    vote,
                    timed_out: false,
                    latency: started.elapsed(),
                    timestamp,
                }
            }
        }
    })
}

fn orchestration_error(index: usize, err: tokio::task::JoinError) -> ConsensusError {
    let cause = if err.is_panic() { "panicked" } else { "was cancelled" };
    ConsensusError::Orchestration(format!("agent task #{} {}", index, cause))
}

fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
