//! Fluent construction of a [`VerificationSystem`].
//!
//! Unlike [`VerificationSystem::new`], the builder refuses to hand out a
//! system that could not run a round: `build()` fails when fewer than
//! `min_agents` voters were registered.

use std::sync::Arc;

use super::agent::SignatureVerifier;
use super::system::{ConsensusConfig, ConsensusError, VerificationSystem};
use crate::identity::AgentIdentity;
use crate::metrics::ConsensusMetrics;

enum PendingAgent {
    Identity(AgentIdentity),
    Verifier(Arc<dyn SignatureVerifier>),
}

/// Builder for [`VerificationSystem`]. Starts from `ConsensusConfig::default()`.
#[derive(Default)]
pub struct VerificationSystemBuilder {
    config: ConsensusConfig,
    agents: Vec<PendingAgent>,
    metrics: Option<ConsensusMetrics>,
}

impl VerificationSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ConsensusConfig) -> Self {
        self.config = config;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.consensus_threshold = threshold;
        self
    }

    pub fn min_agents(mut self, min_agents: usize) -> Self {
        self.config.min_agents = min_agents;
        self
    }

    pub fn max_agents(mut self, max_agents: usize) -> Self {
        self.config.max_agents = max_agents;
        self
    }

    /// Per-agent timeout in milliseconds; 0 disables it.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn agent(mut self, identity: AgentIdentity) -> Self {
        self.agents.push(PendingAgent::Identity(identity));
        self
    }

    pub fn verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.agents.push(PendingAgent::Verifier(verifier));
        self
    }

    pub fn metrics(mut self, metrics: ConsensusMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<VerificationSystem, ConsensusError> {
        self.config.validate()?;

        let registered = self.agents.len();
        if registered < self.config.min_agents {
            return Err(ConsensusError::PoolBelowMinimum {
                registered,
                min_agents: self.config.min_agents,
            });
        }
        if registered > self.config.max_agents {
            return Err(ConsensusError::PoolFull {
                max: self.config.max_agents,
            });
        }

        let mut system = VerificationSystem::new(self.config)?;
        if let Some(metrics) = self.metrics {
            system = system.with_metrics(metrics);
        }
        for pending in self.agents {
            match pending {
                PendingAgent::Identity(identity) => system.add_agent(identity)?,
                PendingAgent::Verifier(verifier) => system.add_verifier(verifier)?,
            };
        }
        Ok(system)
    }
}
