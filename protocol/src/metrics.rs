//! # Prometheus Metrics
//!
//! Optional operational counters for a [`VerificationSystem`]. They live in
//! a dedicated [`prometheus::Registry`] (prefixed `mandate_`) so an
//! embedding service can merge or expose them however it likes.
//!
//! [`VerificationSystem`]: crate::consensus::VerificationSystem

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

/// Consensus metric handles. Cloning shares the underlying counters.
#[derive(Clone)]
pub struct ConsensusMetrics {
    registry: Registry,
    /// Consensus calls that produced a tally (valid or not).
    pub verifications_total: IntCounter,
    pub verifications_successful: IntCounter,
    /// Invalid tallies plus orchestration failures.
    pub verifications_failed: IntCounter,
    /// Individual agent checks that hit the timeout.
    pub agent_timeouts_total: IntCounter,
    pub verification_latency_seconds: Histogram,
}

impl ConsensusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("mandate".into()), None)?;

        let verifications_total = IntCounter::new(
            "consensus_verifications_total",
            "Total number of consensus verification calls",
        )?;
        registry.register(Box::new(verifications_total.clone()))?;

        let verifications_successful = IntCounter::new(
            "consensus_verifications_successful_total",
            "Consensus calls that ended with a valid verdict",
        )?;
        registry.register(Box::new(verifications_successful.clone()))?;

        let verifications_failed = IntCounter::new(
            "consensus_verifications_failed_total",
            "Consensus calls that ended invalid or failed to orchestrate",
        )?;
        registry.register(Box::new(verifications_failed.clone()))?;

        let agent_timeouts_total = IntCounter::new(
            "consensus_agent_timeouts_total",
            "Agent checks that exceeded the configured timeout",
        )?;
        registry.register(Box::new(agent_timeouts_total.clone()))?;

        let verification_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "consensus_verification_latency_seconds",
                "Wall-clock latency of a consensus verification call",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
            ]),
        )?;
        registry.register(Box::new(verification_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            verifications_total,
            verifications_successful,
            verifications_failed,
            agent_timeouts_total,
            verification_latency_seconds,
        })
    }

    pub(crate) fn observe(&self, is_valid: bool, timeouts: u64, latency_secs: f64) {
        self.verifications_total.inc();
        if is_valid {
            self.verifications_successful.inc();
        } else {
            self.verifications_failed.inc();
        }
        self.agent_timeouts_total.inc_by(timeouts);
        self.verification_latency_seconds.observe(latency_secs);
    }

    pub(crate) fn observe_failure(&self, latency_secs: f64) {
        self.observe(false, 0, latency_secs);
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
