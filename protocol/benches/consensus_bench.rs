// Consensus verification benchmarks for the mandate protocol.
//
// Covers a full consensus round at several pool sizes in both parallel and
// sequential mode, and mandate verification through the pool.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use mandate_protocol::consensus::{ConsensusConfig, VerificationSystem};
use mandate_protocol::identity::AgentIdentity;
use mandate_protocol::mandate::{IntentMandate, Mandate};

/// Builds a pool of `n` honest agents.
fn setup_pool(n: usize, parallel: bool) -> VerificationSystem {
    let config = ConsensusConfig {
        min_agents: 1,
        max_agents: n,
        parallel,
        ..ConsensusConfig::default()
    };
    let mut system = VerificationSystem::new(config).unwrap();
    for _ in 0..n {
        system.add_agent(AgentIdentity::generate().unwrap()).unwrap();
    }
    system
}

fn bench_consensus_round(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let signer = AgentIdentity::generate().unwrap();
    let message = b"mandate:payment:p-42".to_vec();
    let signature = signer.sign(&message).unwrap();
    let public_key = signer.public_key();

    for (label, parallel) in [("parallel", true), ("sequential", false)] {
        let mut group = c.benchmark_group(format!("consensus/round_{}", label));

        for agents in [3usize, 5, 10, 21] {
            group.throughput(Throughput::Elements(agents as u64));
            group.bench_with_input(BenchmarkId::from_parameter(agents), &agents, |b, &n| {
                let mut system = setup_pool(n, parallel);
                b.iter(|| {
                    rt.block_on(system.verify_with_consensus(&signature, &message, &public_key))
                        .unwrap()
                });
            });
        }

        group.finish();
    }
}

fn bench_verify_mandate(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let holder = AgentIdentity::generate().unwrap();
    let mut intent = IntentMandate::new("cust-1", "merchant-1", "groceries", 25_000, "USD");
    intent.sign(&holder).unwrap();
    let public_key = holder.public_key();
    let mut system = setup_pool(5, true);

    c.bench_function("consensus/verify_mandate_5_agents", |b| {
        b.iter(|| rt.block_on(system.verify_mandate(&intent, &public_key)).unwrap());
    });
}

criterion_group!(benches, bench_consensus_round, bench_verify_mandate);
criterion_main!(benches);
