//! Benchmarks for the hot admission-check path.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use admission_gate::config::SchedulerConfig;
use admission_gate::core::{
    AdmissionController, CandidateJob, CategorySet, CredentialKind, JobConsumption, PartitionId,
    PolicyDimension, ResourceVector, SchedulerState,
};

const P0: PartitionId = PartitionId::GLOBAL;

fn build_controller() -> AdmissionController {
    let mut state = SchedulerState::new();
    let gpu = state.catalog.register("gpu");

    for name in ["steve", "ann", "raj"] {
        let user = state
            .credentials
            .credential_mut(CredentialKind::User, name)
            .expect("user kind");
        user.limits.active.set_hard_limit(PolicyDimension::MaxJob, P0, 64);
        user.limits.active.set_hard_limit(PolicyDimension::MaxProc, P0, 512);
        user.limits.active.set_usage(PolicyDimension::MaxJob, P0, 8);
        user.limits.active.set_usage(PolicyDimension::MaxProc, P0, 64);
        user.limits.active.gres_entry_mut("gpu", P0).hard = Some(16);
    }

    let account = state
        .credentials
        .credential_mut(CredentialKind::Account, "eng")
        .expect("account kind");
    account
        .limits
        .active
        .set_hard_limit(PolicyDimension::MaxPs, P0, 1 << 30);

    let root = state.fairshare.add_node("root", None);
    let branch = state.fairshare.add_node("eng", Some(root));
    let leaf = state.fairshare.add_node("steve", Some(branch));
    state
        .fairshare
        .node_mut(branch)
        .expect("branch")
        .limits
        .active
        .set_hard_limit(PolicyDimension::MaxJob, P0, 1024);

    let _ = (gpu, leaf);
    AdmissionController::new(SchedulerConfig::default(), state)
}

fn build_job(controller: &AdmissionController) -> CandidateJob {
    let state = controller.state();
    let state = state.read();
    let gpu = state.catalog.lookup("gpu").expect("registered");

    let mut request = ResourceVector::fixed(2, 4096, 0, 0);
    request.gres.set_count(gpu, 1);
    let mut job = CandidateJob::new(
        "bench.job",
        JobConsumption::derive(&request, 4, 3600, 4, false),
    );
    job.credentials.user = Some("steve".into());
    job.credentials.account = Some("eng".into());
    job.fairshare
        .insert(P0, admission_gate::core::FairshareNodeId(2));
    job
}

fn bench_check_limits(c: &mut Criterion) {
    let controller = build_controller();
    let job = build_job(&controller);

    c.bench_function("check_limits_pass", |b| {
        b.iter(|| {
            let decision = controller.check_limits(
                black_box(&job),
                P0,
                CategorySet::ALL,
                1_000_000,
            );
            assert!(decision.is_ok());
            decision
        });
    });
}

fn bench_vector_arithmetic(c: &mut Criterion) {
    let cfg = ResourceVector::fixed(64, 262_144, 65_536, 1 << 20);
    let req = ResourceVector::fixed(2, 4096, 512, 1024);

    c.bench_function("vector_add_remove", |b| {
        b.iter(|| {
            let mut acc = ResourceVector::new();
            for _ in 0..64 {
                acc.add(black_box(&cfg), black_box(&req), 4, true);
            }
            for _ in 0..64 {
                acc.remove(black_box(&cfg), black_box(&req), 4, true);
            }
            acc
        });
    });

    c.bench_function("task_count", |b| {
        b.iter(|| ResourceVector::task_count(black_box(&cfg), 1, black_box(&req), 64));
    });
}

criterion_group!(benches, bench_check_limits, bench_vector_arithmetic);
criterion_main!(benches);
