//! Benchmarks for pipeline assembly.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use deployflow::pipeline::ExecutionPlan;
use deployflow::prelude::*;
use deployflow::testing::{container_config, managed_config, validated_config};

fn assemble(config: &PipelineConfig) -> PipelineDefinition {
    let mut assembler = PipelineAssembler::new(
        "bench-pipeline",
        DeclarativeProvider::new(),
        NetworkDeployStage::default(),
    );
    match assembler.assemble(config) {
        Ok(definition) => definition,
        Err(err) => panic!("bench config failed to assemble: {err}"),
    }
}

fn assembly_benchmark(c: &mut Criterion) {
    let synth = managed_config("svc");
    let container = container_config("svc");
    let validated = validated_config("svc", &["a@x.com", "b@x.com"]);

    c.bench_function("assemble_synth", |b| {
        b.iter(|| black_box(assemble(black_box(&synth))));
    });

    c.bench_function("assemble_container", |b| {
        b.iter(|| black_box(assemble(black_box(&container))));
    });

    c.bench_function("assemble_validated", |b| {
        b.iter(|| black_box(assemble(black_box(&validated))));
    });

    let definition = assemble(&validated);
    c.bench_function("fingerprint", |b| {
        b.iter(|| black_box(definition.fingerprint()));
    });

    c.bench_function("execution_plan", |b| {
        b.iter(|| black_box(ExecutionPlan::from_definition(black_box(&definition))));
    });
}

criterion_group!(benches, assembly_benchmark);
criterion_main!(benches);
