//! Benchmarks for genome variation, compilation and population evaluation.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

use push_synth::{
    gp::{
        FnEvaluator, GeneSpawner, Individual, KnowledgeArchive, Population, VariationContext,
        VariationStrategy,
    },
    push::{Genome, InstructionSet, Program, ProgramSignature},
    schema::{AlgorithmConfig, GenomeSizePolicy, ReplacementScope, SpawnerConfig},
};

fn spawner() -> GeneSpawner {
    let config = SpawnerConfig {
        n_inputs: 2,
        ..Default::default()
    };
    GeneSpawner::new(&config, &InstructionSet::core()).expect("default spawner is valid")
}

fn bench_produce_child(c: &mut Criterion) {
    let mut group = c.benchmark_group("produce_child");
    let spawner = spawner();
    let mut rng = StdRng::seed_from_u64(42);
    let archive = KnowledgeArchive::random(&spawner, 100, (10, 50), &mut rng);

    let strategies = [
        AlgorithmConfig::Umad {
            addition_rate: 0.09,
            deletion_rate: 0.0826,
        },
        AlgorithmConfig::Umadr {
            addition_rate: 0.09,
            deletion_rate: 0.0826,
            replacement_rate: 0.1,
            replacement_scope: ReplacementScope::Gene,
        },
    ];

    for config in strategies {
        let strategy = VariationStrategy::from_config(&config).expect("rates are valid");
        for length in [50, 200, 1000] {
            let parent = spawner.spawn_genome(length, &mut rng);
            let ctx = VariationContext {
                archive: Some(&archive),
            };
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), length),
                &length,
                |b, _| {
                    b.iter(|| {
                        strategy
                            .produce_child(
                                black_box(std::slice::from_ref(&parent)),
                                &spawner,
                                &mut rng,
                                &ctx,
                                None,
                                GenomeSizePolicy::Truncate,
                            )
                            .expect("variation succeeds")
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let spawner = spawner();
    let mut rng = StdRng::seed_from_u64(7);
    let signature = Arc::new(ProgramSignature::new(2, &["int"]));

    for length in [50, 200, 1000] {
        let genome: Genome = spawner.spawn_genome(length, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, _| {
            b.iter(|| Program::compile(black_box(&genome), Arc::clone(&signature)));
        });
    }

    group.finish();
}

fn bench_population_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("population_evaluate");
    let spawner = spawner();
    let mut rng = StdRng::seed_from_u64(3);
    let signature = Arc::new(ProgramSignature::new(2, &["int"]));
    let evaluator = FnEvaluator::new(10, |program: &Program| {
        let size = program.size() as f64;
        Ok((0..10).map(|case| (size - case as f64).abs()).collect())
    });

    for size in [100, 500, 1000] {
        let genomes: Vec<Genome> = (0..size)
            .map(|_| spawner.spawn_genome((10, 50), &mut rng))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut population = Population::from_individuals(
                    genomes
                        .iter()
                        .map(|g| Individual::new(g.clone(), Arc::clone(&signature))),
                );
                population.evaluate(&evaluator).expect("evaluation succeeds");
                black_box(population.best().map(|i| i.total_error()).ok())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_produce_child,
    bench_compile,
    bench_population_evaluate
);
criterion_main!(benches);
