//! Toy UMAD/UMADR runs against a structural target.
//!
//! There is no Push interpreter in this crate, so the evaluator scores the
//! compiled program's top-level code directly: one case per target position,
//! plus one case for any excess length.
//!
//! Run with `RUST_LOG=info cargo run --release --example umad_demo`.

use std::sync::Arc;
use std::time::Instant;

use push_synth::{
    gp::{FnEvaluator, GeneSpawner, SearchAlgorithm},
    push::{Code, InstructionSet, Literal, Program, ProgramSignature},
    schema::{
        AlgorithmConfig, ArchiveConfig, Epsilon, Parallelism, ReplacementScope, SearchConfig,
        SelectionConfig, SelectionMethod, SpawnerConfig,
    },
};

const TARGET: [&str; 5] = ["int_add", "int_mult", "int_dup", "int_swap", "int_sub"];

fn score(program: &Program) -> Vec<f64> {
    let atoms = program.code.atoms();
    let mut errors: Vec<f64> = TARGET
        .iter()
        .enumerate()
        .map(|(i, name)| match atoms.get(i) {
            Some(Code::Instruction(instr)) if instr.name == *name => 0.0,
            _ => 1.0,
        })
        .collect();
    errors.push(atoms.len().saturating_sub(TARGET.len()) as f64);
    errors
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let instructions = InstructionSet::core();
    let spawner_config = SpawnerConfig {
        n_inputs: 1,
        stacks: vec!["int".into()],
        literals: vec![Literal::Int(0), Literal::Int(1)],
        ..Default::default()
    };
    let evaluator = Arc::new(FnEvaluator::new(TARGET.len() + 1, |p: &Program| {
        Ok(score(p))
    }));

    let algorithms = [
        AlgorithmConfig::default(),
        AlgorithmConfig::Umadr {
            addition_rate: 0.09,
            deletion_rate: 0.0826,
            replacement_rate: 0.1,
            replacement_scope: ReplacementScope::Gene,
        },
    ];

    for algorithm in algorithms {
        let config = SearchConfig {
            population_size: 200,
            max_generations: 60,
            initial_genome_size: (5, 20),
            max_genome_size: Some(40),
            algorithm,
            selection: SelectionConfig::Named(SelectionMethod::Lexicase {
                epsilon: Epsilon::None,
            }),
            archive: ArchiveConfig::Random {
                genome_set_size: 50,
                genome_length: (5, 10),
                spawner: None,
            },
            parallelism: Parallelism::Pool { workers: None },
            random_seed: Some(42),
            ..Default::default()
        };

        let spawner = GeneSpawner::new(&spawner_config, &instructions)?;
        let mut search = SearchAlgorithm::new(
            config,
            ProgramSignature::new(1, &["int"]),
            spawner,
            &instructions,
            evaluator.clone(),
        )?;

        let start = Instant::now();
        let best = search.run_with_callback(|report| {
            if report.generation % 10 == 0 {
                println!(
                    "  gen {:3}: best {:.1}, median {:.1}, mean length {:.1}",
                    report.generation,
                    report.best_total_error,
                    report.median_error,
                    report.mean_genome_length
                );
            }
        })?;

        println!("=== {} ===", search.strategy().name());
        println!("  Termination:  {:?}", search.termination());
        println!("  Generations:  {}", search.generation());
        println!("  Elapsed:      {:.2}s", start.elapsed().as_secs_f64());
        println!("  Best error:   {:?}", best.total_error());
        println!("  Best genome:  {}", best.genome());
        println!("  Program:      {}", best.program());
        println!();
    }

    Ok(())
}
