//! Cluster quality analysis tool
//!
//! Collects positions from seeded random games, projects each position's next-level
//! states onto `evaluation × probability`, and reports the average WCSS for every
//! cluster count from 2 to 10 together with the elbow of that curve.
//!
//! Usage:
//!   cargo run --release --bin analyze_clusters -- [positions] [config.toml]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::env;
use std::process;

use tactics_bot::config::Config;
use tactics_bot::evaluate::{sample_outcome, HeuristicEvaluator};
use tactics_bot::search::cluster::{average_wcss, suggest_clusters_amount, ClusterPoint};
use tactics_bot::search::reduction::{collect_expanded_states, remove_redundant_actions};
use tactics_bot::search::{ClusterSampler, ValueClustering};
use tactics_bot::skirmish::Skirmish;
use tactics_bot::types::Position;

const MIN_CLUSTERS: usize = 2;
const MAX_CLUSTERS: usize = 10;

fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "warn");
    }
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let positions: usize = match args.get(1).map(|s| s.parse()) {
        None => 50,
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            eprintln!("Usage: {} [positions] [config.toml]", args[0]);
            process::exit(1);
        }
    };
    let config = match args.get(2) {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        }),
        None => Config::load_or_default(),
    };
    let evaluator = match config.coefficients() {
        Ok(coefficients) => HeuristicEvaluator::new(coefficients),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let samples = sample_positions(positions, config.clustering.seed);
    let point_sets: Vec<Vec<ClusterPoint>> = samples
        .iter()
        .map(|position| {
            let mut actions = position.legal_actions();
            remove_redundant_actions(&mut actions);
            let states = collect_expanded_states(
                position,
                &actions,
                config.search.bad_branch_probability,
                config.search.renormalize_after_cutoff,
            );
            ClusterSampler::points(&states, &evaluator, position.current_mover())
        })
        .filter(|points| points.len() >= MIN_CLUSTERS)
        .collect();

    println!("\n═══════════════════════════════════════════════════════════");
    println!("        CLUSTER QUALITY ANALYSIS");
    println!("═══════════════════════════════════════════════════════════");
    println!("Positions sampled:   {}", samples.len());
    println!("Positions clustered: {}", point_sets.len());
    println!("═══════════════════════════════════════════════════════════\n");

    let clustering = ValueClustering::new(config.clustering.max_iterations, config.clustering.seed);
    let curve: Vec<(usize, f64)> = (MIN_CLUSTERS..=MAX_CLUSTERS)
        .map(|k| (k, average_wcss(&clustering, &point_sets, k)))
        .collect();

    println!("{:>8} {:>16}", "clusters", "average WCSS");
    for (k, wcss) in &curve {
        println!("{:>8} {:>16.3}", k, wcss);
    }

    match suggest_clusters_amount(&curve) {
        Some(k) => println!("\nSuggested clusters_amount: {}", k),
        None => println!("\nNot enough data to suggest a cluster count"),
    }
}

/// Positions met along seeded random games from the default line-up
fn sample_positions(count: usize, seed: u64) -> Vec<Skirmish> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(count);

    while samples.len() < count {
        let mut position = Skirmish::default_placement();
        while !position.is_terminal() && samples.len() < count {
            let actions = position.legal_actions();
            if actions.is_empty() {
                position.pass_turn();
                continue;
            }
            samples.push(position.clone());

            let action = &actions[rng.random_range(0..actions.len())];
            match position.apply_action(action).ok().and_then(|o| sample_outcome(o, &mut rng)) {
                Some(next) => position = next,
                None => position.pass_turn(),
            }
        }
    }
    samples
}
