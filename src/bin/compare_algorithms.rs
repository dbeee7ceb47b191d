//! Algorithm comparison tool
//!
//! Runs every search algorithm in both execution modes on the default line-up and
//! reports the chosen action, its score, the visited nodes and the search time.
//!
//! Usage:
//!   cargo run --release --bin compare_algorithms -- [max_depth] [config.toml]

use std::env;
use std::process;

use tactics_bot::bot::Bot;
use tactics_bot::config::{Algorithm, Config, Execution};
use tactics_bot::error::SearchError;
use tactics_bot::evaluate::build_evaluator;
use tactics_bot::skirmish::Skirmish;

fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "warn");
    }
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let max_depth: u8 = match args.get(1).map(|s| s.parse()) {
        None => 3,
        Some(Ok(depth)) => depth,
        Some(Err(_)) => {
            eprintln!("Usage: {} [max_depth] [config.toml]", args[0]);
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

    let game = Skirmish::default_placement();
    println!("{}\n", game);

    println!(
        "{:<20} {:<11} {:>5} {:>12} {:>12} {:>10}  action",
        "algorithm", "execution", "depth", "score", "nodes", "time(ms)"
    );
    println!("{}", "─".repeat(90));

    for depth in 1..=max_depth {
        for algorithm in Algorithm::all() {
            for execution in [Execution::Sequential, Execution::Parallel] {
                let config = config.with_algorithm(algorithm).with_execution(execution);
                let bot = build_evaluator::<Skirmish>(&config)
                    .map_err(SearchError::from)
                    .and_then(|evaluator| Bot::new(&config, evaluator));
                let bot = match bot {
                    Ok(bot) => bot,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                };

                match bot.decide(&game, depth) {
                    Ok(result) => {
                        let stats = bot.last_search_stats();
                        println!(
                            "{:<20} {:<11} {:>5} {:>12.3} {:>12} {:>10.2}  {}",
                            algorithm.as_str(),
                            execution.as_str(),
                            depth,
                            result.score,
                            stats.nodes_visited,
                            stats.elapsed.as_secs_f64() * 1000.0,
                            result.action.map_or("-".to_string(), |a| format!(
                                "{:?} ({},{}) -> ({},{})",
                                a.attacker, a.from.col, a.from.row, a.to.col, a.to.row
                            ))
                        );
                    }
                    Err(e) => println!(
                        "{:<20} {:<11} {:>5} failed: {}",
                        algorithm.as_str(),
                        execution.as_str(),
                        depth,
                        e
                    ),
                }
            }
        }
        println!();
    }
}
