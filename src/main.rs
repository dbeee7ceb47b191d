use log::{error, info};
use std::env;
use std::process;

use tactics_bot::arena::{build_policy, play_match};
use tactics_bot::config::Config;
use tactics_bot::skirmish::Skirmish;

/// Plays the configured arena match from the default line-up
///
/// Usage: tactics-bot [config.toml]
fn main() {
    // We default to 'info' level logging. But if the `RUST_LOG` environment variable is set,
    // we keep that value instead.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    info!("Starting tactics bot...");

    // Load configuration once at startup
    let config = match env::args().nth(1) {
        Some(path) => Config::from_file(&path).unwrap_or_else(|e| {
            error!("{}", e);
            process::exit(1);
        }),
        None => Config::load_or_default(),
    };

    let arena = &config.arena;
    let start = Skirmish::default_placement();
    let result = build_policy::<Skirmish>(arena.first, &config, arena.seed).and_then(|mut first| {
        let mut second =
            build_policy::<Skirmish>(arena.second, &config, arena.seed.wrapping_add(1))?;
        play_match(
            &start,
            first.as_mut(),
            second.as_mut(),
            arena.games,
            arena.max_plies,
            arena.seed,
        )
    });

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!("Match aborted: {}", e);
            process::exit(1);
        }
    };

    println!("\n═══════════════════════════════════════════════════════════");
    println!("        MATCH SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!("First:         {}", report.first);
    println!("Second:        {}", report.second);
    println!("Games:         {}", report.games);
    println!("First wins:    {}", report.first_wins);
    println!("Second wins:   {}", report.second_wins);
    println!("Draws:         {}", report.draws);
    println!("Average plies: {:.1}", report.average_plies());
    for (side, stats) in [("First", report.first_stats), ("Second", report.second_stats)] {
        if let Some(stats) = stats {
            println!(
                "{} search:  {} nodes, last decision {}us",
                side,
                stats.nodes_visited,
                stats.elapsed.as_micros()
            );
        }
    }
    println!("═══════════════════════════════════════════════════════════\n");
}
