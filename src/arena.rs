// Arena module for playing complete games between two policies
//
// This module provides functionality to:
// 1. Play one game from a starting position, sampling chance outcomes with a seeded RNG
// 2. Play a match of several games and tally the results
// 3. Build a policy from a configured contender

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::bot::{Bot, MovePolicy, RandomPolicy};
use crate::config::{Config, Contender};
use crate::error::SearchError;
use crate::evaluate::{build_evaluator, sample_outcome};
use crate::search::SearchSummary;
use crate::types::{BoardView, Player, Position};

/// Result of a single game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    pub winner: Option<Player>,
    pub plies: usize,
    /// The ply cap ended the game before the rules did
    pub capped: bool,
}

/// Statistics for a complete match
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    pub first: String,
    pub second: String,
    pub games: usize,
    pub first_wins: usize,
    pub second_wins: usize,
    pub draws: usize,
    pub total_plies: usize,
    pub first_stats: Option<SearchSummary>,
    pub second_stats: Option<SearchSummary>,
}

impl MatchReport {
    fn record(&mut self, game: &GameRecord) {
        self.games += 1;
        self.total_plies += game.plies;
        match game.winner {
            Some(Player::First) => self.first_wins += 1,
            Some(Player::Second) => self.second_wins += 1,
            None => self.draws += 1,
        }
    }

    pub fn average_plies(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.total_plies as f64 / self.games as f64
        }
    }
}

/// Plays one game to its end or to `max_plies`
///
/// # Arguments
/// * `start` - Starting position, left untouched
/// * `first` - Policy moving for `Player::First`
/// * `second` - Policy moving for `Player::Second`
/// * `max_plies` - Moves after which the game is declared a draw
/// * `rng` - Source used to pick the chance outcome of every move
pub fn play_game<P: Position>(
    start: &P,
    first: &mut dyn MovePolicy<P>,
    second: &mut dyn MovePolicy<P>,
    max_plies: usize,
    rng: &mut StdRng,
) -> Result<GameRecord, SearchError> {
    let mut position = start.clone();
    let mut plies = 0;

    while !position.is_terminal() {
        if plies >= max_plies {
            return Ok(GameRecord {
                winner: None,
                plies,
                capped: true,
            });
        }
        plies += 1;

        let policy: &mut dyn MovePolicy<P> = match position.current_mover() {
            Player::First => &mut *first,
            Player::Second => &mut *second,
        };
        let Some(action) = policy.choose(&position)? else {
            position.pass_turn();
            continue;
        };

        match position.apply_action(&action) {
            Ok(outcomes) => match sample_outcome(outcomes, rng) {
                Some(next) => position = next,
                None => position.pass_turn(),
            },
            Err(e) => {
                warn!("{} chose an unplayable action: {}", policy.name(), e);
                position.pass_turn();
            }
        }
    }

    Ok(GameRecord {
        winner: position.winner(),
        plies,
        capped: false,
    })
}

/// Plays `games` games with fixed sides, game `i` sampling with `seed + i`
pub fn play_match<P: Position>(
    start: &P,
    first: &mut dyn MovePolicy<P>,
    second: &mut dyn MovePolicy<P>,
    games: usize,
    max_plies: usize,
    seed: u64,
) -> Result<MatchReport, SearchError> {
    let mut report = MatchReport {
        first: first.name(),
        second: second.name(),
        ..MatchReport::default()
    };

    for game in 0..games {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(game as u64));
        let record = play_game(start, first, second, max_plies, &mut rng)?;
        info!(
            "Game {}/{}: {} after {} plies{}",
            game + 1,
            games,
            record
                .winner
                .map_or("draw".to_string(), |p| format!("{} wins", p.as_str())),
            record.plies,
            if record.capped { " (capped)" } else { "" }
        );
        report.record(&record);
    }

    report.first_stats = first.stats();
    report.second_stats = second.stats();
    Ok(report)
}

/// Builds the policy for a configured contender
///
/// Searching contenders share every setting of `config` except the algorithm.
pub fn build_policy<P>(
    contender: Contender,
    config: &Config,
    seed: u64,
) -> Result<Box<dyn MovePolicy<P>>, SearchError>
where
    P: Position + BoardView + 'static,
{
    match contender.algorithm() {
        None => Ok(Box::new(RandomPolicy::new(seed))),
        Some(algorithm) => {
            let config = config.with_algorithm(algorithm);
            let evaluator = build_evaluator::<P>(&config)?;
            let bot: Bot<P> = Bot::new(&config, evaluator)?;
            Ok(Box::new(bot))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skirmish::Skirmish;

    #[test]
    fn test_random_match_is_reproducible() {
        let start = Skirmish::default_placement();
        let run = || {
            let mut first = RandomPolicy::new(1);
            let mut second = RandomPolicy::new(2);
            play_match(&start, &mut first, &mut second, 5, 500, 9).unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.games, 5);
        assert_eq!(a.first_wins + a.second_wins + a.draws, 5);
        assert_eq!(
            (a.first_wins, a.second_wins, a.draws, a.total_plies),
            (b.first_wins, b.second_wins, b.draws, b.total_plies)
        );
        assert!(a.first_stats.is_none());
    }

    #[test]
    fn test_ply_cap_declares_draw() {
        let start = Skirmish::default_placement();
        let mut first = RandomPolicy::new(1);
        let mut second = RandomPolicy::new(2);
        let mut rng = StdRng::seed_from_u64(0);
        let record = play_game(&start, &mut first, &mut second, 3, &mut rng).unwrap();
        assert_eq!(
            record,
            GameRecord {
                winner: None,
                plies: 3,
                capped: true
            }
        );
    }

    #[test]
    fn test_search_contender_reports_stats() {
        let mut config = Config::default_hardcoded();
        config.search.depth = 1;
        let start = Skirmish::default_placement();
        let mut first = build_policy::<Skirmish>(Contender::AlphaBeta, &config, 3).unwrap();
        let mut second = build_policy::<Skirmish>(Contender::Random, &config, 4).unwrap();

        let report = play_match(&start, first.as_mut(), second.as_mut(), 1, 60, 11).unwrap();
        assert_eq!(report.first, "alpha_beta/sequential");
        assert_eq!(report.second, "random");
        assert!(report.first_stats.unwrap().nodes_visited > 0);
        assert!(report.second_stats.is_none());
    }
}
