// Rollout evaluator
//
// The static heuristic becomes unreliable once the board thins out. Below the
// living-unit threshold this evaluator instead plays independent random games to the
// end and scores the position from the observed results.

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::RolloutConfig;
use crate::evaluate::{Evaluator, HeuristicEvaluator, MAX_COST};
use crate::types::{BoardView, ChanceOutcome, Player, Position};

#[derive(Debug, Clone)]
pub struct RolloutEvaluator {
    heuristic: HeuristicEvaluator,
    games: usize,
    min_alive_units: usize,
    seed: u64,
    max_plies: usize,
}

/// Result of one random playout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayoutResult {
    Won,
    Lost,
    Drawn,
}

impl RolloutEvaluator {
    pub fn new(heuristic: HeuristicEvaluator, config: &RolloutConfig) -> Self {
        RolloutEvaluator {
            heuristic,
            games: config.games.max(1),
            min_alive_units: config.min_alive_units,
            seed: config.seed,
            max_plies: config.max_plies,
        }
    }

    /// Whether the board is sparse enough for playouts to take over
    pub fn uses_playouts<P: BoardView>(&self, position: &P) -> bool {
        position.alive_units(Player::First) < self.min_alive_units
            && position.alive_units(Player::Second) < self.min_alive_units
    }

    /// Scores a position by `(wins - losses) / games`, scaled to the evaluation interval
    pub fn playout_score<P: Position>(&self, position: &P, perspective: Player) -> f64 {
        let mut balance: i64 = 0;
        for game in 0..self.games {
            let mut rng = StdRng::seed_from_u64(Self::playout_seed(self.seed, game));
            match self.play_out(position.clone(), perspective, &mut rng) {
                PlayoutResult::Won => balance += 1,
                PlayoutResult::Lost => balance -= 1,
                PlayoutResult::Drawn => {}
            }
        }
        balance as f64 / self.games as f64 * MAX_COST
    }

    fn playout_seed(seed: u64, game: usize) -> u64 {
        seed ^ (game as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// Plays uniformly random actions on an owned copy until the game ends
    fn play_out<P: Position>(&self, mut position: P, perspective: Player, rng: &mut StdRng) -> PlayoutResult {
        let mut plies = 0;
        while !position.is_terminal() {
            if plies >= self.max_plies {
                return PlayoutResult::Drawn;
            }
            plies += 1;

            let actions = position.legal_actions();
            if actions.is_empty() {
                position.pass_turn();
                continue;
            }

            let action = &actions[rng.random_range(0..actions.len())];
            match position.apply_action(action) {
                Ok(outcomes) => match sample_outcome(outcomes, rng) {
                    Some(next) => position = next,
                    None => position.pass_turn(),
                },
                Err(e) => {
                    warn!("Rollout skipped an action: {}", e);
                    position.pass_turn();
                }
            }
        }

        match position.winner() {
            Some(player) if player == perspective => PlayoutResult::Won,
            Some(_) => PlayoutResult::Lost,
            None => PlayoutResult::Drawn,
        }
    }
}

/// Draws one outcome according to its probability
pub fn sample_outcome<P, R: Rng>(outcomes: Vec<ChanceOutcome<P>>, rng: &mut R) -> Option<P> {
    let total: f64 = outcomes.iter().map(|o| o.probability).sum();
    if outcomes.is_empty() || total <= 0.0 {
        return outcomes.into_iter().next().map(|o| o.position);
    }

    let mut ticket = rng.random::<f64>() * total;
    let last = outcomes.len() - 1;
    for (index, outcome) in outcomes.into_iter().enumerate() {
        if ticket < outcome.probability || index == last {
            return Some(outcome.position);
        }
        ticket -= outcome.probability;
    }
    None
}

impl<P> Evaluator<P> for RolloutEvaluator
where
    P: Position + BoardView,
{
    fn evaluate(&self, position: &P, perspective: Player) -> f64 {
        if position.is_terminal() || !self.uses_playouts(position) {
            return self.heuristic.evaluate(position, perspective);
        }
        self.playout_score(position, perspective)
    }

    fn name(&self) -> &'static str {
        "rollout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Coefficients, Config};
    use crate::evaluate::MIN_COST;
    use crate::skirmish::{Cell, Skirmish, Unit, UnitKind};

    fn evaluator() -> RolloutEvaluator {
        let config = Config::default_hardcoded();
        let heuristic = HeuristicEvaluator::new(config.coefficients().unwrap());
        RolloutEvaluator::new(heuristic, &config.rollout)
    }

    fn sparse_game() -> Skirmish {
        let mut game = Skirmish::empty();
        game.place(Cell::new(0, 1), Some(Unit::new(UnitKind::Knight, Player::First)));
        game.place(Cell::new(1, 0), Some(Unit::new(UnitKind::Archer, Player::First)));
        game.place(Cell::new(1, 2), Some(Unit::new(UnitKind::Knight, Player::Second)));
        game
    }

    #[test]
    fn test_full_board_delegates_to_heuristic() {
        let game = Skirmish::default_placement();
        let heuristic = HeuristicEvaluator::new(Coefficients {
            is_general_bonus: 1.5,
            row_penalty: 0.8,
            no_def_penalty: 0.7,
        });
        assert!(!evaluator().uses_playouts(&game));
        assert_eq!(
            evaluator().evaluate(&game, Player::First),
            heuristic.evaluate(&game, Player::First)
        );
    }

    #[test]
    fn test_sparse_board_uses_playouts_deterministically() {
        let game = sparse_game();
        let rollout = evaluator();
        assert!(rollout.uses_playouts(&game));

        let first = rollout.evaluate(&game, Player::First);
        let again = rollout.evaluate(&game, Player::First);
        assert_eq!(first, again);
        assert!(first >= MIN_COST && first <= MAX_COST);
    }

    #[test]
    fn test_playouts_leave_the_caller_position_untouched() {
        let game = sparse_game();
        let snapshot = game.clone();
        evaluator().evaluate(&game, Player::First);
        assert_eq!(game, snapshot);
    }

    #[test]
    fn test_sample_outcome_respects_certain_outcomes() {
        let mut rng = StdRng::seed_from_u64(3);
        let outcomes = vec![
            ChanceOutcome { position: 1, probability: 0.0 },
            ChanceOutcome { position: 2, probability: 1.0 },
        ];
        for _ in 0..20 {
            assert_eq!(sample_outcome(outcomes.clone(), &mut rng), Some(2));
        }
    }
}
