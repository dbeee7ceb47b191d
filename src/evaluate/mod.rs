//! Position evaluation
//!
//! Every evaluator maps a position onto the closed scale `[MIN_COST, MAX_COST]`, so the
//! search algorithms compare values on one scale whichever evaluator is plugged in.

mod heuristic;
mod rollout;

pub use heuristic::HeuristicEvaluator;
pub use rollout::{sample_outcome, RolloutEvaluator};

use std::sync::Arc;

use crate::config::{Config, EvaluatorKind};
use crate::error::ConfigError;
use crate::types::{BoardView, Player, Position};

/// Score of a certain win for the perspective player
pub const MAX_COST: f64 = 1000.0;
/// Score of a certain loss for the perspective player
pub const MIN_COST: f64 = -1000.0;

/// Trait for position evaluators.
///
/// Implementations are shared by every search branch, possibly across threads, and
/// must not mutate any state while evaluating.
pub trait Evaluator<P: Position>: Send + Sync {
    /// Scores `position` from the point of view of `perspective`
    fn evaluate(&self, position: &P, perspective: Player) -> f64;

    fn name(&self) -> &'static str;
}

/// Score of an ended game: win, loss or draw
pub fn terminal_score(winner: Option<Player>, perspective: Player) -> f64 {
    match winner {
        Some(player) if player == perspective => MAX_COST,
        Some(_) => MIN_COST,
        None => 0.0,
    }
}

/// Clamps a score into the evaluation scale
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(MIN_COST, MAX_COST)
}

/// Builds the evaluator selected in the configuration
///
/// Fails when a coefficient is missing or unparsable; the agent cannot run without them.
pub fn build_evaluator<P>(config: &Config) -> Result<Arc<dyn Evaluator<P>>, ConfigError>
where
    P: Position + BoardView + 'static,
{
    let heuristic = HeuristicEvaluator::new(config.coefficients()?);
    Ok(match config.evaluator.kind {
        EvaluatorKind::Heuristic => Arc::new(heuristic),
        EvaluatorKind::Rollout => Arc::new(RolloutEvaluator::new(heuristic, &config.rollout)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_score() {
        assert_eq!(terminal_score(Some(Player::First), Player::First), MAX_COST);
        assert_eq!(terminal_score(Some(Player::Second), Player::First), MIN_COST);
        assert_eq!(terminal_score(None, Player::Second), 0.0);
    }

    #[test]
    fn test_build_evaluator_follows_kind() {
        use crate::skirmish::Skirmish;

        let mut config = Config::default_hardcoded();
        let evaluator = build_evaluator::<Skirmish>(&config).unwrap();
        assert_eq!(evaluator.name(), "heuristic");

        config.evaluator.kind = EvaluatorKind::Rollout;
        let evaluator = build_evaluator::<Skirmish>(&config).unwrap();
        assert_eq!(evaluator.name(), "rollout");

        config.coefficients.remove("rowPenalty");
        assert!(matches!(
            build_evaluator::<Skirmish>(&config),
            Err(ConfigError::MissingCoefficient("rowPenalty"))
        ));
    }

    #[test]
    fn test_scale_is_symmetric() {
        assert_eq!(MAX_COST, -MIN_COST);
        assert_eq!(clamp_score(5000.0), MAX_COST);
        assert_eq!(clamp_score(-5000.0), MIN_COST);
    }
}
