// Static board heuristic
//
// Each living unit is worth its remaining health fraction, scaled by a bonus for
// generals and by penalties for standing on a row that does not suit its role or
// for lacking cover. The signed sum over both halves of the board is rescaled
// into the evaluation interval.

use crate::config::Coefficients;
use crate::evaluate::{clamp_score, terminal_score, Evaluator, MAX_COST};
use crate::types::{BoardView, Player, Position, UnitRole};

#[derive(Debug, Clone)]
pub struct HeuristicEvaluator {
    coefficients: Coefficients,
    /// Largest value a single unit can contribute
    max_unit_value: f64,
    /// Smallest value a full-health unit can contribute
    min_unit_value: f64,
}

impl HeuristicEvaluator {
    pub fn new(coefficients: Coefficients) -> Self {
        let Coefficients {
            is_general_bonus,
            row_penalty,
            no_def_penalty,
        } = coefficients;

        let max_unit_value = is_general_bonus.max(1.0) * row_penalty.max(1.0) * no_def_penalty.max(1.0);
        let min_unit_value = is_general_bonus.min(1.0) * row_penalty.min(1.0) * no_def_penalty.min(1.0);

        HeuristicEvaluator {
            coefficients,
            max_unit_value,
            min_unit_value,
        }
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    /// Per-unit value range derived from the coefficients
    pub fn unit_value_bounds(&self) -> (f64, f64) {
        (self.min_unit_value, self.max_unit_value)
    }

    /// Value of the unit standing on a cell, zero for empty cells and dead units
    pub fn unit_value<B: BoardView>(&self, board: &B, col: usize, row: usize) -> f64 {
        let unit = match board.unit_at(col, row) {
            Some(unit) if unit.is_alive() && unit.max_hp > 0 => unit,
            _ => return 0.0,
        };

        let mut value = unit.current_hp as f64 / unit.max_hp as f64;

        if unit.is_general {
            value *= self.coefficients.is_general_bonus;
        }

        if Self::is_misplaced(unit.role, row, board.rows()) {
            value *= self.coefficients.row_penalty;
        }

        if Self::lacks_cover(board, col, row) {
            value *= self.coefficients.no_def_penalty;
        }

        value
    }

    /// Ranged units belong away from the middle, melee units away from the edges
    fn is_misplaced(role: UnitRole, row: usize, rows: usize) -> bool {
        let half = rows / 2;
        let middle = half > 0 && (row + 1 == half || row == half);
        let edge = row == 0 || row + 1 == rows;
        match role {
            UnitRole::Ranged => middle,
            UnitRole::Melee => edge,
        }
    }

    /// An edge-row unit with nobody alive on the neighbouring row of its column
    fn lacks_cover<B: BoardView>(board: &B, col: usize, row: usize) -> bool {
        let rows = board.rows();
        if rows < 2 {
            return false;
        }
        let neighbour = if row == 0 {
            1
        } else if row + 1 == rows {
            rows - 2
        } else {
            return false;
        };
        !board
            .unit_at(col, neighbour)
            .map_or(false, |unit| unit.is_alive())
    }

    /// Signed sum of unit values, positive on the perspective player's half
    fn raw_sum<B: BoardView>(&self, board: &B, perspective: Player) -> f64 {
        let mut sum = 0.0;
        for player in [Player::First, Player::Second] {
            let sign = if player == perspective { 1.0 } else { -1.0 };
            for row in board.rows_of(player) {
                for col in 0..board.columns() {
                    sum += sign * self.unit_value(board, col, row);
                }
            }
        }
        sum
    }

    /// Linear map of `[-bound, bound]` onto `[MIN_COST, MAX_COST]`
    fn normalize(&self, sum: f64, cells_per_side: usize) -> f64 {
        let bound = cells_per_side as f64 * self.max_unit_value.max(self.min_unit_value);
        if bound <= 0.0 {
            return 0.0;
        }
        let (min_possible, max_possible) = (-bound, bound);
        let scaled = MAX_COST * ((sum - min_possible) / (max_possible - min_possible) * 2.0 - 1.0);
        clamp_score(scaled)
    }
}

impl<P> Evaluator<P> for HeuristicEvaluator
where
    P: Position + BoardView,
{
    fn evaluate(&self, position: &P, perspective: Player) -> f64 {
        if position.is_terminal() {
            return terminal_score(position.winner(), perspective);
        }

        let sum = self.raw_sum(position, perspective);
        let cells_per_side = position.columns() * (position.rows() / 2);
        self.normalize(sum, cells_per_side)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::MIN_COST;
    use crate::skirmish::{Cell, Skirmish, Unit, UnitKind};

    fn evaluator() -> HeuristicEvaluator {
        HeuristicEvaluator::new(Coefficients {
            is_general_bonus: 1.5,
            row_penalty: 0.8,
            no_def_penalty: 0.7,
        })
    }

    #[test]
    fn test_default_placement_is_balanced() {
        let game = Skirmish::default_placement();
        let first = evaluator().evaluate(&game, Player::First);
        let second = evaluator().evaluate(&game, Player::Second);
        assert!(first.abs() < 1e-9);
        assert!(second.abs() < 1e-9);
    }

    #[test]
    fn test_score_does_not_depend_on_mover() {
        let mut game = Skirmish::default_placement();
        game.set_hp(Cell::new(0, 2), 1);
        let before = evaluator().evaluate(&game, Player::First);
        game.pass_turn();
        let after = evaluator().evaluate(&game, Player::First);
        assert_eq!(before, after);
    }

    #[test]
    fn test_kill_lowers_score() {
        let mut game = Skirmish::default_placement();
        let before = evaluator().evaluate(&game, Player::First);
        game.set_hp(Cell::new(0, 0), 0);
        let after = evaluator().evaluate(&game, Player::First);
        assert!(after < before);
    }

    #[test]
    fn test_wrong_row_lowers_score() {
        let mut game = Skirmish::default_placement();
        let before = evaluator().evaluate(&game, Player::First);
        game.place(Cell::new(1, 1), Some(Unit::new(UnitKind::Archer, Player::First)));
        let after = evaluator().evaluate(&game, Player::First);
        assert!(before > after);
    }

    #[test]
    fn test_missing_cover_lowers_score() {
        let mut game = Skirmish::default_placement();
        let before = evaluator().evaluate(&game, Player::First);
        game.set_hp(Cell::new(1, 1), 0);
        let after = evaluator().evaluate(&game, Player::First);
        assert!(before > after);
    }

    #[test]
    fn test_lone_side_stays_in_bounds() {
        let mut game = Skirmish::empty();
        let mut general = Unit::new(UnitKind::Knight, Player::First);
        general.is_general = true;
        game.place(Cell::new(0, 1), Some(general));
        game.place(Cell::new(2, 3), Some(Unit::new(UnitKind::Archer, Player::Second)));

        let score = evaluator().evaluate(&game, Player::First);
        assert!(score <= MAX_COST && score >= MIN_COST);
        assert!(score > 0.0);
    }
}
