// Game API Types
// The seam between the search core and whatever rule engine owns the board

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::InvalidActionError;

/// One of the two sides of a match
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Player {
    First,
    Second,
}

impl Player {
    /// Returns the other side
    pub fn opponent(self) -> Player {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }

    /// Converts player to string representation for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Player::First => "first",
            Player::Second => "second",
        }
    }
}

/// Whether the game is still being played
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStage {
    Ongoing,
    Ended,
}

/// Combat role of a unit, used by the row-placement heuristic
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitRole {
    Melee,
    Ranged,
}

/// Read-only view of a unit standing on a board cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitSnapshot {
    pub current_hp: i32,
    pub max_hp: i32,
    pub is_general: bool,
    pub role: UnitRole,
}

impl UnitSnapshot {
    pub fn is_alive(&self) -> bool {
        self.current_hp > 0
    }
}

/// A position reached from applying an action, with its likelihood
#[derive(Debug, Clone)]
pub struct ChanceOutcome<P> {
    pub position: P,
    pub probability: f64,
}

/// A move the current mover can make
///
/// Two actions sharing a unit kind and a destination are interchangeable for the
/// search, so the action exposes exactly that pair.
pub trait GameAction: Clone + Debug + Send + Sync {
    type UnitKind: Copy + Eq + Hash;
    type Cell: Copy + Eq + Hash;

    fn unit_kind(&self) -> Self::UnitKind;
    fn destination(&self) -> Self::Cell;
}

/// Full snapshot of the game board and turn state
///
/// Cloning must produce an independent deep copy: sibling branches of the search
/// each own their position and mutate it freely.
pub trait Position: Clone + Send + Sync {
    type Action: GameAction;

    fn current_mover(&self) -> Player;
    fn stage(&self) -> GameStage;
    fn winner(&self) -> Option<Player>;

    fn is_terminal(&self) -> bool {
        self.stage() == GameStage::Ended
    }

    /// Actions available to the current mover
    fn legal_actions(&self) -> Vec<Self::Action>;

    /// Resolves an action into its chance outcomes
    ///
    /// The receiver is left untouched; probabilities of the returned outcomes sum to 1.
    fn apply_action(
        &self,
        action: &Self::Action,
    ) -> Result<Vec<ChanceOutcome<Self>>, InvalidActionError>;

    /// Hands the turn to the opponent without consuming an action
    fn pass_turn(&mut self);
}

/// Cell-level access used by board-based evaluators
///
/// Rows `[0, rows / 2)` belong to `Player::First`, the remaining rows to `Player::Second`.
pub trait BoardView {
    fn columns(&self) -> usize;
    fn rows(&self) -> usize;
    fn unit_at(&self, col: usize, row: usize) -> Option<UnitSnapshot>;

    /// Rows owned by a player
    fn rows_of(&self, player: Player) -> std::ops::Range<usize> {
        let half = self.rows() / 2;
        match player {
            Player::First => 0..half,
            Player::Second => half..self.rows(),
        }
    }

    /// Number of living units a player still has on the board
    fn alive_units(&self, player: Player) -> usize {
        let mut count = 0;
        for col in 0..self.columns() {
            for row in self.rows_of(player) {
                if self.unit_at(col, row).map_or(false, |u| u.is_alive()) {
                    count += 1;
                }
            }
        }
        count
    }
}
