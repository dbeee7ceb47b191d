// Reference rule engine
//
// A compact two-player tactical skirmish implementing the rule-engine seam. It is
// used by the binaries, the arena and the tests; the search core never depends on
// it directly.
//
// Board layout (columns x rows = 3 x 4):
//   row 3  back row of Second
//   row 2  front row of Second
//   row 1  front row of First
//   row 0  back row of First

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InvalidActionError;
use crate::types::{
    BoardView, ChanceOutcome, GameAction, GameStage, Player, Position, UnitRole, UnitSnapshot,
};

pub const COLUMNS: usize = 3;
pub const ROWS: usize = 4;
/// Turn handovers after which the game is declared a draw
pub const DEFAULT_MAX_TURNS: u32 = 200;

/// Board coordinate
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub col: usize,
    pub row: usize,
}

impl Cell {
    pub fn new(col: usize, row: usize) -> Self {
        Cell { col, row }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Knight,
    Archer,
    Healer,
}

impl UnitKind {
    pub fn role(&self) -> UnitRole {
        match self {
            UnitKind::Knight => UnitRole::Melee,
            UnitKind::Archer | UnitKind::Healer => UnitRole::Ranged,
        }
    }

    pub fn max_hp(&self) -> i32 {
        match self {
            UnitKind::Knight => 10,
            UnitKind::Archer => 6,
            UnitKind::Healer => 6,
        }
    }

    /// Damage dealt, or health restored for healers
    pub fn power(&self) -> i32 {
        match self {
            UnitKind::Knight => 4,
            UnitKind::Archer => 3,
            UnitKind::Healer => 2,
        }
    }

    pub fn accuracy(&self) -> f64 {
        match self {
            UnitKind::Knight => 0.8,
            UnitKind::Archer => 0.6,
            UnitKind::Healer => 1.0,
        }
    }

    fn symbol(&self) -> char {
        match self {
            UnitKind::Knight => 'K',
            UnitKind::Archer => 'A',
            UnitKind::Healer => 'H',
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub kind: UnitKind,
    pub owner: Player,
    pub current_hp: i32,
    pub max_hp: i32,
    pub power: i32,
    pub accuracy: f64,
    pub is_general: bool,
    pub has_acted: bool,
}

impl Unit {
    /// Fresh unit with the stock stats of its kind
    pub fn new(kind: UnitKind, owner: Player) -> Self {
        Unit {
            kind,
            owner,
            current_hp: kind.max_hp(),
            max_hp: kind.max_hp(),
            power: kind.power(),
            accuracy: kind.accuracy(),
            is_general: false,
            has_acted: false,
        }
    }

    pub fn general(kind: UnitKind, owner: Player) -> Self {
        Unit {
            is_general: true,
            ..Unit::new(kind, owner)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current_hp > 0
    }
}

/// A unit acting from one cell onto another
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkirmishAction {
    pub attacker: UnitKind,
    pub from: Cell,
    pub to: Cell,
}

impl GameAction for SkirmishAction {
    type UnitKind = UnitKind;
    type Cell = Cell;

    fn unit_kind(&self) -> UnitKind {
        self.attacker
    }

    fn destination(&self) -> Cell {
        self.to
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skirmish {
    cells: Vec<Option<Unit>>,
    mover: Player,
    stage: GameStage,
    winner: Option<Player>,
    turns: u32,
    max_turns: u32,
}

impl Skirmish {
    /// Board with no units, first player to move
    pub fn empty() -> Self {
        Skirmish {
            cells: vec![None; COLUMNS * ROWS],
            mover: Player::First,
            stage: GameStage::Ongoing,
            winner: None,
            turns: 0,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Board holding exactly the given units
    pub fn with_units<I>(units: I) -> Self
    where
        I: IntoIterator<Item = (Cell, Unit)>,
    {
        let mut game = Skirmish::empty();
        for (cell, unit) in units {
            game.place(cell, Some(unit));
        }
        game
    }

    /// Mirrored standard line-up: knights in front with the general in the middle,
    /// archers and a healer behind
    pub fn default_placement() -> Self {
        let mut game = Skirmish::empty();
        for player in [Player::First, Player::Second] {
            let front = Self::front_row(player);
            let back = Self::back_row(player);
            game.place(Cell::new(0, front), Some(Unit::new(UnitKind::Knight, player)));
            game.place(Cell::new(1, front), Some(Unit::general(UnitKind::Knight, player)));
            game.place(Cell::new(2, front), Some(Unit::new(UnitKind::Knight, player)));
            game.place(Cell::new(0, back), Some(Unit::new(UnitKind::Archer, player)));
            game.place(Cell::new(1, back), Some(Unit::new(UnitKind::Healer, player)));
            game.place(Cell::new(2, back), Some(Unit::new(UnitKind::Archer, player)));
        }
        game
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self.refresh_stage();
        self
    }

    pub fn with_mover(mut self, mover: Player) -> Self {
        self.mover = mover;
        self
    }

    pub fn front_row(player: Player) -> usize {
        match player {
            Player::First => ROWS / 2 - 1,
            Player::Second => ROWS / 2,
        }
    }

    pub fn back_row(player: Player) -> usize {
        match player {
            Player::First => 0,
            Player::Second => ROWS - 1,
        }
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    fn index(cell: Cell) -> usize {
        cell.col * ROWS + cell.row
    }

    fn in_bounds(cell: Cell) -> bool {
        cell.col < COLUMNS && cell.row < ROWS
    }

    pub fn unit(&self, cell: Cell) -> Option<&Unit> {
        if !Self::in_bounds(cell) {
            return None;
        }
        self.cells[Self::index(cell)].as_ref()
    }

    fn living(&self, cell: Cell) -> Option<&Unit> {
        self.unit(cell).filter(|unit| unit.is_alive())
    }

    /// Puts a unit on (or clears) a cell
    pub fn place(&mut self, cell: Cell, unit: Option<Unit>) {
        if Self::in_bounds(cell) {
            self.cells[Self::index(cell)] = unit;
            self.refresh_stage();
        }
    }

    /// Overrides the health of the unit on a cell
    pub fn set_hp(&mut self, cell: Cell, hp: i32) {
        if !Self::in_bounds(cell) {
            return;
        }
        if let Some(unit) = self.cells[Self::index(cell)].as_mut() {
            unit.current_hp = hp.clamp(0, unit.max_hp);
        }
        self.refresh_stage();
    }

    /// Cells of a player's living units in scan order (rows first, then columns)
    fn cells_of(&self, player: Player) -> Vec<Cell> {
        let rows = match player {
            Player::First => 0..ROWS / 2,
            Player::Second => ROWS / 2..ROWS,
        };
        let mut cells = Vec::new();
        for row in rows {
            for col in 0..COLUMNS {
                let cell = Cell::new(col, row);
                if self.living(cell).map_or(false, |unit| unit.owner == player) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Cells a unit standing on `from` may act upon
    fn targets(&self, from: Cell) -> Vec<Cell> {
        let unit = match self.living(from) {
            Some(unit) => *unit,
            None => return Vec::new(),
        };
        let enemy = unit.owner.opponent();

        match unit.kind {
            UnitKind::Knight => {
                let own_front = Self::front_row(unit.owner);
                let blocked = from.row != own_front
                    && self.living(Cell::new(from.col, own_front)).is_some();
                if blocked {
                    return Vec::new();
                }
                let enemy_front = Self::front_row(enemy);
                let row = if self.row_has_living(enemy_front) {
                    enemy_front
                } else {
                    Self::back_row(enemy)
                };
                (0..COLUMNS)
                    .filter(|col| col.abs_diff(from.col) <= 1)
                    .map(|col| Cell::new(col, row))
                    .filter(|cell| self.living(*cell).is_some())
                    .collect()
            }
            UnitKind::Archer => self.cells_of(enemy),
            UnitKind::Healer => self
                .cells_of(unit.owner)
                .into_iter()
                .filter(|cell| {
                    self.living(*cell)
                        .map_or(false, |ally| ally.current_hp < ally.max_hp)
                })
                .collect(),
        }
    }

    fn row_has_living(&self, row: usize) -> bool {
        (0..COLUMNS).any(|col| self.living(Cell::new(col, row)).is_some())
    }

    fn validate(&self, action: &SkirmishAction) -> Result<Unit, InvalidActionError> {
        let unit = self
            .living(action.from)
            .copied()
            .ok_or_else(|| InvalidActionError(format!("no living unit at {:?}", action.from)))?;
        if unit.owner != self.mover {
            return Err(InvalidActionError(format!(
                "unit at {:?} does not belong to the {} player",
                action.from,
                self.mover.as_str()
            )));
        }
        if unit.kind != action.attacker {
            return Err(InvalidActionError(format!(
                "unit at {:?} is a {:?}, not a {:?}",
                action.from, unit.kind, action.attacker
            )));
        }
        if unit.has_acted {
            return Err(InvalidActionError(format!(
                "unit at {:?} has already acted this turn",
                action.from
            )));
        }
        if !self.targets(action.from).contains(&action.to) {
            return Err(InvalidActionError(format!(
                "{:?} cannot reach {:?}",
                action.from, action.to
            )));
        }
        Ok(unit)
    }

    /// Copy of this position with the action resolved as hit or miss
    fn resolve(&self, action: &SkirmishAction, unit: &Unit, hit: bool) -> Skirmish {
        let mut next = self.clone();
        if hit {
            if let Some(target) = next.cells[Self::index(action.to)].as_mut() {
                target.current_hp = match unit.kind {
                    UnitKind::Healer => (target.current_hp + unit.power).min(target.max_hp),
                    _ => (target.current_hp - unit.power).max(0),
                };
            }
        }
        if let Some(actor) = next.cells[Self::index(action.from)].as_mut() {
            actor.has_acted = true;
        }
        next.refresh_stage();
        if next.stage == GameStage::Ongoing && next.legal_actions().is_empty() {
            next.end_turn();
        }
        next
    }

    fn end_turn(&mut self) {
        self.mover = self.mover.opponent();
        for unit in self.cells.iter_mut().flatten() {
            unit.has_acted = false;
        }
        self.turns += 1;
        self.refresh_stage();
    }

    fn refresh_stage(&mut self) {
        let first = self.cells_of(Player::First).len();
        let second = self.cells_of(Player::Second).len();
        let (stage, winner) = match (first, second) {
            (0, 0) => (GameStage::Ended, None),
            (0, _) => (GameStage::Ended, Some(Player::Second)),
            (_, 0) => (GameStage::Ended, Some(Player::First)),
            _ if self.turns >= self.max_turns => (GameStage::Ended, None),
            _ => (GameStage::Ongoing, None),
        };
        self.stage = stage;
        self.winner = winner;
    }
}

impl Position for Skirmish {
    type Action = SkirmishAction;

    fn current_mover(&self) -> Player {
        self.mover
    }

    fn stage(&self) -> GameStage {
        self.stage
    }

    fn winner(&self) -> Option<Player> {
        self.winner
    }

    fn legal_actions(&self) -> Vec<SkirmishAction> {
        if self.stage == GameStage::Ended {
            return Vec::new();
        }
        let mut actions = Vec::new();
        for from in self.cells_of(self.mover) {
            let unit = match self.living(from) {
                Some(unit) if !unit.has_acted => *unit,
                _ => continue,
            };
            for to in self.targets(from) {
                actions.push(SkirmishAction {
                    attacker: unit.kind,
                    from,
                    to,
                });
            }
        }
        actions
    }

    fn apply_action(
        &self,
        action: &SkirmishAction,
    ) -> Result<Vec<ChanceOutcome<Skirmish>>, InvalidActionError> {
        if self.stage == GameStage::Ended {
            return Err(InvalidActionError("the game has already ended".to_string()));
        }
        let unit = self.validate(action)?;

        if unit.accuracy >= 1.0 {
            return Ok(vec![ChanceOutcome {
                position: self.resolve(action, &unit, true),
                probability: 1.0,
            }]);
        }

        Ok(vec![
            ChanceOutcome {
                position: self.resolve(action, &unit, true),
                probability: unit.accuracy,
            },
            ChanceOutcome {
                position: self.resolve(action, &unit, false),
                probability: 1.0 - unit.accuracy,
            },
        ])
    }

    fn pass_turn(&mut self) {
        self.end_turn();
    }
}

impl BoardView for Skirmish {
    fn columns(&self) -> usize {
        COLUMNS
    }

    fn rows(&self) -> usize {
        ROWS
    }

    fn unit_at(&self, col: usize, row: usize) -> Option<UnitSnapshot> {
        self.unit(Cell::new(col, row)).map(|unit| UnitSnapshot {
            current_hp: unit.current_hp,
            max_hp: unit.max_hp,
            is_general: unit.is_general,
            role: unit.kind.role(),
        })
    }
}

impl fmt::Display for Skirmish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..ROWS).rev() {
            for col in 0..COLUMNS {
                match self.unit(Cell::new(col, row)) {
                    Some(unit) if unit.is_alive() => {
                        let general = if unit.is_general { '*' } else { ' ' };
                        write!(f, " {}{:>2}{}", unit.kind.symbol(), unit.current_hp, general)?
                    }
                    _ => write!(f, "  .  ")?,
                }
            }
            writeln!(f)?;
        }
        write!(f, "mover: {}, turn {}", self.mover.as_str(), self.turns)
    }
}
