//! Scripted game-tree fixture
//!
//! A `ScriptedGame` walks a hand-built tree: every node names its mover and the score
//! the evaluator reports for it, every action lists its chance outcomes. Tests can
//! also script actions the rule engine rejects and actions that panic.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tactics_bot::error::InvalidActionError;
use tactics_bot::evaluate::{terminal_score, Evaluator};
use tactics_bot::types::{ChanceOutcome, GameAction, GameStage, Player, Position};

#[derive(Debug, Clone)]
enum Effect {
    Outcomes(Vec<(usize, f64)>),
    Invalid,
    Panic,
}

#[derive(Debug, Clone)]
struct ScriptedMove {
    kind: u8,
    destination: u8,
    effect: Effect,
}

#[derive(Debug, Clone)]
struct Node {
    mover: Player,
    /// Evaluation from the first player's point of view
    value: f64,
    ended: Option<Option<Player>>,
    moves: Vec<ScriptedMove>,
    pass_to: Option<usize>,
}

/// Action of a scripted node, identified by its node and index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedAction {
    pub node: usize,
    pub index: usize,
    pub kind: u8,
    pub destination: u8,
}

impl GameAction for ScriptedAction {
    type UnitKind = u8;
    type Cell = u8;

    fn unit_kind(&self) -> u8 {
        self.kind
    }

    fn destination(&self) -> u8 {
        self.destination
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedGame {
    tree: Arc<Vec<Node>>,
    node: usize,
}

impl ScriptedGame {
    pub fn node(&self) -> usize {
        self.node
    }

    fn current(&self) -> &Node {
        &self.tree[self.node]
    }
}

impl Position for ScriptedGame {
    type Action = ScriptedAction;

    fn current_mover(&self) -> Player {
        self.current().mover
    }

    fn stage(&self) -> GameStage {
        match self.current().ended {
            Some(_) => GameStage::Ended,
            None => GameStage::Ongoing,
        }
    }

    fn winner(&self) -> Option<Player> {
        self.current().ended.flatten()
    }

    fn legal_actions(&self) -> Vec<ScriptedAction> {
        self.current()
            .moves
            .iter()
            .enumerate()
            .map(|(index, m)| ScriptedAction {
                node: self.node,
                index,
                kind: m.kind,
                destination: m.destination,
            })
            .collect()
    }

    fn apply_action(
        &self,
        action: &ScriptedAction,
    ) -> Result<Vec<ChanceOutcome<Self>>, InvalidActionError> {
        if action.node != self.node {
            return Err(InvalidActionError(format!(
                "action of node {} applied to node {}",
                action.node, self.node
            )));
        }
        let scripted = self
            .current()
            .moves
            .get(action.index)
            .ok_or_else(|| InvalidActionError(format!("no action {}", action.index)))?;

        match &scripted.effect {
            Effect::Outcomes(outcomes) => Ok(outcomes
                .iter()
                .map(|(node, probability)| ChanceOutcome {
                    position: ScriptedGame {
                        tree: Arc::clone(&self.tree),
                        node: *node,
                    },
                    probability: *probability,
                })
                .collect()),
            Effect::Invalid => Err(InvalidActionError("scripted rejection".to_string())),
            Effect::Panic => panic!("scripted failure at node {}", self.node),
        }
    }

    fn pass_turn(&mut self) {
        if let Some(next) = self.current().pass_to {
            self.node = next;
        }
    }
}

/// Builds a scripted tree; node 0 is the root
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    next_destination: u8,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&mut self, mover: Player, value: f64) -> usize {
        self.nodes.push(Node {
            mover,
            value,
            ended: None,
            moves: Vec::new(),
            pass_to: None,
        });
        self.nodes.len() - 1
    }

    /// Leaf position: a node without actions
    pub fn leaf(&mut self, value: f64) -> usize {
        self.node(Player::Second, value)
    }

    pub fn ended(&mut self, winner: Option<Player>) -> usize {
        let id = self.node(Player::First, 0.0);
        self.nodes[id].ended = Some(winner);
        id
    }

    fn push_move(&mut self, from: usize, kind: u8, destination: u8, effect: Effect) {
        self.nodes[from].moves.push(ScriptedMove {
            kind,
            destination,
            effect,
        });
    }

    fn fresh_destination(&mut self) -> u8 {
        self.next_destination = self.next_destination.wrapping_add(1);
        self.next_destination
    }

    /// Action with a unique redundancy key
    pub fn action(&mut self, from: usize, outcomes: &[(usize, f64)]) {
        let destination = self.fresh_destination();
        self.push_move(from, 0, destination, Effect::Outcomes(outcomes.to_vec()));
    }

    /// Action with an explicit (unit kind, destination) key
    pub fn keyed_action(&mut self, from: usize, kind: u8, destination: u8, outcomes: &[(usize, f64)]) {
        self.push_move(from, kind, destination, Effect::Outcomes(outcomes.to_vec()));
    }

    pub fn invalid_action(&mut self, from: usize) {
        let destination = self.fresh_destination();
        self.push_move(from, 0, destination, Effect::Invalid);
    }

    pub fn panicking_action(&mut self, from: usize) {
        let destination = self.fresh_destination();
        self.push_move(from, 0, destination, Effect::Panic);
    }

    pub fn pass_to(&mut self, from: usize, to: usize) {
        self.nodes[from].pass_to = Some(to);
    }

    pub fn build(self) -> ScriptedGame {
        ScriptedGame {
            tree: Arc::new(self.nodes),
            node: 0,
        }
    }
}

/// Reports each node's scripted value and counts its calls
#[derive(Debug, Default)]
pub struct ScriptedEvaluator {
    calls: AtomicUsize,
}

impl ScriptedEvaluator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Evaluator<ScriptedGame> for ScriptedEvaluator {
    fn evaluate(&self, position: &ScriptedGame, perspective: Player) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if position.is_terminal() {
            return terminal_score(position.winner(), perspective);
        }
        let value = position.current().value;
        match perspective {
            Player::First => value,
            Player::Second => -value,
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
