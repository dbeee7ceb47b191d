// Stochastic adversarial search
//
// One recursive engine covers minimax, alpha-beta, expectimax and clustered minimax in
// both sequential and fork/join form. An algorithm is lowered into a `SearchPlan`
// naming its backup rule, pruning, branch reduction and execution mode.

pub mod cluster;
mod engine;
pub mod reduction;
mod stats;

pub use cluster::{ClusterSampler, Clustering, ValueClustering};
pub use engine::{SearchEngine, SearchSettings};
pub use stats::{SearchStats, SearchSummary};

use crate::config::{Algorithm, Execution};
use crate::evaluate::{MAX_COST, MIN_COST};
use crate::types::{Player, Position};

/// Which side's score a node optimizes toward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Maximizing,
    Minimizing,
}

impl Role {
    pub fn flip(self) -> Role {
        match self {
            Role::Maximizing => Role::Minimizing,
            Role::Minimizing => Role::Maximizing,
        }
    }

    /// Role of a child node: kept while the same side keeps moving
    pub fn after_move(self, parent_mover: Player, child_mover: Player) -> Role {
        if parent_mover == child_mover {
            self
        } else {
            self.flip()
        }
    }

    /// Score reported for a root whose mover cannot act
    pub fn stalled_score(self) -> f64 {
        match self {
            Role::Maximizing => MIN_COST,
            Role::Minimizing => MAX_COST,
        }
    }
}

/// Result of a search call
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<A> {
    /// `None` for leaves, expectation nodes and stalled roots
    pub action: Option<A>,
    pub score: f64,
}

impl<A> ScoredCandidate<A> {
    pub fn leaf(score: f64) -> Self {
        ScoredCandidate { action: None, score }
    }
}

/// A next-level position with the probability and action that produced it
#[derive(Debug, Clone)]
pub struct ExpandedState<P: Position> {
    pub position: P,
    pub probability: f64,
    pub action: P::Action,
}

/// How child scores are folded into their parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backup {
    /// Max and min nodes both keep their extreme child
    Minimax,
    /// Minimizing nodes become expectation nodes
    Expectimax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pruning {
    Off,
    AlphaBeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Full,
    Clustered,
}

/// Parameterization of the single search engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPlan {
    pub backup: Backup,
    pub pruning: Pruning,
    pub reduction: Reduction,
    pub execution: Execution,
}

impl SearchPlan {
    pub fn new(algorithm: Algorithm, execution: Execution) -> Self {
        let (backup, pruning, reduction) = match algorithm {
            Algorithm::Minimax => (Backup::Minimax, Pruning::Off, Reduction::Full),
            Algorithm::AlphaBeta => (Backup::Minimax, Pruning::AlphaBeta, Reduction::Full),
            Algorithm::Expectimax => (Backup::Expectimax, Pruning::Off, Reduction::Full),
            Algorithm::ClusteredMinimax => (Backup::Minimax, Pruning::Off, Reduction::Clustered),
        };
        SearchPlan {
            backup,
            pruning,
            reduction,
            execution,
        }
    }
}

/// Alpha-beta bounds, expressed in the receiving node's own score domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub alpha: f64,
    pub beta: f64,
}

impl Window {
    pub const FULL: Window = Window {
        alpha: f64::NEG_INFINITY,
        beta: f64::INFINITY,
    };

    /// Window for a child whose score is weighted by `probability` in the parent
    ///
    /// In real arithmetic `probability * s > alpha` exactly when `s > alpha / probability`.
    /// Rounding in the division and in the parent's multiplication can move either side
    /// by an ulp, so both bounds are pushed outward by a few ulps: a child only cuts once
    /// its weighted bound is strictly outside the parent's window and can never win the
    /// parent's fold.
    pub fn scaled(self, probability: f64) -> Window {
        Window {
            alpha: loosen(self.alpha / probability, -1.0),
            beta: loosen(self.beta / probability, 1.0),
        }
    }

    pub fn tighten(self, role: Role, value: f64) -> Window {
        match role {
            Role::Maximizing => Window {
                alpha: self.alpha.max(value),
                ..self
            },
            Role::Minimizing => Window {
                beta: self.beta.min(value),
                ..self
            },
        }
    }

    pub fn is_closed(&self) -> bool {
        self.beta <= self.alpha
    }
}

/// Relative slack applied to scaled bounds
const SCALE_MARGIN: f64 = 4.0 * f64::EPSILON;

fn loosen(bound: f64, direction: f64) -> f64 {
    if bound.is_finite() {
        bound + direction * bound.abs() * SCALE_MARGIN
    } else {
        bound
    }
}

/// Accumulates child results according to a node's backup rule
#[derive(Debug)]
pub(crate) struct NodeFold<A> {
    role: Role,
    expectation: bool,
    best: Option<(A, f64)>,
    weighted_sum: f64,
    total_probability: f64,
    folded: usize,
}

impl<A: Clone> NodeFold<A> {
    pub fn new(role: Role, backup: Backup) -> Self {
        NodeFold {
            role,
            expectation: backup == Backup::Expectimax && role == Role::Minimizing,
            best: None,
            weighted_sum: 0.0,
            total_probability: 0.0,
            folded: 0,
        }
    }

    /// Window handed to a child reached with `probability`
    pub fn child_window(&self, window: Window, probability: f64, pruning: Pruning) -> Window {
        if pruning == Pruning::Off || self.expectation {
            Window::FULL
        } else {
            window.scaled(probability)
        }
    }

    /// Folds one child's score, weighted by the probability that reached it
    ///
    /// Ties keep the earlier child.
    pub fn push(&mut self, action: &A, probability: f64, score: f64) {
        self.folded += 1;
        let weighted = score * probability;

        if self.expectation {
            self.weighted_sum += weighted;
            self.total_probability += probability;
            return;
        }

        let improves = match &self.best {
            None => true,
            Some((_, best)) => match self.role {
                Role::Maximizing => weighted > *best,
                Role::Minimizing => weighted < *best,
            },
        };
        if improves {
            self.best = Some((action.clone(), weighted));
        }
    }

    /// Current folded value, if any child has been folded
    pub fn value(&self) -> Option<f64> {
        if self.expectation {
            (self.total_probability > 0.0).then(|| self.weighted_sum / self.total_probability)
        } else {
            self.best.as_ref().map(|(_, score)| *score)
        }
    }

    /// Window after this node's current value is taken into account
    pub fn tighten(&self, window: Window) -> Window {
        match self.value() {
            Some(value) if !self.expectation => window.tighten(self.role, value),
            _ => window,
        }
    }

    pub fn folded(&self) -> usize {
        self.folded
    }

    /// `None` when no child was folded
    pub fn finish(self) -> Option<ScoredCandidate<A>> {
        if self.folded == 0 {
            return None;
        }
        if self.expectation {
            let score = self.value()?;
            return Some(ScoredCandidate::leaf(score));
        }
        self.best.map(|(action, score)| ScoredCandidate {
            action: Some(action),
            score,
        })
    }
}
