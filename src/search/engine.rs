// Recursive search engine
//
// A single recursion parameterized by `SearchPlan`. Sequential nodes expand their
// actions lazily so an alpha-beta cutoff stops before the remaining siblings are
// generated. Forked nodes expand eagerly, search their children on the current rayon
// pool and fold the results in enumeration order, which keeps their results identical
// to the sequential fold.

use log::{debug, trace};
use rayon::prelude::*;

use crate::config::{Execution, SearchConfig};
use crate::evaluate::Evaluator;
use crate::search::cluster::ClusterSampler;
use crate::search::reduction::{collect_expanded_states, expand_action, remove_redundant_actions};
use crate::search::stats::SearchStats;
use crate::search::{
    ExpandedState, NodeFold, Pruning, Reduction, Role, ScoredCandidate, SearchPlan, Window,
};
use crate::types::{Player, Position};

/// Branch limits shared by every node of a search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub bad_branch_probability: f64,
    pub renormalize_after_cutoff: bool,
    /// Subtrees with this many plies left or fewer are never forked
    pub sequential_cutoff_depth: u8,
}

impl SearchSettings {
    pub fn from_config(config: &SearchConfig) -> Self {
        SearchSettings {
            bad_branch_probability: config.bad_branch_probability,
            renormalize_after_cutoff: config.renormalize_after_cutoff,
            sequential_cutoff_depth: config.sequential_cutoff_depth,
        }
    }
}

pub struct SearchEngine<'a, P: Position> {
    evaluator: &'a dyn Evaluator<P>,
    sampler: &'a ClusterSampler,
    stats: &'a SearchStats,
    plan: SearchPlan,
    settings: SearchSettings,
}

/// State of one top-level search
struct Descent<'e, 'a, P: Position> {
    engine: &'e SearchEngine<'a, P>,
    perspective: Player,
    root_depth: u8,
}

impl<'a, P: Position> SearchEngine<'a, P> {
    pub fn new(
        evaluator: &'a dyn Evaluator<P>,
        sampler: &'a ClusterSampler,
        stats: &'a SearchStats,
        plan: SearchPlan,
        settings: SearchSettings,
    ) -> Self {
        SearchEngine {
            evaluator,
            sampler,
            stats,
            plan,
            settings,
        }
    }

    pub fn plan(&self) -> SearchPlan {
        self.plan
    }

    /// Searches `depth` plies ahead for the side to move in `position`
    ///
    /// Parallel plans fork onto the rayon pool the caller is running in.
    pub fn run(&self, position: &P, depth: u8) -> ScoredCandidate<P::Action> {
        let descent = Descent {
            engine: self,
            perspective: position.current_mover(),
            root_depth: depth,
        };
        descent.search(position, depth, Role::Maximizing, Window::FULL)
    }
}

impl<'e, 'a, P: Position> Descent<'e, 'a, P> {
    fn leaf(&self, position: &P) -> ScoredCandidate<P::Action> {
        ScoredCandidate::leaf(self.engine.evaluator.evaluate(position, self.perspective))
    }

    fn search(
        &self,
        position: &P,
        depth: u8,
        role: Role,
        window: Window,
    ) -> ScoredCandidate<P::Action> {
        self.engine.stats.record_node();

        if depth == 0 || position.is_terminal() {
            return self.leaf(position);
        }

        let actions = position.legal_actions();
        if !actions.is_empty() {
            return self.expand(position, actions, depth, role, window);
        }

        if depth == self.root_depth {
            debug!(
                "No legal action for the {} player at the root",
                position.current_mover().as_str()
            );
            return ScoredCandidate::leaf(role.stalled_score());
        }

        // The stalled side hands over without consuming a ply
        let mut passed = position.clone();
        passed.pass_turn();
        let actions = if passed.is_terminal() {
            Vec::new()
        } else {
            passed.legal_actions()
        };
        if actions.is_empty() {
            return self.leaf(&passed);
        }
        self.expand(&passed, actions, depth, role.flip(), window)
    }

    fn expand(
        &self,
        position: &P,
        mut actions: Vec<P::Action>,
        depth: u8,
        role: Role,
        window: Window,
    ) -> ScoredCandidate<P::Action> {
        remove_redundant_actions(&mut actions);

        let plan = self.engine.plan;
        let settings = self.engine.settings;
        let floor = settings.bad_branch_probability;
        let renormalize = settings.renormalize_after_cutoff;
        let forked =
            plan.execution == Execution::Parallel && depth > settings.sequential_cutoff_depth;

        let folded = if plan.reduction == Reduction::Clustered || forked {
            let mut states = collect_expanded_states(position, &actions, floor, renormalize);
            if plan.reduction == Reduction::Clustered {
                states = self
                    .engine
                    .sampler
                    .sample(states, self.engine.evaluator, self.perspective);
            }
            if forked {
                self.fold_forked(position.current_mover(), states, depth, role, window)
            } else {
                self.fold_in_order(position.current_mover(), states.into_iter(), depth, role, window)
            }
        } else {
            let states = actions
                .iter()
                .flat_map(|action| expand_action(position, action, floor, renormalize));
            self.fold_in_order(position.current_mover(), states, depth, role, window)
        };

        // Every action was rejected or every outcome cut off
        folded.unwrap_or_else(|| self.leaf(position))
    }

    fn child(
        &self,
        mover: Player,
        state: &ExpandedState<P>,
        depth: u8,
        role: Role,
        window: Window,
    ) -> ScoredCandidate<P::Action> {
        let child_role = role.after_move(mover, state.position.current_mover());
        self.search(&state.position, depth - 1, child_role, window)
    }

    fn fold_in_order<I>(
        &self,
        mover: Player,
        states: I,
        depth: u8,
        role: Role,
        mut window: Window,
    ) -> Option<ScoredCandidate<P::Action>>
    where
        I: Iterator<Item = ExpandedState<P>>,
    {
        let pruning = self.engine.plan.pruning;
        let mut fold = NodeFold::new(role, self.engine.plan.backup);

        for state in states {
            let child_window = fold.child_window(window, state.probability, pruning);
            let result = self.child(mover, &state, depth, role, child_window);
            fold.push(&state.action, state.probability, result.score);

            if pruning == Pruning::AlphaBeta {
                window = fold.tighten(window);
                if window.is_closed() {
                    trace!("Cutoff at depth {} after {} children", depth, fold.folded());
                    break;
                }
            }
        }
        fold.finish()
    }

    fn fold_forked(
        &self,
        mover: Player,
        states: Vec<ExpandedState<P>>,
        depth: u8,
        role: Role,
        mut window: Window,
    ) -> Option<ScoredCandidate<P::Action>> {
        let pruning = self.engine.plan.pruning;
        let mut fold = NodeFold::new(role, self.engine.plan.backup);
        let mut siblings = states.as_slice();

        if pruning == Pruning::AlphaBeta {
            // Establish a bound before forking so siblings start with a useful window
            let (first, rest) = siblings.split_first()?;
            let child_window = fold.child_window(window, first.probability, pruning);
            let result = self.child(mover, first, depth, role, child_window);
            fold.push(&first.action, first.probability, result.score);
            window = fold.tighten(window);
            if window.is_closed() {
                trace!("Cutoff at depth {} before forking", depth);
                return fold.finish();
            }
            siblings = rest;
        }

        let results: Vec<ScoredCandidate<P::Action>> = siblings
            .par_iter()
            .map(|state| {
                let child_window = fold.child_window(window, state.probability, pruning);
                self.child(mover, state, depth, role, child_window)
            })
            .collect();

        for (state, result) in siblings.iter().zip(results) {
            fold.push(&state.action, state.probability, result.score);
            if pruning == Pruning::AlphaBeta {
                window = fold.tighten(window);
                if window.is_closed() {
                    trace!("Cutoff at depth {} after {} children", depth, fold.folded());
                    break;
                }
            }
        }
        fold.finish()
    }
}
