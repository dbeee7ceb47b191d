// Branch reduction heuristics
//
// Redundant-move elimination and the bad-branch probability cutoff, plus the eager
// expansion used by the parallel and clustered searches.

use log::warn;
use std::collections::HashSet;

use crate::search::ExpandedState;
use crate::types::{ChanceOutcome, GameAction, Position};

/// Keeps one action per (unit kind, destination) pair, preserving enumeration order
pub fn remove_redundant_actions<A: GameAction>(actions: &mut Vec<A>) {
    let mut seen = HashSet::new();
    actions.retain(|action| seen.insert((action.unit_kind(), action.destination())));
}

/// Whether a chance outcome is likely enough to be explored
#[inline]
pub fn survives_cutoff(probability: f64, floor: f64) -> bool {
    probability > 0.0 && probability >= floor
}

/// Drops outcomes under the floor
///
/// Surviving probabilities no longer sum to 1 unless `renormalize` is set, in which
/// case they are rescaled by their sum.
pub fn apply_cutoff<P>(
    outcomes: Vec<ChanceOutcome<P>>,
    floor: f64,
    renormalize: bool,
) -> Vec<ChanceOutcome<P>> {
    let mut kept: Vec<ChanceOutcome<P>> = outcomes
        .into_iter()
        .filter(|outcome| survives_cutoff(outcome.probability, floor))
        .collect();

    if renormalize {
        let total: f64 = kept.iter().map(|o| o.probability).sum();
        if total > 0.0 {
            for outcome in kept.iter_mut() {
                outcome.probability /= total;
            }
        }
    }
    kept
}

/// Applies one action and returns its surviving outcomes as next-level states
///
/// An action the rule engine rejects yields no state; the branch is abandoned.
pub fn expand_action<P: Position>(
    position: &P,
    action: &P::Action,
    floor: f64,
    renormalize: bool,
) -> Vec<ExpandedState<P>> {
    let outcomes = match position.apply_action(action) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            warn!("Abandoning branch {:?}: {}", action, e);
            return Vec::new();
        }
    };
    apply_cutoff(outcomes, floor, renormalize)
        .into_iter()
        .map(|outcome| ExpandedState {
            position: outcome.position,
            probability: outcome.probability,
            action: action.clone(),
        })
        .collect()
}

/// Expands every action eagerly, keeping enumeration order
pub fn collect_expanded_states<P: Position>(
    position: &P,
    actions: &[P::Action],
    floor: f64,
    renormalize: bool,
) -> Vec<ExpandedState<P>> {
    actions
        .iter()
        .flat_map(|action| expand_action(position, action, floor, renormalize))
        .collect()
}
