// Decision-making facade
//
// A `Bot` owns everything one agent needs across decisions: the configuration, the
// shared evaluator, the cluster sampler, the worker pool and the search statistics.
// Each call to `decide_move` runs one top-level search and leaves its statistics
// readable through `last_search_stats`.

use log::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::{Config, Execution};
use crate::debug_logger::{DebugLogger, DecisionLogEntry};
use crate::error::SearchError;
use crate::evaluate::Evaluator;
use crate::search::{
    ClusterSampler, Clustering, ScoredCandidate, SearchEngine, SearchPlan, SearchSettings,
    SearchStats, SearchSummary,
};
use crate::types::Position;

/// Anything that can pick an action for the side to move
pub trait MovePolicy<P: Position> {
    fn name(&self) -> String;

    /// `Ok(None)` when the mover has nothing to play
    fn choose(&mut self, position: &P) -> Result<Option<P::Action>, SearchError>;

    /// Accumulated search statistics, for policies that search
    fn stats(&self) -> Option<SearchSummary> {
        None
    }
}

/// Search agent with OOP-style API
/// Takes static configuration dependencies and exposes one method per decision
pub struct Bot<P: Position> {
    config: Config,
    evaluator: Arc<dyn Evaluator<P>>,
    sampler: ClusterSampler,
    stats: SearchStats,
    pool: rayon::ThreadPool,
    logger: DebugLogger,
    decisions: AtomicU64,
}

impl<P: Position> Bot<P> {
    /// Creates a new Bot instance with the given configuration
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    /// * `evaluator` - Position evaluator shared by every search branch
    ///
    /// # Returns
    /// * `Err` if the configuration is invalid or the worker pool cannot be built
    pub fn new(config: &Config, evaluator: Arc<dyn Evaluator<P>>) -> Result<Self, SearchError> {
        config.validate()?;

        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|index| format!("search-{}", index));
        if config.search.threads > 0 {
            builder = builder.num_threads(config.search.threads);
        }
        let pool = builder.build()?;

        Ok(Bot {
            config: config.clone(),
            evaluator,
            sampler: ClusterSampler::from_config(&config.clustering),
            stats: SearchStats::new(),
            pool,
            logger: DebugLogger::new(config.debug.enabled, &config.debug.log_file_path),
            decisions: AtomicU64::new(0),
        })
    }

    /// Replaces the clustering strategy used by clustered minimax
    pub fn with_clustering(mut self, clustering: Arc<dyn Clustering>) -> Self {
        self.sampler = ClusterSampler::new(clustering, &self.config.clustering);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Short label such as `alpha_beta/parallel`
    pub fn label(&self) -> String {
        format!(
            "{}/{}",
            self.config.search.algorithm.as_str(),
            self.config.search.execution.as_str()
        )
    }

    /// Best action for the side to move, `None` for depth 0 or a stalled position
    pub fn decide_move(&self, position: &P, depth: u8) -> Result<Option<P::Action>, SearchError> {
        Ok(self.decide(position, depth)?.action)
    }

    /// Runs one top-level search and returns the root's scored candidate
    ///
    /// # Arguments
    /// * `position` - Position to decide for; never mutated
    /// * `depth` - Plies to search ahead
    ///
    /// # Returns
    /// * `Err(SearchError::TaskPanicked)` if any branch of the search panicked
    pub fn decide(&self, position: &P, depth: u8) -> Result<ScoredCandidate<P::Action>, SearchError> {
        let search = &self.config.search;
        let plan = SearchPlan::new(search.algorithm, search.execution);
        let engine = SearchEngine::new(
            self.evaluator.as_ref(),
            &self.sampler,
            &self.stats,
            plan,
            SearchSettings::from_config(search),
        );

        let nodes_before = self.stats.nodes_visited();
        self.stats.start_stopwatch();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match plan.execution {
            Execution::Parallel => self.pool.install(|| engine.run(position, depth)),
            Execution::Sequential => engine.run(position, depth),
        }));
        self.stats.stop_stopwatch();

        let result = outcome.map_err(|payload| {
            let message = panic_message(payload.as_ref());
            error!("Search for {} panicked: {}", self.label(), message);
            SearchError::TaskPanicked(message)
        })?;

        let decision = self.decisions.fetch_add(1, Ordering::Relaxed) + 1;
        let summary = self.stats.summary();
        // The counter accumulates until reset_stats; report this decision's share
        let searched = summary.nodes_visited.saturating_sub(nodes_before);
        info!(
            "Decision {} [{}, depth {}]: chose {:?} (score: {:.3}, nodes: {}, time: {}us)",
            decision,
            self.label(),
            depth,
            result.action,
            result.score,
            searched,
            summary.elapsed.as_micros()
        );

        if self.logger.is_enabled() {
            self.logger.log_decision(DecisionLogEntry {
                decision,
                algorithm: search.algorithm.as_str().to_string(),
                execution: search.execution.as_str().to_string(),
                depth,
                mover: position.current_mover().as_str().to_string(),
                chosen_action: result.action.as_ref().map(|action| format!("{:?}", action)),
                score: result.score,
                nodes_visited: searched,
                elapsed_us: summary.elapsed.as_micros(),
                timestamp: String::new(),
            });
        }

        Ok(result)
    }

    /// Nodes visited since the last reset and the duration of the last decision
    pub fn last_search_stats(&self) -> SearchSummary {
        self.stats.summary()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

impl<P: Position> MovePolicy<P> for Bot<P> {
    fn name(&self) -> String {
        self.label()
    }

    fn choose(&mut self, position: &P) -> Result<Option<P::Action>, SearchError> {
        let depth = self.config.search.depth;
        self.decide_move(position, depth)
    }

    fn stats(&self) -> Option<SearchSummary> {
        Some(self.last_search_stats())
    }
}

/// Plays a uniformly random legal action
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        RandomPolicy {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<P: Position> MovePolicy<P> for RandomPolicy {
    fn name(&self) -> String {
        "random".to_string()
    }

    fn choose(&mut self, position: &P) -> Result<Option<P::Action>, SearchError> {
        let mut actions = position.legal_actions();
        if actions.is_empty() {
            return Ok(None);
        }
        let index = self.rng.random_range(0..actions.len());
        Ok(Some(actions.swap_remove(index)))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Algorithm;
    use crate::evaluate::build_evaluator;
    use crate::skirmish::Skirmish;

    fn bot(config: &Config) -> Bot<Skirmish> {
        Bot::new(config, build_evaluator(config).unwrap()).unwrap()
    }

    #[test]
    fn test_decide_move_is_deterministic() {
        let config = Config::default_hardcoded();
        let bot = bot(&config);
        let game = Skirmish::default_placement();

        let first = bot.decide_move(&game, 2).unwrap();
        let second = bot.decide_move(&game, 2).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_stats_accumulate_until_reset() {
        let config = Config::default_hardcoded().with_algorithm(Algorithm::Minimax);
        let bot = bot(&config);
        let game = Skirmish::default_placement();

        bot.decide_move(&game, 1).unwrap();
        let once = bot.last_search_stats().nodes_visited;
        bot.decide_move(&game, 1).unwrap();
        assert_eq!(bot.last_search_stats().nodes_visited, once * 2);

        bot.reset_stats();
        assert_eq!(bot.last_search_stats(), SearchSummary::default());
    }

    #[test]
    fn test_depth_zero_returns_no_action() {
        let config = Config::default_hardcoded();
        let bot = bot(&config);
        assert_eq!(bot.decide_move(&Skirmish::default_placement(), 0).unwrap(), None);
        assert_eq!(bot.last_search_stats().nodes_visited, 1);
    }

    #[test]
    fn test_decision_log_counts_each_decision_alone() {
        let path = std::env::temp_dir().join(format!("bot-decisions-{}.jsonl", std::process::id()));
        let mut config = Config::default_hardcoded().with_algorithm(Algorithm::Minimax);
        config.debug.enabled = true;
        config.debug.log_file_path = path.to_string_lossy().to_string();
        let bot = bot(&config);
        let game = Skirmish::default_placement();

        bot.decide_move(&game, 1).unwrap();
        let once = bot.last_search_stats().nodes_visited;
        bot.decide_move(&game, 1).unwrap();
        assert_eq!(bot.last_search_stats().nodes_visited, once * 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["nodes_visited"], once);
        assert_eq!(entries[1]["nodes_visited"], once);
        assert_eq!(entries[1]["decision"], 2);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default_hardcoded();
        config.search.bad_branch_probability = 1.5;
        let evaluator = build_evaluator::<Skirmish>(&Config::default_hardcoded()).unwrap();
        assert!(matches!(
            Bot::new(&config, evaluator),
            Err(SearchError::Config(_))
        ));
    }

    #[test]
    fn test_random_policy_plays_legal_actions() {
        let game = Skirmish::default_placement();
        let mut policy = RandomPolicy::new(5);
        for _ in 0..10 {
            let action = MovePolicy::<Skirmish>::choose(&mut policy, &game)
                .unwrap()
                .unwrap();
            assert!(game.legal_actions().contains(&action));
        }
    }

    #[test]
    fn test_panic_messages_are_extracted() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
