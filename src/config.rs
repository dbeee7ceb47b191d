// Configuration module for reading Agent.toml
// This module provides OOP-style configuration management for the search bot

use log::warn;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub search: SearchConfig,
    pub clustering: ClusteringConfig,
    pub evaluator: EvaluatorConfig,
    pub coefficients: BTreeMap<String, toml::Value>,
    pub rollout: RolloutConfig,
    pub arena: ArenaConfig,
    pub debug: DebugConfig,
}

/// Search algorithm family
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Minimax,
    AlphaBeta,
    Expectimax,
    ClusteredMinimax,
}

impl Algorithm {
    pub fn all() -> [Algorithm; 4] {
        [
            Algorithm::Minimax,
            Algorithm::AlphaBeta,
            Algorithm::Expectimax,
            Algorithm::ClusteredMinimax,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Minimax => "minimax",
            Algorithm::AlphaBeta => "alpha_beta",
            Algorithm::Expectimax => "expectimax",
            Algorithm::ClusteredMinimax => "clustered_minimax",
        }
    }
}

/// Whether sibling subtrees are searched one after another or forked onto the pool
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    Sequential,
    Parallel,
}

impl Execution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Execution::Sequential => "sequential",
            Execution::Parallel => "parallel",
        }
    }
}

/// Search constants
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub algorithm: Algorithm,
    pub execution: Execution,
    pub depth: u8,
    /// Chance outcomes less likely than this are not explored
    pub bad_branch_probability: f64,
    pub renormalize_after_cutoff: bool,
    /// Worker threads for parallel execution, 0 means one per hardware thread
    pub threads: usize,
    /// Subtrees with this many plies left or fewer are searched sequentially
    pub sequential_cutoff_depth: u8,
}

/// Cluster-based branch sampling constants
#[derive(Debug, Deserialize, Clone)]
pub struct ClusteringConfig {
    pub clusters_amount: usize,
    pub representatives: usize,
    pub min_states_for_clustering: usize,
    pub max_iterations: usize,
    pub seed: u64,
}

/// Position evaluator selection
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    Heuristic,
    Rollout,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvaluatorConfig {
    pub kind: EvaluatorKind,
}

/// Random-playout evaluation constants
#[derive(Debug, Deserialize, Clone)]
pub struct RolloutConfig {
    pub games: usize,
    pub min_alive_units: usize,
    pub seed: u64,
    pub max_plies: usize,
}

/// Match harness constants
#[derive(Debug, Deserialize, Clone)]
pub struct ArenaConfig {
    pub games: usize,
    pub max_plies: usize,
    pub seed: u64,
    pub first: Contender,
    pub second: Contender,
}

/// A side in the arena: either a search algorithm or a uniformly random mover
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Contender {
    Random,
    Minimax,
    AlphaBeta,
    Expectimax,
    ClusteredMinimax,
}

impl Contender {
    /// Search algorithm backing this contender, if any
    pub fn algorithm(&self) -> Option<Algorithm> {
        match self {
            Contender::Random => None,
            Contender::Minimax => Some(Algorithm::Minimax),
            Contender::AlphaBeta => Some(Algorithm::AlphaBeta),
            Contender::Expectimax => Some(Algorithm::Expectimax),
            Contender::ClusteredMinimax => Some(Algorithm::ClusteredMinimax),
        }
    }
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

/// Heuristic evaluator coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub is_general_bonus: f64,
    pub row_penalty: f64,
    pub no_def_penalty: f64,
}

impl Coefficients {
    pub const GENERAL_BONUS_KEY: &'static str = "isGeneralBonus";
    pub const ROW_PENALTY_KEY: &'static str = "rowPenalty";
    pub const NO_DEF_PENALTY_KEY: &'static str = "noDefPenalty";

    /// Builds coefficients from any key -> textual value lookup
    ///
    /// Fails on the first key that is absent, unparsable, non-finite or not positive.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| -> Result<f64, ConfigError> {
            let raw = lookup(key).ok_or(ConfigError::MissingCoefficient(key))?;
            let value: f64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidCoefficient {
                    key,
                    value: raw.clone(),
                })?;
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidCoefficient { key, value: raw });
            }
            Ok(value)
        };

        Ok(Coefficients {
            is_general_bonus: read(Self::GENERAL_BONUS_KEY)?,
            row_penalty: read(Self::ROW_PENALTY_KEY)?,
            no_def_penalty: read(Self::NO_DEF_PENALTY_KEY)?,
        })
    }

    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| map.get(key).cloned())
    }

    /// Accepts TOML numbers as well as numeric strings
    pub fn from_table(table: &BTreeMap<String, toml::Value>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| {
            table.get(key).map(|value| match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
    }

    /// Parses `key=value` properties text, ignoring blank lines and `#`/`!` comments
    pub fn from_properties(text: &str) -> Result<Self, ConfigError> {
        let map: HashMap<String, String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| {
                let (key, value) = line.split_once('=').or_else(|| line.split_once(':'))?;
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        Self::from_map(&map)
    }

    pub fn from_properties_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::from_properties(&text)
    }
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Agent.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, ConfigError>` - Parsed and validated configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads default configuration from Agent.toml in the project root
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::from_file("Agent.toml")
    }

    /// Checks cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let floor = self.search.bad_branch_probability;
        if !(0.0..=1.0).contains(&floor) {
            return Err(ConfigError::Invalid(format!(
                "search.bad_branch_probability must be within [0, 1], got {}",
                floor
            )));
        }
        if self.clustering.clusters_amount == 0 {
            return Err(ConfigError::Invalid(
                "clustering.clusters_amount must be positive".to_string(),
            ));
        }
        if self.clustering.representatives == 0 {
            return Err(ConfigError::Invalid(
                "clustering.representatives must be positive".to_string(),
            ));
        }
        if self.rollout.games == 0 {
            return Err(ConfigError::Invalid(
                "rollout.games must be positive".to_string(),
            ));
        }
        self.coefficients()?;
        Ok(())
    }

    /// Evaluator coefficients from the `[coefficients]` table
    pub fn coefficients(&self) -> Result<Coefficients, ConfigError> {
        Coefficients::from_table(&self.coefficients)
    }

    /// Returns a copy searching with another algorithm
    pub fn with_algorithm(&self, algorithm: Algorithm) -> Self {
        let mut config = self.clone();
        config.search.algorithm = algorithm;
        config
    }

    /// Returns a copy searching with another execution mode
    pub fn with_execution(&self, execution: Execution) -> Self {
        let mut config = self.clone();
        config.search.execution = execution;
        config
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Agent.toml
    pub fn default_hardcoded() -> Self {
        let mut coefficients = BTreeMap::new();
        coefficients.insert(
            Coefficients::GENERAL_BONUS_KEY.to_string(),
            toml::Value::Float(1.5),
        );
        coefficients.insert(
            Coefficients::ROW_PENALTY_KEY.to_string(),
            toml::Value::Float(0.8),
        );
        coefficients.insert(
            Coefficients::NO_DEF_PENALTY_KEY.to_string(),
            toml::Value::Float(0.7),
        );

        Config {
            search: SearchConfig {
                algorithm: Algorithm::AlphaBeta,
                execution: Execution::Sequential,
                depth: 3,
                bad_branch_probability: 0.1,
                renormalize_after_cutoff: false,
                threads: 0,
                sequential_cutoff_depth: 1,
            },
            clustering: ClusteringConfig {
                clusters_amount: 5,
                representatives: 5,
                min_states_for_clustering: 6,
                max_iterations: 100,
                seed: 42,
            },
            evaluator: EvaluatorConfig {
                kind: EvaluatorKind::Heuristic,
            },
            coefficients,
            rollout: RolloutConfig {
                games: 20,
                min_alive_units: 4,
                seed: 7,
                max_plies: 400,
            },
            arena: ArenaConfig {
                games: 10,
                max_plies: 500,
                seed: 1,
                first: Contender::AlphaBeta,
                second: Contender::Random,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "decisions.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            warn!(
                "Could not load Agent.toml ({}), using hardcoded defaults",
                e
            );
            Self::default_hardcoded()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_can_be_created() {
        let config = Config::default_hardcoded();
        assert_eq!(config.search.depth, 3);
        assert_eq!(config.search.bad_branch_probability, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_agent_toml_can_be_parsed() {
        // This test ensures Agent.toml is valid and can be parsed
        let result = Config::from_file("Agent.toml");
        assert!(
            result.is_ok(),
            "Failed to parse Agent.toml: {:?}",
            result.err()
        );
    }

    #[test]
    fn test_all_config_values_match_hardcoded_defaults() {
        let file_config = Config::from_file("Agent.toml").expect("Agent.toml should be parseable");
        let hardcoded_config = Config::default_hardcoded();

        // Search
        assert_eq!(file_config.search.algorithm, hardcoded_config.search.algorithm);
        assert_eq!(file_config.search.execution, hardcoded_config.search.execution);
        assert_eq!(file_config.search.depth, hardcoded_config.search.depth);
        assert_eq!(
            file_config.search.bad_branch_probability,
            hardcoded_config.search.bad_branch_probability
        );
        assert_eq!(
            file_config.search.renormalize_after_cutoff,
            hardcoded_config.search.renormalize_after_cutoff
        );
        assert_eq!(
            file_config.search.sequential_cutoff_depth,
            hardcoded_config.search.sequential_cutoff_depth
        );

        // Clustering
        assert_eq!(
            file_config.clustering.clusters_amount,
            hardcoded_config.clustering.clusters_amount
        );
        assert_eq!(
            file_config.clustering.min_states_for_clustering,
            hardcoded_config.clustering.min_states_for_clustering
        );

        // Coefficients
        assert_eq!(
            file_config.coefficients().unwrap(),
            hardcoded_config.coefficients().unwrap()
        );

        // Rollout
        assert_eq!(file_config.rollout.games, hardcoded_config.rollout.games);
        assert_eq!(
            file_config.rollout.min_alive_units,
            hardcoded_config.rollout.min_alive_units
        );

        // Arena
        assert_eq!(file_config.arena.first, hardcoded_config.arena.first);
        assert_eq!(file_config.arena.second, hardcoded_config.arena.second);
    }

    #[test]
    fn test_missing_file_returns_error() {
        let result = Config::from_file("nonexistent.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_out_of_range_floor_is_rejected() {
        let mut config = Config::default_hardcoded();
        config.search.bad_branch_probability = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_coefficients_from_properties() {
        let text = "# evaluator\nisGeneralBonus=1.5\nrowPenalty = 0.8\n\nnoDefPenalty=0.7\n";
        let coefficients = Coefficients::from_properties(text).unwrap();
        assert_eq!(coefficients.is_general_bonus, 1.5);
        assert_eq!(coefficients.row_penalty, 0.8);
        assert_eq!(coefficients.no_def_penalty, 0.7);
    }

    #[test]
    fn test_missing_coefficient_fails_fast() {
        let mut map = HashMap::new();
        map.insert("isGeneralBonus".to_string(), "1.5".to_string());
        map.insert("rowPenalty".to_string(), "0.8".to_string());

        let result = Coefficients::from_map(&map);
        assert!(matches!(
            result,
            Err(ConfigError::MissingCoefficient("noDefPenalty"))
        ));
    }

    #[test]
    fn test_unparsable_coefficient_fails_fast() {
        let result =
            Coefficients::from_properties("isGeneralBonus=lots\nrowPenalty=0.8\nnoDefPenalty=0.7");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidCoefficient {
                key: "isGeneralBonus",
                ..
            })
        ));
    }

    #[test]
    fn test_coefficients_accept_integers_and_strings_in_toml() {
        let mut table = BTreeMap::new();
        table.insert("isGeneralBonus".to_string(), toml::Value::Integer(2));
        table.insert("rowPenalty".to_string(), toml::Value::String("0.5".into()));
        table.insert("noDefPenalty".to_string(), toml::Value::Float(0.25));

        let coefficients = Coefficients::from_table(&table).unwrap();
        assert_eq!(coefficients.is_general_bonus, 2.0);
        assert_eq!(coefficients.row_penalty, 0.5);
        assert_eq!(coefficients.no_def_penalty, 0.25);
    }

    #[test]
    fn test_config_without_coefficients_is_rejected() {
        let text = fs::read_to_string("Agent.toml").unwrap();
        let stripped = text.replace("noDefPenalty", "noDefenceAtAll");
        assert!(matches!(
            Config::from_toml_str(&stripped),
            Err(ConfigError::MissingCoefficient("noDefPenalty"))
        ));
    }
}
