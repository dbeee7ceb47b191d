// Decision logging module
//
// Appends one JSON line per decision to a log file so search behaviour can be
// inspected offline. Writes go through a mutex because a single bot may be driven
// from several threads.

use log::{error, info};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Arc;

/// Represents a single decision log entry
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DecisionLogEntry {
    pub decision: u64,
    pub algorithm: String,
    pub execution: String,
    pub depth: u8,
    pub mover: String,
    pub chosen_action: Option<String>,
    pub score: f64,
    /// Nodes searched by this decision alone
    pub nodes_visited: u64,
    pub elapsed_us: u128,
    pub timestamp: String,
}

/// Shared decision logger state
#[derive(Clone)]
pub struct DebugLogger {
    file: Arc<Mutex<Option<File>>>,
    enabled: bool,
}

impl DebugLogger {
    /// Creates a new decision logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    pub fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
        {
            Ok(file) => {
                info!("Decision logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Arc::new(Mutex::new(Some(file))),
                    enabled: true,
                }
            }
            Err(e) => {
                error!("Failed to create decision log file '{}': {}", log_file_path, e);
                Self::disabled()
            }
        }
    }

    /// Creates a disabled logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stamps the entry with the current time and appends it
    pub fn log_decision(&self, mut entry: DecisionLogEntry) {
        if !self.enabled {
            return;
        }
        entry.timestamp = chrono::Utc::now().to_rfc3339();

        let mut file_guard = self.file.lock();
        let Some(file) = file_guard.as_mut() else {
            return;
        };

        match serde_json::to_string(&entry) {
            Ok(json_line) => {
                if let Err(e) = writeln!(file, "{}", json_line) {
                    error!("Failed to write decision log entry: {}", e);
                } else if let Err(e) = file.flush() {
                    error!("Failed to flush decision log: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to serialize decision log entry: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn entry(decision: u64) -> DecisionLogEntry {
        DecisionLogEntry {
            decision,
            algorithm: "alpha_beta".to_string(),
            execution: "sequential".to_string(),
            depth: 2,
            mover: "first".to_string(),
            chosen_action: Some("a1".to_string()),
            score: 12.5,
            nodes_visited: 40,
            elapsed_us: 900,
            timestamp: String::new(),
        }
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let logger = DebugLogger::disabled();
        assert!(!logger.is_enabled());
        logger.log_decision(entry(1));
    }

    #[test]
    fn test_entries_are_appended_as_json_lines() {
        let path = std::env::temp_dir().join(format!("decisions-{}.jsonl", std::process::id()));
        let path_str = path.to_string_lossy().to_string();

        let logger = DebugLogger::new(true, &path_str);
        assert!(logger.is_enabled());
        logger.log_decision(entry(1));
        logger.log_decision(entry(2));

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed["decision"], 2);
        assert_eq!(parsed["chosen_action"], "a1");
        assert!(!parsed["timestamp"].as_str().unwrap().is_empty());

        let _ = fs::remove_file(&path);
    }
}
