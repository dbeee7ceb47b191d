// Library exports for the tactics bot
// This allows the binaries, benchmarks and integration tests to use the core search logic

pub mod arena;
pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod error;
pub mod evaluate;
pub mod search;
pub mod skirmish;
pub mod types;
