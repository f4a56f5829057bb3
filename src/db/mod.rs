pub mod daily_stats;
pub mod initialize;
pub mod log;
pub mod migrate;
pub mod overrides;
pub mod pairs;
pub mod pool;
pub mod queries;
pub mod stats;
pub mod store;
