pub mod calculator;
pub mod classifier;
pub mod log;
pub mod overrides;
pub mod reconciler;
pub mod report;
pub mod sync;
