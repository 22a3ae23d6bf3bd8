mod dispatcher;
mod reporter;
mod runner;
mod snapshot;
mod stats;
#[cfg(test)]
mod test_support;
mod worker;

pub use runner::{Engine, RunSummary};
pub use stats::StatsAggregator;
