pub mod advancement;
pub mod bracket_builder;
pub mod competition;
pub mod format_selector;
pub mod match_registry;
pub mod projection;
pub mod results_aggregator;
pub mod standings;
