pub mod exploratory;
pub mod source_wrapper;
pub mod strategy;

pub use exploratory::ExploratoryHandler;
pub use source_wrapper::SourceRetrieverHandler;
pub use strategy::{ExplorationStrategy, StrategyHandler, StrategyRegistry, StrategyResult};
