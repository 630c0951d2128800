pub mod scorer;
pub mod select;

pub use scorer::RetrieverScorer;
pub use select::{select_retrievers, SelectionResult};
