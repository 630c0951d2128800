pub mod engine;
pub mod feed;

pub use engine::{Engine, EngineDeps};
pub use feed::{FeedItem, FeedResult};
