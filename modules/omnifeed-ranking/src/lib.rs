pub mod click_head;
pub mod features;
pub mod linalg;
pub mod model;
pub mod registry;
pub mod reward_head;
pub mod scaler;
pub mod training;

pub use click_head::ClickHead;
pub use features::{build_features, feature_dim};
pub use model::{RankingModel, ScoreResult};
pub use registry::{score_content, ModelHandle, ModelRegistry};
pub use reward_head::RewardHead;
pub use scaler::StandardScaler;
pub use training::{collect_training_data, source_stats_for_content, TrainingExample, TrainingStats};
