use std::collections::HashMap;

use omnifeed_common::{Content, ExplicitFeedback, SourceStats};
use omnifeed_embedding::EmbeddingFusion;
use serde::{Deserialize, Serialize};

use crate::click_head::ClickHead;
use crate::features::build_features;
use crate::reward_head::RewardHead;
use crate::scaler::StandardScaler;
use crate::training::TrainingExample;

/// Key used for the single reward head of a non-multi-objective model.
const SINGLE_OBJECTIVE_KEY: &str = "";

#[derive(Debug, Clone, Copy)]
pub struct ScoreResult {
    pub click: f64,
    pub reward: f64,
    pub combined: f64,
}

/// A named ranking model: fusion projection, feature scaler, click head, and
/// one or more reward heads.
#[derive(Serialize, Deserialize)]
pub struct RankingModel {
    name: String,
    is_default: bool,
    supports_objectives: bool,
    objectives: Vec<String>,
    fusion: EmbeddingFusion,
    scaler: Option<StandardScaler>,
    click_head: Option<ClickHead>,
    reward_heads: HashMap<String, RewardHead>,
    trained: bool,
}

impl RankingModel {
    pub fn new(
        name: impl Into<String>,
        fusion_output_dim: usize,
        supports_objectives: bool,
        is_default: bool,
    ) -> Self {
        let objectives = if supports_objectives {
            ExplicitFeedback::OBJECTIVE_TYPES.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };
        Self {
            name: name.into(),
            is_default,
            supports_objectives,
            objectives,
            fusion: EmbeddingFusion::new(fusion_output_dim),
            scaler: None,
            click_head: None,
            reward_heads: HashMap::new(),
            trained: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn supports_objectives(&self) -> bool {
        self.supports_objectives
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Fit the fusion projection, scaler, click head, and reward head(s) on
    /// the given examples. Leaves the model untrained (scoring falls back to
    /// priors) if there is nothing to learn from.
    pub fn train(&mut self, examples: &[TrainingExample]) {
        if examples.is_empty() {
            self.trained = false;
            return;
        }

        let embeddings_by_example: Vec<HashMap<String, Vec<f32>>> = examples
            .iter()
            .map(|ex| embeddings_map(&ex.content))
            .collect();
        self.fusion.fit(&embeddings_by_example);

        let raw_features: Vec<Vec<f64>> = examples
            .iter()
            .zip(embeddings_by_example.iter())
            .map(|(ex, by_type)| {
                let fused = self.fusion.transform(by_type);
                build_features(&ex.content, &fused, &SourceStats::default())
            })
            .collect();

        let scaler = match StandardScaler::fit(&raw_features) {
            Some(scaler) => scaler,
            None => {
                self.trained = false;
                return;
            }
        };
        let scaled: Vec<Vec<f64>> = raw_features.iter().map(|row| scaler.transform(row)).collect();
        self.scaler = Some(scaler);

        let click_labels: Vec<f64> = examples.iter().map(|ex| if ex.clicked { 1.0 } else { 0.0 }).collect();
        self.click_head = ClickHead::train(&scaled, &click_labels);

        self.reward_heads.clear();
        if self.supports_objectives {
            for objective in self.objectives.clone() {
                let (feats, labels) = reward_training_rows(examples, &scaled, Some(&objective));
                if labels.iter().any(|&l| l > 0.0) {
                    if let Some(head) = RewardHead::train(&feats, &labels, 1.0) {
                        self.reward_heads.insert(objective, head);
                    }
                }
            }
        } else {
            let (feats, labels) = reward_training_rows(examples, &scaled, None);
            if let Some(head) = RewardHead::train(&feats, &labels, 1.0) {
                self.reward_heads.insert(SINGLE_OBJECTIVE_KEY.to_string(), head);
            }
        }

        self.trained = true;
    }

    /// Score a content item against cold-start priors if untrained or
    /// embedding-less, else the learned heads with an OOD guard.
    pub fn score(&self, content: &Content, source_stats: &SourceStats, objective: Option<&str>) -> ScoreResult {
        let prior_reward = source_stats.avg_reward;
        if !self.trained || content.embeddings.is_empty() {
            return ScoreResult {
                click: 0.5,
                reward: prior_reward,
                combined: prior_reward,
            };
        }

        let scaler = match &self.scaler {
            Some(scaler) => scaler,
            None => {
                return ScoreResult {
                    click: 0.5,
                    reward: prior_reward,
                    combined: prior_reward,
                }
            }
        };

        let by_type = embeddings_map(content);
        let fused = self.fusion.transform(&by_type);
        let raw = build_features(content, &fused, source_stats);
        let scaled = scaler.transform(&raw);

        let click = self.click_head.as_ref().map(|h| h.predict(&scaled)).unwrap_or(0.5);
        let max_abs = scaled.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()));

        let reward = if max_abs > 10.0 {
            prior_reward
        } else {
            self.reward_for_objective(&scaled, objective).unwrap_or(prior_reward)
        };

        let combined = if self.click_head.is_some() { click * reward } else { reward };
        ScoreResult { click, reward, combined }
    }

    fn reward_for_objective(&self, scaled_features: &[f64], objective: Option<&str>) -> Option<f64> {
        if self.supports_objectives {
            let mean_of_present = || {
                let rewards: Vec<f64> = self
                    .reward_heads
                    .values()
                    .map(|head| head.predict(scaled_features).clamp(0.0, 5.0))
                    .collect();
                if rewards.is_empty() {
                    None
                } else {
                    Some(rewards.iter().sum::<f64>() / rewards.len() as f64)
                }
            };
            match objective {
                Some(obj) => self
                    .reward_heads
                    .get(obj)
                    .map(|head| head.predict(scaled_features).clamp(0.0, 5.0))
                    .or_else(mean_of_present),
                None => mean_of_present(),
            }
        } else {
            self.reward_heads
                .get(SINGLE_OBJECTIVE_KEY)
                .map(|head| head.predict(scaled_features).clamp(0.0, 5.0))
        }
    }
}

fn embeddings_map(content: &Content) -> HashMap<String, Vec<f32>> {
    content
        .embeddings
        .iter()
        .map(|e| (e.kind.clone(), e.vector.clone()))
        .collect()
}

/// Build the (features, labels) pair for one reward head: label is the
/// example's `reward_score` if it carries explicit feedback, restricted (for
/// a multi-objective head) to examples that selected that objective, else
/// `0.0`.
fn reward_training_rows(
    examples: &[TrainingExample],
    scaled: &[Vec<f64>],
    objective: Option<&str>,
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut feats = Vec::new();
    let mut labels = Vec::new();
    for (ex, row) in examples.iter().zip(scaled.iter()) {
        let Some(score) = ex.reward_score else { continue };
        let label = match objective {
            None => score,
            Some(obj) => {
                let selected = ex
                    .selections
                    .get(ExplicitFeedback::REWARD_TYPE_DIMENSION)
                    .map(|sels| sels.iter().any(|s| s.trim_start_matches("reward_type_") == obj))
                    .unwrap_or(false);
                if selected {
                    score
                } else {
                    0.0
                }
            }
        };
        feats.push(row.clone());
        labels.push(label);
    }
    (feats, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use omnifeed_common::{ConsumptionType, ContentType, Embedding};
    use std::collections::HashMap as Map;

    fn example(id: &str, clicked: bool, reward: Option<f64>, objective: Option<&str>) -> TrainingExample {
        let mut selections = Map::new();
        if let Some(obj) = objective {
            selections.insert(
                ExplicitFeedback::REWARD_TYPE_DIMENSION.to_string(),
                vec![obj.to_string()],
            );
        }
        TrainingExample {
            content: Content {
                id: id.to_string(),
                title: format!("Title {id}"),
                content_type: ContentType::Article,
                published_at: Utc::now(),
                ingested_at: Utc::now(),
                creator_ids: Vec::new(),
                consumption_type: ConsumptionType::OneShot,
                canonical_ids: Map::new(),
                seen: false,
                hidden: false,
                series_id: None,
                series_position: None,
                metadata: Map::new(),
                embeddings: vec![Embedding {
                    name: "text".to_string(),
                    kind: "text".to_string(),
                    model: "m".to_string(),
                    vector: vec![id.len() as f32, 0.0],
                }],
            },
            clicked,
            reward_score: reward,
            selections,
        }
    }

    #[test]
    fn untrained_model_returns_prior() {
        let model = RankingModel::new("default", 4, false, true);
        let content = example("c1", false, None, None).content;
        let stats = SourceStats { avg_reward: 3.2, ..SourceStats::default() };
        let result = model.score(&content, &stats, None);
        assert_eq!(result.click, 0.5);
        assert_eq!(result.reward, 3.2);
    }

    #[test]
    fn single_objective_model_trains_and_scores() {
        let mut model = RankingModel::new("default", 2, false, true);
        let examples: Vec<_> = (0..8)
            .map(|i| example(&format!("item-{i}"), i % 2 == 0, Some(if i % 2 == 0 { 4.0 } else { 1.0 }), None))
            .collect();
        model.train(&examples);
        assert!(model.is_trained());

        let stats = SourceStats::default();
        let result = model.score(&examples[0].content, &stats, None);
        assert!(result.reward >= 0.0 && result.reward <= 5.0);
    }

    #[test]
    fn multi_objective_model_trains_per_objective_heads() {
        let mut model = RankingModel::new("multi_objective", 2, true, false);
        let examples: Vec<_> = (0..8)
            .map(|i| {
                let objective = if i % 2 == 0 { "entertainment" } else { "curiosity" };
                example(&format!("item-{i}"), true, Some(4.0), Some(objective))
            })
            .collect();
        model.train(&examples);
        assert!(model.is_trained());

        let stats = SourceStats::default();
        let with_objective = model.score(&examples[0].content, &stats, Some("entertainment"));
        let without_objective = model.score(&examples[0].content, &stats, None);
        assert!(with_objective.reward >= 0.0);
        assert!(without_objective.reward >= 0.0);
    }

    #[test]
    fn missing_objective_head_falls_back_to_mean_of_present_heads_not_prior() {
        let mut model = RankingModel::new("multi_objective", 2, true, false);
        // Only "entertainment" ever gets a positive example, so "curiosity",
        // "foundational", and "targeted" never train a head.
        let examples: Vec<_> = (0..8)
            .map(|i| example(&format!("item-{i}"), true, Some(4.0), Some("entertainment")))
            .collect();
        model.train(&examples);
        assert!(model.is_trained());

        let stats = SourceStats { avg_reward: 1.0, ..SourceStats::default() };
        let missing_head = model.score(&examples[0].content, &stats, Some("foundational"));
        let mean_of_present = model.score(&examples[0].content, &stats, None);
        assert_eq!(missing_head.reward, mean_of_present.reward);
        assert_ne!(missing_head.reward, stats.avg_reward);
    }
}
