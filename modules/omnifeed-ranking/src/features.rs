use omnifeed_common::{Content, ContentType, SourceStats};

/// `fused_vector (output_dim) ‖ [avg_reward, click_rate, scaled engagement]
/// ‖ [has_thumbnail, scaled title length] ‖ one-hot(content_type)`.
pub fn build_features(content: &Content, fused: &[f32], source_stats: &SourceStats) -> Vec<f64> {
    let mut features: Vec<f64> = fused.iter().map(|&x| x as f64).collect();

    features.push(source_stats.avg_reward);
    features.push(source_stats.click_rate);
    features.push((source_stats.engagement_count as f64 / 100.0).min(1.0));

    features.push(if content.metadata.contains_key("thumbnail") { 1.0 } else { 0.0 });
    features.push((content.title.chars().count() as f64 / 100.0).min(1.0));

    let mut one_hot = vec![0.0_f64; ContentType::ONE_HOT_ORDER.len()];
    one_hot[content.content_type.one_hot_index()] = 1.0;
    features.extend(one_hot);

    features
}

/// Total feature count for a given fusion output dimension, for pre-sizing
/// or sanity checks.
pub fn feature_dim(fusion_output_dim: usize) -> usize {
    fusion_output_dim + 3 + 2 + ContentType::ONE_HOT_ORDER.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn content(content_type: ContentType, has_thumbnail: bool) -> Content {
        let mut metadata = HashMap::new();
        if has_thumbnail {
            metadata.insert("thumbnail".to_string(), serde_json::json!("https://x/t.jpg"));
        }
        Content {
            id: "c1".to_string(),
            title: "Some title here".to_string(),
            content_type,
            published_at: Utc::now(),
            ingested_at: Utc::now(),
            creator_ids: Vec::new(),
            consumption_type: omnifeed_common::ConsumptionType::OneShot,
            canonical_ids: HashMap::new(),
            seen: false,
            hidden: false,
            series_id: None,
            series_position: None,
            metadata,
            embeddings: Vec::new(),
        }
    }

    #[test]
    fn feature_vector_has_expected_length() {
        let c = content(ContentType::Article, true);
        let fused = vec![0.1_f32, 0.2, 0.3];
        let features = build_features(&c, &fused, &SourceStats::default());
        assert_eq!(features.len(), feature_dim(3));
    }

    #[test]
    fn one_hot_marks_correct_content_type() {
        let c = content(ContentType::Video, false);
        let features = build_features(&c, &[], &SourceStats::default());
        let one_hot_start = 0 + 3 + 2;
        let one_hot = &features[one_hot_start..];
        assert_eq!(one_hot[ContentType::Video.one_hot_index()], 1.0);
        assert_eq!(one_hot.iter().sum::<f64>(), 1.0);
    }
}
