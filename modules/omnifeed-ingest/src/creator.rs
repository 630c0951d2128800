use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use omnifeed_common::{normalize_name, short_id, Creator, CreatorType};
use omnifeed_store::Store;

/// Resolve `name`/`external_ids` to an existing `Creator`, or mint a new one.
///
/// 1. Any `external_ids` key matching an existing creator's external ids on
///    the same key wins; previously-unset keys from `external_ids` are
///    merged into the match.
/// 2. Else, `name` normalized (lowercase, trimmed, whitespace-collapsed) is
///    compared against existing creators' normalized name and variants.
/// 3. Else, a new `Creator` is minted with `creator_type = unknown`.
pub async fn find_or_create_creator(
    store: &dyn Store,
    name: &str,
    external_ids: &HashMap<String, String>,
) -> Result<Creator> {
    for (key, value) in external_ids {
        if let Some(existing) = store.find_creator_by_external_id(key, value).await? {
            let mut merged = existing;
            let mut changed = false;
            for (k, v) in external_ids {
                if !merged.external_ids.contains_key(k) {
                    merged.external_ids.insert(k.clone(), v.clone());
                    changed = true;
                }
            }
            if changed {
                merged.updated_at = Utc::now();
                return Ok(store.upsert_creator(merged).await?);
            }
            return Ok(merged);
        }
    }

    let normalized = normalize_name(name);
    if let Some(existing) = store.find_creator_by_normalized_name(&normalized).await? {
        return Ok(existing);
    }

    let now = Utc::now();
    let creator = Creator {
        id: short_id(),
        name: name.to_string(),
        creator_type: CreatorType::Unknown,
        name_variants: Vec::new(),
        external_ids: external_ids.clone(),
        avatar_url: None,
        bio: None,
        url: None,
        metadata: HashMap::new(),
        created_at: now,
        updated_at: now,
    };
    Ok(store.upsert_creator(creator).await?)
}
