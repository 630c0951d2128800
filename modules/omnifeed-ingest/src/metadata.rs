use std::collections::HashMap;

use serde_json::Value;

/// Keys from `RawItem::raw_metadata` that land on `Content::metadata`.
pub const CONTENT_METADATA_KEYS: [&str; 6] = [
    "content_text",
    "content_html",
    "description",
    "thumbnail",
    "tags",
    "author",
];

/// Keys from `RawItem::raw_metadata` that land on `Encoding::metadata`.
/// Unknown keys default to content metadata.
pub const ENCODING_METADATA_KEYS: [&str; 8] = [
    "view_count",
    "like_count",
    "duration_seconds",
    "bitrate",
    "resolution",
    "file_size",
    "video_id",
    "channel_id",
];

/// Split a raw item's metadata into the `(content, encoding)` maps the dual
/// write persists. Keys not named by either list default to content.
pub fn partition_metadata(
    raw_metadata: &HashMap<String, Value>,
) -> (HashMap<String, Value>, HashMap<String, Value>) {
    let mut content = HashMap::new();
    let mut encoding = HashMap::new();
    for (key, value) in raw_metadata {
        if ENCODING_METADATA_KEYS.contains(&key.as_str()) {
            encoding.insert(key.clone(), value.clone());
        } else {
            content.insert(key.clone(), value.clone());
        }
    }
    (content, encoding)
}
