//! Media source resolution
//!
//! Turns the configured media source into the effective engine
//! configuration. The source variants are soft-exclusive: when several are
//! populated the precedence is remote collection, then explicit item list
//! (if it actually lists more than one item), then single item. A fully
//! empty source degrades to the standby reel, never to an error.

use serde::{Deserialize, Serialize};

/// Item shown when no media source is configured at all.
pub const FALLBACK_ITEM_ID: &str = "standby-reel";

/// Configured media source for the board.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MediaSource {
    /// Single item to loop
    pub item_id: Option<String>,

    /// Remote collection resolved by the engine itself
    pub collection_id: Option<String>,

    /// Explicit ordered item list
    pub item_list: Vec<String>,
}

/// Effective engine configuration consumed once at surface construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    /// Item loaded as the primary target
    pub primary_item: String,

    /// Remote collection id, when the engine should resolve the list
    pub collection: Option<String>,

    /// Items queued after the primary target in explicit-list mode
    pub upcoming: Option<Vec<String>>,

    /// Always 0: playback starts at the head of whatever list applies
    pub start_index: usize,
}

/// Resolve a media source into an engine configuration.
pub fn resolve(source: &MediaSource) -> EngineConfig {
    let primary_item = source
        .item_list
        .first()
        .or(source.item_id.as_ref())
        .cloned()
        .unwrap_or_else(|| FALLBACK_ITEM_ID.to_string());

    if let Some(collection) = &source.collection_id {
        return EngineConfig {
            primary_item: source
                .item_id
                .clone()
                .unwrap_or_else(|| FALLBACK_ITEM_ID.to_string()),
            collection: Some(collection.clone()),
            upcoming: None,
            start_index: 0,
        };
    }

    if source.item_list.len() > 1 {
        return EngineConfig {
            primary_item,
            collection: None,
            upcoming: Some(source.item_list[1..].to_vec()),
            start_index: 0,
        };
    }

    EngineConfig {
        primary_item,
        collection: None,
        upcoming: None,
        start_index: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_takes_precedence_over_item_list() {
        let source = MediaSource {
            item_id: None,
            collection_id: Some("X".into()),
            item_list: vec!["a".into(), "b".into(), "c".into()],
        };
        let config = resolve(&source);
        assert_eq!(config.collection.as_deref(), Some("X"));
        assert!(config.upcoming.is_none());
        assert_eq!(config.start_index, 0);
    }

    #[test]
    fn item_list_splits_off_primary_target() {
        let source = MediaSource {
            item_id: None,
            collection_id: None,
            item_list: vec!["a".into(), "b".into(), "c".into()],
        };
        let config = resolve(&source);
        assert_eq!(config.primary_item, "a");
        assert_eq!(
            config.upcoming,
            Some(vec!["b".to_string(), "c".to_string()])
        );
        assert!(config.collection.is_none());
    }

    #[test]
    fn single_entry_list_is_single_item_mode() {
        let source = MediaSource {
            item_id: None,
            collection_id: None,
            item_list: vec!["a".into()],
        };
        let config = resolve(&source);
        assert_eq!(config.primary_item, "a");
        assert!(config.upcoming.is_none());
        assert!(config.collection.is_none());
    }

    #[test]
    fn single_item_mode() {
        let source = MediaSource {
            item_id: Some("solo".into()),
            collection_id: None,
            item_list: vec![],
        };
        let config = resolve(&source);
        assert_eq!(config.primary_item, "solo");
        assert!(config.upcoming.is_none());
    }

    #[test]
    fn empty_source_degrades_to_standby_reel() {
        let config = resolve(&MediaSource::default());
        assert_eq!(config.primary_item, FALLBACK_ITEM_ID);
        assert!(config.collection.is_none());
        assert!(config.upcoming.is_none());
    }
}
