//! Core data structures for the traynotes application.
//!
//! This module contains the note model shared by the store, the render
//! engine, and the interchange layer.
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Title given to every freshly created note.
pub const DEFAULT_TITLE: &str = "New Note";

/// Represents a single sticky note.
///
/// The serialized field names are the persisted wire schema; optional fields
/// are omitted from the output until they are assigned, which is how older
/// persisted collections (without `color` or `zIndex`) are recognized and
/// migrated on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier; the creation timestamp in ms since the epoch
    pub id: i64,
    /// Note title
    pub title: String,
    /// Note content in Markdown format
    pub content: String,
    /// When the note was created (ms since the epoch); equals `id`
    pub created: i64,
    /// Pinned notes refuse deletion
    #[serde(default)]
    pub pinned: bool,
    /// Presentation flag: content is blurred until revealed
    #[serde(default)]
    pub blurred: bool,
    /// Whether the last-viewed mode was rendered Markdown rather than raw edit
    #[serde(default)]
    pub preview: bool,
    /// Tags for organization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Reminder timestamp (ms); `None` means inactive
    #[serde(default)]
    pub reminder: Option<i64>,
    /// Canvas position, randomized at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Last observed rendered size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Background color (hex RGB), assigned once at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Stacking rank; higher draws on top
    #[serde(rename = "zIndex", default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
}

impl Note {
    /// Creates a note with default field values for the given id.
    ///
    /// Color, stacking rank, and placement are assigned by the store at
    /// creation time.
    pub fn new(id: i64) -> Self {
        Note {
            id,
            title: DEFAULT_TITLE.to_string(),
            content: String::new(),
            created: id,
            pinned: false,
            blurred: false,
            preview: false,
            tags: Vec::new(),
            reminder: None,
            x: None,
            y: None,
            width: None,
            height: None,
            color: None,
            z_index: None,
        }
    }

    /// Current time in ms since the epoch, the unit all note timestamps use.
    pub fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Replaces the tag list by splitting a whitespace-separated input string.
    pub fn set_tags_from_input(&mut self, input: &str) {
        self.tags = parse_tag_input(input);
    }

    /// Case-insensitive substring match over title, content, and tags.
    ///
    /// `lowered_query` must already be lowercased; an empty query matches
    /// every note.
    pub fn matches(&self, lowered_query: &str) -> bool {
        if lowered_query.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(lowered_query)
            || self.content.to_lowercase().contains(lowered_query)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(lowered_query))
    }

    /// Stacking rank used at render time; unmigrated notes rank lowest.
    pub fn stacking(&self) -> i64 {
        self.z_index.unwrap_or(0)
    }
}

/// Splits a whitespace-separated tag string, dropping empty entries.
pub fn parse_tag_input(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note_defaults() {
        let note = Note::new(1700000000000);
        assert_eq!(note.title, DEFAULT_TITLE);
        assert_eq!(note.content, "");
        assert_eq!(note.created, note.id);
        assert!(!note.pinned);
        assert!(!note.blurred);
        assert!(!note.preview);
        assert!(note.tags.is_empty());
        assert!(note.reminder.is_none());
        assert!(note.color.is_none());
        assert!(note.z_index.is_none());
    }

    #[test]
    fn test_parse_tag_input_drops_empty_entries() {
        assert_eq!(parse_tag_input("work  home\ttodo\n"), vec!["work", "home", "todo"]);
        assert!(parse_tag_input("   ").is_empty());
        assert!(parse_tag_input("").is_empty());
    }

    #[test]
    fn test_matches_is_case_insensitive_over_all_fields() {
        let mut note = Note::new(1);
        note.title = "Groceries".to_string();
        note.content = "Buy Milk".to_string();
        note.set_tags_from_input("Errands");

        assert!(note.matches("grocer"));
        assert!(note.matches("milk"));
        assert!(note.matches("errands"));
        assert!(note.matches(""));
        assert!(!note.matches("missing"));
    }

    #[test]
    fn test_wire_schema_field_names() {
        let mut note = Note::new(42);
        note.z_index = Some(3);
        note.color = Some("#fff9c4".to_string());
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"zIndex\":3"));
        assert!(json.contains("\"created\":42"));
        assert!(json.contains("\"reminder\":null"));
    }

    #[test]
    fn test_optional_fields_omitted_until_assigned() {
        let note = Note::new(42);
        let json = serde_json::to_string(&note).unwrap();
        assert!(!json.contains("zIndex"));
        assert!(!json.contains("color"));
        assert!(!json.contains("\"x\""));
    }

    #[test]
    fn test_deserializes_minimal_legacy_note() {
        let note: Note =
            serde_json::from_str(r#"{"id":1,"title":"T","content":"C","created":1}"#).unwrap();
        assert_eq!(note.id, 1);
        assert!(note.color.is_none());
        assert!(note.z_index.is_none());
        assert!(!note.pinned);
    }
}
