use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::derived;
use super::icon::DEFAULT_ICON;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A single note. Folder ids and tags are sets so duplicates collapse on insert
/// and on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredNote")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub folder_ids: BTreeSet<String>,
    /// Manually committed tags, always lowercase.
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub is_deleted: bool,
}

impl Note {
    pub fn new() -> Self {
        let now = now_millis();
        Self {
            id: new_id(),
            title: String::new(),
            content: String::new(),
            folder_ids: BTreeSet::new(),
            tags: BTreeSet::new(),
            summary: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    /// Manual tags merged with `#word` occurrences found in the content.
    pub fn display_tags(&self) -> BTreeSet<String> {
        derived::display_tags(&self.tags, &self.content)
    }

    pub fn display_title(&self) -> String {
        let title = self.title.trim();
        if !title.is_empty() {
            return title.to_string();
        }

        self.content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| "Untitled".to_string())
    }

    /// Case-insensitive substring match against content and summary.
    pub fn matches_query(&self, needle_lower: &str) -> bool {
        if needle_lower.is_empty() {
            return true;
        }
        self.content.to_lowercase().contains(needle_lower)
            || self
                .summary
                .as_deref()
                .is_some_and(|summary| summary.to_lowercase().contains(needle_lower))
    }

    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at);
    }
}

/// On-disk shape of a note, tolerant of records written by older versions.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredNote {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    folder_ids: Option<Vec<String>>,
    /// Single-folder field used before notes could belong to several folders.
    #[serde(default)]
    folder_id: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    created_at: Timestamp,
    #[serde(default)]
    updated_at: Timestamp,
    #[serde(default)]
    is_deleted: bool,
}

impl From<StoredNote> for Note {
    fn from(raw: StoredNote) -> Self {
        let folder_ids = match (raw.folder_ids, raw.folder_id) {
            (Some(ids), _) => ids.into_iter().filter(|id| !id.is_empty()).collect(),
            (None, Some(legacy)) if !legacy.is_empty() => BTreeSet::from([legacy]),
            _ => BTreeSet::new(),
        };

        Self {
            id: raw.id,
            title: raw.title,
            content: raw.content,
            folder_ids,
            tags: raw
                .tags
                .into_iter()
                .map(|tag| tag.trim().to_lowercase())
                .filter(|tag| !tag.is_empty())
                .collect(),
            summary: raw.summary.filter(|s| !s.trim().is_empty()),
            created_at: raw.created_at,
            updated_at: raw.updated_at.max(raw.created_at),
            is_deleted: raw.is_deleted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            icon: Some(DEFAULT_ICON.to_string()),
        }
    }
}

/// Folder set used on first launch and when stored folders cannot be parsed.
pub fn default_folders() -> Vec<Folder> {
    vec![
        Folder {
            id: "personal".to_string(),
            name: "Personal".to_string(),
            icon: Some("home".to_string()),
        },
        Folder {
            id: "work".to_string(),
            name: "Work".to_string(),
            icon: Some("work".to_string()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_folder_id_is_migrated() {
        let json = r#"{"id":"n1","content":"hi","folderId":"f1","createdAt":1,"updatedAt":2}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.folder_ids, BTreeSet::from(["f1".to_string()]));
        assert!(!note.is_deleted);
        assert!(note.tags.is_empty());
    }

    #[test]
    fn folder_ids_win_over_legacy_field() {
        let json = r#"{"id":"n1","folderIds":["a","a","b"],"folderId":"c","isDeleted":true}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(
            note.folder_ids,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        assert!(note.is_deleted);
    }

    #[test]
    fn stored_tags_are_lowercased_and_deduplicated() {
        let json = r#"{"id":"n1","tags":["Work","work","  "]}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.tags, BTreeSet::from(["work".to_string()]));
    }

    #[test]
    fn serializes_camel_case_fields() {
        let mut note = Note::new();
        note.folder_ids.insert("f".to_string());
        let value = serde_json::to_value(&note).unwrap();
        assert!(value.get("folderIds").is_some());
        assert!(value.get("isDeleted").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("folderId").is_none());
    }

    #[test]
    fn display_title_falls_back_to_first_line() {
        let mut note = Note::new();
        assert_eq!(note.display_title(), "Untitled");
        note.content = "\n  Groceries  \nmilk".to_string();
        assert_eq!(note.display_title(), "Groceries");
        note.title = "Shopping".to_string();
        assert_eq!(note.display_title(), "Shopping");
    }

    #[test]
    fn query_matches_summary() {
        let mut note = Note::new();
        note.content = "Call mom".to_string();
        note.summary = Some("Weekly MILK run".to_string());
        assert!(note.matches_query("milk"));
        assert!(!note.matches_query("bread"));
    }
}
