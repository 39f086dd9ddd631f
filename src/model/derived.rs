//! Values computed from the note and folder collections rather than stored.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use super::note::{Folder, Note};

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z0-9_-]+)").expect("valid hashtag regex"));

/// Lowercase `#word` names found anywhere in `content`.
pub fn extract_tags(content: &str) -> BTreeSet<String> {
    HASHTAG_RE
        .captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .map(|name| name.as_str().to_lowercase())
        .collect()
}

/// Manual tags merged with tags extracted from content.
pub fn display_tags(manual: &BTreeSet<String>, content: &str) -> BTreeSet<String> {
    let mut tags = manual.clone();
    tags.extend(extract_tags(content));
    tags
}

/// Live notes referencing each folder id. Ids with no live reference are absent.
pub fn folder_usage(notes: &[Note]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for note in notes.iter().filter(|note| !note.is_deleted) {
        for id in &note.folder_ids {
            *counts.entry(id.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Live notes carrying each displayed tag.
pub fn tag_usage(notes: &[Note]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for note in notes.iter().filter(|note| !note.is_deleted) {
        for tag in note.display_tags() {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }
    counts
}

/// Drop folders no live note references. Trashed notes do not keep a folder
/// alive. Returns the removed folders.
pub fn prune_folders(folders: &mut Vec<Folder>, notes: &[Note]) -> Vec<Folder> {
    let usage = folder_usage(notes);
    let (kept, removed): (Vec<Folder>, Vec<Folder>) = std::mem::take(folders)
        .into_iter()
        .partition(|folder| usage.contains_key(&folder.id));
    *folders = kept;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(content: &str, folders: &[&str], deleted: bool) -> Note {
        let mut note = Note::new();
        note.content = content.to_string();
        note.folder_ids = folders.iter().map(|f| f.to_string()).collect();
        note.is_deleted = deleted;
        note
    }

    fn folder(id: &str, name: &str) -> Folder {
        Folder {
            id: id.to_string(),
            name: name.to_string(),
            icon: None,
        }
    }

    #[test]
    fn extracts_tags_anywhere_in_content() {
        let tags = extract_tags("#Work stuff and #home-ideas, also #work again");
        assert_eq!(
            tags,
            BTreeSet::from(["home-ideas".to_string(), "work".to_string()])
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let content = "a #b c #D_e";
        assert_eq!(extract_tags(content), extract_tags(content));
    }

    #[test]
    fn display_tags_union_manual_and_derived() {
        let manual = BTreeSet::from(["errand".to_string()]);
        let tags = display_tags(&manual, "Buy milk #Errand #dairy");
        assert_eq!(
            tags,
            BTreeSet::from(["dairy".to_string(), "errand".to_string()])
        );
    }

    #[test]
    fn trashed_notes_are_not_counted() {
        let notes = vec![
            note("#a", &["f1"], false),
            note("#a", &["f1", "f2"], true),
        ];
        let folders = folder_usage(&notes);
        assert_eq!(folders.get("f1"), Some(&1));
        assert_eq!(folders.get("f2"), None);
        assert_eq!(tag_usage(&notes).get("a"), Some(&1));
    }

    #[test]
    fn folder_used_only_by_trashed_note_is_pruned() {
        let notes = vec![note("list", &["g"], true)];
        let mut folders = vec![folder("g", "Groceries")];
        let removed = prune_folders(&mut folders, &notes);
        assert!(folders.is_empty());
        assert_eq!(removed[0].name, "Groceries");
    }

    #[test]
    fn pruning_is_idempotent() {
        let notes = vec![note("x", &["keep"], false)];
        let mut folders = vec![folder("keep", "Keep"), folder("drop", "Drop")];
        assert_eq!(prune_folders(&mut folders, &notes).len(), 1);
        assert!(prune_folders(&mut folders, &notes).is_empty());
        assert_eq!(folders, vec![folder("keep", "Keep")]);
    }
}
