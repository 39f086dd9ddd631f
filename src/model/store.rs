//! In-memory note and folder collections, written through to a
//! [`KeyValueStore`] after every mutation.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::derived;
use super::filter::Scope;
use super::note::{Folder, Note, default_folders};
use super::theme::Theme;
use super::tokenizer::{self, TokenKind, TokenMatch};
use crate::enrich::Enrichment;
use crate::storage::{self, KeyValueStore};

pub const NOTES_KEY: &str = "inkpad.notes";
pub const FOLDERS_KEY: &str = "inkpad.folders";
pub const THEME_KEY: &str = "inkpad.theme";

/// Result of feeding editor text through the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Content as stored, with any committed trigger removed.
    pub content: String,
    pub token: Option<TokenMatch>,
}

pub struct NoteStore {
    kv: Box<dyn KeyValueStore>,
    notes: Vec<Note>,
    folders: Vec<Folder>,
    theme: Theme,
    default_theme: Theme,
}

impl NoteStore {
    /// Read all collections. Unreadable data falls back to empty notes, the
    /// default folder set and `default_theme`.
    pub fn load(kv: Box<dyn KeyValueStore>, default_theme: Theme) -> Self {
        let notes: Vec<Note> = read_json(kv.as_ref(), NOTES_KEY).unwrap_or_default();
        let folders: Vec<Folder> =
            read_json(kv.as_ref(), FOLDERS_KEY).unwrap_or_else(default_folders);
        let theme = read_json::<String>(kv.as_ref(), THEME_KEY)
            .and_then(|name| {
                let parsed = Theme::parse(&name);
                if parsed.is_none() {
                    tracing::warn!("unknown stored theme {name:?}, using default");
                }
                parsed
            })
            .unwrap_or(default_theme);

        tracing::info!(
            notes = notes.len(),
            folders = folders.len(),
            theme = theme.name(),
            "note store loaded"
        );

        Self {
            kv,
            notes,
            folders,
            theme,
            default_theme,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn folder(&self, id: &str) -> Option<&Folder> {
        self.folders.iter().find(|folder| folder.id == id)
    }

    pub fn folder_by_name(&self, name: &str) -> Option<&Folder> {
        let name = name.trim().to_lowercase();
        self.folders
            .iter()
            .find(|folder| folder.name.to_lowercase() == name)
    }

    pub fn folder_counts(&self) -> BTreeMap<String, usize> {
        derived::folder_usage(&self.notes)
    }

    pub fn tag_counts(&self) -> BTreeMap<String, usize> {
        derived::tag_usage(&self.notes)
    }

    /// Create an empty note, placed in the folder or tag `scope` points at.
    pub fn create_note(&mut self, scope: &Scope) -> storage::Result<String> {
        let mut note = Note::new();
        match scope {
            Scope::Folder(id) if self.folder(id).is_some() => {
                note.folder_ids.insert(id.clone());
            }
            Scope::Tag(tag) => {
                note.tags.insert(tag.clone());
            }
            _ => {}
        }

        let id = note.id.clone();
        self.notes.push(note);
        self.commit_notes()?;
        tracing::debug!(%id, "note created");
        Ok(id)
    }

    /// Replace a note's content with editor text, committing a trailing
    /// `@folder ` or `#tag ` trigger if one was just completed.
    ///
    /// The in-memory note is updated before anything is written, so on a
    /// write error `note(id)` already holds the stripped content.
    pub fn edit_content(&mut self, id: &str, text: &str) -> storage::Result<Option<EditOutcome>> {
        if self.note(id).is_none() {
            return Ok(None);
        }

        let token = tokenizer::scan(text);
        let content = match &token {
            Some(m) => m.strip_from(text),
            None => text.to_string(),
        };

        let (folder_id, folder_created) = match &token {
            Some(m) if m.kind == TokenKind::Folder => {
                let (folder_id, created) = self.ensure_folder(&m.name);
                (Some(folder_id), created)
            }
            _ => (None, false),
        };

        let Some(note) = self.note_mut(id) else {
            return Ok(None);
        };
        if let Some(folder_id) = folder_id {
            note.folder_ids.insert(folder_id);
        }
        if let Some(m) = token.as_ref().filter(|m| m.kind == TokenKind::Tag) {
            note.tags.insert(m.name.to_lowercase());
        }
        note.content = content.clone();
        note.touch();

        if let Some(m) = &token {
            tracing::debug!(note = id, kind = ?m.kind, name = %m.name, "inline token committed");
        }

        if folder_created {
            self.write_folders()?;
        }
        self.commit_notes()?;
        Ok(Some(EditOutcome { content, token }))
    }

    /// Returns false when the note is missing or already carries the tag.
    pub fn add_tag(&mut self, id: &str, name: &str) -> storage::Result<bool> {
        let Some(tag) = normalize_tag(name) else {
            return Ok(false);
        };
        let Some(note) = self.note_mut(id) else {
            return Ok(false);
        };
        if !note.tags.insert(tag) {
            return Ok(false);
        }
        note.touch();
        self.commit_notes()?;
        Ok(true)
    }

    pub fn remove_tag(&mut self, id: &str, name: &str) -> storage::Result<bool> {
        let tag = name.trim().trim_start_matches('#').to_lowercase();
        let Some(note) = self.note_mut(id) else {
            return Ok(false);
        };
        if !note.tags.remove(&tag) {
            return Ok(false);
        }
        note.touch();
        self.commit_notes()?;
        Ok(true)
    }

    /// Attach the folder called `name`, creating it if needed. Returns the
    /// folder id, or `None` for a missing note or blank name.
    pub fn attach_folder(&mut self, id: &str, name: &str) -> storage::Result<Option<String>> {
        let name = name.trim().trim_start_matches('@');
        if name.is_empty() || self.note(id).is_none() {
            return Ok(None);
        }

        let (folder_id, created) = self.ensure_folder(name);
        if let Some(note) = self.note_mut(id)
            && note.folder_ids.insert(folder_id.clone())
        {
            note.touch();
        }
        if created {
            self.write_folders()?;
        }
        self.commit_notes()?;
        Ok(Some(folder_id))
    }

    pub fn detach_folder(&mut self, id: &str, folder_id: &str) -> storage::Result<bool> {
        let Some(note) = self.note_mut(id) else {
            return Ok(false);
        };
        if !note.folder_ids.remove(folder_id) {
            return Ok(false);
        }
        note.touch();
        self.commit_notes()?;
        Ok(true)
    }

    /// Create a standalone folder. It is pruned with the next note change
    /// unless a note references it by then.
    pub fn create_folder(&mut self, name: &str) -> storage::Result<Option<String>> {
        let name = name.trim().trim_start_matches('@');
        if name.is_empty() {
            return Ok(None);
        }
        let (folder_id, created) = self.ensure_folder(name);
        if created {
            self.write_folders()?;
        }
        Ok(Some(folder_id))
    }

    pub fn set_folder_icon(&mut self, folder_id: &str, icon: &str) -> storage::Result<bool> {
        let Some(folder) = self.folders.iter_mut().find(|f| f.id == folder_id) else {
            return Ok(false);
        };
        folder.icon = Some(icon.to_string());
        self.write_folders()?;
        Ok(true)
    }

    /// Soft-delete. Returns how many live notes moved to the trash.
    pub fn trash(&mut self, ids: &[String]) -> storage::Result<usize> {
        let moved = self.set_deleted(ids, true);
        if moved > 0 {
            self.commit_notes()?;
        }
        Ok(moved)
    }

    pub fn restore(&mut self, ids: &[String]) -> storage::Result<usize> {
        let restored = self.set_deleted(ids, false);
        if restored > 0 {
            self.commit_notes()?;
        }
        Ok(restored)
    }

    /// Permanently remove notes, trashed or not.
    pub fn purge(&mut self, ids: &[String]) -> storage::Result<usize> {
        let before = self.notes.len();
        self.notes.retain(|note| !ids.contains(&note.id));
        let purged = before - self.notes.len();
        if purged > 0 {
            self.commit_notes()?;
        }
        Ok(purged)
    }

    pub fn empty_trash(&mut self) -> storage::Result<usize> {
        let before = self.notes.len();
        self.notes.retain(|note| !note.is_deleted);
        let purged = before - self.notes.len();
        if purged > 0 {
            self.commit_notes()?;
        }
        Ok(purged)
    }

    /// Drop every stored key and return to first-launch state.
    pub fn reset_all(&mut self) -> storage::Result<()> {
        for key in [NOTES_KEY, FOLDERS_KEY, THEME_KEY] {
            self.kv.remove(key)?;
        }
        self.notes.clear();
        self.folders = default_folders();
        self.theme = self.default_theme;
        tracing::info!("all data reset");
        Ok(())
    }

    pub fn set_theme(&mut self, theme: Theme) -> storage::Result<()> {
        self.theme = theme;
        write_json(self.kv.as_mut(), THEME_KEY, &theme)
    }

    /// Copy an enrichment result onto a note. Tags merge into the manual set.
    pub fn apply_enrichment(&mut self, id: &str, enrichment: &Enrichment) -> storage::Result<bool> {
        let Some(note) = self.note_mut(id) else {
            return Ok(false);
        };

        let title = enrichment.title.trim();
        if !title.is_empty() {
            note.title = title.to_string();
        }
        let summary = enrichment.summary.trim();
        if !summary.is_empty() {
            note.summary = Some(summary.to_string());
        }
        note.tags
            .extend(enrichment.tags.iter().filter_map(|tag| normalize_tag(tag)));
        note.touch();

        self.commit_notes()?;
        Ok(true)
    }

    fn note_mut(&mut self, id: &str) -> Option<&mut Note> {
        self.notes.iter_mut().find(|note| note.id == id)
    }

    fn set_deleted(&mut self, ids: &[String], deleted: bool) -> usize {
        let mut changed = 0;
        for note in self
            .notes
            .iter_mut()
            .filter(|note| note.is_deleted != deleted && ids.contains(&note.id))
        {
            note.is_deleted = deleted;
            note.touch();
            changed += 1;
        }
        changed
    }

    /// Existing folder matched case-insensitively, or a new in-memory one.
    /// The flag is true when the folder was created and still needs writing.
    fn ensure_folder(&mut self, name: &str) -> (String, bool) {
        if let Some(folder) = self.folder_by_name(name) {
            return (folder.id.clone(), false);
        }

        let folder = Folder::new(name);
        let id = folder.id.clone();
        tracing::debug!(%id, name, "folder created");
        self.folders.push(folder);
        (id, true)
    }

    /// Persist notes, then prune unreferenced folders.
    fn commit_notes(&mut self) -> storage::Result<()> {
        write_json(self.kv.as_mut(), NOTES_KEY, &self.notes)?;

        let removed = derived::prune_folders(&mut self.folders, &self.notes);
        if !removed.is_empty() {
            let names: Vec<&str> = removed.iter().map(|f| f.name.as_str()).collect();
            tracing::debug!(?names, "pruned unused folders");
            self.write_folders()?;
        }
        Ok(())
    }

    fn write_folders(&mut self) -> storage::Result<()> {
        write_json(self.kv.as_mut(), FOLDERS_KEY, &self.folders)
    }
}

/// Lowercase single word from the tag charset, or `None`.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_start_matches('#').to_lowercase();
    let valid = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(tag)
}

fn read_json<T: DeserializeOwned>(kv: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!("reading {key} failed, using defaults: {err}");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("stored {key} is malformed, using defaults: {err}");
            None
        }
    }
}

fn write_json<T: Serialize + ?Sized>(
    kv: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> storage::Result<()> {
    let raw = serde_json::to_string(value)?;
    kv.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::storage::{MemoryStore, ReadOnlyStore};

    fn empty_store() -> NoteStore {
        NoteStore::load(
            Box::new(MemoryStore::new().with_entry(FOLDERS_KEY, "[]")),
            Theme::Dark,
        )
    }

    fn store_with_note(content: &str) -> (NoteStore, String) {
        let mut store = empty_store();
        let id = store.create_note(&Scope::All).unwrap();
        store.edit_content(&id, content).unwrap();
        (store, id)
    }

    #[test]
    fn folder_trigger_creates_and_attaches_folder() {
        let mut store = empty_store();
        let id = store.create_note(&Scope::All).unwrap();

        let outcome = store
            .edit_content(&id, "Meeting notes @work ")
            .unwrap()
            .unwrap();

        assert_eq!(outcome.content, "Meeting notes ");
        let note = store.note(&id).unwrap();
        assert_eq!(note.content, "Meeting notes ");
        let folder = store.folder_by_name("work").unwrap();
        assert_eq!(folder.name, "work");
        assert!(note.folder_ids.contains(&folder.id));
    }

    #[test]
    fn folder_trigger_reuses_existing_folder_case_insensitively() {
        let (mut store, first) = store_with_note("a @Work ");
        let second = store.create_note(&Scope::All).unwrap();
        store.edit_content(&second, "b @WORK ").unwrap();

        assert_eq!(store.folders().len(), 1);
        assert_eq!(store.folders()[0].name, "Work");
        assert_eq!(
            store.note(&first).unwrap().folder_ids,
            store.note(&second).unwrap().folder_ids
        );
    }

    #[test]
    fn tag_trigger_adds_lowercase_manual_tag() {
        let (store, id) = store_with_note("Buy milk #Errand ");
        let note = store.note(&id).unwrap();
        assert_eq!(note.content, "Buy milk ");
        assert!(note.tags.contains("errand"));
    }

    #[test]
    fn repeated_tag_trigger_keeps_set_semantics() {
        let (mut store, id) = store_with_note("x #a ");
        store.edit_content(&id, "x #A ").unwrap();
        assert_eq!(store.note(&id).unwrap().tags.len(), 1);
    }

    #[test]
    fn plain_text_is_stored_verbatim() {
        let (store, id) = store_with_note("just #words here");
        let note = store.note(&id).unwrap();
        assert_eq!(note.content, "just #words here");
        assert!(note.tags.is_empty());
        assert!(note.display_tags().contains("words"));
    }

    #[test]
    fn edits_are_written_through_immediately() {
        let (store, id) = store_with_note("persist me");
        let raw = store.kv.get(NOTES_KEY).unwrap().unwrap();
        let stored: Vec<Note> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].content, "persist me");
    }

    #[test]
    fn trashing_the_only_reference_prunes_the_folder() {
        let (mut store, id) = store_with_note("list @Groceries ");
        assert!(store.folder_by_name("groceries").is_some());

        store.trash(&[id.clone()]).unwrap();

        assert!(store.folder_by_name("groceries").is_none());
        assert!(store.note(&id).unwrap().is_deleted);
        assert!(store.folder_counts().is_empty());
    }

    #[test]
    fn trashed_notes_drop_out_of_tag_counts() {
        let (mut store, id) = store_with_note("#a #b");
        assert_eq!(store.tag_counts().len(), 2);
        store.trash(&[id.clone()]).unwrap();
        assert!(store.tag_counts().is_empty());
        store.restore(&[id]).unwrap();
        assert_eq!(store.tag_counts().get("a"), Some(&1));
    }

    #[test]
    fn malformed_collections_recover_to_defaults() {
        let kv = MemoryStore::new()
            .with_entry(NOTES_KEY, "{not json")
            .with_entry(FOLDERS_KEY, "42")
            .with_entry(THEME_KEY, "\"neon\"");
        let store = NoteStore::load(Box::new(kv), Theme::Sepia);
        assert!(store.notes().is_empty());
        assert_eq!(store.folders(), default_folders().as_slice());
        assert_eq!(store.theme(), Theme::Sepia);
    }

    #[test]
    fn legacy_records_load() {
        let kv = MemoryStore::new()
            .with_entry(
                NOTES_KEY,
                r#"[{"id":"n","content":"old","folderId":"personal","createdAt":1,"updatedAt":1}]"#,
            )
            .with_entry(THEME_KEY, "\"light\"");
        let store = NoteStore::load(Box::new(kv), Theme::Dark);
        assert_eq!(store.theme(), Theme::Light);
        assert_eq!(store.folder_counts().get("personal"), Some(&1));
    }

    #[test]
    fn new_note_inherits_scope() {
        let (mut store, _) = store_with_note("x @proj ");
        let folder_id = store.folder_by_name("proj").unwrap().id.clone();

        let in_folder = store.create_note(&Scope::Folder(folder_id.clone())).unwrap();
        let tagged = store.create_note(&Scope::Tag("idea".to_string())).unwrap();

        assert!(store.note(&in_folder).unwrap().folder_ids.contains(&folder_id));
        assert!(store.note(&tagged).unwrap().tags.contains("idea"));
    }

    #[test]
    fn purge_and_empty_trash() {
        let (mut store, a) = store_with_note("a");
        let b = store.create_note(&Scope::All).unwrap();
        let c = store.create_note(&Scope::All).unwrap();

        store.trash(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(store.purge(&[a]).unwrap(), 1);
        assert_eq!(store.empty_trash().unwrap(), 1);
        assert_eq!(store.notes().len(), 1);
        assert_eq!(store.notes()[0].id, c);
    }

    #[test]
    fn detaching_last_reference_prunes_folder() {
        let (mut store, id) = store_with_note("x @tmp ");
        let folder_id = store.folder_by_name("tmp").unwrap().id.clone();
        assert!(store.detach_folder(&id, &folder_id).unwrap());
        assert!(store.folder(&folder_id).is_none());
    }

    #[test]
    fn manual_tag_commands_normalize() {
        let (mut store, id) = store_with_note("x");
        assert!(store.add_tag(&id, "#Todo").unwrap());
        assert!(!store.add_tag(&id, "todo").unwrap());
        assert!(!store.add_tag(&id, "two words").unwrap());
        assert!(store.remove_tag(&id, "TODO").unwrap());
        assert!(store.note(&id).unwrap().tags.is_empty());
    }

    #[test]
    fn enrichment_sets_metadata_and_merges_tags() {
        let (mut store, id) = store_with_note("Buy milk #errand ");
        let enrichment = Enrichment {
            title: "Shopping".to_string(),
            summary: "Pick up milk.".to_string(),
            tags: vec!["Dairy".to_string(), "errand".to_string(), "not valid".to_string()],
        };
        assert!(store.apply_enrichment(&id, &enrichment).unwrap());

        let note = store.note(&id).unwrap();
        assert_eq!(note.title, "Shopping");
        assert_eq!(note.summary.as_deref(), Some("Pick up milk."));
        assert_eq!(
            note.tags,
            BTreeSet::from(["dairy".to_string(), "errand".to_string()])
        );
    }

    #[test]
    fn reset_restores_first_launch_state() {
        let (mut store, _) = store_with_note("x @a ");
        store.set_theme(Theme::Midnight).unwrap();
        store.reset_all().unwrap();

        assert!(store.notes().is_empty());
        assert_eq!(store.folders(), default_folders().as_slice());
        assert_eq!(store.theme(), Theme::Dark);
        assert_eq!(store.kv.get(NOTES_KEY).unwrap(), None);
        assert_eq!(store.kv.get(THEME_KEY).unwrap(), None);
    }

    #[test]
    fn standalone_folder_is_pruned_by_next_note_change() {
        let mut store = empty_store();
        let folder_id = store.create_folder("Later").unwrap().unwrap();
        assert!(store.folder(&folder_id).is_some());
        store.create_note(&Scope::All).unwrap();
        assert!(store.folder(&folder_id).is_none());
    }

    #[test]
    fn folder_names_match_case_insensitively_beyond_ascii() {
        let (mut store, id) = store_with_note("x");
        let first = store.attach_folder(&id, "Été").unwrap().unwrap();
        let second = store.attach_folder(&id, "ÉTÉ").unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(store.folders().len(), 1);
        assert_eq!(store.folder_by_name("été").unwrap().name, "Été");
    }

    #[test]
    fn failed_write_still_applies_the_token_in_memory() {
        let kv = ReadOnlyStore(MemoryStore::new().with_entry(
            NOTES_KEY,
            r#"[{"id":"n","content":"","createdAt":1,"updatedAt":1}]"#,
        ));
        let mut store = NoteStore::load(Box::new(kv), Theme::Dark);

        assert!(store.edit_content("n", "x @proj ").is_err());

        let note = store.note("n").unwrap();
        assert_eq!(note.content, "x ");
        let folder = store.folder_by_name("proj").unwrap();
        assert!(note.folder_ids.contains(&folder.id));
    }
}
