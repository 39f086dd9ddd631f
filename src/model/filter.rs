use super::note::Note;

/// Which slice of the collection the note list shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    All,
    Folder(String),
    Tag(String),
}

#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub scope: Scope,
    pub query: String,
}

impl NoteFilter {
    pub fn matches(&self, note: &Note, needle_lower: &str) -> bool {
        let in_scope = match &self.scope {
            Scope::All => true,
            Scope::Folder(id) => note.folder_ids.contains(id),
            Scope::Tag(tag) => note.display_tags().contains(tag),
        };
        in_scope && note.matches_query(needle_lower)
    }

    /// Live notes in scope matching the query, most recently updated first.
    pub fn apply<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        let needle = self.query.trim().to_lowercase();
        let mut hits: Vec<&Note> = notes
            .iter()
            .filter(|note| !note.is_deleted && self.matches(note, &needle))
            .collect();
        sort_recent_first(&mut hits);
        hits
    }
}

/// Trashed notes matching `query`, most recently updated first.
pub fn trashed<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    let needle = query.trim().to_lowercase();
    let mut hits: Vec<&Note> = notes
        .iter()
        .filter(|note| note.is_deleted && note.matches_query(&needle))
        .collect();
    sort_recent_first(&mut hits);
    hits
}

fn sort_recent_first(notes: &mut [&Note]) {
    notes.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, content: &str, updated_at: i64) -> Note {
        let mut note = Note::new();
        note.id = id.to_string();
        note.content = content.to_string();
        note.updated_at = updated_at;
        note
    }

    #[test]
    fn search_is_case_insensitive_over_content() {
        let notes = vec![note("a", "Buy milk #errand", 1), note("b", "Call mom", 2)];
        let filter = NoteFilter {
            scope: Scope::All,
            query: "MILK".to_string(),
        };
        let ids: Vec<&str> = filter.apply(&notes).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn newest_first_and_trash_hidden() {
        let mut gone = note("c", "old", 5);
        gone.is_deleted = true;
        let notes = vec![note("a", "x", 1), note("b", "y", 3), gone];
        let ids: Vec<&str> = NoteFilter::default()
            .apply(&notes)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(trashed(&notes, "")[0].id, "c");
    }

    #[test]
    fn folder_scope_is_membership() {
        let mut inside = note("a", "x", 1);
        inside.folder_ids.insert("f".to_string());
        let notes = vec![inside, note("b", "y", 2)];
        let filter = NoteFilter {
            scope: Scope::Folder("f".to_string()),
            query: String::new(),
        };
        assert_eq!(filter.apply(&notes).len(), 1);
    }

    #[test]
    fn tag_scope_includes_derived_tags() {
        let mut manual = note("a", "x", 1);
        manual.tags.insert("errand".to_string());
        let notes = vec![manual, note("b", "grab #Errand later", 2), note("c", "z", 3)];
        let filter = NoteFilter {
            scope: Scope::Tag("errand".to_string()),
            query: String::new(),
        };
        let ids: Vec<&str> = filter.apply(&notes).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
