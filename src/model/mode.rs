/// Top-level screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Folders,
    Tags,
    Trash,
    Settings,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Home,
        View::Folders,
        View::Tags,
        View::Trash,
        View::Settings,
    ];

    pub fn label(self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Folders => "Folders",
            View::Tags => "Tags",
            View::Trash => "Trash",
            View::Settings => "Settings",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|v| *v == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Actions that only run after a y/n confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
    TrashMarked(Vec<String>),
    PurgeMarked(Vec<String>),
    EmptyTrash,
    ResetAll,
}

impl Confirm {
    pub fn prompt(&self) -> String {
        match self {
            Confirm::TrashMarked(ids) => format!("move {} notes to trash?", ids.len()),
            Confirm::PurgeMarked(ids) => format!("permanently delete {} notes?", ids.len()),
            Confirm::EmptyTrash => "permanently delete everything in trash?".to_string(),
            Confirm::ResetAll => "erase all notes, folders and settings?".to_string(),
        }
    }
}

/// Application interaction modes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Normal mode: navigation and commands.
    #[default]
    Normal,
    /// Insert mode: editing the open note.
    Insert,
    /// Typing a search query.
    Search,
    /// Command palette (`:` prefix).
    Command,
    /// Waiting for y/n.
    Confirm(Confirm),
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Search => "SEARCH",
            Mode::Command => "COMMAND",
            Mode::Confirm(_) => "CONFIRM",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_cycle_wraps() {
        assert_eq!(View::Settings.next(), View::Home);
        assert_eq!(View::Home.next(), View::Folders);
    }
}
