use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::enrich::{EnrichClient, Enrichment};
use crate::model::buffer::Buffer;
use crate::model::config::AppConfig;
use crate::model::filter::{self, NoteFilter, Scope};
use crate::model::icon;
use crate::model::mode::{Confirm, Mode, View};
use crate::model::note::{Note, Timestamp};
use crate::model::store::NoteStore;
use crate::model::theme::{Palette, Theme};
use crate::model::tokenizer::TokenKind;
use crate::msg::Msg;
use crate::storage;

const MAX_NOTIFICATIONS: usize = 8;

pub struct App {
    pub mode: Mode,
    pub view: View,
    pub store: NoteStore,
    pub config: AppConfig,
    /// Open note, if any. Present only in Insert mode.
    pub editor: Option<Buffer>,
    pub query: String,
    command_input: String,
    selected: usize,
    scope_selected: usize,
    settings_selected: usize,
    marked: BTreeSet<String>,
    enricher: Option<Arc<EnrichClient>>,
    enriching: HashSet<String>,
    pub should_quit: bool,
    pub event_tx: mpsc::Sender<Msg>,
    pub notifications: VecDeque<(String, Instant)>,
    list_height: u16,
}

impl App {
    pub fn new(
        config: AppConfig,
        store: NoteStore,
        enricher: Option<EnrichClient>,
        event_tx: mpsc::Sender<Msg>,
    ) -> Self {
        let settings_selected = Theme::ALL
            .iter()
            .position(|theme| *theme == store.theme())
            .unwrap_or(0);

        Self {
            mode: Mode::Normal,
            view: View::Home,
            store,
            config,
            editor: None,
            query: String::new(),
            command_input: String::new(),
            selected: 0,
            scope_selected: 0,
            settings_selected,
            marked: BTreeSet::new(),
            enricher: enricher.map(Arc::new),
            enriching: HashSet::new(),
            should_quit: false,
            event_tx,
            notifications: VecDeque::new(),
            list_height: 20,
        }
    }

    // ── Derived view state ───────────────────────────────────────

    /// Folder or tag entries for the sidebar: scope, label, live note count.
    fn scope_entries(&self) -> Vec<(Scope, String, usize)> {
        match self.view {
            View::Folders => {
                let counts = self.store.folder_counts();
                self.store
                    .folders()
                    .iter()
                    .map(|folder| {
                        (
                            Scope::Folder(folder.id.clone()),
                            format!("{} {}", icon::glyph(folder.icon.as_deref()), folder.name),
                            counts.get(&folder.id).copied().unwrap_or(0),
                        )
                    })
                    .collect()
            }
            View::Tags => self
                .store
                .tag_counts()
                .into_iter()
                .map(|(tag, count)| (Scope::Tag(tag.clone()), format!("#{tag}"), count))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn current_scope(&self) -> Option<Scope> {
        match self.view {
            View::Home => Some(Scope::All),
            View::Folders | View::Tags => self
                .scope_entries()
                .into_iter()
                .nth(self.scope_selected)
                .map(|(scope, _, _)| scope),
            View::Trash | View::Settings => None,
        }
    }

    pub fn visible_notes(&self) -> Vec<&Note> {
        match self.view {
            View::Trash => filter::trashed(self.store.notes(), &self.query),
            View::Settings => Vec::new(),
            _ => match self.current_scope() {
                Some(scope) => NoteFilter {
                    scope,
                    query: self.query.clone(),
                }
                .apply(self.store.notes()),
                None => Vec::new(),
            },
        }
    }

    fn visible_ids(&self) -> Vec<String> {
        self.visible_notes()
            .into_iter()
            .map(|note| note.id.clone())
            .collect()
    }

    fn selected_id(&self) -> Option<String> {
        self.visible_notes()
            .get(self.selected)
            .map(|note| note.id.clone())
    }

    /// The open note, else the highlighted one.
    fn active_id(&self) -> Option<String> {
        self.editor
            .as_ref()
            .map(|buffer| buffer.note_id.clone())
            .or_else(|| self.selected_id())
    }

    fn clamp_selection(&mut self) {
        let entries = self.scope_entries().len();
        self.scope_selected = self.scope_selected.min(entries.saturating_sub(1));

        let len = self.visible_notes().len();
        self.selected = self.selected.min(len.saturating_sub(1));

        let live: HashSet<&str> = self.store.notes().iter().map(|n| n.id.as_str()).collect();
        self.marked.retain(|id| live.contains(id.as_str()));
    }

    fn select_note(&mut self, id: &str) {
        if let Some(idx) = self.visible_ids().iter().position(|v| v == id) {
            self.selected = idx;
        }
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Key(key) => self.handle_key(key)?,
            Msg::Resize(_w, h) => {
                self.list_height = h.saturating_sub(4);
            }
            Msg::Command(command) => self.handle_command(&command),
            Msg::EnrichmentReady {
                note_id,
                enrichment,
            } => self.handle_enrichment(note_id, enrichment),
            Msg::Tick => self.handle_tick(),
            Msg::Quit => self.should_quit = true,
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        match self.mode.clone() {
            Mode::Normal => self.handle_key_normal(key),
            Mode::Insert => self.handle_key_insert(key),
            Mode::Search => self.handle_key_search(key),
            Mode::Command => self.handle_key_command(key),
            Mode::Confirm(action) => self.handle_key_confirm(key, action),
        }
        Ok(())
    }

    fn handle_key_normal(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.set_view(View::ALL[idx]);
            }
            KeyCode::Tab => self.set_view(self.view.next()),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('[') => self.move_scope(-1),
            KeyCode::Char(']') => self.move_scope(1),
            KeyCode::Char('/') => {
                self.mode = Mode::Search;
            }
            KeyCode::Char(':') => {
                self.command_input.clear();
                self.mode = Mode::Command;
            }
            KeyCode::Char(' ') => self.toggle_mark(),
            KeyCode::Char('a') => {
                if let Some(id) = self.selected_id() {
                    self.request_enrichment(&id);
                }
            }
            KeyCode::Esc => {
                self.query.clear();
                self.marked.clear();
                self.clamp_selection();
            }
            _ => match self.view {
                View::Trash => self.handle_key_trash(key),
                View::Settings => self.handle_key_settings(key),
                _ => self.handle_key_notes(key),
            },
        }
    }

    fn handle_key_notes(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') => self.create_note(),
            KeyCode::Enter | KeyCode::Char('i') | KeyCode::Char('e') => {
                if let Some(id) = self.selected_id() {
                    self.open_editor(&id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_id() {
                    let result = self.store.trash(&[id]);
                    if let Some(moved) = self.report(result) {
                        self.push_notification(format!("{moved} note moved to trash"));
                    }
                    self.clamp_selection();
                }
            }
            KeyCode::Char('D') => {
                let ids = self.marked_or_selected();
                if !ids.is_empty() {
                    self.mode = Mode::Confirm(Confirm::TrashMarked(ids));
                }
            }
            KeyCode::Char('c') if self.view == View::Folders => self.cycle_folder_icon(),
            _ => {}
        }
    }

    fn handle_key_trash(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') => {
                let ids = self.marked_or_selected();
                let result = self.store.restore(&ids);
                if let Some(restored) = self.report(result) {
                    self.push_notification(format!("{restored} restored"));
                }
                self.marked.clear();
                self.clamp_selection();
            }
            KeyCode::Char('x') => {
                if let Some(id) = self.selected_id() {
                    let result = self.store.purge(&[id]);
                    self.report(result);
                    self.clamp_selection();
                }
            }
            KeyCode::Char('D') => {
                let ids = self.marked_or_selected();
                if !ids.is_empty() {
                    self.mode = Mode::Confirm(Confirm::PurgeMarked(ids));
                }
            }
            KeyCode::Char('E') => self.mode = Mode::Confirm(Confirm::EmptyTrash),
            _ => {}
        }
    }

    fn handle_key_settings(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let theme = Theme::ALL[self.settings_selected.min(Theme::ALL.len() - 1)];
                self.apply_theme(theme);
            }
            KeyCode::Char('R') => self.mode = Mode::Confirm(Confirm::ResetAll),
            _ => {}
        }
    }

    fn handle_key_insert(&mut self, key: KeyEvent) {
        let Some(buffer) = self.editor.as_mut() else {
            self.mode = Mode::Normal;
            return;
        };

        let changed = match key.code {
            KeyCode::Esc => {
                self.close_editor();
                return;
            }
            KeyCode::Enter => {
                buffer.insert_newline();
                true
            }
            KeyCode::Backspace => buffer.delete_char_before(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                buffer.insert_char(ch);
                true
            }
            KeyCode::Left => {
                buffer.move_left();
                false
            }
            KeyCode::Right => {
                buffer.move_right();
                false
            }
            KeyCode::Up => {
                buffer.move_up();
                false
            }
            KeyCode::Down => {
                buffer.move_down();
                false
            }
            _ => false,
        };

        if changed {
            self.sync_editor();
        }
        if let Some(buffer) = self.editor.as_mut() {
            buffer.scroll_to_cursor();
        }
    }

    fn handle_key_search(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.query.clear();
                self.mode = Mode::Normal;
            }
            KeyCode::Enter => self.mode = Mode::Normal,
            KeyCode::Backspace => {
                self.query.pop();
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.query.push(ch);
            }
            _ => return,
        }
        self.selected = 0;
        self.clamp_selection();
    }

    fn handle_key_command(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.command_input.clear();
            }
            KeyCode::Enter => {
                let command = self.command_input.trim().to_string();
                self.mode = Mode::Normal;
                self.command_input.clear();

                if !command.is_empty() {
                    let _ = self.event_tx.send(Msg::Command(command));
                }
            }
            KeyCode::Backspace => {
                self.command_input.pop();
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.command_input.push(ch);
            }
            _ => {}
        }
    }

    fn handle_key_confirm(&mut self, key: KeyEvent, action: Confirm) {
        self.mode = Mode::Normal;
        if !matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            self.push_notification("cancelled".to_string());
            return;
        }

        match action {
            Confirm::TrashMarked(ids) => {
                let result = self.store.trash(&ids);
                if let Some(moved) = self.report(result) {
                    self.push_notification(format!("{moved} notes moved to trash"));
                }
            }
            Confirm::PurgeMarked(ids) => {
                let result = self.store.purge(&ids);
                if let Some(purged) = self.report(result) {
                    self.push_notification(format!("{purged} notes deleted"));
                }
            }
            Confirm::EmptyTrash => {
                let result = self.store.empty_trash();
                if let Some(purged) = self.report(result) {
                    self.push_notification(format!("trash emptied ({purged})"));
                }
            }
            Confirm::ResetAll => {
                let result = self.store.reset_all();
                if self.report(result).is_some() {
                    self.editor = None;
                    self.query.clear();
                    self.settings_selected = 0;
                    self.push_notification("all data reset".to_string());
                }
            }
        }
        self.marked.clear();
        self.clamp_selection();
    }

    fn handle_command(&mut self, command: &str) {
        let command = command.trim();
        let (verb, rest) = command
            .split_once(char::is_whitespace)
            .map(|(verb, rest)| (verb, parse_quoted_arg(rest)))
            .unwrap_or((command, String::new()));

        match (verb, rest.as_str()) {
            ("q" | "quit", _) => self.should_quit = true,
            ("help", _) => {
                for line in [
                    "commands:",
                    "  tag <name> | untag <name>",
                    "  folder <name> | unfolder <name> | newfolder <name>",
                    "  theme dark|light|sepia|midnight",
                    "  enrich | empty-trash | reset | q",
                ] {
                    self.push_notification(line.to_string());
                }
            }
            ("tag", name) if !name.is_empty() => self.with_active(|app, id| {
                let result = app.store.add_tag(id, name);
                if app.report(result) == Some(false) {
                    app.push_notification(format!("not tagged: {name}"));
                }
            }),
            ("untag", name) if !name.is_empty() => self.with_active(|app, id| {
                let result = app.store.remove_tag(id, name);
                app.report(result);
            }),
            ("folder", name) if !name.is_empty() => self.with_active(|app, id| {
                let result = app.store.attach_folder(id, name);
                app.report(result);
            }),
            ("unfolder", name) if !name.is_empty() => self.with_active(|app, id| {
                let Some(folder_id) = app.store.folder_by_name(name).map(|f| f.id.clone()) else {
                    app.push_notification(format!("no folder named {name}"));
                    return;
                };
                let result = app.store.detach_folder(id, &folder_id);
                app.report(result);
            }),
            ("newfolder", name) if !name.is_empty() => {
                let result = self.store.create_folder(name);
                if let Some(Some(_)) = self.report(result) {
                    self.push_notification(format!("folder {name} ready"));
                }
            }
            ("theme", name) => match Theme::parse(name) {
                Some(theme) => self.apply_theme(theme),
                None => self.push_notification(format!("unknown theme: {name}")),
            },
            ("enrich", _) => {
                if let Some(id) = self.active_id() {
                    self.request_enrichment(&id);
                }
            }
            ("empty-trash", _) => self.mode = Mode::Confirm(Confirm::EmptyTrash),
            ("reset", _) => self.mode = Mode::Confirm(Confirm::ResetAll),
            _ => self.push_notification(format!("unknown command: {command}")),
        }
        self.clamp_selection();
    }

    fn with_active(&mut self, f: impl FnOnce(&mut Self, &str)) {
        match self.active_id() {
            Some(id) => f(self, &id),
            None => self.push_notification("no note selected".to_string()),
        }
    }

    fn handle_enrichment(&mut self, note_id: String, enrichment: Option<Enrichment>) {
        self.enriching.remove(&note_id);
        let Some(enrichment) = enrichment else {
            tracing::debug!(note = %note_id, "no enrichment available");
            return;
        };

        let result = self.store.apply_enrichment(&note_id, &enrichment);
        if self.report(result) == Some(true) {
            self.push_notification(format!("enriched: {}", enrichment.title));
        }
        self.clamp_selection();
    }

    fn handle_tick(&mut self) {
        let ttl = Duration::from_millis(self.config.general.status_ttl_ms);
        let now = Instant::now();
        while self
            .notifications
            .front()
            .is_some_and(|(_, at)| now.duration_since(*at) >= ttl)
        {
            self.notifications.pop_front();
        }
    }

    // ── Actions ──────────────────────────────────────────────────

    fn set_view(&mut self, view: View) {
        if self.view != view {
            self.view = view;
            self.selected = 0;
            self.scope_selected = 0;
            self.marked.clear();
        }
        self.clamp_selection();
    }

    fn move_selection(&mut self, delta: isize) {
        if self.view == View::Settings {
            let max = Theme::ALL.len() as isize - 1;
            self.settings_selected =
                (self.settings_selected as isize + delta).clamp(0, max) as usize;
            return;
        }

        let len = self.visible_notes().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let max = len as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, max) as usize;
    }

    fn move_scope(&mut self, delta: isize) {
        let len = self.scope_entries().len();
        if len == 0 {
            return;
        }
        let next = (self.scope_selected as isize + delta).rem_euclid(len as isize);
        self.scope_selected = next as usize;
        self.selected = 0;
        self.clamp_selection();
    }

    fn toggle_mark(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        if !self.marked.remove(&id) {
            self.marked.insert(id);
        }
        self.move_selection(1);
    }

    fn marked_or_selected(&self) -> Vec<String> {
        if self.marked.is_empty() {
            self.selected_id().into_iter().collect()
        } else {
            self.marked.iter().cloned().collect()
        }
    }

    fn create_note(&mut self) {
        let scope = self.current_scope().unwrap_or_default();
        let result = self.store.create_note(&scope);
        if let Some(id) = self.report(result) {
            self.open_editor(&id);
        }
    }

    fn open_editor(&mut self, id: &str) {
        let Some(note) = self.store.note(id) else {
            return;
        };
        let mut buffer = Buffer::open(id, &note.content, self.config.editor.scroll_off);
        buffer.viewport.height = self.list_height.saturating_sub(2).max(1);
        buffer.scroll_to_cursor();
        self.editor = Some(buffer);
        self.mode = Mode::Insert;
    }

    fn close_editor(&mut self) {
        self.mode = Mode::Normal;
        if let Some(buffer) = self.editor.take() {
            self.clamp_selection();
            self.select_note(&buffer.note_id);
        }
    }

    /// Push the editor text through the note store and adopt its rewrite.
    fn sync_editor(&mut self) {
        let Some(buffer) = self.editor.as_ref() else {
            return;
        };
        let id = buffer.note_id.clone();
        let text = buffer.text();

        let result = self.store.edit_content(&id, &text);
        let outcome = self.report(result).flatten();

        // The buffer mirrors the stored note, written or not.
        if let Some(stored) = self.store.note(&id).map(|note| note.content.clone())
            && stored != text
            && let Some(buffer) = self.editor.as_mut()
        {
            buffer.replace_text(&stored);
        }

        let Some(token) = outcome.and_then(|outcome| outcome.token) else {
            return;
        };
        let notice = match token.kind {
            TokenKind::Folder => format!("added to @{}", token.name),
            TokenKind::Tag => format!("tagged #{}", token.name.to_lowercase()),
        };
        self.push_notification(notice);
    }

    fn cycle_folder_icon(&mut self) {
        let Some(Scope::Folder(folder_id)) = self.current_scope() else {
            return;
        };
        let current = self
            .store
            .folder(&folder_id)
            .and_then(|folder| folder.icon.clone());
        let next = icon::next_icon(current.as_deref());
        let result = self.store.set_folder_icon(&folder_id, next);
        self.report(result);
    }

    fn apply_theme(&mut self, theme: Theme) {
        let result = self.store.set_theme(theme);
        if self.report(result).is_some() {
            self.settings_selected = Theme::ALL.iter().position(|t| *t == theme).unwrap_or(0);
            self.push_notification(format!("theme: {}", theme.name()));
        }
    }

    fn request_enrichment(&mut self, id: &str) {
        let Some(client) = self.enricher.clone() else {
            tracing::info!("ai enrichment requested but no client is configured");
            return;
        };
        let Some(note) = self.store.note(id) else {
            return;
        };
        if !self.enriching.insert(id.to_string()) {
            return;
        }
        spawn_enrichment(
            client,
            id.to_string(),
            note.content.clone(),
            self.event_tx.clone(),
        );
    }

    /// Log a storage failure and tell the user; the in-memory state stays.
    fn report<T>(&mut self, result: storage::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!("save failed: {err}");
                self.push_notification(format!("save failed: {err}"));
                None
            }
        }
    }

    fn push_notification(&mut self, message: String) {
        self.notifications.push_back((message, Instant::now()));
        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&mut self, frame: &mut Frame) {
        let palette = self.store.theme().palette();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // tab bar
                Constraint::Min(1),    // body
                Constraint::Length(1), // status bar
            ])
            .split(frame.area());

        frame.render_widget(
            Block::default().style(Style::default().bg(palette.bg)),
            frame.area(),
        );
        self.render_tab_bar(frame, chunks[0], &palette);

        match self.view {
            View::Settings => self.render_settings(frame, chunks[1], &palette),
            View::Folders | View::Tags => {
                let body = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Percentage(22),
                        Constraint::Percentage(36),
                        Constraint::Min(1),
                    ])
                    .split(chunks[1]);
                self.render_scope_sidebar(frame, body[0], &palette);
                self.render_note_list(frame, body[1], &palette);
                self.render_detail(frame, body[2], &palette);
            }
            View::Home | View::Trash => {
                let body = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(42), Constraint::Min(1)])
                    .split(chunks[1]);
                self.render_note_list(frame, body[0], &palette);
                self.render_detail(frame, body[1], &palette);
            }
        }

        self.render_status_bar(frame, chunks[2], &palette);
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let mut spans = Vec::new();
        for (idx, view) in View::ALL.iter().enumerate() {
            let label = format!(" {} {} ", idx + 1, view.label());
            let style = if *view == self.view {
                Style::default()
                    .fg(palette.selected_fg)
                    .bg(palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.muted).bg(palette.panel)
            };
            spans.push(Span::styled(label, style));
        }

        spans.push(Span::styled(
            "  n: New  Enter: Edit  /: Search  d: Trash  Space: Mark  D: Delete marked  a: AI  :: Command  q: Quit ",
            Style::default().fg(palette.muted).bg(palette.panel),
        ));

        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.panel)),
            area,
        );
    }

    fn render_scope_sidebar(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let entries = self.scope_entries();
        let title = if self.view == View::Folders {
            " Folders [ ] "
        } else {
            " Tags [ ] "
        };

        let lines: Vec<Line> = if entries.is_empty() {
            vec![Line::from(Span::styled(
                if self.view == View::Folders {
                    "No folders. Type @name in a note."
                } else {
                    "No tags. Type #name in a note."
                },
                Style::default().fg(palette.muted),
            ))]
        } else {
            entries
                .iter()
                .enumerate()
                .map(|(idx, (_, label, count))| {
                    let content = format!("{label} ({count})");
                    let style = if idx == self.scope_selected {
                        Style::default()
                            .fg(palette.selected_fg)
                            .bg(palette.selected_bg)
                    } else if self.view == View::Folders {
                        Style::default().fg(palette.folder)
                    } else {
                        Style::default().fg(palette.tag)
                    };
                    Line::from(Span::styled(content, style))
                })
                .collect()
        };

        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .title(title)
                    .borders(Borders::RIGHT)
                    .style(Style::default().bg(palette.panel).fg(palette.fg)),
            ),
            area,
        );
    }

    fn render_note_list(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let notes = self.visible_notes();
        let height = area.height.saturating_sub(1).max(1) as usize;
        let offset = self.selected.saturating_sub(height - 1);

        let lines: Vec<Line> = if notes.is_empty() {
            let empty = match self.view {
                View::Trash => "Trash is empty",
                _ if !self.query.is_empty() => "No matches",
                _ => "No notes. Press n to start one.",
            };
            vec![Line::from(Span::styled(
                empty,
                Style::default().fg(palette.muted),
            ))]
        } else {
            notes
                .iter()
                .enumerate()
                .skip(offset)
                .take(height)
                .map(|(idx, note)| self.note_row(note, idx == self.selected, palette))
                .collect()
        };

        let title = format!(" {} ({}) ", self.view.label(), notes.len());
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .title(title)
                    .borders(Borders::RIGHT)
                    .style(Style::default().bg(palette.bg).fg(palette.fg)),
            ),
            area,
        );
    }

    fn note_row(&self, note: &Note, selected: bool, palette: &Palette) -> Line<'static> {
        let mark = if self.marked.contains(&note.id) {
            "● "
        } else {
            "  "
        };
        let busy = if self.enriching.contains(&note.id) {
            "… "
        } else {
            ""
        };

        if selected {
            return Line::from(Span::styled(
                format!("{mark}{busy}{}  {}", note.display_title(), format_date(note.updated_at)),
                Style::default()
                    .fg(palette.selected_fg)
                    .bg(palette.selected_bg),
            ));
        }

        let mut spans = vec![
            Span::styled(format!("{mark}{busy}"), Style::default().fg(palette.accent)),
            Span::styled(note.display_title(), Style::default().fg(palette.fg)),
            Span::styled(
                format!("  {}", format_date(note.updated_at)),
                Style::default().fg(palette.muted),
            ),
        ];
        for folder_id in &note.folder_ids {
            if let Some(folder) = self.store.folder(folder_id) {
                spans.push(Span::styled(
                    format!("  @{}", folder.name),
                    Style::default().fg(palette.folder),
                ));
            }
        }
        for tag in note.display_tags() {
            spans.push(Span::styled(
                format!(" #{tag}"),
                Style::default().fg(palette.tag),
            ));
        }
        Line::from(spans)
    }

    fn metadata_lines(&self, note: &Note, palette: &Palette) -> Vec<Line<'static>> {
        let mut badges: Vec<Span<'static>> = Vec::new();
        for folder_id in &note.folder_ids {
            if let Some(folder) = self.store.folder(folder_id) {
                badges.push(Span::styled(
                    format!("{} {}  ", icon::glyph(folder.icon.as_deref()), folder.name),
                    Style::default().fg(palette.folder),
                ));
            }
        }
        for tag in note.display_tags() {
            let style = if note.tags.contains(&tag) {
                Style::default().fg(palette.tag).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.tag)
            };
            badges.push(Span::styled(format!("#{tag}  "), style));
        }

        let mut lines = vec![
            Line::from(Span::styled(
                note.display_title(),
                Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!(
                    "created {}  ·  updated {}",
                    format_date(note.created_at),
                    format_date(note.updated_at)
                ),
                Style::default().fg(palette.muted),
            )),
        ];
        if !badges.is_empty() {
            lines.push(Line::from(badges));
        }
        if let Some(summary) = note.summary.as_deref() {
            lines.push(Line::from(Span::styled(
                summary.to_string(),
                Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
            )));
        }
        lines.push(Line::from(""));
        lines
    }

    fn render_detail(&mut self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let block = Block::default().style(Style::default().bg(palette.bg).fg(palette.fg));

        if let Some(note_id) = self.editor.as_ref().map(|buffer| buffer.note_id.clone()) {
            let Some(note) = self.store.note(&note_id) else {
                return;
            };
            let mut lines = self.metadata_lines(note, palette);
            let header = (lines.len() as u16).min(area.height);
            let Some(buffer) = self.editor.as_mut() else {
                return;
            };

            buffer.fit(area.width, area.height - header);
            lines.extend(buffer.visible_lines().into_iter().map(Line::from));
            frame.render_widget(Paragraph::new(lines).block(block), area);

            let (x, y) = buffer.screen_cursor();
            if header < area.height {
                frame.set_cursor_position((area.x + x, area.y + header + y));
            }
            return;
        }

        let Some(note) = self
            .selected_id()
            .and_then(|id| self.store.note(&id).cloned())
        else {
            frame.render_widget(Paragraph::new("").block(block), area);
            return;
        };

        let mut lines = self.metadata_lines(&note, palette);
        lines.extend(note.content.lines().map(|l| Line::from(l.to_string())));
        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(block),
            area,
        );
    }

    fn render_settings(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let mut lines = vec![
            Line::from(Span::styled(
                "Theme  (j/k, Enter)",
                Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        for (idx, theme) in Theme::ALL.iter().enumerate() {
            let active = if *theme == self.store.theme() { "●" } else { " " };
            let content = format!(" {active} {}", theme.name());
            let style = if idx == self.settings_selected {
                Style::default()
                    .fg(palette.selected_fg)
                    .bg(palette.selected_bg)
            } else {
                Style::default().fg(palette.fg)
            };
            lines.push(Line::from(Span::styled(content, style)));
        }

        let ai_status = if self.enricher.is_some() {
            format!("AI enrichment: ready ({})", self.config.ai.model)
        } else if !self.config.ai.enabled {
            "AI enrichment: disabled in config".to_string()
        } else {
            format!("AI enrichment: set {} to enable", self.config.ai.api_key_env)
        };

        lines.extend([
            Line::from(""),
            Line::from(Span::styled(ai_status, Style::default().fg(palette.muted))),
            Line::from(Span::styled(
                format!(
                    "{} notes · {} folders · data in {}",
                    self.store.notes().len(),
                    self.store.folders().len(),
                    self.config.general.data_dir
                ),
                Style::default().fg(palette.muted),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "R: reset all data",
                Style::default().fg(palette.accent),
            )),
        ]);

        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .title(" Settings ")
                    .borders(Borders::ALL)
                    .style(Style::default().bg(palette.bg).fg(palette.fg)),
            ),
            area,
        );
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let mode_span = Span::styled(
            format!(" {} ", self.mode.label()),
            Style::default()
                .fg(palette.selected_fg)
                .bg(palette.accent)
                .add_modifier(Modifier::BOLD),
        );

        let mut suffix = match &self.mode {
            Mode::Search => format!(" /{}", self.query),
            Mode::Command => format!(" :{}", self.command_input),
            Mode::Confirm(action) => format!(" {} (y/n)", action.prompt()),
            _ if !self.query.is_empty() => format!(" filter: {}", self.query),
            _ => String::new(),
        };
        if !self.marked.is_empty() {
            suffix.push_str(&format!(" | {} marked", self.marked.len()));
        }
        if !self.enriching.is_empty() {
            suffix.push_str(" | enriching…");
        }
        if let Some((message, _)) = self.notifications.back() {
            suffix.push_str(&format!(" | {message}"));
        }

        let info = Span::styled(suffix, Style::default().fg(palette.fg).bg(palette.panel));
        frame.render_widget(
            Paragraph::new(Line::from(vec![mode_span, info]))
                .style(Style::default().bg(palette.panel)),
            area,
        );
    }
}

fn spawn_enrichment(
    client: Arc<EnrichClient>,
    note_id: String,
    content: String,
    tx: mpsc::Sender<Msg>,
) {
    std::thread::spawn(move || {
        let enrichment = client.enrich(&content);
        if tx
            .send(Msg::EnrichmentReady {
                note_id,
                enrichment,
            })
            .is_err()
        {
            tracing::debug!("enrichment finished after shutdown");
        }
    });
}

fn format_date(ms: Timestamp) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%b %d %H:%M")
                .to_string()
        })
        .unwrap_or_default()
}

/// Palette argument with one pair of surrounding quotes removed.
fn parse_quoted_arg(raw: &str) -> String {
    let input = raw.trim();
    ['"', '\'']
        .iter()
        .find_map(|quote| input.strip_prefix(*quote)?.strip_suffix(*quote))
        .unwrap_or(input)
        .trim()
        .to_string()
}
