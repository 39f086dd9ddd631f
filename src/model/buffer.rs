use ropey::Rope;

/// Viewport state for scroll tracking.
#[derive(Debug, Clone)]
pub struct Viewport {
    pub top_line: usize,
    /// First visible column, in chars.
    pub left_col: usize,
    pub height: u16,
    pub width: u16,
    pub scroll_off: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            top_line: 0,
            left_col: 0,
            height: 20,
            width: 80,
            scroll_off: 3,
        }
    }
}

/// Cursor position. Columns count chars, not bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
    /// Column to return to when moving vertically through shorter lines.
    pub desired_col: usize,
}

/// Editing state for the open note.
pub struct Buffer {
    pub note_id: String,
    pub rope: Rope,
    pub cursor: Cursor,
    pub viewport: Viewport,
}

impl Buffer {
    /// Open `text` with the cursor at the end, where tokens are committed.
    pub fn open(note_id: impl Into<String>, text: &str, scroll_off: u16) -> Self {
        let mut buffer = Self {
            note_id: note_id.into(),
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
            viewport: Viewport {
                scroll_off,
                ..Viewport::default()
            },
        };
        buffer.move_to_end();
        buffer
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Swap in rewritten text, keeping the cursor as close as possible.
    pub fn replace_text(&mut self, text: &str) {
        let char_idx = self.cursor_char_idx();
        self.rope = Rope::from_str(text);
        self.set_cursor_char_idx(char_idx.min(self.rope.len_chars()));
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Text of line `idx` without its line break.
    pub fn line_text(&self, idx: usize) -> Option<String> {
        if idx >= self.rope.len_lines() {
            return None;
        }
        let mut s: String = self.rope.line(idx).chunks().collect();
        if s.ends_with('\n') {
            s.pop();
        }
        if s.ends_with('\r') {
            s.pop();
        }
        Some(s)
    }

    fn line_len(&self, idx: usize) -> usize {
        self.line_text(idx).map(|l| l.chars().count()).unwrap_or(0)
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.insert_newline();
            return;
        }
        let idx = self.cursor_char_idx();
        self.rope.insert_char(idx, ch);
        self.cursor.col += 1;
        self.cursor.desired_col = self.cursor.col;
    }

    pub fn insert_newline(&mut self) {
        let idx = self.cursor_char_idx();
        self.rope.insert_char(idx, '\n');
        self.cursor.row += 1;
        self.cursor.col = 0;
        self.cursor.desired_col = 0;
    }

    /// Backspace. Returns false at the start of the buffer.
    pub fn delete_char_before(&mut self) -> bool {
        let idx = self.cursor_char_idx();
        if idx == 0 {
            return false;
        }
        self.rope.remove(idx - 1..idx);
        self.set_cursor_char_idx(idx - 1);
        true
    }

    pub fn move_left(&mut self) {
        let idx = self.cursor_char_idx();
        if idx > 0 {
            self.set_cursor_char_idx(idx - 1);
        }
    }

    pub fn move_right(&mut self) {
        let idx = self.cursor_char_idx();
        if idx < self.rope.len_chars() {
            self.set_cursor_char_idx(idx + 1);
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor.row > 0 {
            self.cursor.row -= 1;
            self.cursor.col = self.cursor.desired_col.min(self.line_len(self.cursor.row));
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor.row + 1 < self.line_count() {
            self.cursor.row += 1;
            self.cursor.col = self.cursor.desired_col.min(self.line_len(self.cursor.row));
        }
    }

    pub fn move_to_end(&mut self) {
        self.set_cursor_char_idx(self.rope.len_chars());
    }

    fn cursor_char_idx(&self) -> usize {
        self.rope.line_to_char(self.cursor.row) + self.cursor.col
    }

    fn set_cursor_char_idx(&mut self, idx: usize) {
        let row = self.rope.char_to_line(idx);
        self.cursor.row = row;
        self.cursor.col = idx - self.rope.line_to_char(row);
        self.cursor.desired_col = self.cursor.col;
    }

    /// Ensure the viewport keeps the cursor visible.
    pub fn scroll_to_cursor(&mut self) {
        let height = (self.viewport.height as usize).max(1);
        let off = (self.viewport.scroll_off as usize).min(height.saturating_sub(1) / 2);

        if self.cursor.row < self.viewport.top_line + off {
            self.viewport.top_line = self.cursor.row.saturating_sub(off);
        }
        if self.cursor.row + off >= self.viewport.top_line + height {
            self.viewport.top_line = self.cursor.row + off + 1 - height;
        }

        let width = (self.viewport.width as usize).max(1);
        if self.cursor.col < self.viewport.left_col {
            self.viewport.left_col = self.cursor.col;
        }
        if self.cursor.col >= self.viewport.left_col + width {
            self.viewport.left_col = self.cursor.col + 1 - width;
        }
    }

    /// Resize the text area and scroll the cursor back into it.
    pub fn fit(&mut self, width: u16, height: u16) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.scroll_to_cursor();
    }

    /// Lines inside the viewport, clipped to its columns.
    pub fn visible_lines(&self) -> Vec<String> {
        let height = self.viewport.height as usize;
        let width = self.viewport.width as usize;
        (self.viewport.top_line..self.viewport.top_line + height)
            .map_while(|idx| self.line_text(idx))
            .map(|line| {
                line.chars()
                    .skip(self.viewport.left_col)
                    .take(width)
                    .collect()
            })
            .collect()
    }

    /// Cursor position relative to the viewport's top-left corner.
    pub fn screen_cursor(&self) -> (u16, u16) {
        let x = self.cursor.col.saturating_sub(self.viewport.left_col);
        let y = self.cursor.row.saturating_sub(self.viewport.top_line);
        (x as u16, y as u16)
    }
}
