use ropey::Rope;

/// Cursor position in a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column (byte offset within the line).
    pub col: usize,
    /// Remembered column for vertical movement.
    col_memory: usize,
}

impl Cursor {
    pub const fn new() -> Self {
        Self::at(0, 0)
    }

    pub const fn at(line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            col_memory: col,
        }
    }

    const fn set_col(&mut self, col: usize) {
        self.col = col;
        self.col_memory = col;
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction for cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// The plain-text document, `\n` line endings, backed by a rope.
///
/// Columns are byte offsets into the line, matching the ranges the
/// expansion and completion code computes from `&str` slices.
pub struct TextBuffer {
    rope: Rope,
    cursor: Cursor,
    dirty: bool,
}

impl TextBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::new(),
            dirty: false,
        }
    }

    pub fn empty() -> Self {
        Self::from_text("")
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Whether the buffer changed since creation or the last save.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Content of a line without its newline.
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(line_idx).to_string();
        Some(line.trim_end_matches('\n').to_string())
    }

    /// Length of a line in bytes.
    pub fn line_len(&self, line_idx: usize) -> usize {
        self.line_at(line_idx).map_or(0, |s| s.len())
    }

    /// Text of the cursor's line up to the cursor.
    pub fn line_prefix(&self) -> String {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        line.get(..self.cursor.col).unwrap_or(&line).to_string()
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Replace the whole content from outside. The cursor is clamped and the
    /// buffer stays clean.
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        let Cursor { line, col, .. } = self.cursor;
        self.move_to(line, col);
    }

    /// Replace the whole content as one edit. The cursor is clamped.
    pub fn replace_all(&mut self, text: &str) {
        self.set_text(text);
        self.dirty = true;
    }

    pub fn insert_char(&mut self, ch: char) {
        let char_idx = self.cursor_char_idx();
        self.rope.insert_char(char_idx, ch);
        if ch == '\n' {
            self.cursor.line += 1;
            self.cursor.set_col(0);
        } else {
            self.cursor.set_col(self.cursor.col + ch.len_utf8());
        }
        self.dirty = true;
    }

    /// Insert `s` at the cursor and move the cursor to its end.
    pub fn insert_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        let char_idx = self.cursor_char_idx();
        self.rope.insert(char_idx, s);
        let (lines, col) = crate::catalog::end_of(s);
        if lines > 0 {
            self.cursor.line += lines;
            self.cursor.set_col(col);
        } else {
            self.cursor.set_col(self.cursor.col + col);
        }
        self.dirty = true;
    }

    /// Replace bytes `start..end` of `line` with `text`, leaving the cursor
    /// at the end of the inserted text.
    pub fn replace_range(&mut self, line: usize, start: usize, end: usize, text: &str) {
        let content = self.line_at(line).unwrap_or_default();
        let end = end.min(content.len());
        let start = start.min(end);
        let line_start = self.rope.line_to_char(line.min(self.line_count().saturating_sub(1)));
        let from = line_start + content[..start].chars().count();
        let to = line_start + content[..end].chars().count();
        self.rope.remove(from..to);
        self.cursor = Cursor::at(line, start);
        self.insert_str(text);
        self.dirty = true;
    }

    /// Replace the content of `line`, keeping the cursor column if it fits.
    pub fn replace_line(&mut self, line: usize, text: &str) {
        let len = self.line_len(line);
        let cursor = self.cursor;
        self.replace_range(line, 0, len, text);
        self.move_to(cursor.line, cursor.col);
    }

    /// Split the current line at the cursor (Enter).
    pub fn split_line(&mut self) {
        self.insert_char('\n');
    }

    /// Delete the character before the cursor (Backspace).
    ///
    /// Returns `true` if a character was deleted.
    pub fn delete_back(&mut self) -> bool {
        if self.cursor.col == 0 && self.cursor.line == 0 {
            return false;
        }
        let char_idx = self.cursor_char_idx();
        if self.cursor.col == 0 {
            let prev_line_len = self.line_len(self.cursor.line - 1);
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.line -= 1;
            self.cursor.set_col(prev_line_len);
        } else {
            let before = self.line_prefix();
            let prev_char_len = before.chars().next_back().map_or(1, char::len_utf8);
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.set_col(self.cursor.col - prev_char_len);
        }
        self.dirty = true;
        true
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.move_left(),
            Direction::Right => self.move_right(),
            Direction::Up => self.move_vertical(false),
            Direction::Down => self.move_vertical(true),
        }
    }

    pub const fn move_home(&mut self) {
        self.cursor.set_col(0);
    }

    pub fn move_end(&mut self) {
        let len = self.line_len(self.cursor.line);
        self.cursor.set_col(len);
    }

    /// Move to `line`/`col`, clamped to the buffer.
    pub fn move_to(&mut self, line: usize, col: usize) {
        let max_line = self.line_count().saturating_sub(1);
        self.cursor.line = line.min(max_line);
        let content = self.line_at(self.cursor.line).unwrap_or_default();
        let mut col = col.min(content.len());
        while !content.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor.set_col(col);
    }

    pub fn move_to_end(&mut self) {
        let last_line = self.line_count().saturating_sub(1);
        self.cursor.line = last_line;
        self.cursor.set_col(self.line_len(last_line));
    }

    fn cursor_char_idx(&self) -> usize {
        let line_start = self.rope.line_to_char(self.cursor.line);
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let byte_col = self.cursor.col.min(line.len());
        line_start + line[..byte_col].chars().count()
    }

    fn move_left(&mut self) {
        if self.cursor.col > 0 {
            let prev_char_len = self
                .line_prefix()
                .chars()
                .next_back()
                .map_or(1, char::len_utf8);
            self.cursor.set_col(self.cursor.col - prev_char_len);
        } else if self.cursor.line > 0 {
            self.cursor.line -= 1;
            self.cursor.set_col(self.line_len(self.cursor.line));
        }
    }

    fn move_right(&mut self) {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        if self.cursor.col < line.len() {
            let next_char_len = line[self.cursor.col..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            self.cursor.set_col(self.cursor.col + next_char_len);
        } else if self.cursor.line + 1 < self.line_count() {
            self.cursor.line += 1;
            self.cursor.set_col(0);
        }
    }

    fn move_vertical(&mut self, down: bool) {
        let target = if down {
            self.cursor.line + 1
        } else {
            let Some(up) = self.cursor.line.checked_sub(1) else {
                return;
            };
            up
        };
        if target >= self.line_count() {
            return;
        }
        let memory = self.cursor.col_memory;
        self.move_to(target, memory);
        self.cursor.col_memory = memory;
    }
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field("rope", &format_args!("Rope({} lines)", self.rope.len_lines()))
            .field("cursor", &self.cursor)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_has_one_line() {
        let buf = TextBuffer::empty();
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_at(0), Some(String::new()));
    }

    #[test]
    fn test_from_text_trailing_newline() {
        let buf = TextBuffer::from_text("hello\n");
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.line_at(1), Some(String::new()));
        assert_eq!(buf.text(), "hello\n");
    }

    #[test]
    fn test_insert_marks_dirty() {
        let mut buf = TextBuffer::from_text("hello");
        assert!(!buf.is_dirty());
        buf.insert_char('!');
        assert!(buf.is_dirty());
        buf.mark_clean();
        assert!(!buf.is_dirty());
    }

    #[test]
    fn test_insert_str_multiline_moves_cursor() {
        let mut buf = TextBuffer::from_text("ab");
        buf.move_to(0, 1);
        buf.insert_str("x\nyz");
        assert_eq!(buf.text(), "ax\nyzb");
        assert_eq!(buf.cursor(), Cursor::at(1, 2));
    }

    #[test]
    fn test_line_prefix_stops_at_cursor() {
        let mut buf = TextBuffer::from_text("one /h2 two");
        buf.move_to(0, 7);
        assert_eq!(buf.line_prefix(), "one /h2");
    }

    #[test]
    fn test_replace_range_within_line() {
        let mut buf = TextBuffer::from_text("top\nsay /h2 now");
        buf.replace_range(1, 4, 8, "## ");
        assert_eq!(buf.text(), "top\nsay ## now");
        assert_eq!(buf.cursor(), Cursor::at(1, 7));
    }

    #[test]
    fn test_replace_range_multibyte() {
        let mut buf = TextBuffer::from_text("é/b");
        buf.replace_range(0, 2, 4, "**");
        assert_eq!(buf.text(), "é**");
    }

    #[test]
    fn test_replace_line_keeps_cursor() {
        let mut buf = TextBuffer::from_text("  - [ ] milk");
        buf.move_to(0, 4);
        buf.replace_line(0, "  - [x] milk");
        assert_eq!(buf.text(), "  - [x] milk");
        assert_eq!(buf.cursor(), Cursor::at(0, 4));
    }

    #[test]
    fn test_set_text_clamps_cursor_and_stays_clean() {
        let mut buf = TextBuffer::from_text("long line\nsecond");
        buf.move_to(1, 6);
        buf.set_text("short");
        assert_eq!(buf.cursor(), Cursor::at(0, 5));
        assert!(!buf.is_dirty());
    }

    #[test]
    fn test_delete_back_joins_lines() {
        let mut buf = TextBuffer::from_text("hello\nworld");
        buf.move_to(1, 0);
        assert!(buf.delete_back());
        assert_eq!(buf.text(), "helloworld");
        assert_eq!(buf.cursor(), Cursor::at(0, 5));
    }

    #[test]
    fn test_delete_back_multibyte() {
        let mut buf = TextBuffer::from_text("café");
        buf.move_end();
        buf.delete_back();
        assert_eq!(buf.text(), "caf");
    }

    #[test]
    fn test_vertical_movement_remembers_column() {
        let mut buf = TextBuffer::from_text("abcdef\nab\nabcdef");
        buf.move_to(0, 5);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor().col, 2);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor().col, 5);
        buf.move_cursor(Direction::Up);
        buf.move_cursor(Direction::Up);
        assert_eq!(buf.cursor(), Cursor::at(0, 5));
        buf.move_cursor(Direction::Up);
        assert_eq!(buf.cursor().line, 0);
    }

    #[test]
    fn test_horizontal_movement_wraps_lines() {
        let mut buf = TextBuffer::from_text("ab\ncd");
        buf.move_to(0, 2);
        buf.move_cursor(Direction::Right);
        assert_eq!(buf.cursor(), Cursor::at(1, 0));
        buf.move_cursor(Direction::Left);
        assert_eq!(buf.cursor(), Cursor::at(0, 2));
    }
}
