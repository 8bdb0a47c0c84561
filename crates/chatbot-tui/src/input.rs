//! Cursor bookkeeping for text fields.
//!
//! Field values live in the chat session, so edits produce a new string that
//! the caller stores back; the cursor is the only state kept here. Positions
//! are character indices, not byte offsets.

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditCursor {
    pos: usize,
}

impl EditCursor {
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn insert(&mut self, text: &str, c: char) -> String {
        let mut updated = text.to_string();
        updated.insert(char_to_byte_index(text, self.pos), c);
        self.pos += 1;
        updated
    }

    pub fn backspace(&mut self, text: &str) -> Option<String> {
        if self.pos == 0 {
            return None;
        }
        self.pos -= 1;
        let mut updated = text.to_string();
        updated.remove(char_to_byte_index(text, self.pos));
        Some(updated)
    }

    pub fn delete(&self, text: &str) -> Option<String> {
        if self.pos >= text.chars().count() {
            return None;
        }
        let mut updated = text.to_string();
        updated.remove(char_to_byte_index(text, self.pos));
        Some(updated)
    }

    pub fn left(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    pub fn right(&mut self, text: &str) {
        self.pos = (self.pos + 1).min(text.chars().count());
    }

    pub fn home(&mut self) {
        self.pos = 0;
    }

    pub fn end(&mut self, text: &str) {
        self.pos = text.chars().count();
    }

    /// Row and column of the cursor when `text` is laid out line by line
    pub fn row_col(&self, text: &str) -> (usize, usize) {
        let before: String = text.chars().take(self.pos).collect();
        let row = before.matches('\n').count();
        let col = before
            .rsplit('\n')
            .next()
            .map(|line| line.chars().count())
            .unwrap_or(0);
        (row, col)
    }
}
