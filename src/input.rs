use zeroize::Zeroize;

/// Cursor-addressed text buffer used by dialog fields and the crypto
/// passphrase pair. Masked buffers zeroize their contents when cleared
/// or dropped.
#[derive(Default, Clone)]
pub struct InputBuffer {
    content: String,
    cursor: usize,
    masked: bool,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn masked() -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            masked: true,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    /// What to render: the raw content, or one mask char per character.
    pub fn display(&self, mask_char: char) -> String {
        if self.masked {
            mask_char.to_string().repeat(self.len())
        } else {
            self.content.clone()
        }
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    pub fn delete_back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.remove_char_at_cursor()
    }

    pub fn delete_forward(&mut self) -> bool {
        if self.cursor >= self.len() {
            return false;
        }
        self.remove_char_at_cursor()
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    pub fn move_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    pub fn clear(&mut self) {
        self.content.zeroize();
        self.content.clear();
        self.cursor = 0;
    }

    pub fn set(&mut self, value: &str) {
        self.content.zeroize();
        self.content = value.to_string();
        self.cursor = self.len();
    }

    fn remove_char_at_cursor(&mut self) -> bool {
        let start = self.byte_index(self.cursor);
        let end = self.byte_index(self.cursor + 1);
        self.content.drain(start..end);
        true
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }
}

impl Drop for InputBuffer {
    fn drop(&mut self) {
        if self.masked {
            self.content.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_delete_track_the_cursor() {
        let mut buffer = InputBuffer::new();
        for c in "4096".chars() {
            buffer.insert(c);
        }
        assert_eq!(buffer.content(), "4096");

        buffer.move_left();
        buffer.delete_back();
        assert_eq!(buffer.content(), "406");

        buffer.move_start();
        buffer.delete_forward();
        assert_eq!(buffer.content(), "06");
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn masked_buffer_displays_mask_chars_only() {
        let mut buffer = InputBuffer::masked();
        buffer.set("hunter2");
        assert_eq!(buffer.display('*'), "*******");
        assert_eq!(buffer.content(), "hunter2");
    }

    #[test]
    fn multibyte_content_is_edited_by_char() {
        let mut buffer = InputBuffer::new();
        buffer.set("héllo");
        buffer.move_start();
        buffer.move_right();
        buffer.delete_forward();
        assert_eq!(buffer.content(), "hllo");
    }
}
