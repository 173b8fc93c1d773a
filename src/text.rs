//! Word wrapping and multi-line labels.

use embedded_graphics::pixelcolor::Rgb565;

/// Greedy word wrap on single spaces.
///
/// Carriage returns and newlines are dropped first. A word is appended to the
/// current line while `line + " " + word` still fits in `max_chars`;
/// otherwise the line is closed and the word starts the next one. Words
/// longer than `max_chars` get a line of their own and are not split.
pub fn wrap_nicely(string: &str, max_chars: usize) -> Vec<String> {
    let cleaned: String = string.chars().filter(|c| *c != '\n' && *c != '\r').collect();

    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_chars = 0usize;

    for word in cleaned.split(' ') {
        let word_chars = word.chars().count();
        if line_chars + 1 + word_chars <= max_chars {
            line.push(' ');
            line.push_str(word);
            line_chars += 1 + word_chars;
        } else {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            line.push_str(word);
            line_chars = word_chars;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }

    // Only the first line can carry the joining space.
    if let Some(first) = lines.first_mut() {
        if first.starts_with(' ') {
            first.remove(0);
        }
    }
    lines
}

/// A positioned block of text lines.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub x: i32,
    pub y: i32,
    pub color: Rgb565,
    lines: Vec<String>,
}

impl TextBox {
    pub fn new(x: i32, y: i32, color: Rgb565, text: &str) -> Self {
        let mut tb = Self {
            x,
            y,
            color,
            lines: Vec::new(),
        };
        tb.set_text(text);
        tb
    }

    /// Replace the text verbatim, splitting on `\n`.
    pub fn set_text(&mut self, text: &str) {
        self.lines = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\n').map(str::to_string).collect()
        };
    }

    /// Word-wrap `text` at `max_chars` and move the block to `top`.
    pub fn wrap(&mut self, top: i32, text: &str, max_chars: usize) {
        self.lines = wrap_nicely(text, max_chars);
        self.y = top;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }
}
