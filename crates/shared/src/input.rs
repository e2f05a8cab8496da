//! The pending-input text buffer.
//!
//! Shared between the controller (which drains it on submit) and the voice
//! session (which appends transcript fragments into it). Clones share the
//! same underlying buffer.

use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    text: Arc<Mutex<String>>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> String {
        self.text.lock().clone()
    }

    pub fn set(&self, value: impl Into<String>) {
        *self.text.lock() = value.into();
    }

    pub fn is_blank(&self) -> bool {
        self.text.lock().trim().is_empty()
    }

    /// Clear the buffer and return what was in it.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.text.lock())
    }

    /// Append a recognized transcript fragment, inserting a separating
    /// space only when the buffer is non-empty and does not already end
    /// with one.
    pub fn append_transcript(&self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        let mut text = self.text.lock();
        if !text.is_empty() && !text.ends_with(' ') {
            text.push(' ');
        }
        text.push_str(fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_empties_buffer() {
        let buf = InputBuffer::new();
        buf.set("hello");
        assert_eq!(buf.take(), "hello");
        assert!(buf.is_blank());
    }

    #[test]
    fn test_blank_on_whitespace() {
        let buf = InputBuffer::new();
        buf.set("   \t ");
        assert!(buf.is_blank());
    }

    #[test]
    fn test_transcript_into_empty_buffer_adds_no_space() {
        let buf = InputBuffer::new();
        buf.append_transcript("hello");
        assert_eq!(buf.get(), "hello");
    }

    #[test]
    fn test_transcript_separated_by_single_space() {
        let buf = InputBuffer::new();
        buf.set("hello");
        buf.append_transcript("world");
        assert_eq!(buf.get(), "hello world");
    }

    #[test]
    fn test_no_double_space_after_trailing_space() {
        let buf = InputBuffer::new();
        buf.set("hello ");
        buf.append_transcript("world");
        assert_eq!(buf.get(), "hello world");
    }

    #[test]
    fn test_empty_fragment_ignored() {
        let buf = InputBuffer::new();
        buf.set("hello");
        buf.append_transcript("");
        assert_eq!(buf.get(), "hello");
    }

    #[test]
    fn test_clones_share_storage() {
        let a = InputBuffer::new();
        let b = a.clone();
        b.append_transcript("shared");
        assert_eq!(a.get(), "shared");
    }
}
