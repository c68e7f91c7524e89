use std::time::Duration;

use crate::ConfigError;

/// Reveal rate and mode. `streaming == false` skips the animation and shows
/// the whole text at once, which is what historical answers want.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealOptions {
    chars_per_tick: usize,
    tick: Duration,
    streaming: bool,
}

impl RevealOptions {
    pub fn new(chars_per_tick: usize, tick: Duration) -> Result<Self, ConfigError> {
        if chars_per_tick == 0 {
            return Err(ConfigError::ZeroCharsPerTick);
        }
        if tick.is_zero() {
            return Err(ConfigError::ZeroTick);
        }
        Ok(Self {
            chars_per_tick,
            tick,
            streaming: true,
        })
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn chars_per_tick(&self) -> usize {
        self.chars_per_tick
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn streaming(&self) -> bool {
        self.streaming
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep<'a> {
    /// The cursor moved; show this prefix.
    Progress(&'a str),
    /// The cursor reached the end; this is the full text.
    Completed(&'a str),
    /// Nothing left to reveal.
    Idle,
}

/// Cursor over a fixed text. The cursor counts chars, so a prefix never
/// ends inside a multi-byte character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSession {
    full_text: String,
    options: RevealOptions,
    len: usize,
    cursor: usize,
    byte_end: usize,
    running: bool,
}

impl RevealSession {
    pub fn new(full_text: impl Into<String>, options: RevealOptions) -> Self {
        let full_text = full_text.into();
        let len = full_text.chars().count();
        Self {
            full_text,
            options,
            len,
            cursor: 0,
            byte_end: 0,
            running: len > 0,
        }
    }

    /// Moves the cursor by `chars_per_tick`, clamped to the end of the text.
    pub fn advance(&mut self) -> RevealStep<'_> {
        if !self.running {
            return RevealStep::Idle;
        }

        let step = self.options.chars_per_tick.min(self.len - self.cursor);
        let advanced_bytes: usize = self.full_text[self.byte_end..]
            .chars()
            .take(step)
            .map(char::len_utf8)
            .sum();
        self.cursor += step;
        self.byte_end += advanced_bytes;

        if self.cursor == self.len {
            self.running = false;
            RevealStep::Completed(&self.full_text)
        } else {
            RevealStep::Progress(&self.full_text[..self.byte_end])
        }
    }

    /// Jumps straight to the end. Returns the full text, or `None` when the
    /// session had nothing left to show.
    pub fn finish(&mut self) -> Option<&str> {
        if !self.running {
            return None;
        }
        self.cursor = self.len;
        self.byte_end = self.full_text.len();
        self.running = false;
        Some(&self.full_text)
    }

    pub fn prefix(&self) -> &str {
        &self.full_text[..self.byte_end]
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.len
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn options(&self) -> RevealOptions {
        self.options
    }
}
