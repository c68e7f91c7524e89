use std::io::{self, Write};

use taxdesk_core::{ChatPhase, ChatViewModel};

/// Prints view models as they arrive: one status line per phase change, and
/// the answer as it grows, without repeating what is already on screen.
pub struct TerminalRenderer<W: Write> {
    out: W,
    printed: String,
    last_phase: Option<ChatPhase>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: String::new(),
            last_phase: None,
        }
    }

    pub fn render(&mut self, view: &ChatViewModel) -> io::Result<()> {
        let phase_changed = self.last_phase.as_ref() != Some(&view.phase);
        self.last_phase = Some(view.phase.clone());

        match view.phase {
            ChatPhase::Streaming | ChatPhase::Done => {
                self.write_text(&view.visible_text)?;
                if view.phase == ChatPhase::Done && phase_changed {
                    writeln!(self.out)?;
                }
            }
            _ if phase_changed && !view.status_line.is_empty() => {
                if !self.printed.is_empty() {
                    // Retry restarted the flow; leave the old text alone.
                    writeln!(self.out)?;
                    self.printed.clear();
                }
                writeln!(self.out, "{}", view.status_line)?;
            }
            _ => {}
        }
        self.out.flush()
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        match text.strip_prefix(self.printed.as_str()) {
            Some(delta) => self.out.write_all(delta.as_bytes())?,
            None => {
                writeln!(self.out)?;
                self.out.write_all(text.as_bytes())?;
            }
        }
        self.printed.clear();
        self.printed.push_str(text);
        Ok(())
    }
}
