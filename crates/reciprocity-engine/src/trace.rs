//! Indentation-aware evaluation trace.
//!
//! The recorder is an append-only list of lines. Its indent level mirrors the
//! recursion of the resolver, so the rendered text reads as a call tree:
//!
//! ```text
//! evaluating 1 asks 2 for [type = "addrInfo", city = "Prato"]
//!   rule 2.1: condition true holds, exchange required
//!     exchange requester gives [type = "addrInfo", city = "Pistoia"] to me
//!       ...
//!   OR
//!     exchange requester gives [type = "addrInfo", city = "Lucca"] to me
//!       ...
//!   rule 2.1: granted
//! result: true
//! ```

use crate::config::TraceConfig;

/// Append-only text log with a mutable indent level.
#[derive(Debug, Clone)]
pub struct TraceRecorder {
    lines: Vec<String>,
    level: usize,
    config: TraceConfig,
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new(TraceConfig::default())
    }
}

impl TraceRecorder {
    /// An empty recorder.
    #[must_use]
    pub fn new(config: TraceConfig) -> Self {
        Self {
            lines: Vec::new(),
            level: 0,
            config,
        }
    }

    /// Append `line` at the current indent.
    pub fn record(&mut self, line: impl AsRef<str>) {
        self.push_at(self.level, line.as_ref());
    }

    /// Increase the indent by one level.
    pub fn indent(&mut self) {
        self.level += 1;
    }

    /// Decrease the indent by one level. Saturates at zero.
    pub fn unindent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Append `line`, then indent. Opens a nested block.
    pub fn record_then_indent(&mut self, line: impl AsRef<str>) {
        self.record(line);
        self.indent();
    }

    /// Append `line` one level above the current indent, leaving the indent
    /// unchanged. Used for the connective between two children of a
    /// composite exchange.
    pub fn unindent_then_insert_at_previous_level(&mut self, line: impl AsRef<str>) {
        self.push_at(self.level.saturating_sub(1), line.as_ref());
    }

    /// Unindent, then append `line`. Closes a block opened by
    /// [`record_then_indent`](Self::record_then_indent).
    pub fn unindent_then_record(&mut self, line: impl AsRef<str>) {
        self.unindent();
        self.record(line);
    }

    /// Clear the log and the indent.
    pub fn reset(&mut self) {
        self.lines.clear();
        self.level = 0;
    }

    /// Current indent level.
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Recorded lines, indentation included.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns `true` if nothing was recorded since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The whole log, one line per entry, each terminated by a newline.
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    /// Move the log out, leaving the recorder empty.
    pub fn take(&mut self) -> String {
        let text = self.text();
        self.reset();
        text
    }

    fn push_at(&mut self, level: usize, line: &str) {
        let padding = " ".repeat(level * self.config.indent_width);
        if self.config.emit_events {
            tracing::trace!(target: "reciprocity::trace", depth = level, "{line}");
        }
        self.lines.push(format!("{padding}{line}"));
    }
}
