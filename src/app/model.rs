//! Application model types: `App` and the gap/lead `SecondsEditor`.

use crate::timeline::parse_seconds_input;

/// Which timeline setting an editor is changing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SecondsField {
    Gap,
    Lead,
}

impl SecondsField {
    pub fn label(self) -> &'static str {
        match self {
            SecondsField::Gap => "gap",
            SecondsField::Lead => "lead-in",
        }
    }
}

/// Text being typed into the gap or lead field.
#[derive(Clone, Debug, PartialEq)]
pub struct SecondsEditor {
    pub field: SecondsField,
    pub buffer: String,
    /// Value to restore on cancel.
    pub original: f64,
}

/// The main application model.
#[derive(Debug, Default)]
pub struct App {
    pub selected: usize,
    pub editor: Option<SecondsEditor>,
    pub status: Option<String>,
    /// Level-check every track as soon as it is imported.
    pub auto_levels: bool,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move selection to the next track, wrapping to the first.
    pub fn next(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % len;
    }

    /// Move selection to the previous track, wrapping to the last.
    pub fn prev(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = match self.selected {
            0 => len - 1,
            i => (i - 1).min(len - 1),
        };
    }

    /// Keep `selected` inside a list of `len` tracks.
    pub fn clamp_selection(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Flip automatic level checks; returns the new setting.
    pub fn toggle_auto_levels(&mut self) -> bool {
        self.auto_levels = !self.auto_levels;
        self.auto_levels
    }

    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    pub fn begin_edit(&mut self, field: SecondsField, current: f64) {
        self.editor = Some(SecondsEditor {
            field,
            buffer: format!("{:.1}", current),
            original: current,
        });
    }

    /// Type one character. Only characters that can form a number are kept.
    pub fn push_edit_char(&mut self, c: char) {
        if let Some(ed) = self.editor.as_mut() {
            if c.is_ascii_digit() || c == '.' || c == '-' {
                ed.buffer.push(c);
            }
        }
    }

    pub fn pop_edit_char(&mut self) {
        if let Some(ed) = self.editor.as_mut() {
            ed.buffer.pop();
        }
    }

    /// Value to apply while typing; `None` leaves the setting as it is.
    pub fn edit_preview(&self) -> Option<(SecondsField, f64)> {
        let ed = self.editor.as_ref()?;
        parse_seconds_input(&ed.buffer, false, ed.original).map(|v| (ed.field, v))
    }

    /// Close the editor, returning the value to store.
    pub fn commit_edit(&mut self, fallback: f64) -> Option<(SecondsField, f64)> {
        let ed = self.editor.take()?;
        parse_seconds_input(&ed.buffer, true, fallback).map(|v| (ed.field, v))
    }

    /// Close the editor, returning the value it started from.
    pub fn cancel_edit(&mut self) -> Option<(SecondsField, f64)> {
        self.editor.take().map(|ed| (ed.field, ed.original))
    }
}
