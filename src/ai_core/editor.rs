//! Scoped program edit buffer
//!
//! A buffer is a private copy of one program's text. Nothing reaches the
//! core until `save`; `quit` throws the copy away.

use crate::ai_core::AiCore;
use crate::core::error::Result;

pub struct ProgramBuffer<'a> {
    core: &'a AiCore,
    name: String,
    original: String,
    text: String,
}

impl<'a> ProgramBuffer<'a> {
    pub(crate) fn new(core: &'a AiCore, name: String, text: String) -> Self {
        Self {
            core,
            name,
            original: text.clone(),
            text,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn push_line(&mut self, line: &str) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(line);
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn is_modified(&self) -> bool {
        self.text != self.original
    }

    /// Persist the buffer into the core's program
    pub fn save(&mut self) -> Result<()> {
        self.core.write_program(&self.name, &self.text)?;
        self.original = self.text.clone();
        Ok(())
    }

    /// Leave the editor, discarding unsaved changes
    pub fn quit(self) {
        let note = if self.is_modified() {
            format!("Exited editor for {}, unsaved changes discarded.", self.name)
        } else {
            format!("Exited editor for {}.", self.name)
        };
        self.core.notify(&note);
    }
}
