use super::Reader;
use crate::Config;

use anyhow::Context;
use rustyline::error::ReadlineError;
use rustyline::{Config as EditorConfig, DefaultEditor};
use std::path::PathBuf;

/// Interactive line editor with persistent history.
pub struct PromptReader {
    editor: DefaultEditor,
    prompt: String,
    history: Option<PathBuf>,
}

impl PromptReader {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let editor_config = EditorConfig::builder()
            .max_history_size(config.history_size)
            .context("Invalid history size.")?
            .history_ignore_dups(true)
            .context("Invalid history settings.")?
            .auto_add_history(false)
            .build();
        let mut editor =
            DefaultEditor::with_config(editor_config).context("Failed to start the line editor.")?;

        if let Some(path) = &config.history_file {
            // Missing on first run.
            if let Err(e) = editor.load_history(path) {
                tracing::debug!(path = %path.display(), "no history loaded: {}", e);
            }
        }

        Ok(Self {
            editor,
            prompt: config.prompt.clone(),
            history: config.history_file.clone(),
        })
    }
}

impl Reader for PromptReader {
    fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        match self.editor.readline(&self.prompt) {
            Ok(s) => {
                if !s.trim().is_empty() {
                    let _ = self.editor.add_history_entry(s.as_str());
                }
                Ok(Some(s))
            }
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for PromptReader {
    fn drop(&mut self) {
        if let Some(path) = &self.history {
            if let Err(e) = self.editor.save_history(path) {
                tracing::warn!(path = %path.display(), "failed to save history: {}", e);
            }
        }
    }
}
