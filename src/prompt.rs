//! Human interaction.

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::error::PromptError;

/// Asks a human for values.
pub trait PromptSource {
    /// Free-form value entry.
    fn ask_value(&mut self, label: &str) -> Result<String, PromptError>;

    /// Pick one of `options`; returns the chosen option.
    fn ask_choice(&mut self, label: &str, options: &[String]) -> Result<String, PromptError>;

    fn ask_yes_no(&mut self, label: &str) -> Result<bool, PromptError>;

    /// Pick a row from a provider's list response; returns its index.
    fn select_row(&mut self, label: &str, rows: &[String]) -> Result<usize, PromptError>;
}

/// Prompts on the controlling terminal.
pub struct TerminalPrompt {
    theme: ColorfulTheme,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PromptSource for TerminalPrompt {
    fn ask_value(&mut self, label: &str) -> Result<String, PromptError> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .interact_text()
            .map_err(PromptError::Terminal)
    }

    fn ask_choice(&mut self, label: &str, options: &[String]) -> Result<String, PromptError> {
        let idx = Select::with_theme(&self.theme)
            .with_prompt(label)
            .items(options)
            .default(0)
            .interact_opt()
            .map_err(PromptError::Terminal)?
            .ok_or(PromptError::Aborted)?;
        options.get(idx).cloned().ok_or(PromptError::Aborted)
    }

    fn ask_yes_no(&mut self, label: &str) -> Result<bool, PromptError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(label)
            .interact_opt()
            .map_err(PromptError::Terminal)?
            .ok_or(PromptError::Aborted)
    }

    fn select_row(&mut self, label: &str, rows: &[String]) -> Result<usize, PromptError> {
        Select::with_theme(&self.theme)
            .with_prompt(label)
            .items(rows)
            .default(0)
            .interact_opt()
            .map_err(PromptError::Terminal)?
            .ok_or(PromptError::Aborted)
    }
}

/// For scripted runs: list selections take the first row, anything that
/// needs a human fails with [`PromptError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl PromptSource for NonInteractive {
    fn ask_value(&mut self, label: &str) -> Result<String, PromptError> {
        Err(PromptError::Unavailable {
            label: label.to_string(),
        })
    }

    fn ask_choice(&mut self, label: &str, _options: &[String]) -> Result<String, PromptError> {
        Err(PromptError::Unavailable {
            label: label.to_string(),
        })
    }

    fn ask_yes_no(&mut self, label: &str) -> Result<bool, PromptError> {
        Err(PromptError::Unavailable {
            label: label.to_string(),
        })
    }

    fn select_row(&mut self, label: &str, rows: &[String]) -> Result<usize, PromptError> {
        if rows.is_empty() {
            return Err(PromptError::Unavailable {
                label: label.to_string(),
            });
        }
        Ok(0)
    }
}
