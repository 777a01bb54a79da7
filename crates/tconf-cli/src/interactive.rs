//! Terminal input for interactive configure runs.
//!
//! Uses dialoguer for line editing. The core formats the label, including
//! the bracketed default, so the theme only adds its own prompt marker.

use std::io::Write;

use anyhow::Result;
use console::style;
use dialoguer::{Input, theme::ColorfulTheme};

use tconf_core::prompt::input::PromptInput;

/// Reads answers from the terminal.
#[derive(Default)]
pub struct TerminalInput {
    theme: ColorfulTheme,
}

impl TerminalInput {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

/// Drop the trailing colon the core adds; the theme prints its own marker.
fn prompt_text(label: &str) -> &str {
    label.trim_end().trim_end_matches(':').trim_end()
}

impl PromptInput for TerminalInput {
    fn read_line(&mut self, label: &str) -> Result<String> {
        let answer: String = Input::with_theme(&self.theme)
            .with_prompt(prompt_text(label))
            .allow_empty(true)
            .interact_text()?;
        Ok(answer)
    }
}

pub fn print_banner<W: Write>(writer: &mut W, version: &str) -> Result<()> {
    writeln!(writer)?;
    writeln!(
        writer,
        "{} {}",
        style("  tconf").bold().cyan(),
        style(format!("v{version}")).dim()
    )?;
    writeln!(
        writer,
        "  Type {} at any prompt for a list of commands.",
        style("help").green()
    )?;
    writeln!(writer)?;
    Ok(())
}
