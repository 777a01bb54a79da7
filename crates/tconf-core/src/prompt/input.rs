//! Sources of operator answers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Reads one answer for a fully formatted prompt label.
pub trait PromptInput {
    fn read_line(&mut self, label: &str) -> anyhow::Result<String>;
}

/// Input used in batch mode, where nobody is there to answer.
#[derive(Debug, Default)]
pub struct NoInput;

impl PromptInput for NoInput {
    fn read_line(&mut self, label: &str) -> anyhow::Result<String> {
        anyhow::bail!("No interactive input is available to answer: {}", label.trim())
    }
}

/// Labels that a [`ScriptedInput`] has been asked, shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<String>>>);

impl Transcript {
    pub fn labels(&self) -> Vec<String> {
        self.0.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn record(&self, label: &str) {
        if let Ok(mut labels) = self.0.lock() {
            labels.push(label.to_string());
        }
    }
}

/// Answers prompts from a fixed list, in order.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    transcript: Transcript,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Transcript::default(),
        }
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

impl PromptInput for ScriptedInput {
    fn read_line(&mut self, label: &str) -> anyhow::Result<String> {
        self.transcript.record(label);
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("Ran out of scripted answers at: {}", label.trim()))
    }
}

/// Format the prompt text and its default the way the operator sees it.
pub fn format_label(prompt: &str, default: &str) -> String {
    if prompt.len() + default.len() < 75 {
        format!("{prompt} [{default}]: ")
    } else {
        format!("{prompt}\n[{default}]:")
    }
}
