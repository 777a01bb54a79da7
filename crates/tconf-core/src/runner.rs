//! Walks the prompt catalog and commits answers into the property store.

use std::collections::HashSet;

use anyhow::Context;

use crate::capability::Capability;
use crate::context::RunContext;
use crate::prompt::{Prompt, PromptOutcome};
use crate::remote::{PromptError, RemoteError};
use crate::report::print_prompt_errors;

pub const UNKNOWN_KEY_PROMPT: &str = "Unknown configuration key";
pub const UNKNOWN_KEY_MESSAGE: &str = "This is an unknown configuration key";

const RUN_HELP: &str = "\
Answer each question or press enter to accept the value shown in brackets.
These commands are available at any prompt:
  help      Show help for the current prompt
  prev      Return to the previous prompt
  defaults  Accept the default value for this and all remaining prompts
  save      Save the values entered so far and exit";

/// How a pass over the catalog ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerOutcome {
    Completed,
    SavedAndExited,
}

/// The prompt catalog, sorted by weight.
pub struct PromptRunner {
    prompts: Vec<Box<dyn Prompt>>,
}

impl PromptRunner {
    pub fn new(mut prompts: Vec<Box<dyn Prompt>>) -> Self {
        prompts.sort_by_key(|p| p.weight());
        Self { prompts }
    }

    pub fn prompts(&self) -> &[Box<dyn Prompt>] {
        &self.prompts
    }

    /// Ask every prompt in order, honoring navigation requests.
    ///
    /// Save-and-exit writes the store to the configured path before
    /// returning.
    pub fn run(&self, ctx: &mut RunContext) -> anyhow::Result<RunnerOutcome> {
        ctx.say(RUN_HELP);

        let mut i = 0;
        let mut previous: Vec<usize> = Vec::new();

        while i < self.prompts.len() {
            let prompt = &self.prompts[i];
            match prompt.run(ctx)? {
                PromptOutcome::Next => {
                    if prompt.allow_previous(ctx) {
                        previous.push(i);
                    }
                    i += 1;
                }
                PromptOutcome::Previous => match previous.pop() {
                    Some(index) => i = index,
                    None => ctx.say("Unable to move to the previous prompt"),
                },
                PromptOutcome::SaveAndExit => {
                    self.save_and_exit(ctx)?;
                    return Ok(RunnerOutcome::SavedAndExited);
                }
                PromptOutcome::AcceptAllDefaults => {
                    ctx.say("Accepting the default value for all remaining prompts");
                    if self.accept_defaults(ctx, i, &mut previous)? {
                        return Ok(RunnerOutcome::SavedAndExited);
                    }
                    i = self.prompts.len();
                }
            }
        }
        Ok(RunnerOutcome::Completed)
    }

    /// Commit defaults from `start` to the end. Prompts whose default does
    /// not validate are asked interactively. Returns true on save-and-exit.
    fn accept_defaults(
        &self,
        ctx: &mut RunContext,
        start: usize,
        previous: &mut Vec<usize>,
    ) -> anyhow::Result<bool> {
        let mut i = start;
        let mut force_prompt = false;

        while i < self.prompts.len() {
            let prompt = &self.prompts[i];
            if !prompt.enabled(ctx) {
                prompt.save_disabled_value(ctx);
                i += 1;
                continue;
            }

            prompt.save_current_value(ctx);
            if !force_prompt && prompt.is_valid(ctx).is_empty() {
                i += 1;
                continue;
            }

            match prompt.run(ctx)? {
                PromptOutcome::Next => {
                    if prompt.allow_previous(ctx) {
                        previous.push(i);
                    }
                    i += 1;
                    force_prompt = false;
                }
                PromptOutcome::SaveAndExit => {
                    self.save_and_exit(ctx)?;
                    return Ok(true);
                }
                PromptOutcome::AcceptAllDefaults => {
                    ctx.say(
                        "The current prompt does not have a valid default, please provide a value",
                    );
                    force_prompt = true;
                }
                PromptOutcome::Previous => match previous.pop() {
                    Some(index) => {
                        i = index;
                        force_prompt = true;
                    }
                    None => ctx.say("Unable to move to the previous prompt"),
                },
            }
        }
        Ok(false)
    }

    fn save_and_exit(&self, ctx: &mut RunContext) -> anyhow::Result<()> {
        ctx.info("Saving configuration values and exiting");
        let path = ctx.config_path().to_path_buf();
        ctx.store()
            .store(&path)
            .with_context(|| format!("Failed to save configuration to {}", path.display()))
    }

    /// Store the expected value for disabled prompts that have nothing
    /// stored yet, including group members. Used before validating a file
    /// that was never walked interactively.
    pub fn apply_disabled_values(&self, ctx: &mut RunContext) {
        for prompt in &self.prompts {
            prompt.fill_disabled(ctx);
        }
    }

    /// Check every prompt, visited or not, and flag stored keys that no
    /// prompt owns.
    pub fn validate(&self, ctx: &RunContext) -> Vec<RemoteError> {
        let mut errors = Vec::new();
        let mut known: HashSet<String> = HashSet::new();

        for prompt in &self.prompts {
            known.extend(prompt.keys(ctx));
            if let Some(error) = RemoteError::from_prompt_errors(prompt.is_valid(ctx)) {
                errors.push(error);
            }
        }

        let unknown: Vec<PromptError> = ctx
            .store()
            .leaf_paths()
            .into_iter()
            .filter(|path| !known.contains(path))
            .map(|path| {
                let current = ctx.store().get(&path);
                PromptError::new(&path, UNKNOWN_KEY_PROMPT, UNKNOWN_KEY_MESSAGE, current)
            })
            .collect();
        errors.extend(
            unknown
                .into_iter()
                .map(|error| RemoteError::Prompt { error }),
        );

        errors
    }

    /// Print prompt errors from [`PromptRunner::validate`].
    pub fn print_errors(ctx: &mut RunContext, errors: &[RemoteError]) {
        let flat: Vec<PromptError> = errors
            .iter()
            .flat_map(|error| match error {
                RemoteError::Prompt { error } => vec![error.clone()],
                RemoteError::PromptSet { errors } => errors.clone(),
                _ => Vec::new(),
            })
            .collect();
        print_prompt_errors(ctx, &flat);
    }
}
