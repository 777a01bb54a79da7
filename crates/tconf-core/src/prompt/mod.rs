//! Configuration prompts.
//!
//! A prompt owns one key path (or a family of them) in the property store.
//! Prompts decide for themselves whether they apply, what their default is,
//! and whether the stored value is acceptable. Navigation requests typed by
//! the operator come back as a [`PromptOutcome`], never as errors.

mod group;
pub mod input;
mod multi_value;
pub mod validator;
mod value;

use std::sync::Arc;

use crate::capability::Capability;
use crate::context::RunContext;
use crate::remote::PromptError;

pub use group::{DEFAULTS_ALIAS, GroupPrompt, MemberAlias, MemberMap};
pub use multi_value::MultiValuePrompt;
pub use value::{InterfaceMessage, PromptKind, ValuePrompt};

/// What the operator asked for after answering a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The value was committed, move on.
    Next,
    /// Return to the last prompt that allows it.
    Previous,
    /// Commit defaults for this and every remaining prompt.
    AcceptAllDefaults,
    /// Persist what has been collected and stop.
    SaveAndExit,
}

/// Words recognized at any prompt instead of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    Save,
    Previous,
    Defaults,
}

impl Command {
    pub(crate) fn parse(answer: &str) -> Option<Self> {
        match answer {
            "help" => Some(Command::Help),
            "save" => Some(Command::Save),
            "prev" => Some(Command::Previous),
            "defaults" => Some(Command::Defaults),
            _ => None,
        }
    }

    /// The navigation outcome for this command, if it leaves the prompt.
    pub(crate) fn outcome(self) -> Option<PromptOutcome> {
        match self {
            Command::Help => None,
            Command::Save => Some(PromptOutcome::SaveAndExit),
            Command::Previous => Some(PromptOutcome::Previous),
            Command::Defaults => Some(PromptOutcome::AcceptAllDefaults),
        }
    }
}

pub const NO_HELP: &str = "Sorry, no help is available.";

/// A configuration question.
pub trait Prompt: Capability<Outcome = anyhow::Result<PromptOutcome>> + Send + Sync {
    /// Key path, or group path for prompts that own several keys.
    fn name(&self) -> &str;

    /// Sort order within the catalog.
    fn weight(&self) -> i32;

    /// Whether the runner may return here with `prev`.
    fn allow_previous(&self, ctx: &RunContext) -> bool {
        self.enabled(ctx)
    }

    /// Store the effective value without asking.
    fn save_current_value(&self, ctx: &mut RunContext);

    /// Store the value this prompt expects while it is disabled.
    fn save_disabled_value(&self, ctx: &mut RunContext);

    /// Check the stored value(s) against this prompt's rules.
    fn is_valid(&self, ctx: &RunContext) -> Vec<PromptError>;

    /// Every key path this prompt accounts for.
    fn keys(&self, ctx: &RunContext) -> Vec<String>;

    /// Store the disabled value if this prompt is disabled and none of its
    /// keys has been set.
    fn fill_disabled(&self, ctx: &mut RunContext) {
        if self.enabled(ctx) {
            return;
        }
        if self.keys(ctx).iter().all(|key| !ctx.store().contains(key)) {
            self.save_disabled_value(ctx);
        }
    }
}

/// The group member a prompt instance is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub group: String,
    pub alias: String,
    pub singular: String,
}

impl MemberRef {
    pub fn new(
        group: impl Into<String>,
        alias: impl Into<String>,
        singular: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            alias: alias.into(),
            singular: singular.into(),
        }
    }

    pub fn key(&self, leaf: &str) -> String {
        format!("{}.{}.{leaf}", self.group, self.alias)
    }

    pub fn defaults_key(&self, leaf: &str) -> String {
        format!("{}.{DEFAULTS_ALIAS}.{leaf}", self.group)
    }
}

/// Read-only view handed to default resolvers and enablement predicates.
pub struct PromptEnv<'a> {
    ctx: &'a RunContext,
    member: Option<&'a MemberRef>,
}

impl<'a> PromptEnv<'a> {
    pub fn new(ctx: &'a RunContext, member: Option<&'a MemberRef>) -> Self {
        Self { ctx, member }
    }

    pub fn ctx(&self) -> &'a RunContext {
        self.ctx
    }

    /// Value stored at an absolute key path.
    pub fn value(&self, key: &str) -> Option<&'a str> {
        self.ctx.store().get(key).filter(|v| !v.is_empty())
    }

    /// Value of a sibling setting on the bound member, falling back to the
    /// group's `defaults` entry.
    pub fn member_value(&self, leaf: &str) -> Option<&'a str> {
        let member = self.member?;
        self.value(&member.key(leaf))
            .or_else(|| self.value(&member.defaults_key(leaf)))
    }

    pub fn member_alias(&self) -> Option<&'a str> {
        self.member.map(|m| m.alias.as_str())
    }

    pub fn advanced(&self) -> bool {
        self.ctx.advanced()
    }
}

pub type DefaultFn = Arc<dyn Fn(&PromptEnv<'_>) -> Option<String> + Send + Sync>;
pub type EnabledFn = Arc<dyn Fn(&PromptEnv<'_>) -> bool + Send + Sync>;

/// An answer read from the operator.
pub(crate) enum Answer {
    Value(String),
    Leave(PromptOutcome),
}

/// Read an answer, showing `help` for as long as the operator asks for it.
pub(crate) fn read_answer(
    ctx: &mut RunContext,
    label: &str,
    default: &str,
    help: &str,
) -> anyhow::Result<Answer> {
    loop {
        let raw = ctx.read_value(label, default)?;
        match Command::parse(&raw) {
            None => return Ok(Answer::Value(raw)),
            Some(command) => match command.outcome() {
                Some(outcome) => return Ok(Answer::Leave(outcome)),
                None => {
                    ctx.say("");
                    ctx.say(help);
                    ctx.say("");
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_map_to_outcomes() {
        assert_eq!(Command::parse("prev"), Some(Command::Previous));
        assert_eq!(
            Command::parse("defaults").and_then(Command::outcome),
            Some(PromptOutcome::AcceptAllDefaults)
        );
        assert_eq!(Command::parse("help").and_then(Command::outcome), None);
        assert_eq!(Command::parse("Prev"), None);
    }

    #[test]
    fn member_keys_include_group_and_alias() {
        let member = MemberRef::new("hosts", "db1", "host");
        assert_eq!(member.key("userid"), "hosts.db1.userid");
        assert_eq!(member.defaults_key("userid"), "hosts.defaults.userid");
    }
}
