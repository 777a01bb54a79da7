//! Single-value prompts and interface messages.

use std::sync::Arc;

use crate::capability::Capability;
use crate::context::RunContext;
use crate::error::ValidationFailure;
use crate::remote::PromptError;

use super::validator::SharedValidator;
use super::{
    Answer, DefaultFn, EnabledFn, MemberRef, NO_HELP, Prompt, PromptEnv, PromptOutcome,
    read_answer,
};

pub const VALUE_MISSING: &str = "Value is missing";
pub const VALUE_NOT_EXPECTED: &str = "Value should not be given, remove it from the configuration";

/// How a value prompt decides whether to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptKind {
    /// Asked whenever its predicate allows.
    #[default]
    Standard,
    /// Asked only in advanced mode; otherwise its default is stored.
    Advanced,
    /// Never asked; its default is always stored.
    Constant,
}

#[derive(Clone, Default)]
enum DefaultSource {
    #[default]
    None,
    Fixed(String),
    Computed(DefaultFn),
}

/// A prompt for one key path.
#[derive(Clone)]
pub struct ValuePrompt {
    name: String,
    key: String,
    text: String,
    kind: PromptKind,
    weight: i32,
    validator: Option<SharedValidator>,
    default: DefaultSource,
    enabled_when: Option<EnabledFn>,
    required: bool,
    disabled_value: Option<String>,
    description: Option<String>,
    help: Option<String>,
    member: Option<MemberRef>,
}

impl ValuePrompt {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            name,
            text: text.into(),
            kind: PromptKind::Standard,
            weight: 0,
            validator: None,
            default: DefaultSource::None,
            enabled_when: None,
            required: true,
            disabled_value: None,
            description: None,
            help: None,
            member: None,
        }
    }

    pub fn advanced(mut self) -> Self {
        self.kind = PromptKind::Advanced;
        self
    }

    pub fn constant(mut self) -> Self {
        self.kind = PromptKind::Constant;
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_validator(mut self, validator: SharedValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = DefaultSource::Fixed(default.into());
        self
    }

    pub fn with_computed_default<F>(mut self, default: F) -> Self
    where
        F: Fn(&PromptEnv<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.default = DefaultSource::Computed(Arc::new(default));
        self
    }

    pub fn enabled_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PromptEnv<'_>) -> bool + Send + Sync + 'static,
    {
        self.enabled_when = Some(Arc::new(predicate));
        self
    }

    /// Allow the value to be left empty.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_disabled_value(mut self, value: impl Into<String>) -> Self {
        self.disabled_value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Bind this template to one member of a group.
    pub fn for_member(&self, member: MemberRef) -> Self {
        let mut bound = self.clone();
        bound.key = member.key(&self.name);
        bound.member = Some(member);
        bound
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Setting name without any group prefix.
    pub fn leaf(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    pub fn required(&self) -> bool {
        self.required
    }

    /// Prompt text as shown, with `@value` replaced by the member alias.
    pub fn display_prompt(&self) -> String {
        match &self.member {
            Some(member) => {
                let text = self.text.replace("@value", &member.alias);
                format!("{} {}: {text}", capitalize(&member.singular), member.alias)
            }
            None => self.text.clone(),
        }
    }

    fn env<'a>(&'a self, ctx: &'a RunContext) -> PromptEnv<'a> {
        PromptEnv::new(ctx, self.member.as_ref())
    }

    pub fn help_text(&self) -> &str {
        self.help
            .as_deref()
            .or(self.description.as_deref())
            .filter(|h| !h.is_empty())
            .unwrap_or(NO_HELP)
    }

    /// Run the validator over a non-empty value.
    pub fn validate(&self, value: &str) -> Result<String, ValidationFailure> {
        match &self.validator {
            Some(validator) => validator.validate(value),
            None => Ok(value.to_string()),
        }
    }

    /// Accept an answer typed at the prompt.
    fn accept(&self, raw: &str) -> Result<String, ValidationFailure> {
        if raw.is_empty() {
            if self.required {
                return Err(ValidationFailure::new(VALUE_MISSING));
            }
            return Ok(String::new());
        }
        self.validate(raw)
    }

    /// The value stored in the configuration, if any.
    pub fn stored_value<'a>(&self, ctx: &'a RunContext) -> Option<&'a str> {
        ctx.store().get(&self.key).filter(|v| !v.is_empty())
    }

    /// The stored value, or for a group member the value inherited from
    /// the group's `defaults` entry.
    fn configured_value<'a>(&self, ctx: &'a RunContext) -> Option<&'a str> {
        self.stored_value(ctx).or_else(|| {
            let member = self.member.as_ref()?;
            ctx.store()
                .get(&member.defaults_key(&self.name))
                .filter(|v| !v.is_empty())
        })
    }

    /// Global override, then the group's `defaults` member, then the
    /// prompt's own default. An override that fails validation is ignored.
    pub fn default_value(&self, ctx: &RunContext) -> Option<String> {
        if let Some(global) = ctx.global_default(&self.key) {
            match self.validate(global) {
                Ok(value) => return Some(value),
                Err(err) => tracing::debug!(
                    key = %self.key,
                    "ignoring global default: {}",
                    err.message
                ),
            }
        }
        if let Some(member) = &self.member
            && let Some(value) = ctx.store().get(&member.defaults_key(&self.name))
            && !value.is_empty()
        {
            return Some(value.to_string());
        }
        let computed = match &self.default {
            DefaultSource::None => None,
            DefaultSource::Fixed(value) => Some(value.clone()),
            DefaultSource::Computed(resolve) => resolve(&self.env(ctx)),
        };
        computed.filter(|v| !v.is_empty())
    }

    /// Stored value, else the default.
    pub fn current_value(&self, ctx: &RunContext) -> Option<String> {
        self.stored_value(ctx)
            .map(str::to_string)
            .or_else(|| self.default_value(ctx))
    }

    /// The value stored while this prompt is disabled.
    pub fn disabled_value(&self, ctx: &RunContext) -> Option<String> {
        match self.kind {
            PromptKind::Advanced | PromptKind::Constant => self.default_value(ctx),
            PromptKind::Standard => self.disabled_value.clone().filter(|v| !v.is_empty()),
        }
    }

    fn error(&self, message: &str, current: Option<&str>) -> PromptError {
        PromptError::new(&self.key, self.display_prompt(), message, current)
    }
}

impl Capability for ValuePrompt {
    type Outcome = anyhow::Result<PromptOutcome>;

    fn enabled(&self, ctx: &RunContext) -> bool {
        let allowed = match self.kind {
            PromptKind::Standard => true,
            PromptKind::Advanced => ctx.advanced(),
            PromptKind::Constant => false,
        };
        allowed
            && self
                .enabled_when
                .as_ref()
                .is_none_or(|predicate| predicate(&self.env(ctx)))
    }

    fn run(&self, ctx: &mut RunContext) -> anyhow::Result<PromptOutcome> {
        if !self.enabled(ctx) {
            self.save_disabled_value(ctx);
            return Ok(PromptOutcome::Next);
        }

        ctx.say("");
        ctx.divider();
        if let Some(description) = &self.description {
            ctx.say(description);
        }
        ctx.say("");

        let label = self.display_prompt();
        loop {
            let current = self.current_value(ctx).unwrap_or_default();
            match read_answer(ctx, &label, &current, self.help_text())? {
                Answer::Leave(outcome) => return Ok(outcome),
                Answer::Value(raw) => match self.accept(&raw) {
                    Ok(value) => {
                        ctx.store_mut().set(&self.key, Some(&value));
                        return Ok(PromptOutcome::Next);
                    }
                    Err(err) => ctx.error(&err.message),
                },
            }
        }
    }
}

impl Prompt for ValuePrompt {
    fn name(&self) -> &str {
        &self.key
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn save_current_value(&self, ctx: &mut RunContext) {
        let value = self.current_value(ctx);
        ctx.store_mut().set(&self.key, value.as_deref());
    }

    fn save_disabled_value(&self, ctx: &mut RunContext) {
        let value = self.disabled_value(ctx);
        ctx.store_mut().set(&self.key, value.as_deref());
    }

    fn is_valid(&self, ctx: &RunContext) -> Vec<PromptError> {
        let value = self.configured_value(ctx);

        if self.enabled(ctx) {
            return match value {
                None if self.required => vec![self.error(VALUE_MISSING, None)],
                None => Vec::new(),
                Some(value) => match self.validate(value) {
                    Ok(_) => Vec::new(),
                    Err(err) => vec![self.error(&err.message, Some(value))],
                },
            };
        }

        match (value, self.disabled_value(ctx)) {
            (Some(value), None) => vec![self.error(VALUE_NOT_EXPECTED, Some(value))],
            (None, Some(_)) if self.required => vec![self.error(VALUE_MISSING, None)],
            _ => Vec::new(),
        }
    }

    fn keys(&self, _ctx: &RunContext) -> Vec<String> {
        vec![self.key.clone()]
    }
}

/// A titled block of text shown between prompts. Owns no value.
#[derive(Debug, Clone)]
pub struct InterfaceMessage {
    id: String,
    title: Option<String>,
    text: String,
    weight: i32,
    advanced: bool,
}

impl InterfaceMessage {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            text: text.into(),
            weight: 0,
            advanced: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// Show only in advanced mode.
    pub fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }
}

impl Capability for InterfaceMessage {
    type Outcome = anyhow::Result<PromptOutcome>;

    fn enabled(&self, ctx: &RunContext) -> bool {
        !self.advanced || ctx.advanced()
    }

    fn run(&self, ctx: &mut RunContext) -> anyhow::Result<PromptOutcome> {
        if !self.enabled(ctx) {
            return Ok(PromptOutcome::Next);
        }
        ctx.say("");
        match &self.title {
            Some(title) => ctx.header(title),
            None => ctx.divider(),
        }
        ctx.say(&self.text);
        Ok(PromptOutcome::Next)
    }
}

impl Prompt for InterfaceMessage {
    fn name(&self) -> &str {
        &self.id
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn allow_previous(&self, _ctx: &RunContext) -> bool {
        false
    }

    fn save_current_value(&self, _ctx: &mut RunContext) {}

    fn save_disabled_value(&self, _ctx: &mut RunContext) {}

    fn is_valid(&self, _ctx: &RunContext) -> Vec<PromptError> {
        Vec::new()
    }

    fn keys(&self, _ctx: &RunContext) -> Vec<String> {
        Vec::new()
    }
}

pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
