//! Prompts fanned out over the elements of a list-valued setting.

use crate::capability::Capability;
use crate::context::RunContext;
use crate::remote::PromptError;

use super::validator::SharedValidator;
use super::value::VALUE_MISSING;
use super::{Answer, NO_HELP, Prompt, PromptOutcome, read_answer};

/// One answer per element of a comma-separated source setting, stored under
/// `<prefix><element>.<name>`.
pub struct MultiValuePrompt {
    source: String,
    prefix: String,
    name: String,
    text: String,
    weight: i32,
    validator: Option<SharedValidator>,
    default: String,
    required: bool,
    description: Option<String>,
}

impl MultiValuePrompt {
    pub fn new(
        source: impl Into<String>,
        prefix: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            prefix: prefix.into(),
            name: name.into(),
            text: text.into(),
            weight: 0,
            validator: None,
            default: String::new(),
            required: true,
            description: None,
        }
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
        self.default = default.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn elements(&self, ctx: &RunContext) -> Vec<String> {
        ctx.store()
            .get(&self.source)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn instance_key(&self, element: &str) -> String {
        format!("{}{element}.{}", self.prefix, self.name)
    }

    fn display_prompt(&self, element: &str) -> String {
        self.text.replace("@value", element)
    }

    fn value<'a>(&self, ctx: &'a RunContext, element: &str) -> Option<&'a str> {
        ctx.store()
            .get(&self.instance_key(element))
            .filter(|v| !v.is_empty())
    }

    fn current_value(&self, ctx: &RunContext, element: &str) -> String {
        self.value(ctx, element)
            .map(str::to_string)
            .or_else(|| {
                ctx.global_default(&self.instance_key(element))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| self.default.clone())
    }

    fn validate(&self, value: &str) -> Result<String, crate::error::ValidationFailure> {
        match &self.validator {
            Some(validator) => validator.validate(value),
            None => Ok(value.to_string()),
        }
    }

    /// Read one element's answer. `Ok(None)` means the value was left empty.
    fn ask(
        &self,
        ctx: &mut RunContext,
        element: &str,
    ) -> anyhow::Result<Result<Option<String>, PromptOutcome>> {
        let label = self.display_prompt(element);
        let help = self.description.as_deref().unwrap_or(NO_HELP);
        loop {
            let current = self.current_value(ctx, element);
            let raw = match read_answer(ctx, &label, &current, help)? {
                Answer::Leave(outcome) => return Ok(Err(outcome)),
                Answer::Value(raw) => raw,
            };
            if raw.is_empty() {
                if !self.required {
                    return Ok(Ok(None));
                }
                ctx.error(VALUE_MISSING);
                continue;
            }
            match self.validate(&raw) {
                Ok(value) => return Ok(Ok(Some(value))),
                Err(err) => ctx.error(&err.message),
            }
        }
    }
}

impl Capability for MultiValuePrompt {
    type Outcome = anyhow::Result<PromptOutcome>;

    fn enabled(&self, ctx: &RunContext) -> bool {
        !self.elements(ctx).is_empty()
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

        for element in self.elements(ctx) {
            match self.ask(ctx, &element)? {
                Ok(value) => {
                    let key = self.instance_key(&element);
                    ctx.store_mut().set(&key, value.as_deref());
                }
                Err(outcome) => return Ok(outcome),
            }
        }
        Ok(PromptOutcome::Next)
    }
}

impl Prompt for MultiValuePrompt {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn save_current_value(&self, ctx: &mut RunContext) {
        for element in self.elements(ctx) {
            let value = self.current_value(ctx, &element);
            let key = self.instance_key(&element);
            ctx.store_mut().set(&key, Some(&value));
        }
    }

    /// Clear answers for every entry under the prefix.
    fn save_disabled_value(&self, ctx: &mut RunContext) {
        let parent = self.prefix.trim_end_matches('.');
        for alias in ctx.store().child_keys(parent) {
            let key = self.instance_key(&alias);
            ctx.store_mut().remove(&key);
        }
    }

    fn is_valid(&self, ctx: &RunContext) -> Vec<PromptError> {
        let mut errors = Vec::new();
        for element in self.elements(ctx) {
            let key = self.instance_key(&element);
            let prompt = self.display_prompt(&element);
            match self.value(ctx, &element) {
                None if self.required => {
                    errors.push(PromptError::new(&key, &prompt, VALUE_MISSING, None));
                }
                None => {}
                Some(value) => {
                    if let Err(err) = self.validate(value) {
                        errors.push(PromptError::new(&key, &prompt, err.message, Some(value)));
                    }
                }
            }
        }
        errors
    }

    fn keys(&self, ctx: &RunContext) -> Vec<String> {
        self.elements(ctx)
            .iter()
            .map(|e| self.instance_key(e))
            .collect()
    }
}
