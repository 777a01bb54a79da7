//! Run context threaded through prompts, checks and deployment steps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::console::{Console, LogLevel};
use crate::executor::CommandExecutor;
use crate::params;
use crate::prompt::input::{PromptInput, format_label};
use crate::properties::PropertyStore;

pub const DEFAULT_CONFIG_FILE: &str = "tungsten.cfg";

/// Flags selected on the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub advanced: bool,
    pub interactive: bool,
    pub force: bool,
    pub stream: bool,
    pub dry_run: bool,
    pub skipped_checks: Vec<String>,
    /// Program invoked on remote hosts for single-shot validate and deploy.
    pub remote_program: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            advanced: false,
            interactive: true,
            force: false,
            stream: false,
            dry_run: false,
            skipped_checks: Vec::new(),
            remote_program: "tconf".to_string(),
        }
    }
}

impl RunOptions {
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn with_advanced(mut self, advanced: bool) -> Self {
        self.advanced = advanced;
        self
    }

    pub fn with_batch(mut self, batch: bool) -> Self {
        self.interactive = !batch;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_skipped_check(mut self, title: impl Into<String>) -> Self {
        self.skipped_checks.push(title.into());
        self
    }
}

/// Controller identity used to decide whether a target is local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub hostname: String,
    pub user: String,
}

impl Identity {
    pub fn new(hostname: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            user: user.into(),
        }
    }
}

/// Everything a run needs: the property store being edited, global default
/// overrides, the operator channels and the command executor.
///
/// Frontends create this once and pass it to every component.
pub struct RunContext {
    store: PropertyStore,
    global_defaults: HashMap<String, String>,
    options: RunOptions,
    identity: Identity,
    console: Console,
    input: Box<dyn PromptInput>,
    executor: Box<dyn CommandExecutor>,
}

impl RunContext {
    pub fn new(
        options: RunOptions,
        identity: Identity,
        console: Console,
        input: Box<dyn PromptInput>,
        executor: Box<dyn CommandExecutor>,
    ) -> Self {
        Self {
            store: PropertyStore::new(),
            global_defaults: HashMap::new(),
            options,
            identity,
            console,
            input,
            executor,
        }
    }

    pub fn with_store(mut self, store: PropertyStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PropertyStore {
        &mut self.store
    }

    /// Run `f` with `store` swapped in, restoring the current store afterwards.
    pub fn scoped<R>(&mut self, store: PropertyStore, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.store, store);
        let result = f(self);
        self.store = saved;
        result
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn config_path(&self) -> &Path {
        &self.options.config_path
    }

    pub fn advanced(&self) -> bool {
        self.options.advanced
    }

    pub fn force(&self) -> bool {
        self.options.force
    }

    pub fn interactive(&self) -> bool {
        self.options.interactive
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn executor(&self) -> &dyn CommandExecutor {
        self.executor.as_ref()
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    /// Borrow the executor and console together for streamed commands.
    pub fn executor_and_console(&mut self) -> (&dyn CommandExecutor, &mut Console) {
        (self.executor.as_ref(), &mut self.console)
    }

    pub fn global_default(&self, key: &str) -> Option<&str> {
        self.global_defaults.get(key).map(String::as_str)
    }

    pub fn set_global_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.global_defaults.insert(key.into(), value.into());
    }

    /// Host the current store describes, used for message prefixes.
    pub fn current_host(&self) -> Option<String> {
        self.store.get(params::HOST_NAME).map(str::to_string)
    }

    /// True when the current store targets this host as this user.
    pub fn is_local_target(&self) -> bool {
        let host = self.store.get(params::HOST_NAME).unwrap_or("localhost");
        let user = self
            .store
            .get(params::USERID)
            .unwrap_or(self.identity.user.as_str());
        (host == self.identity.hostname || host == "localhost") && user == self.identity.user
    }

    pub fn write(&mut self, level: LogLevel, message: &str) {
        let host = self.current_host();
        self.console.write(level, host.as_deref(), message);
    }

    pub fn info(&mut self, message: &str) {
        self.write(LogLevel::Info, message);
    }

    pub fn warning(&mut self, message: &str) {
        self.write(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: &str) {
        self.write(LogLevel::Error, message);
    }

    pub fn debug(&mut self, message: &str) {
        self.write(LogLevel::Debug, message);
    }

    /// Print operator text without a level prefix. Empty text prints a blank line.
    pub fn say(&mut self, text: &str) {
        if text.is_empty() {
            self.console.write(LogLevel::Info, None, "");
        } else {
            self.console.raw(LogLevel::Info, text);
        }
    }

    pub fn header(&mut self, title: &str) {
        self.console.header(LogLevel::Info, title);
    }

    pub fn divider(&mut self) {
        self.console.divider(LogLevel::Info);
    }

    /// Show `prompt` with `default` and read an answer. Empty input selects
    /// the default.
    pub fn read_value(&mut self, prompt: &str, default: &str) -> anyhow::Result<String> {
        let raw = self.input.read_line(&format_label(prompt, default))?;
        let raw = raw.trim();
        Ok(if raw.is_empty() {
            default.to_string()
        } else {
            raw.to_string()
        })
    }

    /// Ask a yes/no question until a recognizable answer is given.
    pub fn confirm(&mut self, question: &str, default_yes: bool) -> anyhow::Result<bool> {
        let default = if default_yes { "yes" } else { "no" };
        loop {
            let answer = self.read_value(question, default)?;
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.error("Please answer yes or no"),
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_context(answers: &[&str]) -> RunContext {
    use crate::executor::ShellExecutor;
    use crate::prompt::input::ScriptedInput;

    RunContext::new(
        RunOptions::default(),
        Identity::new("ctl", "tungsten"),
        Console::memory(LogLevel::Info),
        Box::new(ScriptedInput::new(answers.iter().copied())),
        Box::new(ShellExecutor::new("ctl")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_target_requires_matching_host_and_user() {
        let mut ctx = test_context(&[]);
        assert!(ctx.is_local_target());

        ctx.store_mut().set(params::HOST_NAME, Some("ctl"));
        ctx.store_mut().set(params::USERID, Some("tungsten"));
        assert!(ctx.is_local_target());

        ctx.store_mut().set(params::USERID, Some("root"));
        assert!(!ctx.is_local_target());

        ctx.store_mut().set(params::HOST_NAME, Some("db2"));
        ctx.store_mut().set(params::USERID, Some("tungsten"));
        assert!(!ctx.is_local_target());
    }

    #[test]
    fn confirm_repeats_until_yes_or_no() {
        let mut ctx = test_context(&["maybe", "Y"]);
        assert!(ctx.confirm("Continue?", false).unwrap());
        assert!(ctx.console().captured().contains("Please answer yes or no"));
    }

    #[test]
    fn scoped_store_is_restored() {
        let mut ctx = test_context(&[]);
        ctx.store_mut().set("a", Some("1"));

        let mut other = PropertyStore::new();
        other.set("a", Some("2"));
        let seen = ctx.scoped(other, |ctx| ctx.store().get_or("a", ""));

        assert_eq!(seen, "2");
        assert_eq!(ctx.store().get("a"), Some("1"));
    }
}
