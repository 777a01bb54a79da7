//! Validation checks and the engine that runs them across hosts.
//!
//! Preliminary checks run on the controller once per host and establish
//! that the host can be reached at all. Deep checks run on the host itself:
//! in-process when the host is this machine, otherwise by invoking the tool
//! remotely and reading back its [`RemoteResult`].

pub mod checks;

use crate::capability::Capability;
use crate::context::RunContext;
use crate::dispatch::{Operation, RemoteDispatcher};
use crate::error::StoreError;
use crate::params;
use crate::properties::PropertyStore;
use crate::remote::{RemoteError, RemoteResult};
use crate::report::ResultAggregator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckScope {
    /// Run from the controller before anything is sent to the host.
    Preliminary,
    /// Run on the host being configured.
    Deep,
}

/// Errors raised by one run of one check.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    title: String,
    host: Option<String>,
    help: Vec<String>,
    errors: Vec<RemoteError>,
}

impl CheckReport {
    fn new(check: &ValidationCheck, host: Option<String>) -> Self {
        Self {
            title: check.title.clone(),
            host,
            help: check.help.clone(),
            errors: Vec::new(),
        }
    }

    /// Record a validation error against this check.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(RemoteError::Validation {
            message: message.into(),
            host: self.host.clone(),
            check: self.title.clone(),
            help: self.help.clone(),
        });
    }

    /// Record a condition the operator may choose to accept.
    pub fn confirm(&mut self, message: impl Into<String>) {
        self.errors
            .push(RemoteError::confirmation(message, self.host.clone()));
    }

    pub fn errors(&self) -> &[RemoteError] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<RemoteError> {
        self.errors
    }
}

type CheckBody = Box<dyn Fn(&mut RunContext, &mut CheckReport) -> anyhow::Result<()> + Send + Sync>;
type CheckPredicate = Box<dyn Fn(&RunContext) -> bool + Send + Sync>;

/// A named check over the current host's configuration.
pub struct ValidationCheck {
    title: String,
    scope: CheckScope,
    weight: i32,
    fatal_on_error: bool,
    help: Vec<String>,
    enabled_when: Option<CheckPredicate>,
    body: CheckBody,
}

impl ValidationCheck {
    pub fn new<F>(title: impl Into<String>, scope: CheckScope, body: F) -> Self
    where
        F: Fn(&mut RunContext, &mut CheckReport) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            title: title.into(),
            scope,
            weight: 0,
            fatal_on_error: false,
            help: Vec::new(),
            enabled_when: None,
            body: Box::new(body),
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// Stop running further checks for the host when this one fails.
    pub fn fatal(mut self) -> Self {
        self.fatal_on_error = true;
        self
    }

    pub fn with_help(mut self, line: impl Into<String>) -> Self {
        self.help.push(line.into());
        self
    }

    pub fn enabled_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RunContext) -> bool + Send + Sync + 'static,
    {
        self.enabled_when = Some(Box::new(predicate));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn scope(&self) -> CheckScope {
        self.scope
    }

    pub fn fatal_on_error(&self) -> bool {
        self.fatal_on_error
    }
}

impl Capability for ValidationCheck {
    type Outcome = CheckReport;

    fn enabled(&self, ctx: &RunContext) -> bool {
        !ctx.options().skipped_checks.iter().any(|t| t == &self.title)
            && self.enabled_when.as_ref().is_none_or(|p| p(ctx))
    }

    /// Failures of the body itself become a host error on the report.
    fn run(&self, ctx: &mut RunContext) -> CheckReport {
        let mut report = CheckReport::new(self, ctx.current_host());
        if !self.enabled(ctx) {
            return report;
        }

        ctx.debug(&format!("Start: {}", self.title));
        if let Err(err) = (self.body)(ctx, &mut report) {
            tracing::debug!(check = %self.title, "check failed: {err:#}");
            report
                .errors
                .push(RemoteError::host(format!("{err:#}"), ctx.current_host()));
        }
        ctx.debug(&format!("Finish: {}", self.title));
        report
    }
}

/// Run `checks` in order, stopping after a fatal check reports errors.
/// Returns the errors and whether a fatal check failed.
fn run_checks(ctx: &mut RunContext, checks: &[&ValidationCheck]) -> (Vec<RemoteError>, bool) {
    let mut errors = Vec::new();
    for check in checks {
        let report = check.run(ctx);
        let failed = !report.is_valid();
        errors.extend(report.into_errors());
        if failed && check.fatal_on_error() {
            return (errors, true);
        }
    }
    (errors, false)
}

/// The registered checks, split by scope and sorted by weight.
pub struct ValidationEngine {
    preliminary: Vec<ValidationCheck>,
    deep: Vec<ValidationCheck>,
}

impl ValidationEngine {
    pub fn new(checks: Vec<ValidationCheck>) -> Self {
        let (mut preliminary, mut deep): (Vec<_>, Vec<_>) = checks
            .into_iter()
            .partition(|c| c.scope == CheckScope::Preliminary);
        preliminary.sort_by_key(|c| c.weight);
        deep.sort_by_key(|c| c.weight);
        Self { preliminary, deep }
    }

    /// Run preliminary checks for the host described by the current store.
    /// The flag is true when a fatal check failed.
    pub fn prevalidate(&self, ctx: &mut RunContext) -> (Vec<RemoteError>, bool) {
        let host = ctx.store().get_or(params::HOST_NAME, "localhost");
        let home = ctx.store().get_or(params::HOME_DIRECTORY, "");
        ctx.say("");
        ctx.header(&format!("Preliminary checks for {host}:{home}"));

        let checks: Vec<&ValidationCheck> = self.preliminary.iter().collect();
        run_checks(ctx, &checks)
    }

    /// Run deep checks in-process against the current store.
    pub fn validate_config(&self, ctx: &mut RunContext) -> RemoteResult {
        let checks: Vec<&ValidationCheck> = self.deep.iter().collect();
        let (errors, _) = run_checks(ctx, &checks);
        RemoteResult::from_errors(errors)
    }

    /// Validate every host configuration in turn.
    ///
    /// A host whose preliminary checks fail fatally is not deep-checked;
    /// the remaining hosts still are. An interrupted property write ends the
    /// run with an error.
    pub fn run(
        &self,
        ctx: &mut RunContext,
        configs: &[PropertyStore],
        dispatcher: &RemoteDispatcher,
    ) -> anyhow::Result<ResultAggregator> {
        let mut results = ResultAggregator::new();

        for config in configs {
            ctx.scoped(config.clone(), |ctx| -> anyhow::Result<()> {
                let (errors, blocked) = self.prevalidate(ctx);
                results.extend(errors);
                if blocked {
                    tracing::info!(
                        host = ctx.current_host().as_deref().unwrap_or("localhost"),
                        "skipping deep checks after fatal preliminary failure"
                    );
                    return Ok(());
                }

                let host = ctx.store().get_or(params::HOST_NAME, "localhost");
                let home = ctx.store().get_or(params::HOME_DIRECTORY, "");
                ctx.say("");
                if ctx.is_local_target() {
                    ctx.header(&format!("Local checks for {home}"));
                    let result = self.validate_config(ctx);
                    results.merge(result);
                    ctx.debug(&format!("Finish: Local checks for {home}"));
                } else {
                    ctx.header(&format!("Remote checks for {host}:{home}"));
                    match dispatcher.dispatch(ctx, Operation::Validate) {
                        Ok(result) => results.merge(result),
                        Err(err) if StoreError::is_interrupt(&err) => return Err(err),
                        Err(err) => {
                            results.push(RemoteError::host(format!("{err:#}"), Some(host.clone())))
                        }
                    }
                    ctx.debug(&format!("Finish: Remote checks for {host}:{home}"));
                }
                Ok(())
            })?;
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;

    #[test]
    fn body_errors_become_host_errors() {
        let check = ValidationCheck::new("Explodes", CheckScope::Deep, |_, _| {
            anyhow::bail!("check crashed")
        });
        let mut ctx = test_context(&[]);
        ctx.store_mut().set(params::HOST_NAME, Some("db1"));

        let report = check.run(&mut ctx);

        assert_eq!(
            report.errors(),
            &[RemoteError::host("check crashed", Some("db1".to_string()))]
        );
    }

    #[test]
    fn skipped_checks_do_not_run() {
        let check = ValidationCheck::new("Noisy", CheckScope::Deep, |_, report| {
            report.error("should not appear");
            Ok(())
        });
        let mut ctx = crate::context::RunContext::new(
            crate::context::RunOptions::default().with_skipped_check("Noisy"),
            crate::context::Identity::new("ctl", "tungsten"),
            crate::console::Console::memory(crate::console::LogLevel::Info),
            Box::new(crate::prompt::input::NoInput),
            Box::new(crate::executor::ShellExecutor::new("ctl")),
        );

        assert!(check.run(&mut ctx).is_valid());
    }

    #[test]
    fn fatal_failure_stops_later_checks() {
        let engine = ValidationEngine::new(vec![
            ValidationCheck::new("Second", CheckScope::Deep, |_, report| {
                report.error("second ran");
                Ok(())
            })
            .with_weight(2),
            ValidationCheck::new("First", CheckScope::Deep, |_, report| {
                report.error("first failed");
                Ok(())
            })
            .with_weight(1)
            .fatal()
            .with_help("Fix the first thing"),
        ]);
        let mut ctx = test_context(&[]);

        let result = engine.validate_config(&mut ctx);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message(), "first failed (First)");
        assert_eq!(result.errors[0].help(), &["Fix the first thing".to_string()]);
    }
}
