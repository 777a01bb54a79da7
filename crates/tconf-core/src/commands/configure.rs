//! The controller flow: prompts, prompt validation, host validation, deploy.

use anyhow::Context;

use crate::catalog;
use crate::console::LogLevel;
use crate::context::RunContext;
use crate::deploy::DeploymentOrchestrator;
use crate::dispatch::RemoteDispatcher;
use crate::hosts::host_configurations;
use crate::runner::{PromptRunner, RunnerOutcome};
use crate::validation::ValidationEngine;

pub const TITLE: &str = "Tungsten Configuration Procedure";

/// How a configure run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// The operator saved and left before the end of the prompts.
    Saved,
    /// Stored values do not satisfy their prompts.
    InvalidValues,
    ValidationFailed,
    /// Dry run: validation passed and nothing was deployed.
    Validated,
    DeployFailed,
    Deployed,
}

impl ConfigureOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            ConfigureOutcome::Saved | ConfigureOutcome::Validated | ConfigureOutcome::Deployed => 0,
            ConfigureOutcome::InvalidValues
            | ConfigureOutcome::ValidationFailed
            | ConfigureOutcome::DeployFailed => 1,
        }
    }
}

pub struct ConfigureCommand {
    runner: PromptRunner,
    engine: ValidationEngine,
    orchestrator: DeploymentOrchestrator,
    dispatcher: RemoteDispatcher,
}

impl ConfigureCommand {
    pub fn new(
        runner: PromptRunner,
        engine: ValidationEngine,
        orchestrator: DeploymentOrchestrator,
        dispatcher: RemoteDispatcher,
    ) -> Self {
        Self {
            runner,
            engine,
            orchestrator,
            dispatcher,
        }
    }

    /// The built-in catalogs, invoking `remote_program` on remote hosts.
    pub fn standard(remote_program: impl Into<String>) -> Self {
        Self::new(
            PromptRunner::new(catalog::prompts()),
            catalog::validation_engine(),
            catalog::deployment_orchestrator(),
            RemoteDispatcher::new(remote_program),
        )
    }

    pub fn runner(&self) -> &PromptRunner {
        &self.runner
    }

    pub fn run(&self, ctx: &mut RunContext) -> anyhow::Result<ConfigureOutcome> {
        ctx.header(TITLE);

        if ctx.interactive() {
            if self.runner.run(ctx)? == RunnerOutcome::SavedAndExited {
                return Ok(ConfigureOutcome::Saved);
            }
            let path = ctx.config_path().to_path_buf();
            ctx.store()
                .store(&path)
                .with_context(|| format!("Failed to save configuration to {}", path.display()))?;
            tracing::info!(path = %path.display(), "configuration saved");
        } else {
            self.runner.apply_disabled_values(ctx);
        }

        let errors = self.runner.validate(ctx);
        if !errors.is_empty() {
            ctx.console_mut().header(
                LogLevel::Error,
                "There are errors with the values provided in the configuration file",
            );
            PromptRunner::print_errors(ctx, &errors);
            return Ok(ConfigureOutcome::InvalidValues);
        }

        let configs = host_configurations(ctx.store());
        tracing::debug!(hosts = configs.len(), "validating host configurations");

        let mut results = self.engine.run(ctx, &configs, &self.dispatcher)?;
        if !results.is_valid(ctx) {
            let title = if ctx.interactive() {
                "The configuration values do not pass all validation checks"
            } else {
                "The configuration file does not pass all validation checks"
            };
            ctx.say("");
            ctx.console_mut().header(LogLevel::Error, title);
            results.render(ctx);
            if !ctx.force() {
                return Ok(ConfigureOutcome::ValidationFailed);
            }
            ctx.warning("Continuing past validation errors because --force was given");
        }

        if ctx.options().dry_run {
            ctx.say("");
            ctx.info("Validation finished");
            return Ok(ConfigureOutcome::Validated);
        }

        let report = self.orchestrator.run(ctx, &configs, &self.dispatcher)?;
        if report.deployed.len() < configs.len() {
            ctx.say("");
            ctx.console_mut()
                .header(LogLevel::Error, "The deployment failed");
            report.errors.render(ctx);
            if let Some(host) = &report.stopped_at {
                ctx.error(&format!("Deployment stopped at {host}, later hosts were not deployed"));
            }
            if !ctx.force() {
                return Ok(ConfigureOutcome::DeployFailed);
            }
        }

        ctx.say("");
        ctx.info("Deployment finished");
        Ok(ConfigureOutcome::Deployed)
    }
}
