//! Host-side `validate` and `deploy`.
//!
//! The result is returned to the caller, which prints it as the marker line.
//! When the console is collecting, its lines travel in the result messages.

use crate::catalog;
use crate::context::RunContext;
use crate::deploy::DeploymentOrchestrator;
use crate::dispatch::Operation;
use crate::params;
use crate::remote::RemoteResult;
use crate::validation::ValidationEngine;

pub struct SingleShotCommand {
    engine: ValidationEngine,
    orchestrator: DeploymentOrchestrator,
}

impl SingleShotCommand {
    pub fn new(engine: ValidationEngine, orchestrator: DeploymentOrchestrator) -> Self {
        Self {
            engine,
            orchestrator,
        }
    }

    pub fn standard() -> Self {
        Self::new(catalog::validation_engine(), catalog::deployment_orchestrator())
    }

    pub fn run(&self, ctx: &mut RunContext, operation: Operation) -> anyhow::Result<RemoteResult> {
        let host = ctx.store().get_or(params::HOST_NAME, "localhost");
        let home = ctx.store().get_or(params::HOME_DIRECTORY, "");
        if !ctx.options().stream {
            let title = match operation {
                Operation::Validate => format!("Validation checks for {host}:{home}"),
                Operation::Deploy => format!("Deploy {host}:{home}"),
            };
            ctx.header(&title);
        }

        let mut result = match operation {
            Operation::Validate => self.engine.validate_config(ctx),
            Operation::Deploy => self.orchestrator.deploy_config(ctx)?,
        };
        tracing::debug!(
            operation = operation.command(),
            errors = result.errors.len(),
            "single-shot run finished"
        );

        if !ctx.console().is_direct() {
            let mut messages = ctx.console_mut().take_lines();
            messages.append(&mut result.messages);
            result.messages = messages;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{Console, LogLevel};
    use crate::context::{Identity, RunOptions};
    use crate::executor::ShellExecutor;
    use crate::prompt::input::NoInput;
    use crate::validation::{CheckScope, ValidationCheck};

    fn command() -> SingleShotCommand {
        SingleShotCommand::new(
            ValidationEngine::new(vec![ValidationCheck::new(
                "Disk check",
                CheckScope::Deep,
                |ctx, report| {
                    ctx.info("checking disk");
                    report.error("disk is full");
                    Ok(())
                },
            )]),
            DeploymentOrchestrator::new(Vec::new()),
        )
    }

    #[test]
    fn collected_output_travels_in_messages() {
        let mut ctx = RunContext::new(
            RunOptions::default().with_batch(true),
            Identity::new("db1", "tungsten"),
            Console::collecting(LogLevel::Info),
            Box::new(NoInput),
            Box::new(ShellExecutor::new("db1")),
        );
        ctx.store_mut().set(params::HOST_NAME, Some("db1"));

        let result = command().run(&mut ctx, Operation::Validate).unwrap();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message(), "disk is full (Disk check)");
        assert!(result.messages.iter().any(|m| m == "# Validation checks for db1:"));
        assert!(result.messages.iter().any(|m| m == "INFO  >> db1 >> checking disk"));
    }

    #[test]
    fn streamed_runs_keep_messages_empty() {
        let mut ctx = RunContext::new(
            RunOptions::default().with_batch(true).with_stream(true),
            Identity::new("db1", "tungsten"),
            Console::memory(LogLevel::Info),
            Box::new(NoInput),
            Box::new(ShellExecutor::new("db1")),
        );

        let result = command().run(&mut ctx, Operation::Deploy).unwrap();

        assert!(result.is_clean());
        assert!(result.messages.is_empty());
        assert!(!ctx.console().captured().contains("# Deploy"));
    }
}
