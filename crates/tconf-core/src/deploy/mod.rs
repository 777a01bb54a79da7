//! Deployment steps and per-host deployment coordination.

pub mod steps;

use crate::capability::Capability;
use crate::context::RunContext;
use crate::dispatch::{Operation, RemoteDispatcher};
use crate::error::StoreError;
use crate::params;
use crate::properties::PropertyStore;
use crate::remote::{RemoteError, RemoteResult};
use crate::report::ResultAggregator;

/// Weight reserved for the step that must run after every other step.
pub const FINAL_STEP_WEIGHT: i32 = 10000;

type StepAction = Box<dyn Fn(&mut RunContext) -> anyhow::Result<()> + Send + Sync>;
type StepPredicate = Box<dyn Fn(&RunContext) -> bool + Send + Sync>;

pub struct DeploymentStep {
    title: String,
    weight: i32,
    enabled_when: Option<StepPredicate>,
    action: StepAction,
}

impl DeploymentStep {
    pub fn new<F>(title: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut RunContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            title: title.into(),
            weight: 0,
            enabled_when: None,
            action: Box::new(action),
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
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

    pub fn weight(&self) -> i32 {
        self.weight
    }
}

impl Capability for DeploymentStep {
    type Outcome = anyhow::Result<()>;

    fn enabled(&self, ctx: &RunContext) -> bool {
        self.enabled_when.as_ref().is_none_or(|p| p(ctx))
    }

    fn run(&self, ctx: &mut RunContext) -> anyhow::Result<()> {
        if !self.enabled(ctx) {
            return Ok(());
        }
        ctx.debug(&format!("Start: {}", self.title));
        (self.action)(ctx)?;
        ctx.debug(&format!("Finish: {}", self.title));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DeployReport {
    pub errors: ResultAggregator,
    /// Hosts whose deployment completed without errors.
    pub deployed: Vec<String>,
    /// Host after which the run stopped, if it stopped early.
    pub stopped_at: Option<String>,
}

pub struct DeploymentOrchestrator {
    steps: Vec<DeploymentStep>,
}

impl DeploymentOrchestrator {
    pub fn new(mut steps: Vec<DeploymentStep>) -> Self {
        steps.sort_by_key(|s| s.weight);
        Self { steps }
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    /// Run every step against the current store. The first failing step
    /// ends the run with a host error, or with an error when a property
    /// write was interrupted.
    pub fn deploy_config(&self, ctx: &mut RunContext) -> anyhow::Result<RemoteResult> {
        for step in &self.steps {
            if let Err(err) = step.run(ctx) {
                if StoreError::is_interrupt(&err) {
                    return Err(err);
                }
                tracing::warn!(step = %step.title, "deployment step failed: {err:#}");
                let error = RemoteError::host(
                    format!("{}: {err:#}", step.title),
                    ctx.current_host(),
                );
                return Ok(RemoteResult::from_errors(vec![error]));
            }
        }
        Ok(RemoteResult::default())
    }

    /// Deploy each host configuration in order.
    ///
    /// Without `--force`, the first host reporting a fatal error stops the
    /// run before the next host.
    pub fn run(
        &self,
        ctx: &mut RunContext,
        configs: &[PropertyStore],
        dispatcher: &RemoteDispatcher,
    ) -> anyhow::Result<DeployReport> {
        let mut report = DeployReport::default();

        for config in configs {
            let (host, result) = ctx.scoped(config.clone(), |ctx| -> anyhow::Result<_> {
                let host = ctx.store().get_or(params::HOST_NAME, "localhost");
                let home = ctx.store().get_or(params::HOME_DIRECTORY, "");
                ctx.say("");
                let result = if ctx.is_local_target() {
                    ctx.header(&format!("Local deploy {home}"));
                    self.deploy_config(ctx)?
                } else {
                    ctx.header(&format!("Remote deploy {host}:{home}"));
                    match dispatcher.dispatch(ctx, Operation::Deploy) {
                        Ok(result) => result,
                        Err(err) if StoreError::is_interrupt(&err) => return Err(err),
                        Err(err) => RemoteResult::from_errors(vec![RemoteError::host(
                            format!("{err:#}"),
                            Some(host.clone()),
                        )]),
                    }
                };
                ctx.info(&format!("Finish: deploy {host}:{home}"));
                Ok((host, result))
            })?;

            let mut host_errors = ResultAggregator::new();
            host_errors.merge(result);
            let valid = host_errors.is_valid(ctx);
            for error in host_errors.errors() {
                report.errors.push(error.clone());
            }
            if valid {
                report.deployed.push(host);
            } else if !ctx.force() {
                tracing::info!(%host, "stopping deployment after fatal error");
                report.stopped_at = Some(host);
                break;
            }
        }

        Ok(report)
    }
}
