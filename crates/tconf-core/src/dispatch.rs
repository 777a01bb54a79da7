//! Runs a single-shot operation on a remote host and reads back its result.

use anyhow::Context;

use crate::console::LogLevel;
use crate::context::RunContext;
use crate::executor::quote;
use crate::params;
use crate::remote::RemoteResult;
use crate::remote::protocol::ResultStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Validate,
    Deploy,
}

impl Operation {
    pub fn command(self) -> &'static str {
        match self {
            Operation::Validate => "validate",
            Operation::Deploy => "deploy",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Operation::Validate => "validation result",
            Operation::Deploy => "deployment result",
        }
    }
}

/// Ships the host configuration to a target and invokes `program` there in
/// batch, streaming mode.
#[derive(Debug, Clone)]
pub struct RemoteDispatcher {
    program: String,
}

impl RemoteDispatcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Where the host configuration is copied on the target.
    pub fn remote_config_path(&self, ctx: &RunContext) -> String {
        let temp = ctx.store().get_or(params::TEMP_DIRECTORY, "/tmp");
        let host = ctx.store().get_or(params::HOST_NAME, "localhost");
        format!("{}/tconf-{host}.cfg", temp.trim_end_matches('/'))
    }

    /// The command line run on the target.
    pub fn command_line(
        &self,
        ctx: &RunContext,
        operation: Operation,
        config: &str,
    ) -> anyhow::Result<String> {
        let mut parts = vec![
            quote(&self.program)?,
            "-b".to_string(),
            "-c".to_string(),
            quote(config)?,
            "--stream".to_string(),
        ];
        match ctx.console().threshold() {
            LogLevel::Debug => parts.push("-v".to_string()),
            LogLevel::Warn | LogLevel::Error => parts.push("-q".to_string()),
            LogLevel::Info => {}
        }
        if ctx.force() {
            parts.push("-f".to_string());
        }
        for title in &ctx.options().skipped_checks {
            parts.push("--skip-validation-check".to_string());
            parts.push(quote(title)?);
        }
        parts.push(operation.command().to_string());
        Ok(parts.join(" "))
    }

    /// Copy the current store to the target, run `operation` there and
    /// decode the marker line from its output.
    ///
    /// Log lines before the marker are echoed as they arrive.
    pub fn dispatch(&self, ctx: &mut RunContext, operation: Operation) -> anyhow::Result<RemoteResult> {
        let host = ctx.store().get_or(params::HOST_NAME, "localhost");
        let user = ctx.store().get_or(params::USERID, &ctx.identity().user);

        let staged = tempfile::NamedTempFile::new().context("Failed to create staging file")?;
        ctx.store().store(staged.path())?;
        let remote_config = self.remote_config_path(ctx);
        ctx.executor()
            .transfer(&host, &user, staged.path(), &remote_config)
            .with_context(|| format!("Unable to copy the configuration to {host}"))?;

        let command = self.command_line(ctx, operation, &remote_config)?;
        tracing::debug!(%host, %command, "dispatching");

        let mut stream = ResultStream::new();
        let (executor, console) = ctx.executor_and_console();
        let output = executor.execute_streaming(&host, &user, &command, &mut |line| {
            if let Some(log) = stream.feed(line) {
                console.raw(LogLevel::Info, log);
            }
        })?;

        if !stream.has_payload() {
            anyhow::bail!(
                "Failed: {command}, RC: {}, Result: {}",
                output.status,
                output.text()
            );
        }
        let result = stream.finish().map_err(|err| {
            tracing::debug!("bad payload from {host}: {err}");
            anyhow::anyhow!("Unable to load {}: {}", operation.label(), output.text())
        })?;

        for message in &result.messages {
            ctx.console_mut().raw(LogLevel::Info, message);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;

    #[test]
    fn command_line_carries_run_flags() {
        let dispatcher = RemoteDispatcher::new("/opt/tconf/bin/tconf");
        let mut ctx = crate::context::RunContext::new(
            crate::context::RunOptions::default()
                .with_force(true)
                .with_skipped_check("Home directory check"),
            crate::context::Identity::new("ctl", "tungsten"),
            crate::console::Console::memory(LogLevel::Debug),
            Box::new(crate::prompt::input::NoInput),
            Box::new(crate::executor::ShellExecutor::new("ctl")),
        );
        ctx.store_mut().set(params::HOST_NAME, Some("db2"));

        let config = dispatcher.remote_config_path(&ctx);
        let line = dispatcher
            .command_line(&ctx, Operation::Validate, &config)
            .unwrap();

        assert_eq!(config, "/tmp/tconf-db2.cfg");
        assert_eq!(
            line,
            "/opt/tconf/bin/tconf -b -c /tmp/tconf-db2.cfg --stream -v -f \
             --skip-validation-check 'Home directory check' validate"
        );
    }

    #[test]
    fn default_run_adds_no_verbosity_flag() {
        let dispatcher = RemoteDispatcher::new("tconf");
        let ctx = test_context(&[]);
        let line = dispatcher
            .command_line(&ctx, Operation::Deploy, "/tmp/x.cfg")
            .unwrap();
        assert_eq!(line, "tconf -b -c /tmp/x.cfg --stream deploy");
    }
}
