//! Aggregation and display of errors gathered across hosts.

use crate::console::LogLevel;
use crate::context::RunContext;
use crate::remote::{PromptError, RemoteError, RemoteResult};

#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    errors: Vec<RemoteError>,
    messages: Vec<String>,
    /// Fatality of `errors[..decisions.len()]`, settled once per error.
    decisions: Vec<bool>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: RemoteError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = RemoteError>) {
        self.errors.extend(errors);
    }

    pub fn merge(&mut self, result: RemoteResult) {
        self.messages.extend(result.messages);
        self.errors.extend(result.errors);
    }

    pub fn errors(&self) -> &[RemoteError] {
        &self.errors
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// True iff no contained error is fatal.
    ///
    /// Confirmations are resolved the first time they are seen; asking again
    /// reuses the earlier answer.
    pub fn is_valid(&mut self, ctx: &mut RunContext) -> bool {
        while self.decisions.len() < self.errors.len() {
            let fatal = self.errors[self.decisions.len()].is_fatal(ctx);
            self.decisions.push(fatal);
        }
        !self.decisions.iter().any(|fatal| *fatal)
    }

    pub fn into_result(self) -> RemoteResult {
        RemoteResult {
            messages: self.messages,
            errors: self.errors,
        }
    }

    /// Print errors grouped by host, then host-less cluster errors.
    ///
    /// Help for a check is printed once after each contiguous run of errors
    /// from that check.
    pub fn render(&self, ctx: &mut RunContext) {
        let mut hosts: Vec<&str> = Vec::new();
        for error in &self.errors {
            if let Some(host) = error.host_name()
                && !hosts.contains(&host)
            {
                hosts.push(host);
            }
        }

        for host in hosts {
            let grouped: Vec<&RemoteError> = self
                .errors
                .iter()
                .filter(|e| e.host_name() == Some(host))
                .collect();
            ctx.console_mut()
                .header(LogLevel::Error, &format!("Errors for {host}"));
            render_run(ctx, Some(host), &grouped);
        }

        let cluster: Vec<&RemoteError> = self
            .errors
            .iter()
            .filter(|e| e.host_name().is_none())
            .collect();
        if cluster.is_empty() {
            return;
        }
        ctx.console_mut()
            .header(LogLevel::Error, "Errors for the cluster");
        for error in cluster {
            match error {
                RemoteError::Prompt { error } => print_prompt_errors(ctx, std::slice::from_ref(error)),
                RemoteError::PromptSet { errors } => print_prompt_errors(ctx, errors),
                other => ctx.console_mut().write(LogLevel::Error, None, &other.message()),
            }
        }
    }
}

fn render_run(ctx: &mut RunContext, host: Option<&str>, errors: &[&RemoteError]) {
    for (i, error) in errors.iter().enumerate() {
        ctx.console_mut()
            .write(LogLevel::Error, host, &error.message());

        let next_check = errors.get(i + 1).and_then(|e| e.check());
        if error.check().is_some() && error.check() != next_check {
            for line in error.help() {
                ctx.console_mut().write(LogLevel::Error, host, line);
            }
        }
    }
}

/// Print prompt errors with their key and current value.
pub fn print_prompt_errors(ctx: &mut RunContext, errors: &[PromptError]) {
    let console = ctx.console_mut();
    for error in errors {
        console.divider(LogLevel::Error);
        console.write(LogLevel::Error, None, &error.prompt);
        console.write(LogLevel::Error, None, &format!("> Message: {}", error.message));
        console.write(LogLevel::Error, None, &format!("> Config Key: {}", error.key));
        if let Some(current) = error.current_value.as_deref().filter(|v| !v.is_empty()) {
            console.write(LogLevel::Error, None, &format!("> Current Value: {current}"));
        }
    }
    console.divider(LogLevel::Error);
}
