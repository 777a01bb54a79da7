#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tconf_core::console::{Console, LogLevel};
use tconf_core::context::{Identity, RunContext, RunOptions};
use tconf_core::executor::{CommandExecutor, CommandOutput};
use tconf_core::prompt::input::{PromptInput, ScriptedInput};
use tconf_core::remote::RemoteResult;
use tconf_core::remote::protocol::encode;

pub const CONTROLLER: &str = "ctl";
pub const USER: &str = "tungsten";

#[derive(Debug, Clone)]
struct Response {
    host: String,
    needle: String,
    output: CommandOutput,
}

#[derive(Debug, Default)]
struct State {
    responses: Vec<Response>,
    unreachable: HashSet<String>,
    commands: Vec<(String, String)>,
    transfers: Vec<(String, String)>,
}

/// Executor that answers from a script instead of running anything.
///
/// Hosts behave like healthy Tungsten hosts unless told otherwise: login
/// succeeds, directories are writable and host-side runs return a clean
/// result.
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    state: Arc<Mutex<State>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands on `host` containing `needle`. Later entries win.
    pub fn respond(&self, host: &str, needle: &str, status: i32, output: &str) -> &Self {
        self.state.lock().unwrap().responses.push(Response {
            host: host.to_string(),
            needle: needle.to_string(),
            output: CommandOutput {
                status,
                output: output.to_string(),
            },
        });
        self
    }

    /// Make host-side `operation` runs on `host` print `logs` and then
    /// return `result`.
    pub fn remote_result(
        &self,
        host: &str,
        operation: &str,
        logs: &[&str],
        result: &RemoteResult,
    ) -> &Self {
        let mut output: String = logs.iter().map(|l| format!("{l}\n")).collect();
        output.push_str(&encode(result).unwrap());
        output.push('\n');
        self.respond(host, &format!("--stream {operation}"), 0, &output)
    }

    /// Every command and transfer to `host` fails as ssh would.
    pub fn unreachable(&self, host: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .unreachable
            .insert(host.to_string());
        self
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn commands_for(&self, host: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c)
            .collect()
    }

    pub fn transfers(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().transfers.clone()
    }

    fn default_output(host: &str, user: &str, command: &str) -> CommandOutput {
        let (status, output) = if command == "whoami" {
            (0, format!("{user}\n"))
        } else if command == "hostname" {
            (0, format!("{host}\n"))
        } else if command.contains("[ -w") {
            (0, "0\n".to_string())
        } else if let Some(program) = command.strip_prefix("command -v ") {
            (0, format!("/usr/bin/{program}\n"))
        } else if command.contains("--stream") {
            (0, format!("{}\n", encode(&RemoteResult::default()).unwrap()))
        } else {
            (0, String::new())
        };
        CommandOutput { status, output }
    }
}

impl CommandExecutor for FakeExecutor {
    fn execute(&self, host: &str, user: &str, command: &str) -> anyhow::Result<CommandOutput> {
        let mut state = self.state.lock().unwrap();
        state
            .commands
            .push((host.to_string(), command.to_string()));

        if state.unreachable.contains(host) {
            return Ok(CommandOutput {
                status: 255,
                output: format!("ssh: connect to host {host} port 22: Connection refused\n"),
            });
        }
        let scripted = state
            .responses
            .iter()
            .rev()
            .find(|r| r.host == host && command.contains(&r.needle))
            .map(|r| r.output.clone());
        Ok(scripted.unwrap_or_else(|| Self::default_output(host, user, command)))
    }

    fn transfer(
        &self,
        host: &str,
        _user: &str,
        _local: &Path,
        remote_path: &str,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable.contains(host) {
            anyhow::bail!("Unable to copy configuration to {host}:{remote_path}");
        }
        state
            .transfers
            .push((host.to_string(), remote_path.to_string()));
        Ok(())
    }
}

/// A controller context on `ctl` as `tungsten`, writing to memory.
pub fn context(executor: &FakeExecutor, input: impl PromptInput + 'static, options: RunOptions) -> RunContext {
    RunContext::new(
        options,
        Identity::new(CONTROLLER, USER),
        Console::memory(LogLevel::Info),
        Box::new(input),
        Box::new(executor.clone()),
    )
}

pub fn scripted(answers: &[&str]) -> ScriptedInput {
    ScriptedInput::new(answers.iter().copied())
}
