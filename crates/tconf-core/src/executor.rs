//! Command execution against the controller or a remote host.
//!
//! Remote hosts are reached with the system `ssh` and `scp` clients using
//! key authentication. Commands for the local host run through `sh -c`.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context;

const SSH_OPTIONS: [&str; 6] = [
    "-o",
    "PreferredAuthentications=publickey",
    "-o",
    "IdentitiesOnly=yes",
    "-o",
    "StrictHostKeyChecking=no",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Captured text without the trailing newline.
    pub fn text(&self) -> &str {
        self.output.trim_end()
    }
}

pub trait CommandExecutor {
    /// Run `command` as `user` on `host` and capture combined output.
    fn execute(&self, host: &str, user: &str, command: &str) -> anyhow::Result<CommandOutput>;

    /// Like [`execute`](Self::execute) but hands each line to `on_line` as it arrives.
    fn execute_streaming(
        &self,
        host: &str,
        user: &str,
        command: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> anyhow::Result<CommandOutput> {
        let output = self.execute(host, user, command)?;
        for line in output.output.lines() {
            on_line(line);
        }
        Ok(output)
    }

    /// Copy a local file to `remote_path` on `host`.
    fn transfer(&self, host: &str, user: &str, local: &Path, remote_path: &str)
    -> anyhow::Result<()>;
}

/// Runs commands with `sh` locally and `ssh` for every other host.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    local_hostname: String,
}

impl ShellExecutor {
    pub fn new(local_hostname: impl Into<String>) -> Self {
        Self {
            local_hostname: local_hostname.into(),
        }
    }

    pub fn is_local(&self, host: &str) -> bool {
        host == self.local_hostname || host == "localhost"
    }

    fn build(&self, host: &str, user: &str, command: &str) -> Command {
        if self.is_local(host) {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(format!("exec 2>&1; {command}"));
            cmd
        } else {
            let mut cmd = Command::new("ssh");
            cmd.args(SSH_OPTIONS)
                .arg(format!("{user}@{host}"))
                .arg(format!("exec 2>&1; . /etc/profile; {command}"));
            cmd
        }
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, host: &str, user: &str, command: &str) -> anyhow::Result<CommandOutput> {
        self.execute_streaming(host, user, command, &mut |_| {})
    }

    fn execute_streaming(
        &self,
        host: &str,
        user: &str,
        command: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> anyhow::Result<CommandOutput> {
        tracing::debug!(host, user, command, "execute");
        let mut child = self
            .build(host, user, command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start `{command}` on {host}"))?;

        let mut output = String::new();
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let line = line.with_context(|| format!("Failed to read output of `{command}`"))?;
                on_line(&line);
                output.push_str(&line);
                output.push('\n');
            }
        }

        let finished = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for `{command}` on {host}"))?;
        // ssh reports its own connection problems on stderr
        output.push_str(&String::from_utf8_lossy(&finished.stderr));
        let status = finished.status.code().unwrap_or(-1);
        tracing::debug!(host, status, "finished");

        Ok(CommandOutput { status, output })
    }

    fn transfer(
        &self,
        host: &str,
        user: &str,
        local: &Path,
        remote_path: &str,
    ) -> anyhow::Result<()> {
        if self.is_local(host) {
            if let Some(parent) = Path::new(remote_path).parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
            std::fs::copy(local, remote_path).with_context(|| {
                format!("Failed to copy {} to {remote_path}", local.display())
            })?;
            return Ok(());
        }

        let status = Command::new("scp")
            .arg("-q")
            .args(SSH_OPTIONS)
            .arg(local)
            .arg(format!("{user}@{host}:{remote_path}"))
            .status()
            .with_context(|| format!("Failed to start scp to {host}"))?;
        if !status.success() {
            anyhow::bail!(
                "Unable to copy {} to {host}:{remote_path}",
                local.display()
            );
        }
        Ok(())
    }
}

/// Quote a value for inclusion in a shell command line.
pub fn quote(value: &str) -> anyhow::Result<String> {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .with_context(|| format!("Cannot quote value for the shell: {value:?}"))
}

/// The controller's hostname as reported by `hostname`.
pub fn local_hostname() -> String {
    Command::new("hostname")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// The invoking user, from `$USER` or `$LOGNAME`.
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_default()
}
