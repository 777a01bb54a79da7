//! Built-in checks for a host configuration.

use crate::context::RunContext;
use crate::executor::{CommandOutput, quote};
use crate::params;

use super::{CheckReport, CheckScope, ValidationCheck};

pub const SSH_LOGIN_CHECK: &str = "SSH login check";
pub const TEMP_DIRECTORY_CHECK: &str = "Temporary directory check";
pub const HOME_WRITABLE_CHECK: &str = "Home directory writable check";
pub const HOME_DIRECTORY_CHECK: &str = "Home directory check";
pub const HOSTNAME_CHECK: &str = "Hostname check";
pub const REQUIRED_COMMANDS_CHECK: &str = "Required commands check";

/// Commands every host needs to run a deployment.
const REQUIRED_COMMANDS: [&str; 4] = ["java", "ruby", "rsync", "tar"];

/// Run `command` against the host in the current store.
fn run_on_host(ctx: &RunContext, command: &str) -> anyhow::Result<CommandOutput> {
    let host = ctx.store().get_or(params::HOST_NAME, "localhost");
    let user = ctx.store().get_or(params::USERID, &ctx.identity().user);
    ctx.executor().execute(&host, &user, command)
}

fn writable_directory(ctx: &RunContext, key: &str, report: &mut CheckReport) -> anyhow::Result<()> {
    let Some(dir) = ctx.store().get(key).filter(|d| !d.is_empty()) else {
        report.error(format!("No value is given for {key}"));
        return Ok(());
    };
    let quoted = quote(dir)?;
    let output = run_on_host(
        ctx,
        &format!("mkdir -p {quoted} 2>/dev/null; if [ -w {quoted} ]; then echo 0; else echo 1; fi"),
    )?;
    if output.text() != "0" {
        report.error(format!("{dir} is not writable"));
    }
    Ok(())
}

fn ssh_login(ctx: &mut RunContext, report: &mut CheckReport) -> anyhow::Result<()> {
    let expected = ctx.store().get_or(params::USERID, &ctx.identity().user);
    let output = run_on_host(ctx, "whoami")?;
    if !output.success() {
        report.error(format!("Unable to login: {}", output.text()));
    } else if output.text() != expected {
        report.error(format!(
            "Logged in as {} but expected {expected}",
            output.text()
        ));
    } else {
        ctx.debug(&format!("Logged in as {expected}"));
    }
    Ok(())
}

fn home_directory(ctx: &mut RunContext, report: &mut CheckReport) -> anyhow::Result<()> {
    let home = ctx.store().get_or(params::HOME_DIRECTORY, "");
    if home.is_empty() {
        report.error("No home directory is configured");
        return Ok(());
    }
    let output = run_on_host(ctx, &format!("test -d {}", quote(&home)?))?;
    if !output.success() {
        report.error(format!("{home} is not a directory"));
    }
    Ok(())
}

fn hostname(ctx: &mut RunContext, report: &mut CheckReport) -> anyhow::Result<()> {
    let expected = ctx.store().get_or(params::HOST_NAME, "localhost");
    if expected == "localhost" {
        return Ok(());
    }
    let output = run_on_host(ctx, "hostname")?;
    let actual = output.text();
    let short = actual.split('.').next().unwrap_or(actual);
    if actual != expected && short != expected {
        report.confirm(format!(
            "The hostname reported by the host is {actual}, not {expected}."
        ));
    }
    Ok(())
}

fn required_commands(ctx: &mut RunContext, report: &mut CheckReport) -> anyhow::Result<()> {
    for command in REQUIRED_COMMANDS {
        let output = run_on_host(ctx, &format!("command -v {command}"))?;
        if !output.success() || output.text().is_empty() {
            report.error(format!("Unable to find {command} in the path"));
        }
    }
    Ok(())
}

/// The full set of checks, in both scopes.
pub fn builtin_checks() -> Vec<ValidationCheck> {
    vec![
        ValidationCheck::new(SSH_LOGIN_CHECK, CheckScope::Preliminary, ssh_login)
            .with_weight(-5)
            .fatal()
            .with_help("Ensure that the host is running and that you can login via SSH using key authentication"),
        ValidationCheck::new(TEMP_DIRECTORY_CHECK, CheckScope::Preliminary, |ctx, report| {
            writable_directory(ctx, params::TEMP_DIRECTORY, report)
        })
        .fatal()
        .with_help("Set temp_directory to a directory the configured user can write to"),
        ValidationCheck::new(HOME_WRITABLE_CHECK, CheckScope::Preliminary, |ctx, report| {
            writable_directory(ctx, params::HOME_DIRECTORY, report)
        })
        .with_weight(5)
        .with_help("Create the home directory or give the configured user write access to its parent"),
        ValidationCheck::new(HOME_DIRECTORY_CHECK, CheckScope::Deep, home_directory).fatal(),
        ValidationCheck::new(HOSTNAME_CHECK, CheckScope::Deep, hostname).with_weight(5),
        ValidationCheck::new(REQUIRED_COMMANDS_CHECK, CheckScope::Deep, required_commands)
            .with_weight(10)
            .with_help("Install the missing packages and make sure they are on the login PATH"),
    ]
}
