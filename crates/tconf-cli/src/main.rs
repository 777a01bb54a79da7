//! tconf - Tungsten configuration tool
//!
//! Usage:
//!   tconf                 # Ask for settings, validate every host, deploy
//!   tconf -b              # Same, reading everything from the config file
//!   tconf -n              # Stop after validation
//!   tconf show            # Print the stored configuration
//!   tconf validate|deploy # Host-side runs started by the controller

mod interactive;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tconf_core::commands::{ConfigureCommand, SingleShotCommand};
use tconf_core::console::{Console, LogLevel};
use tconf_core::context::{DEFAULT_CONFIG_FILE, Identity, RunContext, RunOptions};
use tconf_core::dispatch::Operation;
use tconf_core::executor::{ShellExecutor, current_user, local_hostname};
use tconf_core::prompt::input::{NoInput, PromptInput};
use tconf_core::properties::{PropertyStore, interrupt, to_flat_string, to_json_string};
use tconf_core::remote::protocol::encode;
use tconf_core::remote::{RemoteError, RemoteResult};

use crate::interactive::{TerminalInput, print_banner};

#[derive(Parser)]
#[command(name = "tconf")]
#[command(about = "Configure and deploy Tungsten Replicator hosts", long_about = None)]
struct Cli {
    /// Ask advanced prompts too
    #[arg(short, long, global = true)]
    advanced: bool,

    /// Read all values from the config file without prompting
    #[arg(short, long, global = true)]
    batch: bool,

    /// Config file to read and write
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Continue past validation and deployment errors
    #[arg(short, long, global = true)]
    force: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print log lines as they are produced (host-side runs)
    #[arg(long, global = true)]
    stream: bool,

    /// Validate only; do not deploy
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Set a property before prompting (KEY=VALUE)
    #[arg(short = 'p', long = "property", value_name = "KEY=VALUE", global = true)]
    properties: Vec<String>,

    /// Override a prompt's default (KEY=VALUE)
    #[arg(short = 'd', long = "default", value_name = "KEY=VALUE", global = true)]
    defaults: Vec<String>,

    /// Disable a validation check by title
    #[arg(long = "skip-validation-check", value_name = "TITLE", global = true)]
    skipped_checks: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    /// Collect settings, validate every host and deploy (default)
    Configure,
    /// Run deep validation checks on this host and print the result
    Validate,
    /// Run deployment steps on this host and print the result
    Deploy,
    /// Print the stored configuration
    Show {
        /// Print key=value lines instead of JSON
        #[arg(long)]
        flat: bool,
    },
}

impl Cli {
    fn threshold(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else if self.quiet {
            LogLevel::Warn
        } else {
            LogLevel::Info
        }
    }

    fn options(&self, config_path: PathBuf) -> RunOptions {
        let mut options = RunOptions::default()
            .with_config_path(config_path)
            .with_advanced(self.advanced)
            .with_batch(self.batch)
            .with_force(self.force)
            .with_stream(self.stream)
            .with_dry_run(self.dry_run);
        for title in &self.skipped_checks {
            options = options.with_skipped_check(title);
        }
        if let Ok(exe) = std::env::current_exe() {
            options.remote_program = exe.display().to_string();
        }
        options
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "tconf=debug" } else { "tconf=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    interrupt::install_handler()?;

    let code = run(cli)?;
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let command = cli.command.clone().unwrap_or(Commands::Configure);
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    if let Commands::Show { flat } = command {
        let store = PropertyStore::load(&config_path)?;
        let text = if flat {
            to_flat_string(&store)
        } else {
            to_json_string(&store)?
        };
        println!("{text}");
        return Ok(0);
    }

    let operation = match command {
        Commands::Validate => Some(Operation::Validate),
        Commands::Deploy => Some(Operation::Deploy),
        _ => None,
    };

    let console = if operation.is_some() && !cli.stream {
        Console::collecting(cli.threshold())
    } else {
        Console::stdout(cli.threshold())
    };
    let interactive = operation.is_none() && !cli.batch;
    let input: Box<dyn PromptInput> = if interactive {
        Box::new(TerminalInput::new())
    } else {
        Box::new(NoInput)
    };
    let hostname = local_hostname();
    let mut options = cli.options(config_path.clone());
    options.interactive = interactive;

    let mut ctx = RunContext::new(
        options,
        Identity::new(&hostname, current_user()),
        console,
        input,
        Box::new(ShellExecutor::new(&hostname)),
    );

    let loaded = load_store(&config_path, interactive);
    let store = match (loaded, operation) {
        (Ok(store), _) => store,
        (Err(err), Some(_)) => {
            // A host-side run always answers with a payload.
            let result = RemoteResult::from_errors(vec![RemoteError::host(
                format!("{err:#}"),
                Some(hostname),
            )]);
            println!("{}", encode(&result)?);
            return Ok(0);
        }
        (Err(err), None) => return Err(err),
    };
    *ctx.store_mut() = store;
    apply_overrides(&mut ctx, &cli.properties, &cli.defaults)?;

    match operation {
        Some(operation) => {
            let result = SingleShotCommand::standard().run(&mut ctx, operation)?;
            println!("{}", encode(&result)?);
            Ok(0)
        }
        None => {
            if interactive {
                print_banner(&mut std::io::stdout(), env!("CARGO_PKG_VERSION"))?;
            }
            let program = ctx.options().remote_program.clone();
            let outcome = ConfigureCommand::standard(program).run(&mut ctx)?;
            tracing::debug!(?outcome, "configure finished");
            Ok(outcome.exit_code())
        }
    }
}

/// `tungsten.cfg` in the working directory when present, else under the
/// user's config directory.
fn default_config_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("tconf").join(DEFAULT_CONFIG_FILE))
        .unwrap_or(local)
}

/// Load the config file. A missing file is fine when prompting.
fn load_store(path: &std::path::Path, interactive: bool) -> Result<PropertyStore> {
    if !path.exists() {
        if interactive {
            tracing::debug!(path = %path.display(), "no existing configuration");
            return Ok(PropertyStore::new());
        }
        anyhow::bail!("Configuration file not found: {}", path.display());
    }
    PropertyStore::load(path)
}

fn split_assignment(raw: &str) -> Result<(&str, &str)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("Expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Missing key in '{raw}'");
    }
    Ok((key, value.trim()))
}

fn apply_overrides(ctx: &mut RunContext, properties: &[String], defaults: &[String]) -> Result<()> {
    for raw in properties {
        let (key, value) = split_assignment(raw)?;
        ctx.store_mut().set(key, Some(value));
    }
    for raw in defaults {
        let (key, value) = split_assignment(raw)?;
        ctx.set_global_default(key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, split_assignment};
    use clap::Parser;
    use tconf_core::console::LogLevel;

    #[test]
    fn no_subcommand_means_configure() {
        let cli = Cli::try_parse_from(["tconf", "-b", "-c", "/etc/tungsten.cfg"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.batch);
        assert_eq!(cli.config.unwrap().to_str(), Some("/etc/tungsten.cfg"));
    }

    #[test]
    fn host_side_invocation_parses() {
        let cli = Cli::try_parse_from([
            "tconf",
            "-b",
            "-c",
            "/tmp/tconf-db2.cfg",
            "--stream",
            "-v",
            "-f",
            "--skip-validation-check",
            "Hostname check",
            "validate",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Commands::Validate));
        assert!(cli.stream && cli.force);
        assert_eq!(cli.threshold(), LogLevel::Debug);
        assert_eq!(cli.skipped_checks, vec!["Hostname check"]);
    }

    #[test]
    fn repeated_overrides_are_collected() {
        let cli = Cli::try_parse_from([
            "tconf",
            "-p",
            "replication.role=slave",
            "-p",
            "replication.masterHost=db1",
            "-d",
            "replication.dbport=3307",
        ])
        .unwrap();
        assert_eq!(cli.properties.len(), 2);
        assert_eq!(cli.defaults, vec!["replication.dbport=3307"]);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["tconf", "-q", "-v"]).is_err());
    }

    #[test]
    fn show_accepts_flat() {
        let cli = Cli::try_parse_from(["tconf", "show", "--flat"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Show { flat: true }));
    }

    #[test]
    fn assignments_split_on_first_equals() {
        assert_eq!(split_assignment("a.b = x=y").unwrap(), ("a.b", "x=y"));
        assert!(split_assignment("novalue").is_err());
        assert!(split_assignment("=x").is_err());
    }
}
