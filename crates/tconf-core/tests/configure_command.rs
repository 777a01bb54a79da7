//! End-to-end batch runs of the configure flow.

mod support;

use std::path::Path;

use tconf_core::commands::configure::{ConfigureCommand, ConfigureOutcome};
use tconf_core::context::{RunContext, RunOptions};
use tconf_core::deploy::steps::{DEPLOYED_MARKER, host_config_path};
use tconf_core::properties::PropertyStore;
use tconf_core::remote::{RemoteError, RemoteResult};
use tempfile::TempDir;

use support::{FakeExecutor, context, scripted};

fn batch_context(fake: &FakeExecutor, options: RunOptions, hosts: &[&str], home: &Path) -> RunContext {
    let mut store = PropertyStore::new();
    let home = home.to_string_lossy().into_owned();
    for &host in hosts {
        store.set(&format!("hosts.{host}.host"), Some(host));
        store.set(&format!("hosts.{host}.userid"), Some("tungsten"));
        store.set(&format!("hosts.{host}.home_directory"), Some(home.as_str()));
        store.set(&format!("dataservice.member.{host}.priority"), Some("1"));
    }
    store.set("dataservice.members", Some(hosts.join(",").as_str()));
    store.set("replication.role", Some("master"));
    store.set("replication.dbms", Some("mysql"));
    store.set("replication.dbport", Some("3306"));

    context(fake, scripted(&[]), options.with_batch(true)).with_store(store)
}

fn deploy_runs(fake: &FakeExecutor, host: &str) -> usize {
    fake.commands_for(host)
        .iter()
        .filter(|c| c.ends_with("--stream deploy"))
        .count()
}

#[test]
fn local_batch_run_deploys_in_process() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("tungsten");
    let fake = FakeExecutor::new();
    let mut ctx = batch_context(&fake, RunOptions::default(), &["ctl"], &home);

    let outcome = ConfigureCommand::standard("tconf").run(&mut ctx).unwrap();

    assert_eq!(outcome, ConfigureOutcome::Deployed);
    assert_eq!(outcome.exit_code(), 0);
    assert!(home.join(DEPLOYED_MARKER).is_file());
    assert!(home.join("releases").is_dir());

    let written = PropertyStore::load(&host_config_path(&home)).unwrap();
    assert_eq!(written.get("deployment_host"), Some("ctl"));
    assert_eq!(written.get("temp_directory"), Some("/tmp"));
    assert!(fake.transfers().is_empty());

    let output = ctx.console().captured();
    assert!(output.contains("# Tungsten Configuration Procedure"));
    assert!(output.contains(&format!("INFO  >> ctl >> Finish: deploy ctl:{}", home.display())));
    assert!(output.contains("INFO  >> Deployment finished"));
}

#[test]
fn dry_run_stops_after_validation() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("tungsten");
    let fake = FakeExecutor::new();
    let mut ctx = batch_context(
        &fake,
        RunOptions::default().with_dry_run(true),
        &["db1", "db2"],
        &home,
    );

    let outcome = ConfigureCommand::standard("tconf").run(&mut ctx).unwrap();

    assert_eq!(outcome, ConfigureOutcome::Validated);
    assert_eq!(deploy_runs(&fake, "db1"), 0);
    assert!(!home.exists());
    assert!(ctx.console().captured().contains("INFO  >> Validation finished"));
}

#[test]
fn invalid_values_stop_before_any_host_is_contacted() {
    let temp = TempDir::new().unwrap();
    let fake = FakeExecutor::new();
    let mut ctx = batch_context(&fake, RunOptions::default(), &["db1"], temp.path());
    ctx.store_mut().set("replication.dbport", Some("port"));

    let outcome = ConfigureCommand::standard("tconf").run(&mut ctx).unwrap();

    assert_eq!(outcome, ConfigureOutcome::InvalidValues);
    assert_eq!(outcome.exit_code(), 1);
    assert!(fake.commands().is_empty());
    assert!(ctx
        .console()
        .captured()
        .contains("# There are errors with the values provided in the configuration file"));
}

#[test]
fn failed_validation_is_reported_per_host() {
    let temp = TempDir::new().unwrap();
    let fake = FakeExecutor::new();
    fake.unreachable("db2");
    let mut ctx = batch_context(&fake, RunOptions::default(), &["db1", "db2"], temp.path());

    let outcome = ConfigureCommand::standard("tconf").run(&mut ctx).unwrap();

    assert_eq!(outcome, ConfigureOutcome::ValidationFailed);
    assert_eq!(deploy_runs(&fake, "db1"), 0);
    let output = ctx.console().captured();
    assert!(output.contains("# The configuration file does not pass all validation checks"));
    assert!(output.contains("# Errors for db2"));
}

fn failing_deploy(fake: &FakeExecutor, host: &str) {
    fake.remote_result(
        host,
        "deploy",
        &[],
        &RemoteResult::from_errors(vec![RemoteError::host(
            "Write host configuration: permission denied",
            Some(host.to_string()),
        )]),
    );
}

#[test]
fn deployment_stops_at_the_first_failing_host() {
    let temp = TempDir::new().unwrap();
    let fake = FakeExecutor::new();
    failing_deploy(&fake, "db2");
    let mut ctx = batch_context(
        &fake,
        RunOptions::default(),
        &["db1", "db2", "db3"],
        temp.path(),
    );

    let outcome = ConfigureCommand::standard("tconf").run(&mut ctx).unwrap();

    assert_eq!(outcome, ConfigureOutcome::DeployFailed);
    assert_eq!(deploy_runs(&fake, "db1"), 1);
    assert_eq!(deploy_runs(&fake, "db2"), 1);
    assert_eq!(deploy_runs(&fake, "db3"), 0);
    let output = ctx.console().captured();
    assert!(output.contains("# The deployment failed"));
    assert!(output.contains("ERROR >> db2 >> Write host configuration: permission denied"));
    assert!(output.contains("Deployment stopped at db2, later hosts were not deployed"));
}

#[test]
fn force_deploys_every_host_despite_failures() {
    let temp = TempDir::new().unwrap();
    let fake = FakeExecutor::new();
    failing_deploy(&fake, "db2");
    let mut ctx = batch_context(
        &fake,
        RunOptions::default().with_force(true),
        &["db1", "db2", "db3"],
        temp.path(),
    );

    let outcome = ConfigureCommand::standard("tconf").run(&mut ctx).unwrap();

    assert_eq!(outcome, ConfigureOutcome::Deployed);
    assert_eq!(deploy_runs(&fake, "db3"), 1);
    assert!(ctx.console().captured().contains("# The deployment failed"));
    assert!(fake
        .commands_for("db3")
        .iter()
        .any(|c| c == "tconf -b -c /tmp/tconf-db3.cfg --stream -f deploy"));
}
