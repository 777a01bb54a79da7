//! SIGINT during a property write ends a multi-host run.
//!
//! Everything runs in one test: the handler and its flags are process-wide.

mod support;

use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use tconf_core::catalog;
use tconf_core::context::RunOptions;
use tconf_core::deploy::steps::DEPLOYED_MARKER;
use tconf_core::dispatch::RemoteDispatcher;
use tconf_core::error::StoreError;
use tconf_core::hosts::host_configurations;
use tconf_core::properties::PropertyStore;
use tconf_core::properties::interrupt::{WriteGuard, install_handler, interrupt_pending};
use tempfile::TempDir;

use support::{FakeExecutor, context, scripted};

/// Deliver SIGINT to this process and wait until the handler has seen it.
/// The caller must hold a [`WriteGuard`], or the handler exits.
fn interrupt_self() {
    let status = Command::new("kill")
        .args(["-INT", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    while !interrupt_pending() {
        assert!(Instant::now() < deadline, "interrupt was never delivered");
        thread::sleep(Duration::from_millis(10));
    }
}

fn cluster(hosts: &[&str], home: &Path) -> PropertyStore {
    let home = home.to_string_lossy().into_owned();
    let mut store = PropertyStore::new();
    for &host in hosts {
        store.set(&format!("hosts.{host}.host"), Some(host));
        store.set(&format!("hosts.{host}.userid"), Some("tungsten"));
        store.set(&format!("hosts.{host}.home_directory"), Some(home.as_str()));
    }
    store
}

#[test]
fn interrupted_writes_stop_the_run() {
    install_handler().unwrap();
    let temp = TempDir::new().unwrap();

    // A failed write still reports the interrupt and clears it.
    let held = WriteGuard::begin();
    interrupt_self();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let err = PropertyStore::new()
        .store(&blocker.join("tungsten.cfg"))
        .unwrap_err();
    assert!(StoreError::is_interrupt(&err), "{err:#}");
    assert!(!interrupt_pending());
    assert!(!held.finish());
    PropertyStore::new()
        .store(&temp.path().join("clean.cfg"))
        .unwrap();

    // Staging db1's configuration is interrupted; db2 is never contacted.
    let fake = FakeExecutor::new();
    let mut ctx = context(&fake, scripted(&[]), RunOptions::default().with_batch(true));
    let configs = host_configurations(&cluster(&["db1", "db2"], Path::new("/opt/continuent")));
    let held = WriteGuard::begin();
    interrupt_self();
    let err = catalog::validation_engine()
        .run(&mut ctx, &configs, &RemoteDispatcher::new("tconf"))
        .unwrap_err();
    assert!(StoreError::is_interrupt(&err), "{err:#}");
    assert!(!held.finish());
    assert!(fake.commands_for("db2").is_empty());
    assert!(fake.transfers().is_empty());

    // The in-process deploy of ctl is interrupted; db2 is never deployed.
    let home = temp.path().join("tungsten");
    let fake = FakeExecutor::new();
    let mut ctx = context(&fake, scripted(&[]), RunOptions::default().with_batch(true));
    let configs = host_configurations(&cluster(&["ctl", "db2"], &home));
    let held = WriteGuard::begin();
    interrupt_self();
    let err = catalog::deployment_orchestrator()
        .run(&mut ctx, &configs, &RemoteDispatcher::new("tconf"))
        .unwrap_err();
    assert!(StoreError::is_interrupt(&err), "{err:#}");
    assert!(!held.finish());
    assert!(!home.join(DEPLOYED_MARKER).exists());
    assert!(!fake
        .commands_for("db2")
        .iter()
        .any(|c| c.ends_with("--stream deploy")));
}
