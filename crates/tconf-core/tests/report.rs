//! Tests for how gathered errors are shown to the operator.

mod support;

use tconf_core::context::RunOptions;
use tconf_core::remote::{PromptError, RemoteError};
use tconf_core::report::ResultAggregator;

use support::{FakeExecutor, context, scripted};

fn check_error(host: &str, check: &str, message: &str) -> RemoteError {
    RemoteError::Validation {
        message: message.to_string(),
        host: Some(host.to_string()),
        check: check.to_string(),
        help: vec![format!("Help for {check}")],
    }
}

fn rendered(results: &ResultAggregator) -> Vec<String> {
    let mut ctx = context(
        &FakeExecutor::new(),
        scripted(&[]),
        RunOptions::default().with_batch(true),
    );
    results.render(&mut ctx);
    ctx.console_mut().take_lines()
}

#[test]
fn errors_are_grouped_by_host_in_first_seen_order() {
    let mut results = ResultAggregator::new();
    results.push(RemoteError::host("db2 is down", Some("db2".to_string())));
    results.push(RemoteError::host("db1 is down", Some("db1".to_string())));
    results.push(RemoteError::host("db2 again", Some("db2".to_string())));

    let lines = rendered(&results);

    let db2 = lines.iter().position(|l| l == "# Errors for db2").unwrap();
    let db1 = lines.iter().position(|l| l == "# Errors for db1").unwrap();
    assert!(db2 < db1);
    assert_eq!(lines[db2 + 2], "ERROR >> db2 >> db2 is down");
    assert_eq!(lines[db2 + 3], "ERROR >> db2 >> db2 again");
    assert_eq!(lines[db1 + 2], "ERROR >> db1 >> db1 is down");
}

#[test]
fn help_follows_each_run_of_the_same_check() {
    let mut results = ResultAggregator::new();
    results.push(check_error("db1", "Required commands check", "Unable to find java in the path"));
    results.push(check_error("db1", "Required commands check", "Unable to find ruby in the path"));
    results.push(check_error("db1", "Home directory check", "/opt is not a directory"));

    let lines = rendered(&results);
    let body: Vec<&str> = lines.iter().skip(3).map(String::as_str).collect();

    assert_eq!(
        body,
        vec![
            "ERROR >> db1 >> Unable to find java in the path (Required commands check)",
            "ERROR >> db1 >> Unable to find ruby in the path (Required commands check)",
            "ERROR >> db1 >> Help for Required commands check",
            "ERROR >> db1 >> /opt is not a directory (Home directory check)",
            "ERROR >> db1 >> Help for Home directory check",
        ]
    );
}

#[test]
fn cluster_errors_come_last() {
    let mut results = ResultAggregator::new();
    results.push(RemoteError::Prompt {
        error: PromptError::new(
            "replication.dbport",
            "Database port",
            "Value must be an integer",
            Some("abc"),
        ),
    });
    results.push(RemoteError::host("db1 is down", Some("db1".to_string())));
    results.push(RemoteError::host("No hosts are reachable", None));

    let lines = rendered(&results);
    let host = lines.iter().position(|l| l == "# Errors for db1").unwrap();
    let cluster = lines
        .iter()
        .position(|l| l == "# Errors for the cluster")
        .unwrap();

    assert!(host < cluster);
    let tail = &lines[cluster..];
    assert!(tail.contains(&"ERROR >> Database port".to_string()));
    assert!(tail.contains(&"ERROR >> > Config Key: replication.dbport".to_string()));
    assert!(tail.contains(&"ERROR >> > Current Value: abc".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("ERROR >> No hosts are reachable"));
}

#[test]
fn merged_results_keep_remote_messages() {
    let mut results = ResultAggregator::new();
    results.merge(tconf_core::remote::RemoteResult {
        messages: vec!["INFO  >> db1 >> Finish: checks".to_string()],
        errors: Vec::new(),
    });

    assert!(results.is_empty());
    assert_eq!(results.messages(), &["INFO  >> db1 >> Finish: checks".to_string()]);
}
