//! The prompt, check and step catalogs for a Tungsten cluster.

use std::sync::Arc;

use crate::deploy::{DeploymentOrchestrator, steps};
use crate::error::ValidationFailure;
use crate::params;
use crate::prompt::validator::{
    FnValidator, SharedValidator, pv_boolean, pv_dbms_role, pv_dbms_type, pv_hostname, pv_identifier,
    pv_integer, pv_java_mem_size, pv_repl_buffer_size,
};
use crate::prompt::{GroupPrompt, InterfaceMessage, MultiValuePrompt, Prompt, ValuePrompt};
use crate::validation::{ValidationEngine, checks};

const INTRO: &str = "\
This tool collects the settings needed to install Tungsten Replicator on
one or more hosts, checks each host, and deploys the configuration.
Type 'help' at any prompt for more information about it.";

fn member_list() -> SharedValidator {
    Arc::new(FnValidator(|value: &str| {
        let valid = value.split(',').map(str::trim).all(|member| {
            !member.is_empty()
                && member
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        });
        if valid {
            Ok(value.to_string())
        } else {
            Err(ValidationFailure::new(
                "Value must be a comma-separated list of host names",
            ))
        }
    }))
}

fn is_slave(role: Option<&str>) -> bool {
    role == Some("slave")
}

fn hosts_group() -> GroupPrompt {
    GroupPrompt::new(
        params::HOSTS,
        "Enter the settings for @value",
        "Host",
        "Hosts",
    )
    .with_weight(100)
    .with_description("Each host receives a copy of the configuration and is deployed in turn.")
    .with_template(
        ValuePrompt::new(params::HOST, "What is the hostname?")
            .with_validator(pv_hostname())
            .with_computed_default(|env| env.member_alias().map(str::to_string)),
    )
    .with_template(
        ValuePrompt::new(params::USERID, "What user should run the services?")
            .with_validator(pv_identifier())
            .with_computed_default(|env| {
                Some(env.ctx().identity().user.clone()).filter(|u| !u.is_empty())
            }),
    )
    .with_template(
        ValuePrompt::new(params::HOME_DIRECTORY, "Where should the software be installed?")
            .with_default("/opt/continuent")
            .with_help("The directory must be writable by the service user, or creatable in its parent."),
    )
    .with_template(
        ValuePrompt::new(params::TEMP_DIRECTORY, "Where should temporary files be staged?")
            .advanced()
            .with_default("/tmp"),
    )
}

fn replication_services_group() -> GroupPrompt {
    GroupPrompt::new(
        params::REPL_SERVICES,
        "Enter the settings for replication service @value",
        "Replication service",
        "Replication services",
    )
    .with_weight(300)
    .with_template(
        ValuePrompt::new(params::DEPLOYMENT_HOST, "Which host runs this service?")
            .with_validator(pv_identifier()),
    )
    .with_template(
        ValuePrompt::new(params::SERVICE_ROLE, "What is the role of this service?")
            .with_validator(pv_dbms_role())
            .with_default("master"),
    )
    .with_template(
        ValuePrompt::new(params::SERVICE_MASTER_HOST, "Which host is the master?")
            .with_validator(pv_hostname())
            .enabled_when(|env| is_slave(env.member_value(params::SERVICE_ROLE))),
    )
}

/// The replication settings shared by every host.
pub fn replication_prompts() -> Vec<Box<dyn Prompt>> {
    vec![
        Box::new(
            ValuePrompt::new(params::REPL_ROLE, "What is the replication role for this host?")
                .with_weight(200)
                .with_validator(pv_dbms_role())
                .with_default("master")
                .with_description("A master extracts transactions; a slave applies them."),
        ),
        Box::new(
            ValuePrompt::new(params::REPL_MASTER_HOST, "What is the master host for this slave?")
                .with_weight(210)
                .with_validator(pv_hostname())
                .enabled_when(|env| is_slave(env.value(params::REPL_ROLE))),
        ),
        Box::new(
            ValuePrompt::new(params::REPL_DBMS, "Which database type is being replicated?")
                .with_weight(220)
                .with_validator(pv_dbms_type())
                .with_default("mysql"),
        ),
        Box::new(
            ValuePrompt::new(params::REPL_DBPORT, "Which port does the database listen on?")
                .with_weight(230)
                .with_validator(pv_integer())
                .with_computed_default(|env| {
                    let port = match env.value(params::REPL_DBMS) {
                        Some("postgresql") => "5432",
                        _ => "3306",
                    };
                    Some(port.to_string())
                }),
        ),
        Box::new(
            ValuePrompt::new(params::REPL_RMI_PORT, "Which port should the replicator use for RMI?")
                .with_weight(240)
                .advanced()
                .with_validator(pv_integer())
                .with_default("10000"),
        ),
        Box::new(
            ValuePrompt::new(params::REPL_BUFFER_SIZE, "How many transactions should be buffered?")
                .with_weight(250)
                .advanced()
                .with_validator(pv_repl_buffer_size())
                .with_default("10"),
        ),
        Box::new(
            ValuePrompt::new(params::REPL_JAVA_MEM_SIZE, "How much memory (MB) should the replicator use?")
                .with_weight(260)
                .advanced()
                .with_validator(pv_java_mem_size())
                .with_default("512"),
        ),
        Box::new(
            ValuePrompt::new(params::REPL_AUTO_ENABLE, "Should the replicator go online at startup?")
                .with_weight(270)
                .advanced()
                .with_validator(pv_boolean())
                .with_default("true"),
        ),
        Box::new(
            ValuePrompt::new(params::REPL_THL_PROTOCOL, "Which protocol do replicators use to exchange logs?")
                .with_weight(280)
                .constant()
                .with_default("thl"),
        ),
    ]
}

/// Every prompt asked by `configure`.
pub fn prompts() -> Vec<Box<dyn Prompt>> {
    let mut prompts: Vec<Box<dyn Prompt>> = vec![
        Box::new(
            InterfaceMessage::new("intro", INTRO)
                .with_title("Tungsten Replicator")
                .with_weight(0),
        ),
        Box::new(hosts_group()),
    ];
    prompts.extend(replication_prompts());
    prompts.push(Box::new(replication_services_group()));
    prompts.push(Box::new(
        ValuePrompt::new(params::DATASERVICE_MEMBERS, "Which hosts are members of the data service?")
            .with_weight(400)
            .optional()
            .with_validator(member_list())
            .with_help("Enter a comma-separated list, or leave empty for a standalone service."),
    ));
    prompts.push(Box::new(
        MultiValuePrompt::new(
            params::DATASERVICE_MEMBERS,
            params::DATASERVICE_MEMBER_PREFIX,
            params::MEMBER_PRIORITY,
            "What is the failover priority of @value?",
        )
        .with_weight(410)
        .with_validator(pv_integer())
        .with_default("1"),
    ));
    prompts
}

pub fn validation_engine() -> ValidationEngine {
    ValidationEngine::new(checks::builtin_checks())
}

pub fn deployment_orchestrator() -> DeploymentOrchestrator {
    DeploymentOrchestrator::new(steps::builtin_steps())
}
