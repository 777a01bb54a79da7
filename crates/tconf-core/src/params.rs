//! Configuration key names.

// Per-host values, filled in when a configuration is expanded for one host.
pub const DEPLOYMENT_HOST: &str = "deployment_host";
pub const HOST_NAME: &str = "host_name";
pub const USERID: &str = "userid";
pub const HOME_DIRECTORY: &str = "home_directory";
pub const TEMP_DIRECTORY: &str = "temp_directory";

// Hosts group and its member keys.
pub const HOSTS: &str = "hosts";
pub const HOST: &str = "host";

// Replication settings.
pub const REPL_ROLE: &str = "replication.role";
pub const REPL_MASTER_HOST: &str = "replication.masterHost";
pub const REPL_DBMS: &str = "replication.dbms";
pub const REPL_DBPORT: &str = "replication.dbport";
pub const REPL_RMI_PORT: &str = "replication.rmiPort";
pub const REPL_BUFFER_SIZE: &str = "replication.bufferSize";
pub const REPL_JAVA_MEM_SIZE: &str = "replication.javaMemSize";
pub const REPL_AUTO_ENABLE: &str = "replication.autoEnable";
pub const REPL_THL_PROTOCOL: &str = "replication.thlProtocol";

// Replication services group and its member keys.
pub const REPL_SERVICES: &str = "repl_services";
pub const SERVICE_ROLE: &str = "role";
pub const SERVICE_MASTER_HOST: &str = "master_host";

// Dataservice membership and per-member settings.
pub const DATASERVICE_MEMBERS: &str = "dataservice.members";
pub const DATASERVICE_MEMBER_PREFIX: &str = "dataservice.member.";
pub const MEMBER_PRIORITY: &str = "priority";

/// Host configuration file written under each home directory.
pub const HOST_CONFIG: &str = "tungsten.cfg";
