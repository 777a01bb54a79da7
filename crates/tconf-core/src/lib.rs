//! tconf Core Library
//!
//! Collects Tungsten cluster settings through a catalog of prompts, then
//! validates and deploys the resulting configuration host by host.

pub mod capability;
pub mod catalog;
pub mod commands;
pub mod console;
pub mod context;
pub mod deploy;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod hosts;
pub mod params;
pub mod prompt;
pub mod properties;
pub mod remote;
pub mod report;
pub mod runner;
pub mod validation;

/// Re-exports of commonly used types
pub mod prelude {
    // Run state
    pub use crate::capability::Capability;
    pub use crate::console::{Console, LogLevel};
    pub use crate::context::{Identity, RunContext, RunOptions};
    pub use crate::executor::{CommandExecutor, CommandOutput, ShellExecutor};
    pub use crate::properties::PropertyStore;

    // Prompts
    pub use crate::prompt::input::{PromptInput, ScriptedInput};
    pub use crate::prompt::{
        GroupPrompt, InterfaceMessage, MultiValuePrompt, Prompt, PromptOutcome, ValuePrompt,
    };
    pub use crate::runner::{PromptRunner, RunnerOutcome};

    // Validation and deployment
    pub use crate::deploy::{DeploymentOrchestrator, DeploymentStep};
    pub use crate::dispatch::{Operation, RemoteDispatcher};
    pub use crate::validation::{CheckScope, ValidationCheck, ValidationEngine};

    // Results
    pub use crate::remote::{PromptError, RemoteError, RemoteResult};
    pub use crate::report::ResultAggregator;
}
