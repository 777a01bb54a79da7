//! The shape shared by prompts, validation checks and deployment steps.

use crate::context::RunContext;

/// Something that can be switched on or off by the current configuration
/// and run against it.
pub trait Capability {
    type Outcome;

    fn enabled(&self, ctx: &RunContext) -> bool;

    fn run(&self, ctx: &mut RunContext) -> Self::Outcome;
}
