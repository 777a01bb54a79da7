//! High-level commands called by the `tconf` frontend.
//!
//! `configure` is the controller flow. The single-shot commands are what the
//! controller invokes on remote hosts.

pub mod configure;
pub mod single_shot;

pub use configure::{ConfigureCommand, ConfigureOutcome};
pub use single_shot::SingleShotCommand;
