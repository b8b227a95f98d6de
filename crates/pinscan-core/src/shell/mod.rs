//! Shared shell-command analyzer: all three front-ends reduce their
//! artifacts to shell fragments and feed them through this walker.

pub mod classify;
pub mod command;
pub mod walker;

pub use command::Command;
pub use walker::{walk_fragment, FragmentLines, TaintedFiles};
