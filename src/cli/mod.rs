//! Command-line interface module.

mod args;
pub mod convert;
pub mod rewrite;
pub mod serve;

pub use args::{Cli, Commands, ServeArgs};
