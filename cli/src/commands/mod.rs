//! Subcommand implementations.

pub mod config;
pub mod kill;
pub mod listen;
pub mod lookup;
pub mod stop;
pub mod wait;
