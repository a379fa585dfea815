//! Claude subscription usage monitor.
//!
//! Reads the Claude CLI's OAuth credential, keeps it fresh, polls the usage
//! endpoint and presents the result in a terminal monitor or as one-shot
//! command output.

pub mod cli;
pub mod credentials;
pub mod display;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod paths;
pub mod poll;
pub mod private_file;
pub mod profiles;
pub mod usage;

#[cfg(test)]
pub mod testing;
