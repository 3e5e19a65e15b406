//! Manage POSIX user accounts on remote hosts through a command channel.
//!
//! The pieces, leaf first: [`passwd`] parses the classic user database,
//! [`command`] builds quoted remote commands, [`runner`] executes them
//! (ssh or local shell), and [`client::Client`] ties them together with
//! a per-connection cache, lookups, and verified mutations.

mod account;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod passwd;
pub mod runner;

pub use client::{Client, UserCache};
pub use error::{Error, Result};
pub use passwd::User;
pub use runner::{CommandRunner, ExecOutput, LocalRunner, SshRunner};
