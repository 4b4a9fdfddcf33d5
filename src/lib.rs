//! server-commander library
//!
//! Client side of a game server's remote command port:
//! - Command model and length-prefixed JSON framing
//! - One-shot TCP transport client with per-step timeouts
//! - Operator actions, update checking, and an MCP control surface built on top

pub mod actions;
pub mod build_id;
pub mod command;
pub mod config;
pub mod error;
pub mod mcp;
pub mod transport;
pub mod update;

pub use command::{Argument, Command, CommandBatch};
pub use error::{Error, Result};
pub use transport::{CommandSender, Response, TcpCommandClient, Timeouts};
