//! Command model: named commands with scalar arguments, grouped into batches.
//!
//! These are plain values. Building them never touches the network; the
//! transport client is what turns a [`CommandBatch`] into wire bytes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A scalar command argument.
///
/// Serializes as the bare JSON value (`"text"`, `42`, `1.5`, `true`).
/// Integers above `i64::MAX` decode as `Unsigned`, so no integer that fits
/// in 64 bits falls through to `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
}

impl Argument {
    /// Parse a command-line token.
    ///
    /// Tokens are strings unless typed with a prefix: `int:`, `float:` or
    /// `bool:`. `str:` keeps a literal that itself starts with a prefix.
    pub fn parse_typed(token: &str) -> Result<Self> {
        let Some((kind, value)) = token.split_once(':') else {
            return Ok(Self::String(token.to_string()));
        };
        let bad = |what: &str| Error::invalid(format!("'{value}' is not a valid {what}"));
        match kind {
            "str" => Ok(Self::String(value.to_string())),
            "bool" => value.parse().map(Self::Bool).map_err(|_| bad("bool")),
            "int" => value
                .parse()
                .map(Self::Integer)
                .or_else(|_| value.parse().map(Self::Unsigned))
                .map_err(|_| bad("integer")),
            "float" => match value.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Self::Float(f)),
                _ => Err(bad("finite float")),
            },
            _ => Ok(Self::String(token.to_string())),
        }
    }
}

impl From<bool> for Argument {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Argument {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Argument {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u64> for Argument {
    fn from(v: u64) -> Self {
        Self::Unsigned(v)
    }
}

impl From<f64> for Argument {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Argument {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Argument {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// A single named operation for the remote server.
///
/// Decoding goes through [`Command::new`], so a decoded command is as valid
/// as a constructed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", try_from = "RawCommand")]
pub struct Command {
    name: String,
    arguments: Vec<Argument>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCommand {
    name: String,
    #[serde(default)]
    arguments: Vec<Argument>,
}

impl TryFrom<RawCommand> for Command {
    type Error = Error;

    fn try_from(raw: RawCommand) -> Result<Self> {
        Self::new(raw.name, raw.arguments)
    }
}

impl Command {
    /// Build a command. Fails if `name` is empty or a float argument is not
    /// finite (JSON has no representation for NaN or infinities).
    pub fn new(name: impl Into<String>, arguments: Vec<Argument>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid("command name must not be empty"));
        }
        if let Some(pos) = arguments
            .iter()
            .position(|a| matches!(a, Argument::Float(f) if !f.is_finite()))
        {
            return Err(Error::invalid(format!(
                "argument {pos} of '{name}' is not a finite number"
            )));
        }
        Ok(Self { name, arguments })
    }

    /// Build a command with no arguments.
    pub fn named(name: impl Into<String>) -> Result<Self> {
        Self::new(name, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }
}

/// An ordered, non-empty group of commands sent in one envelope.
///
/// Order is wire order, and the server reports one result per command in
/// the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", try_from = "RawBatch")]
pub struct CommandBatch {
    commands: Vec<Command>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawBatch {
    commands: Vec<Command>,
}

impl TryFrom<RawBatch> for CommandBatch {
    type Error = Error;

    fn try_from(raw: RawBatch) -> Result<Self> {
        Self::new(raw.commands)
    }
}

impl CommandBatch {
    /// Build a batch. Fails if `commands` is empty.
    pub fn new(commands: Vec<Command>) -> Result<Self> {
        if commands.is_empty() {
            return Err(Error::invalid("batch must contain at least one command"));
        }
        Ok(Self { commands })
    }

    /// Wrap one command in a batch.
    pub fn single(command: Command) -> Self {
        Self {
            commands: vec![command],
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Always false for a batch built through `new` or `single`.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Command names in wire order, for logging.
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(Command::name).collect()
    }
}
