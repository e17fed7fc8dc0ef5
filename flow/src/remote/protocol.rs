//! Line protocol spoken with the remote service.
//!
//! A request is `<id>,<operation>\n` and is answered by exactly one line. There is no correlation
//! field, so only one request may be in flight on a connection.

use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorKind, FlowError, FlowResult};
use crate::{bail, flow_error};

/// Identifier of a twin on the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemoteId(pub u64);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RemoteId {
    fn from(value: u64) -> Self {
        RemoteId(value)
    }
}

/// Operations understood by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    Create,
    Initialize,
    Advance,
    Render,
    Status,
}

impl RemoteOperation {
    pub fn as_wire(&self) -> &'static str {
        match self {
            RemoteOperation::Create => "creer",
            RemoteOperation::Initialize => "initialise",
            RemoteOperation::Advance => "travaille",
            RemoteOperation::Render => "vers_string",
            RemoteOperation::Status => "donne_statut",
        }
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for RemoteOperation {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let operation = match s {
            "creer" => RemoteOperation::Create,
            "initialise" => RemoteOperation::Initialize,
            "travaille" => RemoteOperation::Advance,
            "vers_string" => RemoteOperation::Render,
            "donne_statut" => RemoteOperation::Status,
            other => bail!(
                ErrorKind::RemoteProtocolError,
                "Unknown remote operation",
                other
            ),
        };

        Ok(operation)
    }
}

/// A single call addressed to one twin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub id: RemoteId,
    pub operation: RemoteOperation,
}

impl Request {
    pub fn new(id: RemoteId, operation: RemoteOperation) -> Self {
        Self { id, operation }
    }

    /// Encodes the request as one newline terminated line.
    pub fn encode(&self) -> String {
        format!("{},{}\n", self.id, self.operation)
    }

    /// Parses a request line, with or without its line terminator.
    pub fn parse(line: &str) -> FlowResult<Self> {
        let line = trim_line(line);
        let Some((id, operation)) = line.split_once(',') else {
            bail!(
                ErrorKind::RemoteProtocolError,
                "Malformed remote request",
                line
            );
        };

        let id = id.trim().parse::<u64>().map_err(|err| {
            flow_error!(
                ErrorKind::RemoteProtocolError,
                "Malformed remote id",
                id,
                source: err
            )
        })?;

        Ok(Self {
            id: RemoteId(id),
            operation: operation.trim().parse()?,
        })
    }
}

/// Strips the line terminator, accepting both `\n` and `\r\n`.
pub(crate) fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}
