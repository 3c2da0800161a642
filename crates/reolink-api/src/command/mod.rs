// ── Command model ──
//
// A batch is a list of `CommandRequest`s POSTed as one JSON array; the
// camera answers with one `CommandResponse` per request, in order.

pub mod codec;
pub mod requests;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::Error;
use crate::error_code::ErrorCode;

/// How much detail the camera should return for a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Action {
    /// `action: 0` -- current values only.
    #[default]
    ValueOnly,
    /// `action: 1` -- values plus ranges and initial values.
    Detailed,
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::ValueOnly => serializer.serialize_u8(0),
            Self::Detailed => serializer.serialize_u8(1),
        }
    }
}

/// One command in a batch.
///
/// Built by the factories in [`requests`]; immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    command: String,
    action: Action,
    param: Option<Value>,
    get: bool,
    binary: bool,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            action: Action::ValueOnly,
            param: None,
            get: false,
            binary: false,
        }
    }

    /// Attach a `param` object.
    pub fn with_param(mut self, param: Value) -> Self {
        self.param = Some(param);
        self
    }

    /// Request ranges and initial values (`action: 1`).
    pub fn detailed(mut self) -> Self {
        self.action = Action::Detailed;
        self
    }

    /// Send as a GET with the parameters in the query string when issued alone.
    pub fn as_get(mut self) -> Self {
        self.get = true;
        self
    }

    /// The reply is a raw byte payload (snapshots), not a JSON array.
    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn param(&self) -> Option<&Value> {
        self.param.as_ref()
    }

    pub fn is_get(&self) -> bool {
        self.get
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }
}

/// The `error` block of a failed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
    pub code: ErrorCode,
    pub detail: String,
}

/// One decoded entry of a batch response.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    /// `{"cmd", "code", "value"}`
    Value {
        command: String,
        code: i64,
        value: Value,
    },
    /// `{"cmd", "error": {"rspCode", "detail"}}`
    Error {
        command: String,
        error: ResponseError,
    },
    /// Anything else, passed through untouched.
    Unknown(Value),
}

impl CommandResponse {
    /// The command name this entry answers, if it carries one.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Value { command, .. } | Self::Error { command, .. } => Some(command),
            Self::Unknown(raw) => raw.get("cmd").and_then(Value::as_str),
        }
    }

    /// Whether the entry carries no command name at all.
    pub fn is_anonymous(&self) -> bool {
        self.command().is_none_or(str::is_empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Whether this entry is the camera's "login required" error.
    pub fn is_auth_required(&self) -> bool {
        matches!(
            self,
            Self::Error { error, .. } if error.code == ErrorCode::AuthRequired
        )
    }

    /// Convert into the `value` payload, or the command error.
    pub fn into_value(self) -> Result<Value, Error> {
        match self {
            Self::Value { value, .. } => Ok(value),
            Self::Error { command, error } => Err(Error::Api {
                command,
                code: error.code,
                detail: error.detail,
            }),
            Self::Unknown(raw) => Err(Error::InvalidResponse {
                message: format!("unrecognized response entry: {raw}"),
            }),
        }
    }
}

/// Find the response for `command` and return its `value`.
///
/// Entries are matched by `cmd`. Some firmware drops `cmd` from error
/// entries, so when nothing names the command the entry at `index` (the
/// request's position in the batch) is used if it is anonymous.
///
/// Raises [`Error::MissingResponse`] when the batch did not answer the
/// command at all and [`Error::Api`] when it answered with an error.
pub fn take_value(responses: &[CommandResponse], index: usize, command: &str) -> Result<Value, Error> {
    responses
        .iter()
        .find(|r| r.command() == Some(command))
        .or_else(|| responses.get(index).filter(|r| r.is_anonymous()))
        .cloned()
        .ok_or_else(|| Error::MissingResponse {
            command: command.to_owned(),
        })?
        .into_value()
}

/// Deserialize `value[key]` (or the whole value when `key` is `None`).
pub fn parse_value<T: DeserializeOwned>(value: &Value, key: Option<&str>) -> Result<T, Error> {
    let target = match key {
        Some(key) => value.get(key).ok_or_else(|| Error::Deserialization {
            message: format!("missing field `{key}`"),
            body: value.to_string(),
        })?,
        None => value,
    };
    T::deserialize(target).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: target.to_string(),
    })
}
