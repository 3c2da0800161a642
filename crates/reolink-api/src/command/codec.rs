// Batch codec
//
// Encoding: a lone GET-eligible command becomes a query string, anything
// else a JSON array body. Decoding: accepts `application/json` and the
// firmware quirk of JSON served as `text/html`, normalizes a bare object
// to a one-element batch, and classifies each entry.

use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::command::{Action, CommandRequest, CommandResponse, ResponseError};
use crate::error::Error;
use crate::error_code::ErrorCode;

/// The HTTP shape of an encoded batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

#[derive(Serialize)]
struct WireCommand<'a> {
    cmd: &'a str,
    action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    param: Option<&'a Value>,
}

/// Encode a batch. `token` is appended to the query when present.
pub fn encode(requests: &[CommandRequest], token: Option<&str>) -> Result<EncodedBatch, Error> {
    let first = requests
        .first()
        .ok_or_else(|| Error::Protocol("cannot encode an empty batch".into()))?;
    if requests.len() > 1
        && let Some(streaming) = requests.iter().find(|r| r.is_binary())
    {
        return Err(Error::Protocol(format!(
            "{} returns raw data and must be sent alone",
            streaming.command()
        )));
    }

    let mut query = vec![("cmd".to_owned(), first.command().to_owned())];
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        query.push(("token".to_owned(), token.to_owned()));
    }

    if let [single] = requests
        && single.is_get()
    {
        if let Some(Value::Object(param)) = single.param() {
            flatten_into(&mut query, param);
        }
        return Ok(EncodedBatch {
            method: Method::GET,
            query,
            body: None,
        });
    }

    let wire: Vec<WireCommand<'_>> = requests
        .iter()
        .map(|r| WireCommand {
            cmd: r.command(),
            action: r.action(),
            param: r.param(),
        })
        .collect();
    let body = serde_json::to_string(&wire).map_err(|e| Error::Protocol(e.to_string()))?;

    Ok(EncodedBatch {
        method: Method::POST,
        query,
        body: Some(body),
    })
}

fn flatten_into(query: &mut Vec<(String, String)>, param: &Map<String, Value>) {
    for (key, value) in param {
        match value {
            Value::Null => {}
            Value::String(s) => query.push((key.clone(), s.clone())),
            Value::Object(nested) => flatten_into(query, nested),
            other => query.push((key.clone(), other.to_string())),
        }
    }
}

/// Decode a response body into per-command entries.
///
/// `content_type` of `None` skips the content-type check (used for bodies
/// that were just decrypted).
pub fn decode(content_type: Option<&str>, body: &[u8]) -> Result<Vec<CommandResponse>, Error> {
    let text = std::str::from_utf8(body).map_err(|_| Error::InvalidResponse {
        message: "response body is not UTF-8".into(),
    })?;
    let trimmed = text.trim_start();

    match content_type {
        None => {}
        Some(ct) if ct.eq_ignore_ascii_case("application/json") => {}
        Some(ct) if ct.eq_ignore_ascii_case("text/html") => {
            if !trimmed.starts_with('[') {
                return Err(Error::InvalidResponse {
                    message: "text/html response does not contain a JSON array".into(),
                });
            }
        }
        Some(other) => {
            return Err(Error::InvalidResponse {
                message: format!("unexpected content type {other:?}"),
            });
        }
    }

    let parsed: Value = serde_json::from_str(trimmed).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: text.chars().take(200).collect(),
    })?;

    let entries = match parsed {
        Value::Array(entries) => entries,
        obj @ Value::Object(_) => vec![obj],
        other => {
            return Err(Error::InvalidResponse {
                message: format!("expected a JSON array, got {other}"),
            });
        }
    };

    trace!(count = entries.len(), "decoded batch response");
    Ok(entries.into_iter().map(classify).collect())
}

fn classify(entry: Value) -> CommandResponse {
    let Value::Object(mut obj) = entry else {
        return CommandResponse::Unknown(entry);
    };
    let command = obj
        .get("cmd")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    if let Some(error) = obj.get("error") {
        let code = error.get("rspCode").and_then(Value::as_i64).unwrap_or(0);
        let detail = error
            .get("detail")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        return CommandResponse::Error {
            command,
            error: ResponseError {
                code: ErrorCode::from_code(code),
                detail,
            },
        };
    }

    if let Some(value) = obj.remove("value") {
        let code = obj.get("code").and_then(Value::as_i64).unwrap_or(0);
        return CommandResponse::Value {
            command,
            code,
            value,
        };
    }

    CommandResponse::Unknown(Value::Object(obj))
}
