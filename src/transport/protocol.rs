//! Wire message types.
//!
//! Requests are a serialized [`CommandBatch`](crate::command::CommandBatch):
//! `{"Commands":[{"Name":..,"Arguments":[..]},..]}`.
//! Responses carry one result per command, in submission order:
//! `{"Results":[{"Status":"Success"|"Error","Message":..,"Data":..},..]}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Outcome of a single command as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Error,
}

/// Server report for one command of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandResult {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandResult {
    pub fn success(data: Option<Value>) -> Self {
        Self {
            status: Status::Success,
            message: None,
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Decoded reply to a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    pub results: Vec<CommandResult>,
}

impl Response {
    /// Decode a response payload and check it answers `expected` commands.
    pub fn decode(payload: &[u8], expected: usize) -> Result<Self> {
        let resp: Self = serde_json::from_slice(payload)
            .map_err(|e| Error::Protocol(format!("invalid response payload: {e}")))?;
        if resp.results.len() != expected {
            return Err(Error::Protocol(format!(
                "expected {expected} result(s), server returned {}",
                resp.results.len()
            )));
        }
        Ok(resp)
    }

    /// Overall status: every command succeeded.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(CommandResult::is_success)
    }

    /// Message of the first failed command, if any failed.
    pub fn first_error(&self) -> Option<&str> {
        self.results
            .iter()
            .find(|r| !r.is_success())
            .map(|r| r.message.as_deref().unwrap_or("command failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_minimal_success() {
        let resp = Response::decode(br#"{"Results":[{"Status":"Success"}]}"#, 1).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.results[0].message, None);
        assert_eq!(resp.results[0].data, None);
    }

    #[test]
    fn decode_mixed_results_in_order() {
        let json = br#"{"Results":[
            {"Status":"Success","Data":{"time":912.5}},
            {"Status":"Error","Message":"no such player"}
        ]}"#;
        let resp = Response::decode(json, 2).unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.results[0].data, Some(serde_json::json!({"time": 912.5})));
        assert_eq!(resp.first_error(), Some("no such player"));
    }

    #[test]
    fn truncated_json_is_protocol_error() {
        let err = Response::decode(br#"{"Results":[{"Status":"Succ"#, 1).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn missing_results_is_protocol_error() {
        let err = Response::decode(br#"{"Status":"Success"}"#, 1).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn unknown_status_is_protocol_error() {
        let err = Response::decode(br#"{"Results":[{"Status":"Maybe"}]}"#, 1).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn result_count_mismatch_is_protocol_error() {
        let err = Response::decode(br#"{"Results":[]}"#, 1).unwrap_err();
        assert!(err.to_string().contains("expected 1 result(s)"));
    }

    #[test]
    fn error_without_message_has_fallback() {
        let resp = Response::decode(br#"{"Results":[{"Status":"Error"}]}"#, 1).unwrap();
        assert_eq!(resp.first_error(), Some("command failed"));
    }

    #[test]
    fn serialize_omits_empty_fields() {
        let resp = Response {
            results: vec![CommandResult::success(None), CommandResult::error("denied")],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"Results":[{"Status":"Success"},{"Status":"Error","Message":"denied"}]}"#
        );
    }
}
