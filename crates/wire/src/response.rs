// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rmpv::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Value of the `ver` field on every response.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Request-scoped failures, each with a fixed error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Internal(String),
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::Parse(_) => -32700,
            RpcError::InvalidRequest(_) => -32600,
            RpcError::MethodNotFound(_) => -32601,
            RpcError::InvalidParams(_) => -32602,
            RpcError::Internal(_) => -1,
        }
    }
}

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

impl From<RpcError> for ErrorObject {
    fn from(err: RpcError) -> Self {
        Self { code: err.code(), message: err.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(Value),
    Error(ErrorObject),
}

/// Response to an identified request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: Value,
    pub outcome: Outcome,
}

impl Response {
    pub fn result(id: Value, result: Value) -> Self {
        Self { id, outcome: Outcome::Result(result) }
    }

    pub fn error(id: Value, err: RpcError) -> Self {
        Self { id, outcome: Outcome::Error(err.into()) }
    }

    pub fn from_result(id: Value, result: Result<Value, RpcError>) -> Self {
        match result {
            Ok(value) => Self::result(id, value),
            Err(err) => Self::error(id, err),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("ver", PROTOCOL_VERSION)?;
        map.serialize_entry("id", &self.id)?;
        match &self.outcome {
            Outcome::Result(value) => map.serialize_entry("result", value)?,
            Outcome::Error(error) => map.serialize_entry("error", error)?,
        }
        map.end()
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
