// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rmpv::Value;

use crate::RpcError;

/// Arguments supplied with a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Default for Params {
    fn default() -> Self {
        Params::Positional(Vec::new())
    }
}

/// A decoded RPC call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    /// `None` marks a notification: it never gets a response.
    pub id: Option<Value>,
    pub params: Params,
}

/// A value that could not be turned into a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    /// The id, if one could be read before the failure.
    pub id: Option<Value>,
    pub error: RpcError,
}

impl Request {
    /// Notification request (no id).
    pub fn notify(method: impl Into<String>, params: Params) -> Self {
        Self { method: method.into(), id: None, params }
    }

    /// Request expecting a response.
    pub fn call(method: impl Into<String>, id: impl Into<Value>, params: Params) -> Self {
        Self { method: method.into(), id: Some(id.into()), params }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Extract a request from one decoded top-level value.
    ///
    /// A value that is not a map has no readable id, so its rejection
    /// carries `id: None` and is treated like a notification.
    pub fn from_value(value: Value) -> Result<Self, Rejected> {
        let entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(Rejected {
                    id: None,
                    error: RpcError::InvalidRequest(format!("expected a map, got {other}")),
                })
            }
        };

        let mut method = None;
        let mut id = None;
        let mut params = None;
        for (key, value) in entries {
            match key.as_str() {
                Some("method") => method = Some(value),
                Some("id") => id = Some(value),
                Some("params") => params = Some(value),
                _ => {}
            }
        }

        let method = match method {
            Some(Value::String(s)) => match s.into_str() {
                Some(name) => name,
                None => {
                    return Err(Rejected {
                        id,
                        error: RpcError::InvalidRequest("method is not valid UTF-8".to_string()),
                    })
                }
            },
            Some(other) => {
                return Err(Rejected {
                    id,
                    error: RpcError::InvalidRequest(format!("method must be a string, got {other}")),
                })
            }
            None => {
                return Err(Rejected {
                    id,
                    error: RpcError::InvalidRequest("missing method".to_string()),
                })
            }
        };

        let params = match params {
            Some(Value::Array(values)) => Params::Positional(values),
            Some(Value::Map(entries)) => {
                let mut named = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    match key {
                        Value::String(s) => match s.into_str() {
                            Some(name) => named.push((name, value)),
                            None => {
                                return Err(Rejected {
                                    id,
                                    error: RpcError::InvalidParams(
                                        "parameter names must be valid UTF-8".to_string(),
                                    ),
                                })
                            }
                        },
                        other => {
                            return Err(Rejected {
                                id,
                                error: RpcError::InvalidParams(format!(
                                    "parameter names must be strings, got {other}"
                                )),
                            })
                        }
                    }
                }
                Params::Named(named)
            }
            _ => Params::default(),
        };

        Ok(Self { method, id, params })
    }

    /// Build the wire map for this request.
    pub fn to_value(&self) -> Value {
        let mut entries = vec![(Value::from("method"), Value::from(self.method.as_str()))];
        if let Some(id) = &self.id {
            entries.push((Value::from("id"), id.clone()));
        }
        let params = match &self.params {
            Params::Positional(values) => Value::Array(values.clone()),
            Params::Named(named) => Value::Map(
                named.iter().map(|(k, v)| (Value::from(k.as_str()), v.clone())).collect(),
            ),
        };
        entries.push((Value::from("params"), params));
        Value::Map(entries)
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
