// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt::Display;

use rmpv::Value;
use serde::de::DeserializeOwned;
use thiserror::Error;
use yaqd_wire::{Params, RpcError};

use super::Param;
use crate::DaemonError;

/// Failure of a method call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Arguments do not fit the method (count, names, or types).
    #[error("{0}")]
    InvalidParams(String),

    /// The method ran and failed.
    #[error("{0}")]
    Failed(String),
}

impl CallError {
    pub fn failed(err: impl Display) -> Self {
        CallError::Failed(err.to_string())
    }
}

impl From<CallError> for RpcError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::InvalidParams(message) => RpcError::InvalidParams(message),
            CallError::Failed(message) => RpcError::Internal(message),
        }
    }
}

impl From<DaemonError> for CallError {
    fn from(err: DaemonError) -> Self {
        CallError::failed(err)
    }
}

/// Call arguments bound to a method's declared parameters.
///
/// An explicit nil counts as not given, so optional parameters behave the
/// same whether omitted or sent as nil.
#[derive(Debug, Clone, Default)]
pub struct Args {
    method: &'static str,
    bound: Vec<(&'static str, Option<Value>)>,
}

impl Args {
    pub(crate) fn bind(
        method: &'static str,
        declared: &[Param],
        params: Params,
    ) -> Result<Self, CallError> {
        let mut bound: Vec<(&'static str, Option<Value>)> =
            declared.iter().map(|p| (p.name, None)).collect();

        match params {
            Params::Positional(values) => {
                if values.len() > declared.len() {
                    return Err(CallError::InvalidParams(format!(
                        "{}() takes {} positional argument(s) but {} were given",
                        method,
                        declared.len(),
                        values.len()
                    )));
                }
                for (slot, value) in bound.iter_mut().zip(values) {
                    slot.1 = Some(value);
                }
            }
            Params::Named(named) => {
                for (name, value) in named {
                    let slot = bound.iter_mut().find(|(n, _)| *n == name).ok_or_else(|| {
                        CallError::InvalidParams(format!(
                            "{method}() got an unexpected keyword argument '{name}'"
                        ))
                    })?;
                    if slot.1.is_some() {
                        return Err(CallError::InvalidParams(format!(
                            "{method}() got multiple values for argument '{name}'"
                        )));
                    }
                    slot.1 = Some(value);
                }
            }
        }

        for (param, (_, value)) in declared.iter().zip(&bound) {
            if param.default.is_none() && value.is_none() {
                return Err(CallError::InvalidParams(format!(
                    "{}() missing required argument '{}'",
                    method, param.name
                )));
            }
        }

        Ok(Self { method, bound })
    }

    /// The raw value for `name`, if given and not nil.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.bound
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.as_ref())
            .filter(|v| !v.is_nil())
    }

    /// Take the raw value for `name` out of the arguments.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.bound
            .iter_mut()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.take())
            .filter(|v| !v.is_nil())
    }

    /// Decode an optional argument.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CallError> {
        match self.raw(name) {
            Some(value) => rmpv::ext::from_value(value.clone()).map(Some).map_err(|e| {
                CallError::InvalidParams(format!("{}(): bad '{}': {}", self.method, name, e))
            }),
            None => Ok(None),
        }
    }

    /// Decode a required argument.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T, CallError> {
        self.get(name)?.ok_or_else(|| {
            CallError::InvalidParams(format!("{}() missing required argument '{}'", self.method, name))
        })
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
