// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route one decoded request value to its method.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error};
use yaqd_wire::{Request, Response, RpcError, Value};

use crate::{Context, Daemon};

/// What the connection should do after a request.
#[derive(Debug, PartialEq)]
pub(crate) struct Reply {
    /// Sent only for requests that carried an id.
    pub response: Option<Response>,
    /// The daemon accepted `shutdown`; close once the reply is written.
    pub close: bool,
}

pub(crate) fn dispatch<D: Daemon>(ctx: &Context<D>, value: Value) -> Reply {
    let request = match Request::from_value(value) {
        Ok(request) => request,
        Err(rejected) => {
            debug!(daemon = ctx.name(), error = %rejected.error, "rejected request");
            return Reply {
                response: rejected.id.map(|id| Response::error(id, rejected.error)),
                close: false,
            };
        }
    };

    let Request { method, id, params } = request;
    debug!(daemon = ctx.name(), %method, notification = id.is_none(), "request");

    let result = call(ctx, &method, params);
    let close = method == "shutdown" && result.is_ok();
    if let Err(e) = &result {
        debug!(daemon = ctx.name(), %method, error = %e, "request failed");
    }

    Reply { response: id.map(|id| Response::from_result(id, result)), close }
}

fn call<D: Daemon>(
    ctx: &Context<D>,
    name: &str,
    params: yaqd_wire::Params,
) -> Result<Value, RpcError> {
    let method = ctx
        .methods()
        .get(name)
        .ok_or_else(|| RpcError::MethodNotFound(format!("'{}' has no method '{}'", D::KIND, name)))?;
    let args = method.bind(params)?;

    match catch_unwind(AssertUnwindSafe(|| method.call(ctx, args))) {
        Ok(result) => Ok(result?),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            error!(daemon = ctx.name(), method = name, %message, "handler panicked");
            Err(RpcError::Internal(message))
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
