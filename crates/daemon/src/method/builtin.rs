// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Methods every daemon answers.

use rmpv::Value;

use super::{Args, CallError, Method};
use crate::convert;
use crate::{Context, Daemon};

pub(crate) fn builtin_methods<D: Daemon>() -> Vec<Method<D>> {
    vec![
        Method::<D>::new("id", "Dictionary of identifying information for the daemon.", |ctx, _| {
            Ok(ctx.identity().to_value())
        }),
        Method::<D>::new(
            "help",
            "Return the help text of the daemon, or of the named method(s).",
            help::<D>,
        )
        .optional("method", "None"),
        Method::<D>::new("get_config", "Full configuration for the daemon.", |ctx, _| {
            Ok(convert::table_to_value(ctx.config()))
        }),
        Method::<D>::new(
            "get_config_filepath",
            "String representing the absolute filepath of the configuration file.",
            |ctx, _| Ok(Value::from(ctx.config_filepath().display().to_string())),
        ),
        Method::<D>::new("get_state", "Current state of the daemon.", |ctx, _| {
            Ok(convert::table_to_value(&ctx.get_state()))
        }),
        Method::<D>::new(
            "set_state",
            "Set the daemon state. Fields not given keep their current values.",
            set_state::<D>,
        )
        .param("state"),
        Method::<D>::new("list_methods", "Return a list of all public methods.", |ctx, _| {
            Ok(Value::Array(ctx.methods().names().into_iter().map(Value::from).collect()))
        }),
        Method::<D>::new("busy", "Boolean representing if the daemon is busy.", |ctx, _| {
            Ok(Value::Boolean(ctx.is_busy()))
        }),
        Method::<D>::new(
            "shutdown",
            "Cleanly shut down (or restart) the daemon. Closing the connection signals completion.",
            |ctx, args: Args| {
                let restart = args.get::<bool>("restart")?.unwrap_or(false);
                ctx.request_shutdown(restart);
                Ok(Value::Nil)
            },
        )
        .optional("restart", "False"),
    ]
}

fn help<D: Daemon>(ctx: &Context<D>, args: Args) -> Result<Value, CallError> {
    let method_help = |name: &str| {
        ctx.methods()
            .get(name)
            .map(|m| Value::from(m.help()))
            .ok_or_else(|| CallError::Failed(format!("'{}' has no method '{}'", D::KIND, name)))
    };

    match args.raw("method") {
        None => Ok(Value::from(D::DESCRIPTION)),
        Some(Value::String(name)) => match name.as_str() {
            Some(name) => method_help(name),
            None => Err(CallError::InvalidParams("method name is not valid UTF-8".into())),
        },
        Some(Value::Array(names)) => {
            let mut out = Vec::with_capacity(names.len());
            for name in names {
                let name = name.as_str().ok_or_else(|| {
                    CallError::InvalidParams(format!("method names must be strings, got {name}"))
                })?;
                out.push(method_help(name)?);
            }
            Ok(Value::Array(out))
        }
        Some(other) => Err(CallError::InvalidParams(format!(
            "help() expects a method name or list of names, got {other}"
        ))),
    }
}

fn set_state<D: Daemon>(ctx: &Context<D>, mut args: Args) -> Result<Value, CallError> {
    let state = args.take("state").unwrap_or(Value::Map(Vec::new()));
    let partial = convert::table_from_value(state)
        .map_err(|e| CallError::InvalidParams(format!("set_state(): bad 'state': {e}")))?;
    ctx.set_state(partial)?;
    Ok(Value::Nil)
}

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
