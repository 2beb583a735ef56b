// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC method table.
//!
//! Every method a daemon answers is listed here with its parameter names,
//! so the dispatchable surface is fixed when the daemon is built.

mod args;
mod builtin;

pub use args::{Args, CallError};
pub(crate) use builtin::builtin_methods;

use std::collections::BTreeMap;

use rmpv::Value;
use tracing::warn;
use yaqd_wire::Params;

use crate::Context;

type Handler<D> = Box<dyn Fn(&Context<D>, Args) -> Result<Value, CallError> + Send + Sync>;

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    /// Rendered default for optional parameters; `None` when required.
    pub default: Option<&'static str>,
}

/// One callable RPC method.
pub struct Method<D> {
    name: &'static str,
    doc: &'static str,
    params: Vec<Param>,
    handler: Handler<D>,
}

impl<D> Method<D> {
    pub fn new<F>(name: &'static str, doc: &'static str, handler: F) -> Self
    where
        F: Fn(&Context<D>, Args) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self { name, doc, params: Vec::new(), handler: Box::new(handler) }
    }

    /// Add a required parameter.
    pub fn param(mut self, name: &'static str) -> Self {
        self.params.push(Param { name, default: None });
        self
    }

    /// Add an optional parameter; `default` is how `help` shows it.
    pub fn optional(mut self, name: &'static str, default: &'static str) -> Self {
        self.params.push(Param { name, default: Some(default) });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn doc(&self) -> &'static str {
        self.doc
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// `name(a, b=None)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match p.default {
                Some(default) => format!("{}={}", p.name, default),
                None => p.name.to_string(),
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// Signature followed by the doc text.
    pub fn help(&self) -> String {
        format!("{}\n{}", self.signature(), self.doc)
    }

    /// Match call parameters against the declared ones.
    pub fn bind(&self, params: Params) -> Result<Args, CallError> {
        Args::bind(self.name, &self.params, params)
    }

    pub(crate) fn call(&self, ctx: &Context<D>, args: Args) -> Result<Value, CallError> {
        (self.handler)(ctx, args)
    }
}

impl<D> std::fmt::Debug for Method<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method").field("name", &self.name).field("params", &self.params).finish()
    }
}

/// The methods a daemon answers, keyed by name.
pub struct MethodTable<D> {
    methods: BTreeMap<&'static str, Method<D>>,
}

impl<D> MethodTable<D> {
    /// Later entries replace earlier ones with the same name. Names with a
    /// leading underscore are internal and never exposed.
    pub fn new(methods: impl IntoIterator<Item = Method<D>>) -> Self {
        let mut table = BTreeMap::new();
        for method in methods {
            if method.name.starts_with('_') {
                warn!(method = method.name, "ignoring internal method name");
                continue;
            }
            table.insert(method.name, method);
        }
        Self { methods: table }
    }

    pub fn get(&self, name: &str) -> Option<&Method<D>> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Method names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.methods.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
#[path = "method_tests.rs"]
mod tests;
