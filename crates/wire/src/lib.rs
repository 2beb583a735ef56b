// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC protocol for yaq daemons.
//!
//! Wire format: a plain byte stream of concatenated msgpack maps. Requests
//! carry `method`, an optional `id` and optional `params`; responses carry
//! `ver`, the echoed `id`, and exactly one of `result` or `error`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod codec;
mod request;
mod response;

pub use codec::{encode, CodecError, DecodeError, StreamDecoder};
pub use request::{Params, Rejected, Request};
pub use response::{ErrorObject, Outcome, Response, RpcError, PROTOCOL_VERSION};

/// Re-exported so daemons and clients agree on the value type.
pub use rmpv::Value;
