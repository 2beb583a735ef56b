// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle specs
//!
//! Verify per-instance shutdown and restart over RPC, and process-wide
//! shutdown.

use tokio::net::TcpStream;

use crate::prelude::*;

const TWO: &str = r#"
[alpha]
port = 0

[beta]
port = 0
"#;

#[tokio::test]
async fn shutdown_closes_connection_before_next_request() {
    let daemons = Daemons::start::<Stage>(TWO).await;
    let mut client = daemons.connect("alpha").await;

    let mut bytes = encode(&Request::call("shutdown", 1, Params::default()).to_value()).unwrap();
    let set = Request::call(
        "set_state",
        2,
        positional(vec![map(&[("position", Value::from(9.0))])]),
    );
    bytes.extend(encode(&set.to_value()).unwrap());
    client.send_raw(&bytes).await;

    let response = client.recv().await.unwrap();
    assert_eq!(field(&response, "id"), Some(&Value::from(1)));
    assert_eq!(field(&response, "result"), Some(&Value::Nil));
    assert_eq!(client.recv().await, None);

    let (dir, _) = daemons.signal(Exit::Stop).await;
    let saved = std::fs::read_to_string(dir.path().join("state/stage/alpha-state.toml"))
        .unwrap_or_default();
    assert!(!saved.contains("9.0"), "second request was processed: {saved}");
}

#[tokio::test]
async fn shutdown_notification_also_closes() {
    let daemons = Daemons::start::<BaseDaemon>(TWO).await;
    let mut client = daemons.connect("alpha").await;

    client.send(Request::notify("shutdown", Params::default())).await;
    assert_eq!(client.recv().await, None);
}

#[tokio::test]
async fn shut_down_instance_stops_listening_others_keep_serving() {
    let daemons = Daemons::start::<BaseDaemon>(TWO).await;
    let alpha = daemons.addr("alpha");

    let mut client = daemons.connect("alpha").await;
    client.result("shutdown", Params::default()).await;

    assert!(wait_for(|| async move { TcpStream::connect(alpha).await.is_err() }).await);

    let mut beta = daemons.connect("beta").await;
    assert_eq!(beta.result("busy", Params::default()).await, Value::Boolean(false));
}

#[tokio::test]
async fn process_exits_when_every_instance_shut_down() {
    let daemons = Daemons::start::<BaseDaemon>(TWO).await;
    for name in ["alpha", "beta"] {
        let mut client = daemons.connect(name).await;
        client.result("shutdown", Params::default()).await;
    }
    assert_eq!(daemons.finished().await, Exit::Stop);
}

#[tokio::test]
async fn restart_rereads_config_for_that_instance() {
    let port = free_port();
    let config = |make: &str| {
        format!(
            r#"
            [alpha]
            port = {port}
            make = "{make}"

            [beta]
            port = 0
            "#
        )
    };
    let daemons = Daemons::start::<BaseDaemon>(&config("old")).await;
    let addr = daemons.addr("alpha");

    let mut client = daemons.connect("alpha").await;
    client.result("set_state", positional(vec![map(&[("label", Value::from("kept"))])])).await;
    daemons.rewrite_config(&config("new"));
    client.result("shutdown", named(&[("restart", Value::Boolean(true))])).await;
    assert_eq!(client.recv().await, None);

    // The restarted instance binds the same port again.
    let reachable = wait_for(|| async move {
        let Ok(stream) = TcpStream::connect(addr).await else {
            return false;
        };
        drop(stream);
        true
    })
    .await;
    assert!(reachable, "alpha did not come back");

    let mut client = Client::connect(addr).await;
    let id = client.result("id", Params::default()).await;
    assert_eq!(field(&id, "make"), Some(&Value::from("new")));
    let state = client.result("get_state", Params::default()).await;
    assert_eq!(field(&state, "label"), Some(&Value::from("kept")));
}

#[tokio::test]
async fn process_signal_stops_everything() {
    let daemons = Daemons::start::<BaseDaemon>(TWO).await;
    let addrs = [daemons.addr("alpha"), daemons.addr("beta")];
    let mut client = daemons.connect("alpha").await;

    let (_dir, exit) = daemons.signal(Exit::Restart).await;
    assert_eq!(exit, Exit::Restart);

    assert_eq!(client.recv().await, None);
    for addr in addrs {
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
