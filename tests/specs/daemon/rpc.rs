// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC surface specs
//!
//! Verify the shared methods, error codes, and per-connection ordering
//! over a real socket.

use crate::prelude::*;

const FOO: &str = r#"
[foo]
port = 0
"#;

#[tokio::test]
async fn id_of_fresh_base_daemon() {
    let daemons = Daemons::start::<BaseDaemon>(FOO).await;
    let mut client = daemons.connect("foo").await;

    client.send(Request::call("id", 1, Params::default())).await;
    let response = client.recv().await.unwrap();

    assert_eq!(
        response,
        map(&[
            ("ver", Value::from("1.0")),
            ("id", Value::from(1)),
            (
                "result",
                map(&[
                    ("name", Value::from("foo")),
                    ("kind", Value::from("base")),
                    ("make", Value::Nil),
                    ("model", Value::Nil),
                    ("serial", Value::Nil),
                ])
            ),
        ])
    );
}

#[tokio::test]
async fn id_reports_configured_make_model_serial() {
    let daemons = Daemons::start::<BaseDaemon>(
        r#"
        [foo]
        port = 0
        make = "acme"
        model = "x1"
        serial = "0042"
        "#,
    )
    .await;
    let mut client = daemons.connect("foo").await;
    let id = client.result("id", Params::default()).await;
    assert_eq!(field(&id, "make"), Some(&Value::from("acme")));
    assert_eq!(field(&id, "model"), Some(&Value::from("x1")));
    assert_eq!(field(&id, "serial"), Some(&Value::from("0042")));
}

#[tokio::test]
async fn unknown_method_is_not_found() {
    let daemons = Daemons::start::<BaseDaemon>(FOO).await;
    let mut client = daemons.connect("foo").await;

    client.send(Request::call("nope", 2, Params::default())).await;
    let response = client.recv().await.unwrap();
    assert_eq!(field(&response, "id"), Some(&Value::from(2)));
    assert_eq!(error_code(&response), Some(-32601));
    assert!(field(&response, "result").is_none());
}

#[tokio::test]
async fn mismatched_params_are_invalid() {
    let daemons = Daemons::start::<BaseDaemon>(FOO).await;
    let mut client = daemons.connect("foo").await;

    let response = client.call("busy", positional(vec![Value::from(1)])).await;
    assert_eq!(error_code(&response), Some(-32602));

    let response = client.call("set_state", named(&[("bogus", Value::Nil)])).await;
    assert_eq!(error_code(&response), Some(-32602));
}

#[tokio::test]
async fn failing_method_keeps_connection_usable() {
    let daemons = Daemons::start::<Stage>(FOO).await;
    let mut client = daemons.connect("foo").await;

    let response = client.call("home", Params::default()).await;
    assert_eq!(error_code(&response), Some(-1));
    let message = field(field(&response, "error").unwrap(), "message").unwrap();
    assert!(message.as_str().unwrap().contains("no limit switch"));

    assert_eq!(client.result("busy", Params::default()).await, Value::Boolean(false));
}

#[tokio::test]
async fn request_without_method_is_invalid_but_answered() {
    let daemons = Daemons::start::<BaseDaemon>(FOO).await;
    let mut client = daemons.connect("foo").await;

    let bytes = encode(&map(&[("id", Value::from(5))])).unwrap();
    client.send_raw(&bytes).await;
    let response = client.recv().await.unwrap();
    assert_eq!(field(&response, "id"), Some(&Value::from(5)));
    assert_eq!(error_code(&response), Some(-32600));
}

#[tokio::test]
async fn undecodable_bytes_get_one_parse_error() {
    let daemons = Daemons::start::<BaseDaemon>(FOO).await;
    let mut client = daemons.connect("foo").await;

    client.send_raw(&[0xc1]).await;
    let response = client.recv().await.unwrap();
    assert_eq!(field(&response, "id"), Some(&Value::Nil));
    assert_eq!(error_code(&response), Some(-32700));

    // Still open.
    assert_eq!(client.result("busy", Params::default()).await, Value::Boolean(false));
}

#[tokio::test]
async fn responses_keep_request_order() {
    let daemons = Daemons::start::<BaseDaemon>(FOO).await;
    let mut client = daemons.connect("foo").await;

    let mut batch = Vec::new();
    for id in 1..=5 {
        batch.extend(encode(&Request::call("busy", id, Params::default()).to_value()).unwrap());
    }
    client.send_raw(&batch).await;

    for id in 1..=5 {
        let response = client.recv().await.unwrap();
        assert_eq!(field(&response, "id"), Some(&Value::from(id)));
    }
}

#[tokio::test]
async fn list_methods_covers_shared_surface() {
    let daemons = Daemons::start::<Stage>(FOO).await;
    let mut client = daemons.connect("foo").await;

    let methods = client.result("list_methods", Params::default()).await;
    let names: Vec<&str> = methods.as_array().unwrap().iter().filter_map(Value::as_str).collect();
    for name in [
        "busy",
        "get_config",
        "get_config_filepath",
        "get_state",
        "help",
        "id",
        "list_methods",
        "set_state",
        "shutdown",
        "set_position",
    ] {
        assert!(names.contains(&name), "missing {name} in {names:?}");
    }
    for internal in ["update_state", "save_state", "load_state", "close", "new"] {
        assert!(!names.contains(&internal), "{internal} exposed");
    }
}

#[tokio::test]
async fn help_shows_signature_and_doc() {
    let daemons = Daemons::start::<Stage>(FOO).await;
    let mut client = daemons.connect("foo").await;

    let help = client.result("help", positional(vec![Value::from("set_position")])).await;
    assert_eq!(help, Value::from("set_position(position)\nStart moving to `position`."));
}

#[tokio::test]
async fn config_and_filepath_are_reported() {
    let daemons = Daemons::start::<BaseDaemon>(
        r#"
        [shared-settings]
        units = "mm"

        [foo]
        port = 0
        "#,
    )
    .await;
    let mut client = daemons.connect("foo").await;

    let config = client.result("get_config", Params::default()).await;
    assert_eq!(field(&config, "units"), Some(&Value::from("mm")));

    let path = client.result("get_config_filepath", Params::default()).await;
    let path = std::path::PathBuf::from(path.as_str().unwrap());
    assert!(path.is_absolute());
    assert_eq!(path, daemons.path().join("config.toml"));
}

#[tokio::test]
async fn each_section_gets_its_own_port() {
    let daemons = Daemons::start::<BaseDaemon>(
        r#"
        [left]
        port = 0

        [right]
        port = 0
        "#,
    )
    .await;
    assert_ne!(daemons.addr("left"), daemons.addr("right"));

    let mut left = daemons.connect("left").await;
    let mut right = daemons.connect("right").await;
    let left_id = left.result("id", Params::default()).await;
    let right_id = right.result("id", Params::default()).await;
    assert_eq!(field(&left_id, "name"), Some(&Value::from("left")));
    assert_eq!(field(&right_id, "name"), Some(&Value::from("right")));
}
