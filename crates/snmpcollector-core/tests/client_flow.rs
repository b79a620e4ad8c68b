//! Integration tests for `ApiClient` against a mocked snmpcollector service.
//!
//! These cover the session lifecycle as seen from the outside (lazy login,
//! single login per validity window, re-login after expiry) and the request
//! contract of every public operation.

use std::time::Duration;

use mockito::{Matcher, Mock, Server, ServerGuard};
use reqwest::{Method, StatusCode};
use serde_json::json;
use snmpcollector_core::api::{ApiClient, ApiError, ClientOptions};
use snmpcollector_core::auth::Credentials;
use snmpcollector_core::models::{ApiResponse, DeviceConfig};

const COOKIE: &str = "snmpcollector-sess-my_instance_cookie=abc";

fn client_for(server: &ServerGuard) -> ApiClient {
    ApiClient::new(&server.url(), "admin", "secret").unwrap()
}

async fn mock_login(server: &mut ServerGuard, set_cookie: &str, hits: usize) -> Mock {
    server
        .mock("POST", "/login")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("username".into(), "admin".into()),
            Matcher::UrlEncoded("password".into(), "secret".into()),
        ]))
        .with_status(200)
        .with_header("set-cookie", set_cookie)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok": true}"#)
        .expect(hits)
        .create_async()
        .await
}

fn device_config() -> DeviceConfig {
    match json!({
        "ID": "core-sw1",
        "Host": "10.0.0.1",
        "Port": 161,
        "SnmpVersion": "2c",
        "Community": "public",
        "Active": true,
        "MeasurementGroups": ["ifstats", "cpu"]
    }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

// ── session lifecycle ──────────────────────────────────────────────────

#[tokio::test]
async fn first_call_logs_in_once_and_reuses_session() {
    let mut server = Server::new_async().await;
    let login = mock_login(
        &mut server,
        "snmpcollector-sess-my_instance_cookie=abc; Path=/",
        1,
    )
    .await;
    let info = server
        .mock("GET", "/api/rt/device/info")
        .match_header("cookie", COOKIE)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"core-sw1": {"TagMap": {}}}"#)
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server);
    for _ in 0..3 {
        let resp = client.get_devices_info().await.unwrap();
        assert!(resp.is_json());
    }

    login.assert_async().await;
    info.assert_async().await;
    assert!(client.session_expires_at().await.is_some());
}

#[tokio::test]
async fn expired_session_logs_in_before_request() {
    let mut server = Server::new_async().await;
    let login = mock_login(&mut server, COOKIE, 2).await;
    let reload = server
        .mock("GET", "/api/rt/agent/reload")
        .match_header("cookie", COOKIE)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"DeviceActive": 1}"#)
        .expect(2)
        .create_async()
        .await;

    // A zero lifetime makes every session stale immediately
    let options = ClientOptions {
        session_ttl: Duration::ZERO,
        ..Default::default()
    };
    let client = ApiClient::with_options(
        Credentials::new(server.url(), "admin", "secret"),
        options,
    )
    .unwrap();

    client.reload_config().await.unwrap();
    client.reload_config().await.unwrap();

    login.assert_async().await;
    reload.assert_async().await;
}

#[tokio::test]
async fn invalidated_session_logs_in_again() {
    let mut server = Server::new_async().await;
    let login = mock_login(&mut server, COOKIE, 2).await;
    let _devices = server
        .mock("GET", "/api/cfg/snmpdevice")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let client = client_for(&server);
    client.get_devices_config().await.unwrap();
    client.invalidate_session().await;
    assert!(client.session_expires_at().await.is_none());
    client.get_devices_config().await.unwrap();

    login.assert_async().await;
}

#[tokio::test]
async fn concurrent_calls_share_one_login() {
    let mut server = Server::new_async().await;
    let login = mock_login(&mut server, COOKIE, 1).await;
    let _info = server
        .mock("GET", "/api/rt/device/info")
        .match_header("cookie", COOKIE)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .expect(2)
        .create_async()
        .await;

    let client = client_for(&server);
    let (a, b) = tokio::join!(client.get_devices_info(), client.get_devices_info());
    a.unwrap();
    b.unwrap();

    login.assert_async().await;
}

#[tokio::test]
async fn instance_specific_cookie_is_used() {
    let mut server = Server::new_async().await;
    let _login = mock_login(&mut server, "snmpcollector-sess-node3=xyz; Path=/", 1).await;
    let devices = server
        .mock("GET", "/api/cfg/snmpdevice")
        .match_header("cookie", "snmpcollector-sess-node3=xyz")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let client = client_for(&server);
    client.get_devices_config().await.unwrap();

    devices.assert_async().await;
}

#[tokio::test]
async fn rejected_login_is_authentication_error() {
    let mut server = Server::new_async().await;
    let _login = server
        .mock("POST", "/login")
        .with_status(401)
        .with_body("bad username or password")
        .create_async()
        .await;
    let devices = server
        .mock("GET", "/api/cfg/snmpdevice")
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.get_devices_config().await.unwrap_err();

    match &err {
        ApiError::Authentication(msg) => {
            assert!(msg.contains("401"));
            assert!(msg.contains("bad username or password"));
        }
        other => panic!("expected authentication error, got {other:?}"),
    }
    devices.assert_async().await;
    assert!(client.session_expires_at().await.is_none());
}

#[tokio::test]
async fn login_without_session_cookie_is_authentication_error() {
    let mut server = Server::new_async().await;
    let _login = mock_login(&mut server, "lang=en; Path=/", 1).await;

    let client = client_for(&server);
    let err = client.reload_config().await.unwrap_err();

    assert!(err.is_authentication(), "unexpected error: {err:?}");
}

// ── request contract ───────────────────────────────────────────────────

#[tokio::test]
async fn failed_update_carries_verb_path_and_body() {
    let mut server = Server::new_async().await;
    let login = mock_login(&mut server, COOKIE, 1).await;
    let _update = server
        .mock("PUT", "/api/cfg/snmpdevice/42")
        .with_status(500)
        .with_body("Error on update device 42: database is locked")
        .create_async()
        .await;
    let get = server
        .mock("GET", "/api/cfg/snmpdevice/42")
        .match_header("cookie", COOKIE)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ID": "42"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let expires_before = {
        client.authenticate().await.unwrap();
        client.session_expires_at().await
    };

    let err = client
        .update_device_config("42", &device_config(), false)
        .await
        .unwrap_err();

    match err {
        ApiError::Request {
            method,
            path,
            status,
            body,
        } => {
            assert_eq!(method, Method::PUT);
            assert_eq!(path, "/api/cfg/snmpdevice/42");
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "Error on update device 42: database is locked");
        }
        other => panic!("expected request error, got {other:?}"),
    }

    // The session survives a failed resource call
    assert_eq!(client.session_expires_at().await, expires_before);
    client.get_device_config("42", false).await.unwrap();
    login.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn create_then_get_round_trips_config() {
    let mut server = Server::new_async().await;
    let _login = mock_login(&mut server, COOKIE, 1).await;
    let config = device_config();
    let body = serde_json::to_string(&config).unwrap();

    let create = server
        .mock("POST", "/api/cfg/snmpdevice")
        .match_header("cookie", COOKIE)
        .match_body(Matcher::Json(serde_json::Value::Object(config.clone())))
        .with_status(200)
        .with_header("content-type", "application/json; charset=utf-8")
        .with_body(&body)
        .create_async()
        .await;
    let get = server
        .mock("GET", "/api/cfg/snmpdevice/core-sw1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(&body)
        .create_async()
        .await;

    let client = client_for(&server);
    let created = client.create_device_config(&config, false).await.unwrap();
    let id = created.as_json().unwrap()["ID"].as_str().unwrap().to_string();
    let fetched = client.get_device_config(&id, false).await.unwrap();

    assert_eq!(fetched.into_json().unwrap(), serde_json::Value::Object(config.clone()));
    assert_eq!(config, device_config(), "caller payload must not change");
    create.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn runtime_operations_use_runtime_paths() {
    let mut server = Server::new_async().await;
    let login = mock_login(&mut server, COOKIE, 1).await;
    let mut mocks = Vec::new();
    for (method, path) in [
        ("GET", "/api/cfg/snmpdevice/sw2/runtime"),
        ("PUT", "/api/cfg/snmpdevice/sw2/runtime"),
        ("POST", "/api/cfg/snmpdevice/runtime"),
        ("DELETE", "/api/cfg/snmpdevice/sw2/runtime"),
    ] {
        mocks.push(
            server
                .mock(method, path)
                .match_header("cookie", COOKIE)
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body("{}")
                .create_async()
                .await,
        );
    }

    let client = client_for(&server);
    let config = device_config();
    client.get_device_config("sw2", true).await.unwrap();
    client.update_device_config("sw2", &config, true).await.unwrap();
    client.create_device_config(&config, true).await.unwrap();
    client.delete_device_config("sw2", true).await.unwrap();

    for mock in mocks {
        mock.assert_async().await;
    }
    login.assert_async().await;
}

#[tokio::test]
async fn delete_returns_text_body() {
    let mut server = Server::new_async().await;
    let _login = mock_login(&mut server, COOKIE, 1).await;
    let _delete = server
        .mock("DELETE", "/api/cfg/snmpdevice/sw3")
        .with_status(200)
        .with_header("content-type", "text/plain; charset=utf-8")
        .with_body("deleted")
        .create_async()
        .await;

    let client = client_for(&server);
    let resp = client.delete_device_config("sw3", false).await.unwrap();

    assert_eq!(resp, ApiResponse::Text("deleted".to_string()));
}

#[tokio::test]
async fn json_content_type_with_bad_body_is_invalid_response() {
    let mut server = Server::new_async().await;
    let _login = mock_login(&mut server, COOKIE, 1).await;
    let _info = server
        .mock("GET", "/api/rt/device/info")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.get_devices_info().await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidResponse(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn send_passes_query_parameters() {
    let mut server = Server::new_async().await;
    let _login = mock_login(&mut server, COOKIE, 1).await;
    let filtered = server
        .mock("GET", "/api/cfg/snmpdevice")
        .match_query(Matcher::UrlEncoded("filter".into(), "core".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let client = client_for(&server);
    client
        .send::<()>(Method::GET, "/api/cfg/snmpdevice", &[("filter", "core")], None)
        .await
        .unwrap();

    filtered.assert_async().await;
}

#[tokio::test]
async fn non_200_success_status_is_request_error() {
    let mut server = Server::new_async().await;
    let _login = mock_login(&mut server, COOKIE, 1).await;
    let _create = server
        .mock("POST", "/api/cfg/snmpdevice")
        .with_status(201)
        .with_body("created")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .create_device_config(&device_config(), false)
        .await
        .unwrap_err();

    match err {
        ApiError::Request { method, status, .. } => {
            assert_eq!(method, Method::POST);
            assert_eq!(status, StatusCode::CREATED);
        }
        other => panic!("expected request error, got {other:?}"),
    }
}
