#![allow(clippy::unwrap_used)]
// Integration tests for `Connection` and `Security` against a mock camera.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reolink_api::command::requests;
use reolink_api::crypto::{Cipher, derive_key};
use reolink_api::{
    AuthState, CommandResponse, Connection, Error, ErrorCode, Security, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

const API: &str = "/cgi-bin/api.cgi";

async fn setup(encrypted_login: bool) -> (MockServer, Arc<Connection>, Arc<Security>) {
    let server = MockServer::start().await;
    let state = Arc::new(AuthState::new());
    let connection = Arc::new(Connection::new(
        TransportConfig::default(),
        Arc::clone(&state) as Arc<dyn reolink_api::TokenProvider>,
    ));
    let security = Security::new(Arc::clone(&connection), state, encrypted_login);

    let addr = server.address();
    connection
        .connect(&addr.ip().to_string(), Some(addr.port()), None, None)
        .await
        .unwrap();
    (server, connection, security)
}

fn password(value: &str) -> secrecy::SecretString {
    value.to_string().into()
}

fn login_ok(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!([{
        "cmd": "Login",
        "code": 0,
        "value": {"Token": {"name": token, "leaseTime": 3600}}
    }]))
}

async fn mount_plain_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .respond_with(login_ok(token))
        .mount(server)
        .await;
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, _conn, security) = setup(false).await;
    mount_plain_login(&server, "abc").await;

    assert!(security.login("admin", &password("")).await.unwrap());
    assert!(security.authenticated());
    assert!(!security.is_encrypted());
    assert!(security.authentication_timeout().as_secs() > 3500);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body[0]["cmd"], "Login");
    assert_eq!(body[0]["param"]["User"]["userName"], "admin");
}

#[tokio::test]
async fn test_login_wrong_password_returns_false() {
    let (server, _conn, security) = setup(false).await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "cmd": "Login",
            "code": 1,
            "error": {"rspCode": -7, "detail": "login failed"}
        }])))
        .mount(&server)
        .await;

    assert!(!security.login("admin", &password("nope")).await.unwrap());
    assert!(!security.authenticated());
}

#[tokio::test]
async fn test_login_other_error_is_raised() {
    let (server, _conn, security) = setup(false).await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cmd": "Login",
            "code": 1,
            "error": {"rspCode": -5, "detail": "max session"}
        })))
        .mount(&server)
        .await;

    let result = security.login("admin", &password("")).await;
    assert!(
        matches!(
            result,
            Err(Error::Api {
                code: ErrorCode::MaxSessions,
                ..
            })
        ),
        "expected MaxSessions, got: {result:?}"
    );
}

#[tokio::test]
async fn test_token_is_sent_after_login() {
    let (server, conn, security) = setup(false).await;
    mount_plain_login(&server, "tok123").await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetDevInfo"))
        .and(query_param("token", "tok123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "cmd": "GetDevInfo",
            "code": 0,
            "value": {"DevInfo": {"model": "RLC-410", "channelNum": 1}}
        }])))
        .expect(1)
        .mount(&server)
        .await;

    security.login("admin", &password("")).await.unwrap();
    let responses = conn.execute(&[requests::get_dev_info()]).await.unwrap();
    assert_eq!(responses.len(), 1);
    assert!(matches!(responses[0], CommandResponse::Value { .. }));
}

#[tokio::test]
async fn test_auth_required_mid_session_clears_token() {
    let (server, conn, security) = setup(false).await;
    mount_plain_login(&server, "abc").await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetTime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "cmd": "GetTime",
            "code": 1,
            "error": {"rspCode": -6, "detail": "please login first"}
        }])))
        .mount(&server)
        .await;

    security.login("admin", &password("")).await.unwrap();
    assert!(security.authenticated());

    let responses = conn.execute(&[requests::get_time()]).await.unwrap();
    assert!(responses[0].is_auth_required());
    assert!(!security.authenticated());

    // No extra round trip: login plus the one command.
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_disconnect_logs_out() {
    let (server, conn, security) = setup(false).await;
    mount_plain_login(&server, "abc").await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "cmd": "Logout", "code": 0, "value": {"rspCode": 200}
        }])))
        .expect(1)
        .mount(&server)
        .await;

    security.login("admin", &password("")).await.unwrap();
    conn.disconnect().await;
    assert!(!security.authenticated());
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn test_logout_failure_still_clears_state() {
    let (server, _conn, security) = setup(false).await;
    mount_plain_login(&server, "abc").await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Logout"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    security.login("admin", &password("")).await.unwrap();
    security.logout().await;
    assert!(!security.authenticated());
}

// ── Encrypted login ─────────────────────────────────────────────────

const CHALLENGE: &str = r#"Digest realm="IPC", nonce="0b1c2d3e4f", qop="auth", nc=00000001"#;

#[tokio::test]
async fn test_encrypted_login_wraps_later_payloads() {
    let (server, conn, security) = setup(true).await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .and(body_string_contains("\"Digest\""))
        .respond_with(login_ok("enc-token"))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", CHALLENGE))
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetDevInfo"))
        .and(query_param("encrypt", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "cmd": "GetDevInfo", "code": 0, "value": {"DevInfo": {}}
        }])))
        .expect(1)
        .mount(&server)
        .await;

    assert!(security.login("admin", &password("secret")).await.unwrap());
    assert!(security.is_encrypted());

    let responses = conn.execute(&[requests::get_dev_info()]).await.unwrap();
    assert_eq!(responses[0].command(), Some("GetDevInfo"));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);

    // The digest login carries the proof, never the password.
    let login: Value = serde_json::from_slice(&received[1].body).unwrap();
    let digest = &login[0]["param"]["Digest"];
    assert_eq!(digest["Realm"], "IPC");
    assert_eq!(digest["Nonce"], "0b1c2d3e4f");
    assert!(!String::from_utf8_lossy(&received[1].body).contains("secret"));

    // The follow-up body is ciphertext under the derived key.
    let cnonce = digest["Cnonce"].as_str().unwrap();
    let cipher = Cipher::new(derive_key("0b1c2d3e4f", "secret", cnonce));
    let body = String::from_utf8(received[2].body.clone()).unwrap();
    assert!(!body.starts_with('['));
    let plain: Value = serde_json::from_str(&cipher.decrypt(&body).unwrap()).unwrap();
    assert_eq!(plain[0]["cmd"], "GetDevInfo");
}

#[tokio::test]
async fn test_encrypted_login_falls_back_without_challenge() {
    let (server, _conn, security) = setup(true).await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .and(body_string_contains("password"))
        .respond_with(login_ok("plain-token"))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(2)
        .mount(&server)
        .await;

    assert!(security.login("admin", &password("pw")).await.unwrap());
    assert!(!security.is_encrypted());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_encrypted_login_falls_back_on_malformed_challenge() {
    let (server, _conn, security) = setup(true).await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .and(body_string_contains("password"))
        .respond_with(login_ok("plain-token"))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", "Basic realm=\"x\""))
        .with_priority(2)
        .mount(&server)
        .await;

    assert!(security.login("admin", &password("pw")).await.unwrap());
    assert!(!security.is_encrypted());
}

// ── Batches and payloads ────────────────────────────────────────────

#[tokio::test]
async fn test_batch_preserves_order() {
    let (server, conn, _security) = setup(false).await;

    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetLocalLink"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"cmd": "GetLocalLink", "code": 0, "value": {"LocalLink": {}}},
            {"cmd": "GetNetPort", "code": 1, "error": {"rspCode": -9, "detail": "not support"}}
        ])))
        .mount(&server)
        .await;

    let responses = conn
        .execute(&[requests::get_local_link(), requests::get_net_port()])
        .await
        .unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].command(), Some("GetLocalLink"));
    assert!(responses[1].is_error());
}

#[tokio::test]
async fn test_json_served_as_html_is_accepted() {
    let (server, conn, _security) = setup(false).await;

    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"[{"cmd":"GetTime","code":0,"value":{"Time":{}}}]"#,
            "text/html",
        ))
        .mount(&server)
        .await;

    let responses = conn.execute(&[requests::get_time()]).await.unwrap();
    assert_eq!(responses.len(), 1);
}

#[tokio::test]
async fn test_html_page_is_invalid_response() {
    let (server, conn, _security) = setup(false).await;

    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>nope</html>", "text/html"))
        .mount(&server)
        .await;

    let result = conn.execute(&[requests::get_time()]).await;
    assert!(
        matches!(result, Err(Error::InvalidResponse { .. })),
        "expected InvalidResponse, got: {result:?}"
    );
}

#[tokio::test]
async fn test_server_error_is_invalid_response() {
    let (server, conn, _security) = setup(false).await;

    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = conn.execute(&[requests::get_time()]).await;
    assert!(matches!(result, Err(Error::InvalidResponse { .. })));
}

#[tokio::test]
async fn test_client_error_is_invalid_credentials() {
    let (server, conn, _security) = setup(false).await;

    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = conn.execute(&[requests::get_time()]).await;
    assert!(matches!(
        result,
        Err(Error::InvalidCredentials { status: 403, .. })
    ));
}

#[tokio::test]
async fn test_snapshot_returns_bytes() {
    let (server, conn, _security) = setup(false).await;
    let jpeg = vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];

    Mock::given(method("GET"))
        .and(path(API))
        .and(query_param("cmd", "Snap"))
        .and(query_param("channel", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(jpeg.clone(), "image/jpeg"))
        .mount(&server)
        .await;

    let bytes = conn
        .execute_binary(requests::snap(0, "abc"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bytes.as_ref(), jpeg.as_slice());
}

#[tokio::test]
async fn test_snapshot_json_error_is_raised() {
    let (server, conn, _security) = setup(false).await;

    Mock::given(method("GET"))
        .and(path(API))
        .and(query_param("cmd", "Snap"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "cmd": "Snap", "code": 1, "error": {"rspCode": -13, "detail": "invalid channel"}
        }])))
        .mount(&server)
        .await;

    let result = conn.execute_binary(requests::snap(3, "abc")).await;
    assert!(
        matches!(result, Err(Error::Api { .. })),
        "expected Api error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_snapshot_is_kept_out_of_json_batches() {
    let (server, conn, _security) = setup(false).await;

    let result = conn
        .execute(&[requests::get_time(), requests::snap(0, "abc")])
        .await;
    assert!(
        matches!(result, Err(Error::Protocol(_))),
        "expected Protocol error, got: {result:?}"
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}
