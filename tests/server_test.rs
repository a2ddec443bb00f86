use std::{collections::HashMap, time::Duration};

use axum::{
    Router,
    body::{self, Body},
    http::{Request, Response, StatusCode, header},
};
use coinbase_relay::{api::AppState, config::Config, server::router};
use httpmock::prelude::*;
use serde_json::Value;
use tower::util::ServiceExt;
use url::Url;

// Unusual spacing and key order, so that any re-serialization would show
const ACCOUNTS_BODY: &str = r#"{"pagination": {"limit":25,"order":"desc"},  "data":[{"name":"BTC Wallet","id":"b1","balance":{"currency":"BTC","amount":"0.10000000"}}]}"#;

const TOKEN_BODY: &str =
    r#"{"access_token":"access-123","token_type":"bearer","expires_in":7200,"scope":"wallet:accounts:read"}"#;

fn test_config(server: &MockServer) -> Config {
    Config {
        client_id: Some("client-id".to_string()),
        client_secret: Some("client-secret".to_string()),
        api_key: Some("api-key".to_string()),
        api_secret: Some("api-secret".to_string()),
        token_url: server.url("/oauth/token"),
        api_url: server.base_url(),
        ..Config::default()
    }
}

fn app(config: Config) -> Router {
    router(AppState::new(config).expect("App state should build."))
}

async fn get(app: &Router, uri: &str) -> Response<Body> {
    let req = Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(resp: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

fn location_pairs(resp: &Response<Body>) -> HashMap<String, String> {
    let location = resp
        .headers()
        .get(header::LOCATION)
        .expect("Redirect should carry a Location header.")
        .to_str()
        .unwrap();
    Url::parse(location)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

async fn login_state(app: &Router) -> String {
    let resp = get(app, "/login").await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    location_pairs(&resp)
        .remove("state")
        .expect("Authorization URL should carry a state.")
}

#[tokio::test]
async fn test_login_redirects_to_authorization_url() {
    let server = MockServer::start_async().await;
    let app = app(test_config(&server));

    let resp = get(&app, "/login").await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);

    let location = Url::parse(
        resp.headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(location.host_str(), Some("www.coinbase.com"));
    assert_eq!(location.path(), "/oauth/authorize");

    let pairs = location_pairs(&resp);
    assert_eq!(pairs.get("client_id"), Some(&"client-id".to_string()));
    assert_eq!(pairs.get("account"), Some(&"all".to_string()));
    assert_eq!(pairs.get("response_type"), Some(&"code".to_string()));
    assert_eq!(pairs.get("scope"), Some(&"wallet:accounts:read".to_string()));
    assert_eq!(pairs.get("state").map(String::len), Some(32));
}

#[tokio::test]
async fn test_login_with_fixed_state() {
    let server = MockServer::start_async().await;
    let app = app(Config {
        fixed_state: Some("hogefoo".to_string()),
        ..test_config(&server)
    });

    let resp = get(&app, "/login").await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);

    let location = resp
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.contains("client_id=client-id"));
    assert!(location.contains("state=hogefoo"));
    assert!(location.contains("account=all"));
}

#[tokio::test]
async fn test_login_without_client_id() {
    let app = app(Config::default());

    let resp = get(&app, "/login").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(resp).await;
    assert_eq!(json["error"]["type"], "configuration_error");
    assert_eq!(json["error"]["status"], 500);
}

#[tokio::test]
async fn test_callback_rejects_unknown_state_without_exchange() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(TOKEN_BODY);
        })
        .await;
    let app = app(test_config(&server));

    // Issue a real state so the store is not empty
    let _ = login_state(&app).await;

    for uri in [
        "/callback?state=hogefoo&code=auth-code",
        "/callback?code=auth-code",
        "/callback?state=&code=auth-code",
    ] {
        let resp = get(&app, uri).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);

        let json = body_json(resp).await;
        assert_eq!(json["error"]["type"], "invalid_state");
    }

    token_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_callback_relays_accounts() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .body_includes("code=auth-code");
            then.status(200)
                .header("content-type", "application/json")
                .body(TOKEN_BODY);
        })
        .await;
    let accounts_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/accounts")
                .header("authorization", "Bearer access-123");
            then.status(200)
                .header("content-type", "application/json")
                .body(ACCOUNTS_BODY);
        })
        .await;
    let app = app(test_config(&server));

    let state = login_state(&app).await;
    let resp = get(&app, &format!("/callback?state={}&code=auth-code", state)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_bytes(resp).await, ACCOUNTS_BODY.as_bytes());

    token_mock.assert_async().await;
    accounts_mock.assert_async().await;

    // The state was consumed by the first callback
    let resp = get(&app, &format!("/callback?state={}&code=auth-code", state)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    token_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_login_flood_evicts_oldest_state() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(400).body(r#"{"error":"invalid_grant"}"#);
        })
        .await;
    let app = app(Config {
        max_pending_states: 2,
        ..test_config(&server)
    });

    let oldest = login_state(&app).await;
    let _ = login_state(&app).await;
    let newest = login_state(&app).await;

    let resp = get(&app, &format!("/callback?state={}&code=auth-code", oldest)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    token_mock.assert_calls_async(0).await;

    // The newest login is still accepted and reaches the token endpoint
    let resp = get(&app, &format!("/callback?state={}&code=auth-code", newest)).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    token_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_callback_with_fixed_state() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(TOKEN_BODY);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/accounts");
            then.status(200)
                .header("content-type", "application/json")
                .body(ACCOUNTS_BODY);
        })
        .await;
    let app = app(Config {
        fixed_state: Some("hogefoo".to_string()),
        ..test_config(&server)
    });

    let resp = get(&app, "/callback?state=hogefoo&code=auth-code").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, ACCOUNTS_BODY.as_bytes());

    let resp = get(&app, "/callback?state=hogefoa&code=auth-code").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_callback_provider_denied() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200).body(TOKEN_BODY);
        })
        .await;
    let app = app(test_config(&server));

    let state = login_state(&app).await;
    let resp = get(
        &app,
        &format!(
            "/callback?state={}&error=access_denied&error_description=User%20denied",
            state
        ),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["type"], "access_denied");
    assert!(json["error"]["message"].as_str().unwrap().contains("User denied"));

    token_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_callback_missing_code() {
    let server = MockServer::start_async().await;
    let app = app(test_config(&server));

    let state = login_state(&app).await;
    let resp = get(&app, &format!("/callback?state={}", state)).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["type"], "missing_code");
}

#[tokio::test]
async fn test_callback_token_exchange_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"error":"invalid_grant"}"#);
        })
        .await;
    let accounts_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/accounts");
            then.status(200).body(ACCOUNTS_BODY);
        })
        .await;
    let app = app(test_config(&server));

    let state = login_state(&app).await;
    let resp = get(&app, &format!("/callback?state={}&code=stale", state)).await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(resp).await["error"]["type"], "token_exchange_failed");
    accounts_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_callback_upstream_failure_keeps_serving() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(TOKEN_BODY);
        })
        .await;
    let mut failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/accounts");
            then.status(500).body(r#"{"errors":[{"id":"internal_server_error"}]}"#);
        })
        .await;
    let app = app(test_config(&server));

    let state = login_state(&app).await;
    let resp = get(&app, &format!("/callback?state={}&code=auth-code", state)).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(resp).await["error"]["type"], "upstream_error");

    failing.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/accounts");
            then.status(200)
                .header("content-type", "application/json")
                .body(ACCOUNTS_BODY);
        })
        .await;

    let state = login_state(&app).await;
    let resp = get(&app, &format!("/callback?state={}&code=auth-code", state)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, ACCOUNTS_BODY.as_bytes());
}

#[tokio::test]
async fn test_api_key_relays_accounts() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/accounts")
                .header("cb-access-key", "api-key")
                .header_exists("cb-access-sign")
                .header_exists("cb-access-timestamp");
            then.status(200)
                .header("content-type", "application/json")
                .body(ACCOUNTS_BODY);
        })
        .await;
    let app = app(test_config(&server));

    let resp = get(&app, "/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, ACCOUNTS_BODY.as_bytes());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_key_upstream_failure_keeps_serving() {
    let server = MockServer::start_async().await;
    let mut failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/accounts");
            then.status(401)
                .header("content-type", "application/json")
                .body(r#"{"errors":[{"id":"authentication_error"}]}"#);
        })
        .await;
    let app = app(test_config(&server));

    let resp = get(&app, "/").await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["type"], "upstream_error");
    assert_eq!(json["error"]["status"], 502);

    // The process is still up and other routes answer
    let resp = get(&app, "/health").await;
    assert_eq!(resp.status(), StatusCode::OK);

    failing.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/accounts");
            then.status(200)
                .header("content-type", "application/json")
                .body(ACCOUNTS_BODY);
        })
        .await;

    let resp = get(&app, "/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, ACCOUNTS_BODY.as_bytes());
}

#[tokio::test]
async fn test_api_key_upstream_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/accounts");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .body(ACCOUNTS_BODY);
        })
        .await;
    let app = app(Config {
        request_timeout: Duration::from_millis(200),
        ..test_config(&server)
    });

    let resp = get(&app, "/").await;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body_json(resp).await["error"]["status"], 504);
}

#[tokio::test]
async fn test_api_key_not_configured() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/accounts");
            then.status(200).body(ACCOUNTS_BODY);
        })
        .await;
    let app = app(Config {
        api_secret: None,
        ..test_config(&server)
    });

    let resp = get(&app, "/").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["type"], "configuration_error");
    assert!(json["error"]["message"].as_str().unwrap().contains("COINBASE_SECRET"));

    mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_health() {
    let app = app(Config::default());

    let resp = get(&app, "/health").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert!(json.get("service").is_none());
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
