// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! End-to-end requests against local wiremock servers

use simplereq::{BasicAuth, ClientConfig, MapEnvironment, ProxyMap, RequestOptions, Transport};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Client = simplereq::Client;

async fn target() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    server
}

async fn proxy() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("proxy"))
        .mount(&server)
        .await;
    server
}

fn client(env: MapEnvironment) -> Client {
    Client::with_environment(ClientConfig::default(), env)
}

#[tokio::test]
async fn test_environment_proxy_is_used() {
    let target = target().await;
    let proxy = proxy().await;
    let client = client(MapEnvironment::new().set("http_proxy", proxy.uri()));

    let response = client.get(&target.uri(), RequestOptions::new()).await.unwrap();
    assert!(!response.request_info().proxy.is_direct());
    assert_eq!(response.text().await.unwrap(), "proxy");
}

#[tokio::test]
async fn test_no_proxy_goes_direct() {
    let target = target().await;
    let proxy = proxy().await;
    let env = MapEnvironment::new()
        .set("HTTP_PROXY", proxy.uri())
        .set("no_proxy", "localhost, 127.0.0.0/8");
    let client = client(env);

    let response = client.get(&target.uri(), RequestOptions::new()).await.unwrap();
    assert!(response.request_info().proxy.is_direct());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_proxy_credentials_sent() {
    let target = target().await;
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("proxy-authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("authenticated proxy"))
        .mount(&proxy)
        .await;

    let proxy_url = proxy.uri().replace("http://", "http://user:pass@");
    let client = client(MapEnvironment::new());
    let options = RequestOptions::new().proxies(ProxyMap::new().with("http", proxy_url));
    let response = client.get(&target.uri(), options).await.unwrap();
    assert_eq!(response.text().await.unwrap(), "authenticated proxy");

    let options = RequestOptions::new()
        .proxy(proxy.uri())
        .proxy_auth(BasicAuth::new("user", "pass"));
    let response = client.get(&target.uri(), options).await.unwrap();
    assert_eq!(response.text().await.unwrap(), "authenticated proxy");
}

#[tokio::test]
async fn test_params_auth_and_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(query_param("dry_run", "1"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(body_string(r#"{"name":"widget"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":7}"#))
        .mount(&server)
        .await;

    let client = client(MapEnvironment::new());
    let options = RequestOptions::new()
        .param("dry_run", "1")
        .auth(("user", "pass"))
        .json(&serde_json::json!({"name": "widget"}))
        .unwrap();
    let response = client
        .post(&format!("{}/items", server.uri()), options)
        .await
        .unwrap();
    assert_eq!(response.status_code(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn test_cookies_overlay_and_persist() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "sid=s1; Path=/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/check"))
        .and(header("cookie", "sid=s1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("session only"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/check"))
        .respond_with(ResponseTemplate::new(200).set_body_string("with extra"))
        .mount(&server)
        .await;

    let client = client(MapEnvironment::new());
    client
        .get(&format!("{}/login", server.uri()), RequestOptions::new())
        .await
        .unwrap()
        .release();

    let check = format!("{}/check", server.uri());
    let with_extra = client
        .get(&check, RequestOptions::new().cookie("theme", "dark"))
        .await
        .unwrap();
    assert_eq!(with_extra.text().await.unwrap(), "with extra");

    let plain = client.get(&check, RequestOptions::new()).await.unwrap();
    assert_eq!(plain.text().await.unwrap(), "session only");

    let jar = client.session().await.unwrap().cookie_jar();
    assert!(jar.get("theme").is_none());
    assert!(jar.get("sid").is_some());
}

#[tokio::test]
async fn test_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&server)
        .await;

    let client = client(MapEnvironment::new());
    let old = format!("{}/old", server.uri());

    let followed = client.get(&old, RequestOptions::new()).await.unwrap();
    assert!(followed.redirected());
    assert_eq!(followed.url().path(), "/new");

    let held = client
        .get(&old, RequestOptions::new().allow_redirects(false))
        .await
        .unwrap();
    assert_eq!(held.status_code(), 302);
}

#[tokio::test]
async fn test_close_and_resurrect() {
    let target = target().await;
    let client = client(MapEnvironment::new());

    assert_ok!(client.get(&target.uri(), RequestOptions::new()).await);
    client.close().await;
    let response = assert_ok!(client.get(&target.uri(), RequestOptions::new()).await);
    assert_eq!(response.text().await.unwrap(), "ok");

    let stats = client.session_stats();
    assert_eq!(stats.transports_created, 2);
    assert_eq!(stats.closes, 1);
}

#[tokio::test]
async fn test_transport_errors_propagate() {
    let client = client(MapEnvironment::new());
    // nothing listens on the discard port
    let err = assert_err!(client.get("http://127.0.0.1:9/", RequestOptions::new()).await);
    assert!(err.is_transport());
}

#[test]
fn test_session_survives_runtime_restart() {
    let build = || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    };

    let first = build();
    let client = first.block_on(async {
        let server = target().await;
        let client = client(MapEnvironment::new());
        client.get(&server.uri(), RequestOptions::new()).await.unwrap();
        client
    });
    drop(first);

    let second = build();
    second.block_on(async {
        let server = target().await;
        let response = client.get(&server.uri(), RequestOptions::new()).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "ok");
        assert_eq!(client.session_stats().transports_recreated, 1);
    });
}
