use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use swkit_agent::{
    Body, Capabilities, FetchSource, MemoryCacheStore, MemoryNotificationCenter,
    MemoryWindowRegistry, Network, Request, ResponseType, ServiceWorkerAgent,
};
use swkit_common::AgentConfig;
use swkit_net::{HttpNetwork, NetConfig};
use url::Url;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn network_for(server: &MockServer) -> HttpNetwork {
    HttpNetwork::new(NetConfig {
        origin: Url::parse(&server.uri()).unwrap(),
        ..Default::default()
    })
    .unwrap()
}

fn url(server: &MockServer, path: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), path)).unwrap()
}

#[tokio::test]
async fn same_origin_response_is_basic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html"))
        .mount(&server)
        .await;

    let network = network_for(&server);
    let mut response = network
        .fetch(Request::get(url(&server, "/index.html")))
        .await
        .expect("fetch ok");

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.response_type, ResponseType::Basic);
    assert!(!response.from_cache);
    assert_eq!(response.text().unwrap(), "<html>ok</html>");
}

#[tokio::test]
async fn error_status_is_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let response = network_for(&server)
        .fetch(Request::get(url(&server, "/missing")))
        .await
        .expect("404 is not a network error");
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(!response.ok());
}

#[tokio::test]
async fn cross_origin_responses_are_classified() {
    let app = MockServer::start().await;
    let cdn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lib.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("access-control-allow-origin", "*")
                .set_body_string("lib"),
        )
        .mount(&cdn)
        .await;
    Mock::given(method("GET"))
        .and(path("/pixel"))
        .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
        .mount(&cdn)
        .await;

    let network = network_for(&app);

    let mut cors = network.fetch(Request::get(url(&cdn, "/lib.js"))).await.unwrap();
    assert_eq!(cors.response_type, ResponseType::Cors);
    assert_eq!(cors.text().unwrap(), "lib");

    let mut opaque = network.fetch(Request::get(url(&cdn, "/pixel"))).await.unwrap();
    assert_eq!(opaque.response_type, ResponseType::Opaque);
    assert!(opaque.headers.is_empty());
    assert_eq!(opaque.text().unwrap(), "");
}

#[tokio::test]
async fn request_body_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_string("{\"a\":1}"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::new(Method::POST, url(&server, "/api"), Body::new("{\"a\":1}"));
    let response = network_for(&server).fetch(request).await.unwrap();
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn timeout_is_a_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let network = HttpNetwork::new(NetConfig {
        origin: Url::parse(&server.uri()).unwrap(),
        timeout: Duration::from_millis(100),
        ..Default::default()
    })
    .unwrap();

    let err = network
        .fetch(Request::get(url(&server, "/slow")))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "network");
}

#[tokio::test]
async fn agent_precaches_over_http() {
    let server = MockServer::start().await;
    for (route, body) in [("/", "root"), ("/index.html", "index")] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = AgentConfig {
        scope: Url::parse(&server.uri()).unwrap(),
        precache: vec!["/".to_string(), "/index.html".to_string()],
        ..Default::default()
    };
    let capabilities = Capabilities::new(
        Arc::new(MemoryCacheStore::new()),
        Arc::new(HttpNetwork::new(NetConfig::for_agent(&config)).unwrap()),
        Arc::new(MemoryNotificationCenter::new()),
        Arc::new(MemoryWindowRegistry::new()),
    );
    let (agent, _events) = ServiceWorkerAgent::new(config, capabilities).unwrap();
    agent.install().await.unwrap();
    agent.activate().await.unwrap();

    for _ in 0..2 {
        let mut outcome = agent
            .handle_fetch(Request::get(url(&server, "/index.html")))
            .await
            .unwrap();
        assert_eq!(outcome.source, FetchSource::Cache);
        assert_eq!(outcome.response.text().unwrap(), "index");
    }
}
