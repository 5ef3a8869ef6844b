//! End-to-end tests: real sockets for clients, balancer and backends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn test_round_robin_across_backends() {
    let b1 = common::start_mock_backend("b1").await;
    let b2 = common::start_mock_backend("b2").await;
    let b3 = common::start_mock_backend("b3").await;
    let proxy = common::start_proxy(common::config_for(&[b1, b2, b3])).await;
    let client = common::client();

    let mut bodies = Vec::new();
    for _ in 0..6 {
        let res = client.get(proxy.url("/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        bodies.push(res.text().await.unwrap());
    }
    assert_eq!(bodies, vec!["b1", "b2", "b3", "b1", "b2", "b3"]);

    proxy.stop().await;
}

#[tokio::test]
async fn test_dead_backend_is_skipped() {
    let a = common::start_mock_backend("a").await;
    let b = common::start_mock_backend("b").await;
    let c = common::start_mock_backend("c").await;
    let b_addr = format!("http://{b}");
    let proxy = common::start_proxy_with(common::config_for(&[a, b, c]), |server| {
        server.pool().set_alive(&b_addr, false);
    })
    .await;
    let client = common::client();

    let mut bodies = Vec::new();
    for _ in 0..4 {
        bodies.push(client.get(proxy.url("/")).send().await.unwrap().text().await.unwrap());
    }
    assert_eq!(bodies, vec!["a", "c", "a", "c"]);

    proxy.stop().await;
}

#[tokio::test]
async fn test_rate_limit_returns_exact_json() {
    let backend = common::start_mock_backend("ok").await;
    let mut config = common::config_for(&[backend]);
    config.rate_limit.capacity = 2;
    config.rate_limit.rate = 0;
    let proxy = common::start_proxy(config).await;
    let client = common::client();

    for _ in 0..2 {
        let res = client.get(proxy.url("/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    for _ in 0..3 {
        let res = client.get(proxy.url("/anything")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            res.text().await.unwrap(),
            r#"{"code":429,"message":"Rate limit exceeded"}"#
        );
    }

    proxy.stop().await;
}

#[tokio::test]
async fn test_no_alive_backend_returns_503() {
    let backend = common::start_mock_backend("ok").await;
    let addr = format!("http://{backend}");
    let proxy = common::start_proxy_with(common::config_for(&[backend]), |server| {
        server.pool().set_alive(&addr, false);
    })
    .await;
    let client = common::client();

    for _ in 0..3 {
        let res = client.get(proxy.url("/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.text().await.unwrap(), "No available backends");
    }

    proxy.stop().await;
}

#[tokio::test]
async fn test_forward_failure_is_502_and_keeps_backend_alive() {
    let dead = common::dead_address().await;
    let proxy = common::start_proxy(common::config_for(&[dead])).await;
    let client = common::client();

    let res = client.get(proxy.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "Backend unavailable");

    // Only a health probe may demote a backend.
    assert_eq!(proxy.server_pool.is_alive(&format!("http://{dead}")), Some(true));

    proxy.stop().await;
}

#[tokio::test]
async fn test_request_is_rewritten_for_backend() {
    let echo = common::start_echo_backend().await;
    let proxy = common::start_proxy(common::config_for(&[echo])).await;
    let client = common::client();

    let res = client
        .post(proxy.url("/orders/42?expand=items"))
        .header("x-request-id", "req-1")
        .body("")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "req-1");

    let head = res.text().await.unwrap().to_lowercase();
    assert!(head.starts_with("post /orders/42?expand=items http/1.1"), "{head}");
    assert!(head.contains(&format!("host: {echo}")), "{head}");
    assert!(head.contains("x-forwarded-for: 127.0.0.1"), "{head}");
    assert!(head.contains(&format!("x-forwarded-host: {}", proxy.addr)), "{head}");
    assert!(head.contains("x-forwarded-proto: http"), "{head}");
    assert!(head.contains("x-request-id: req-1"), "{head}");

    proxy.stop().await;
}

#[tokio::test]
async fn test_request_id_generated_when_missing() {
    let backend = common::start_mock_backend("ok").await;
    let proxy = common::start_proxy(common::config_for(&[backend])).await;

    let res = common::client().get(proxy.url("/")).send().await.unwrap();
    let id = res.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(id.len(), 36);

    proxy.stop().await;
}

#[tokio::test]
async fn test_health_check_eviction_and_recovery() {
    let b1 = common::start_mock_backend("b1").await;

    let b2_healthy = Arc::new(AtomicBool::new(true));
    let flag = b2_healthy.clone();
    let b2 = common::start_programmable_backend(move |_| {
        if flag.load(Ordering::SeqCst) {
            (200, "b2".into())
        } else {
            (500, "dead".into())
        }
    })
    .await;

    let mut config = common::config_for(&[b1, b2]);
    config.health_check.interval = Duration::from_millis(100);
    let proxy = common::start_proxy(config).await;
    let client = common::client();
    let b2_addr = format!("http://{b2}");

    b2_healthy.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(proxy.server_pool.is_alive(&b2_addr), Some(false));

    for _ in 0..4 {
        let body = client.get(proxy.url("/")).send().await.unwrap().text().await.unwrap();
        assert_eq!(body, "b1");
    }

    b2_healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(proxy.server_pool.is_alive(&b2_addr), Some(true));

    let mut bodies = Vec::new();
    for _ in 0..4 {
        bodies.push(client.get(proxy.url("/")).send().await.unwrap().text().await.unwrap());
    }
    bodies.sort();
    assert_eq!(bodies, vec!["b1", "b1", "b2", "b2"]);

    proxy.stop().await;
}
