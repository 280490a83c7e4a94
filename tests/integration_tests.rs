//! Integration tests using mock HTTP servers
//!
//! Tests the full flow through the public API: service client → cursor →
//! HTTP executor → mock provider, and producer/consumer runs over queues.

use futures::StreamExt;
use nimbus::http::HttpClientConfig;
use nimbus::queue::{ClaimRequest, MemoryQueue, NewMessage, QueueService, StreamOptions};
use nimbus::{Cursor, Error, ListOptions, Marker, ServiceClient};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct Network {
    id: String,
    status: String,
}

fn client_for(server: &MockServer) -> ServiceClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(0)
        .no_rate_limit()
        .build();
    ServiceClient::from_config(config).unwrap()
}

async fn mount_page(server: &MockServer, marker: Option<&str>, body: serde_json::Value) {
    let mock = Mock::given(method("GET")).and(path("/v2.0/networks"));
    let mock = match marker {
        Some(marker) => mock.and(query_param("marker", marker)),
        None => mock,
    };
    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .with_priority(if marker.is_some() { 1 } else { 5 })
        .expect(1)
        .mount(server)
        .await;
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_list_across_pages_with_empty_middle_page() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        None,
        json!({
            "networks": [{"id": "n1", "status": "ACTIVE"}, {"id": "n2", "status": "ACTIVE"}],
            "networks_links": [{"rel": "next", "href": "/v2.0/networks?limit=2&marker=n2"}]
        }),
    )
    .await;
    mount_page(
        &server,
        Some("n2"),
        json!({
            "networks": [],
            "networks_links": [{"rel": "next", "href": "/v2.0/networks?limit=2&marker=n3"}]
        }),
    )
    .await;
    mount_page(
        &server,
        Some("n3"),
        json!({"networks": [{"id": "n4", "status": "DOWN"}]}),
    )
    .await;

    let networks: Vec<Network> = client_for(&server)
        .list("/v2.0/networks", "networks", ListOptions::new().limit(2))
        .into_items()
        .map(|n| n.unwrap())
        .collect()
        .await;

    let ids: Vec<&str> = networks.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["n1", "n2", "n4"]);
    assert_eq!(networks[2].status, "DOWN");
}

#[tokio::test]
async fn test_failed_page_can_be_resumed() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        None,
        json!({
            "networks": [{"id": "n1", "status": "ACTIVE"}],
            "networks_links": [{"rel": "next", "href": "/v2.0/networks?marker=n1"}]
        }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/v2.0/networks"))
        .and(query_param("marker", "n1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .with_priority(1)
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2.0/networks"))
        .and(query_param("marker", "n1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "networks": [{"id": "n2", "status": "BUILD"}]
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut cursor = client.list::<Network>("/v2.0/networks", "networks", ListOptions::new());

    let first = cursor.next_page().await.unwrap().unwrap();
    assert_eq!(first.items[0].id, "n1");

    let err = cursor.next_page().await.unwrap_err();
    assert!(matches!(err, Error::ServerError { status: 500, .. }));
    assert!(cursor.next_page().await.unwrap().is_none());

    let resume_at: Marker = cursor.marker().cloned().unwrap();
    let rest = Cursor::resume(
        client.fetcher::<Network>("/v2.0/networks", nimbus::codec::JsonPageCodec::openstack("networks")),
        ListOptions::new(),
        resume_at,
    )
    .collect_all()
    .await
    .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].id, "n2");
}

#[tokio::test]
async fn test_missing_collection_and_resource() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let stacks: Vec<serde_json::Value> = client
        .list("/v1/tenant/stacks", "stacks", ListOptions::new())
        .collect_all()
        .await
        .unwrap();
    assert!(stacks.is_empty());

    let stack: Option<serde_json::Value> = client
        .get("/v1/tenant/stacks/web/abc", Some("stack"))
        .await
        .unwrap();
    assert!(stack.is_none());
}

#[tokio::test]
async fn test_unauthorized_listing_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .list::<serde_json::Value>("/v2.0/ports", "ports", ListOptions::new())
        .collect_all()
        .await;
    assert!(matches!(result, Err(Error::Unauthorized { .. })));
}

// ============================================================================
// Queues
// ============================================================================

#[tokio::test]
async fn test_competing_consumers_process_each_message_once() {
    let producer = MemoryQueue::new("work");
    let batch: Vec<NewMessage> = (0..12)
        .map(|n| NewMessage::new(Duration::from_secs(600), json!({"job": n})))
        .collect();
    let posted = producer.post(batch).await.unwrap().ids;

    let consumers: Vec<MemoryQueue> = (0..3).map(|_| producer.as_client(Uuid::new_v4())).collect();
    let handles: Vec<_> = consumers
        .into_iter()
        .map(|consumer| {
            tokio::spawn(async move {
                let mut done = Vec::new();
                loop {
                    let claimed = consumer
                        .claim(ClaimRequest::secs(300, 60, 5))
                        .await
                        .unwrap();
                    if claimed.is_empty() {
                        break;
                    }
                    for message in claimed {
                        let claim_id = message.claim_id.clone().unwrap();
                        consumer.delete_by_claim(&message.id, &claim_id).await.unwrap();
                        done.push(message.id);
                    }
                }
                done
            })
        })
        .collect();

    let mut processed = Vec::new();
    for handle in handles {
        processed.extend(handle.await.unwrap());
    }

    assert_eq!(processed.len(), posted.len());
    let unique: HashSet<_> = processed.iter().collect();
    assert_eq!(unique.len(), posted.len());
    assert!(producer.is_empty().await);
}

#[tokio::test]
async fn test_observer_streams_while_consumer_claims() {
    let producer = MemoryQueue::new("audit");
    producer
        .post(
            (0..6)
                .map(|n| NewMessage::new(Duration::from_secs(600), json!(n)))
                .collect(),
        )
        .await
        .unwrap();

    let consumer = producer.as_client(Uuid::new_v4());
    let claimed = consumer.claim(ClaimRequest::secs(300, 60, 2)).await.unwrap();
    assert_eq!(claimed.len(), 2);

    let observer = producer.as_client(Uuid::new_v4());
    let visible = observer
        .stream(StreamOptions::new().limit(2))
        .collect_all()
        .await
        .unwrap();
    assert_eq!(visible.len(), 4);

    let everything = observer
        .stream(StreamOptions::new().limit(2).include_claimed(true))
        .collect_all()
        .await
        .unwrap();
    assert_eq!(everything.len(), 6);

    let claim_id = claimed[0].claim_id.clone().unwrap();
    consumer.release(&claim_id).await.unwrap();
    let after_release = observer
        .stream(StreamOptions::new())
        .collect_all()
        .await
        .unwrap();
    assert_eq!(after_release.len(), 6);
}
