//! Tests for pagination module

use super::*;
use crate::codec::JsonPageCodec;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestExecutor};
use async_trait::async_trait;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use test_case::test_case;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Fetchers
// ============================================================================

/// Replays a fixed sequence of outcomes and records each request marker
#[derive(Default)]
struct ScriptedFetcher {
    outcomes: Mutex<VecDeque<Result<Page<u32>>>>,
    sent: Mutex<Vec<Option<String>>>,
}

impl ScriptedFetcher {
    fn new(outcomes: Vec<Result<Page<u32>>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            sent: Mutex::default(),
        }
    }

    fn sent(&self) -> Vec<Option<String>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    type Item = u32;
    type Options = ListOptions;

    async fn fetch_page(&self, options: &ListOptions) -> Result<Page<u32>> {
        self.sent
            .lock()
            .unwrap()
            .push(options.marker.as_ref().map(|m| m.to_string()));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::invalid_argument("script exhausted")))
    }
}

/// Serves a sorted collection the way a provider does: items after the
/// marker, at most `limit` of them, with a marker only when more remain
struct CollectionFetcher {
    items: Vec<u32>,
    calls: Mutex<usize>,
}

impl CollectionFetcher {
    fn new(items: Vec<u32>) -> Self {
        Self {
            items,
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl PageFetcher for CollectionFetcher {
    type Item = u32;
    type Options = ListOptions;

    async fn fetch_page(&self, options: &ListOptions) -> Result<Page<u32>> {
        options.validate()?;
        *self.calls.lock().unwrap() += 1;

        let after: Option<u32> = options.marker.as_ref().map(|m| m.as_str().parse().unwrap());
        let remaining: Vec<u32> = self
            .items
            .iter()
            .copied()
            .filter(|id| after.map_or(true, |a| *id > a))
            .collect();
        let limit = options.limit.unwrap_or(1000) as usize;
        let items: Vec<u32> = remaining.iter().copied().take(limit).collect();
        let marker = if remaining.len() > limit {
            items.last().map(|id| Marker::new(id.to_string()))
        } else {
            None
        };
        Ok(Page::new(items, marker))
    }
}

fn page(items: Vec<u32>, marker: Option<&str>) -> Result<Page<u32>> {
    Ok(Page::new(items, marker.map(Marker::from)))
}

// ============================================================================
// Page and Options Tests
// ============================================================================

#[test]
fn test_page_basics() {
    let last: Page<u32> = Page::last(vec![1, 2]);
    assert!(last.is_last());
    assert_eq!(last.len(), 2);

    let more = Page::new(Vec::<u32>::new(), Some(Marker::new("m1")));
    assert!(more.is_empty());
    assert!(!more.is_last());

    let mapped = Page::new(vec![1, 2, 3], Some(Marker::new("3"))).map(|n| n * 10);
    assert_eq!(mapped.items, vec![10, 20, 30]);
    assert_eq!(mapped.marker, Some(Marker::new("3")));

    let kept = Page::new(vec![1, 2, 3, 4], Some(Marker::new("4"))).retain(|n| n % 2 == 0);
    assert_eq!(kept.items, vec![2, 4]);
    assert_eq!(kept.marker, Some(Marker::new("4")));
}

#[test]
fn test_list_options_query() {
    let options = ListOptions::new()
        .limit(50)
        .marker("abc")
        .sort_key(SortKey::CreatedAt)
        .sort_dir(SortDirection::Descending)
        .status("ACTIVE")
        .status("BUILD")
        .name("web");

    assert_eq!(
        options.to_query(),
        vec![
            ("limit".to_string(), "50".to_string()),
            ("marker".to_string(), "abc".to_string()),
            ("sort_key".to_string(), "created_at".to_string()),
            ("sort_dir".to_string(), "desc".to_string()),
            ("status".to_string(), "ACTIVE".to_string()),
            ("status".to_string(), "BUILD".to_string()),
            ("name".to_string(), "web".to_string()),
        ]
    );
}

#[test]
fn test_with_marker_copies_options() {
    let options = ListOptions::new().limit(2).status("ACTIVE");
    let next = options.with_marker(Marker::new("x"));

    assert!(options.marker.is_none());
    assert_eq!(next.marker, Some(Marker::new("x")));
    assert_eq!(next.limit, Some(2));
    assert_eq!(next.filters, options.filters);
}

#[test]
fn test_list_options_validate() {
    assert_ok!(ListOptions::new().validate());
    assert_ok!(ListOptions::new()
        .limit(1)
        .sort_dir(SortDirection::Ascending)
        .validate());
    assert_err!(ListOptions::new().limit(0).validate());
    assert_err!(ListOptions::new()
        .sort_dir(SortDirection::from_str("sideways").unwrap())
        .validate());
}

#[test_case("name", SortKey::Name ; "name")]
#[test_case("STATUS", SortKey::Status ; "uppercase status")]
#[test_case("created_at", SortKey::CreatedAt ; "created")]
#[test_case("updated_at", SortKey::UpdatedAt ; "updated")]
#[test_case("id", SortKey::Id ; "id")]
#[test_case("flavor", SortKey::Unknown("flavor".to_string()) ; "unknown passthrough")]
fn test_sort_key_parse(raw: &str, expected: SortKey) {
    assert_eq!(SortKey::from_str(raw).unwrap(), expected);
}

#[test_case("asc", SortDirection::Ascending ; "asc")]
#[test_case("DESC", SortDirection::Descending ; "desc uppercase")]
#[test_case("descending", SortDirection::Descending ; "long form")]
#[test_case("up", SortDirection::Unknown("up".to_string()) ; "unknown")]
fn test_sort_direction_parse(raw: &str, expected: SortDirection) {
    assert_eq!(SortDirection::from_str(raw).unwrap(), expected);
}

// ============================================================================
// Cursor Tests
// ============================================================================

#[tokio::test]
async fn test_n_pages_take_n_fetches_in_order() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        page(vec![1, 2], Some("2")),
        page(vec![3, 4], Some("4")),
        page(vec![5], None),
    ]));
    let mut cursor = Cursor::new(Arc::clone(&fetcher), ListOptions::new().limit(2));

    let items = cursor.collect_all().await.unwrap();

    assert_eq!(items, vec![1, 2, 3, 4, 5]);
    assert_eq!(cursor.pages_fetched(), 3);
    assert!(cursor.is_done());
    assert_eq!(
        fetcher.sent(),
        vec![None, Some("2".to_string()), Some("4".to_string())]
    );
}

#[tokio::test]
async fn test_limit_two_over_four_items() {
    let fetcher = Arc::new(CollectionFetcher::new(vec![10, 20, 30, 40]));
    let mut cursor = Cursor::new(Arc::clone(&fetcher), ListOptions::new().limit(2));

    let items = cursor.collect_all().await.unwrap();

    assert_eq!(items, vec![10, 20, 30, 40]);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_not_found_is_empty_collection() {
    let fetcher = ScriptedFetcher::new(vec![Err(Error::not_found("GET /v2.0/networks"))]);
    let mut cursor = Cursor::new(fetcher, ListOptions::new());

    let first = cursor.next_page().await.unwrap().unwrap();
    assert!(first.is_empty());
    assert!(cursor.next_page().await.unwrap().is_none());
    assert_eq!(cursor.pages_fetched(), 1);
}

#[tokio::test]
async fn test_empty_page_with_marker_fetches_again() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        page(vec![], Some("m1")),
        page(vec![7], None),
    ]));
    let mut cursor = Cursor::new(Arc::clone(&fetcher), ListOptions::new());

    let items = cursor.collect_all().await.unwrap();

    assert_eq!(items, vec![7]);
    assert_eq!(fetcher.sent(), vec![None, Some("m1".to_string())]);
}

#[tokio::test]
async fn test_repeated_marker_on_empty_page_stops() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        page(vec![1], Some("m1")),
        page(vec![], Some("m1")),
        page(vec![99], None),
    ]));
    let mut cursor = Cursor::new(Arc::clone(&fetcher), ListOptions::new());

    let items = cursor.collect_all().await.unwrap();

    assert_eq!(items, vec![1]);
    assert_eq!(cursor.pages_fetched(), 2);
}

#[tokio::test]
async fn test_repeated_marker_on_full_page_stops() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        page(vec![1], Some("m")),
        page(vec![1], Some("m")),
        page(vec![1], Some("m")),
        page(vec![1], Some("m")),
    ]));
    let mut cursor = Cursor::new(Arc::clone(&fetcher), ListOptions::new());

    let items = cursor.collect_all().await.unwrap();

    assert_eq!(items, vec![1, 1]);
    assert_eq!(fetcher.sent(), vec![None, Some("m".to_string())]);
    assert!(cursor.is_done());
    assert_eq!(cursor.marker(), None);
}

#[tokio::test]
async fn test_not_found_after_first_page_is_an_error() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        page(vec![1, 2], Some("2")),
        Err(Error::not_found("GET /v2.0/networks")),
    ]));
    let mut cursor = Cursor::new(Arc::clone(&fetcher), ListOptions::new().limit(2));

    let err = cursor.collect_all().await.unwrap_err();

    assert!(err.is_not_found());
    assert!(cursor.is_done());
    assert_eq!(cursor.marker(), Some(&Marker::new("2")));
}

#[tokio::test]
async fn test_marker_is_cleared_when_exhausted() {
    let fetcher = ScriptedFetcher::new(vec![page(vec![1], Some("1")), page(vec![2], None)]);
    let mut cursor = Cursor::new(fetcher, ListOptions::new());

    cursor.next_page().await.unwrap();
    assert_eq!(cursor.marker(), Some(&Marker::new("1")));

    assert_eq!(cursor.collect_all().await.unwrap(), vec![2]);
    assert_eq!(cursor.marker(), None);
}

#[tokio::test]
async fn test_error_mid_iteration_keeps_resume_marker() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        page(vec![1, 2], Some("2")),
        Err(Error::ServerError {
            status: 503,
            body: "unavailable".to_string(),
        }),
    ]));
    let mut cursor = Cursor::new(Arc::clone(&fetcher), ListOptions::new().limit(2));

    let first = cursor.next_page().await.unwrap().unwrap();
    assert_eq!(first.items, vec![1, 2]);

    let err = cursor.next_page().await.unwrap_err();
    assert!(matches!(err, Error::ServerError { status: 503, .. }));

    assert!(cursor.next_page().await.unwrap().is_none());
    assert_eq!(cursor.marker(), Some(&Marker::new("2")));
}

#[tokio::test]
async fn test_resume_from_marker() {
    let fetcher = Arc::new(CollectionFetcher::new(vec![1, 2, 3, 4, 5]));
    let mut cursor = Cursor::resume(
        Arc::clone(&fetcher),
        ListOptions::new().limit(2),
        Marker::new("3"),
    );

    assert_eq!(cursor.collect_all().await.unwrap(), vec![4, 5]);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_invalid_options_surface_from_fetch() {
    let fetcher = CollectionFetcher::new(vec![1]);
    let mut cursor = Cursor::new(fetcher, ListOptions::new().limit(0));

    let err = cursor.next_page().await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert!(cursor.is_done());
}

#[tokio::test]
async fn test_item_stream_yields_error_in_position() {
    let fetcher = ScriptedFetcher::new(vec![
        page(vec![1, 2], Some("2")),
        page(vec![3], Some("3")),
        Err(Error::Unauthorized {
            message: "token expired".to_string(),
        }),
    ]);
    let results: Vec<Result<u32>> = Cursor::new(fetcher, ListOptions::new())
        .into_items()
        .collect()
        .await;

    assert_eq!(results.len(), 4);
    let delivered: Vec<u32> = results[..3]
        .iter()
        .map(|r| *r.as_ref().unwrap())
        .collect();
    assert_eq!(delivered, vec![1, 2, 3]);
    assert!(matches!(results[3], Err(Error::Unauthorized { .. })));
}

#[tokio::test]
async fn test_page_stream_is_lazy() {
    let fetcher = Arc::new(CollectionFetcher::new((1..=10).collect()));
    let pages = Cursor::new(Arc::clone(&fetcher), ListOptions::new().limit(3)).into_pages();
    futures::pin_mut!(pages);

    let first = pages.next().await.unwrap().unwrap();
    assert_eq!(first.items, vec![1, 2, 3]);
    assert_eq!(fetcher.calls(), 1);

    let rest: Vec<Page<u32>> = pages.map(|p| p.unwrap()).collect().await;
    assert_eq!(rest.len(), 3);
    assert_eq!(fetcher.calls(), 4);
}

// ============================================================================
// HTTP Fetcher Tests
// ============================================================================

#[derive(Debug, Deserialize, PartialEq)]
struct Stack {
    id: String,
    stack_status: String,
}

fn executor_for(server: &MockServer) -> Arc<dyn RequestExecutor> {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(0)
        .no_rate_limit()
        .build();
    Arc::new(HttpClient::with_config(config).unwrap())
}

#[tokio::test]
async fn test_http_fetcher_follows_next_links() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/stacks"))
        .and(query_param("marker", "s2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stacks": [{"id": "s3", "stack_status": "CREATE_COMPLETE"}],
            "stacks_links": []
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/stacks"))
        .and(query_param("limit", "2"))
        .and(header("X-Project-Id", "tenant-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stacks": [
                {"id": "s1", "stack_status": "CREATE_COMPLETE"},
                {"id": "s2", "stack_status": "UPDATE_FAILED"}
            ],
            "stacks_links": [{"rel": "next", "href": "/v1/stacks?limit=2&marker=s2"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher: HttpPageFetcher<Stack, ListOptions> =
        HttpPageFetcher::new(executor_for(&server), "/v1/stacks")
            .with_codec(JsonPageCodec::openstack("stacks"))
            .with_header("X-Project-Id", "tenant-1");

    let stacks = Cursor::new(fetcher, ListOptions::new().limit(2))
        .collect_all()
        .await
        .unwrap();

    let ids: Vec<&str> = stacks.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2", "s3"]);
    assert_eq!(stacks[1].stack_status, "UPDATE_FAILED");
}

#[tokio::test]
async fn test_http_fetcher_missing_collection() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2.0/routers"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher: HttpPageFetcher<serde_json::Value, ListOptions> =
        HttpPageFetcher::new(executor_for(&server), "/v2.0/routers")
            .with_codec(JsonPageCodec::openstack("routers"));

    // The fetcher reports the 404; the cursor turns it into an empty listing
    let err = fetcher.fetch_page(&ListOptions::new()).await.unwrap_err();
    assert!(err.is_not_found());

    let items = Cursor::new(fetcher, ListOptions::new())
        .collect_all()
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_http_fetcher_bad_item_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/stacks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stacks": [{"id": 42}]
        })))
        .mount(&server)
        .await;

    let fetcher: HttpPageFetcher<Stack, ListOptions> =
        HttpPageFetcher::new(executor_for(&server), "/v1/stacks")
            .with_codec(JsonPageCodec::openstack("stacks"));

    let err = fetcher.fetch_page(&ListOptions::new()).await.unwrap_err();
    assert!(matches!(err, Error::Malformed { .. }));
}
