//! Retry, status mapping and recovery matrix behaviour end to end.

mod common;

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wsoptv::app::AppContext;
use wsoptv::error::{map_status_to_error_code, Domain, ErrorCode};
use wsoptv::recovery::{lookup, recovery_matrix, FallbackStrategy};
use wsoptv::search::SearchQuery;
use wsoptv::storage::MemoryStorage;

use common::{config_for, search_result_json};

fn retrying_app(server: &MockServer) -> AppContext {
    let mut config = config_for(server);
    config.retry.enabled = true;
    config.retry.max_backoff_ms = 10;
    AppContext::with_storage(config, std::sync::Arc::new(MemoryStorage::new()))
}

#[tokio::test]
async fn transient_search_timeouts_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(504))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_result_json(&["Final table"])))
        .expect(1)
        .mount(&server)
        .await;

    let app = retrying_app(&server);
    app.search().search(SearchQuery::new("final")).await.unwrap();
    assert_eq!(app.search().state().results[0].title, "Final table");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let app = retrying_app(&server);
    let error = app.search().search(SearchQuery::new("??")).await.unwrap_err();
    assert_eq!(error.code, ErrorCode::SearchQueryInvalid);
}

#[test]
fn every_mapped_status_has_a_matrix_entry() {
    let domains = [Domain::Auth, Domain::Content, Domain::Stream, Domain::Search];
    for domain in domains {
        for status in [400, 401, 403, 404, 408, 409, 429, 500, 503, 504] {
            let code = map_status_to_error_code(domain, status, None);
            assert!(domain.accepts(code), "{domain} mapped {status} to foreign {code}");
            assert_eq!(lookup(code).code, code);
        }
    }
}

#[test]
fn unknown_statuses_fall_back_to_domain_generic_code() {
    assert_eq!(map_status_to_error_code(Domain::Content, 418, None), ErrorCode::ContentLoadError);
    assert_eq!(map_status_to_error_code(Domain::Search, 502, None), ErrorCode::SearchIndexError);
    assert_eq!(map_status_to_error_code(Domain::Stream, 500, None), ErrorCode::PlayerNetworkError);
}

#[test]
fn only_search_index_failures_fall_back_to_cache() {
    let cached: Vec<ErrorCode> = recovery_matrix()
        .filter(|entry| entry.strategy == FallbackStrategy::FallbackCache)
        .map(|entry| entry.code)
        .collect();
    assert_eq!(cached, vec![ErrorCode::SearchIndexError]);
}
