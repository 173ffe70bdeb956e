use std::time::Duration;

use pmh_core::{IndexSettings, Query};
use pmh_engine::{IndexFailureKind, IndexQuery, IndexService, RetryingIndex, SolrIndex};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, request_timeout_ms: u64) -> IndexSettings {
    IndexSettings {
        url: format!("{}/solr/collection1", server.uri()),
        connect_timeout_ms: 1_000,
        request_timeout_ms,
        max_attempts: 3,
    }
}

fn predicate() -> Query {
    Query::And(vec![Query::publishable_or_tombstone()])
}

#[tokio::test]
async fn query_sends_paging_and_sort_and_decodes_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .and(query_param("wt", "json"))
        .and(query_param("start", "20"))
        .and(query_param("rows", "10"))
        .and(query_param("sort", "DATEUPDATED asc,PI asc"))
        .and(query_param(
            "q",
            "(ISWORK:true OR ISANCHOR:true OR DATEDELETED:*)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "numFound": 42,
                "docs": [
                    {"PI": "PPN1", "DATEUPDATED": [1420070400000i64]},
                    {"PI": "PPN2", "DATEDELETED": 1420156799999i64}
                ]
            }
        })))
        .mount(&server)
        .await;

    let index = SolrIndex::new(&settings(&server, 2_000)).unwrap();
    let result = index
        .query(&IndexQuery::harvest(predicate(), 20, 10))
        .await
        .unwrap();
    assert_eq!(result.total, 42);
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[0].identifier(), Some("PPN1"));
    assert!(result.records[1].is_deleted());
}

#[tokio::test]
async fn distinct_value_count_sums_facet_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .and(query_param("facet.field", "LANGUAGE"))
        .and(query_param("rows", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"numFound": 5, "docs": []},
            "facet_counts": {"facet_fields": {"LANGUAGE": ["de", 4, "en", 3, "fr", 1]}}
        })))
        .mount(&server)
        .await;

    let index = SolrIndex::new(&settings(&server, 2_000)).unwrap();
    let count = index
        .distinct_value_count("LANGUAGE", &predicate())
        .await
        .unwrap();
    assert_eq!(count, 8);

    let values = index.field_values("LANGUAGE", &predicate()).await.unwrap();
    let names: Vec<_> = values.iter().map(|v| v.value.as_str()).collect();
    assert_eq!(names, ["de", "en", "fr"]);
}

#[tokio::test]
async fn http_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let index = RetryingIndex::new(SolrIndex::new(&settings(&server, 2_000)).unwrap(), 3)
        .with_backoff(Duration::from_millis(1));
    let err = index
        .query(&IndexQuery::count(predicate()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, IndexFailureKind::HttpStatus(404));
}

#[tokio::test]
async fn slow_index_times_out_after_bounded_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": {"numFound": 0, "docs": []}}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let index = RetryingIndex::new(SolrIndex::new(&settings(&server, 50)).unwrap(), 2)
        .with_backoff(Duration::from_millis(1));
    let err = index
        .query(&IndexQuery::count(predicate()))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn undecodable_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/collection1/select"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let index = SolrIndex::new(&settings(&server, 2_000)).unwrap();
    let err = index
        .query(&IndexQuery::count(predicate()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, IndexFailureKind::Decode);
}
