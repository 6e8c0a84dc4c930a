use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use ticketry_core::{ErrorKind, ExpirationPolicy, Ticket, TicketKind, TicketRecord};
use ticketry_registry::{
    DocumentStoreOptions, DocumentTicketStore, StorageRegion, StoredTicket, TicketStore,
};
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> DocumentTicketStore {
    let options = DocumentStoreOptions::new(Url::parse(&server.uri()).unwrap())
        .with_request_timeout(Duration::from_millis(200));
    DocumentTicketStore::new(options).unwrap()
}

fn region() -> StorageRegion {
    StorageRegion::new("service_tickets", TicketKind::Service, None)
}

fn ticket(id: &str) -> Ticket {
    Ticket::new(id, TicketKind::Service, ExpirationPolicy::never(), Utc::now())
}

fn document(id: &str, rev: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "_rev": rev,
        "kind": "service",
        "record": TicketRecord::from(ticket(id)),
    })
}

#[tokio::test]
async fn initialize_accepts_existing_databases() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/ticketry_service_tickets"))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({"error": "file_exists"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/ticketry_proxy_tickets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let regions = [
        region(),
        StorageRegion::new("proxy_tickets", TicketKind::Proxy, None),
    ];
    store(&server).initialize(&regions).await.unwrap();
}

#[tokio::test]
async fn fetch_maps_missing_document_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticketry_service_tickets/ST-missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not_found"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ticketry_service_tickets/ST-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document("ST-1", "3-abc")))
        .mount(&server)
        .await;

    let store = store(&server);
    assert!(store.fetch(&region(), "ST-missing").await.unwrap().is_none());

    let stored = store.fetch(&region(), "ST-1").await.unwrap().unwrap();
    assert_eq!(stored.key, "ST-1");
    assert_eq!(stored.revision.as_deref(), Some("3-abc"));
    assert_eq!(stored.record.id(), "ST-1");
}

#[tokio::test]
async fn replace_sends_revision_and_maps_409_to_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/ticketry_service_tickets/ST-1"))
        .and(body_partial_json(json!({"_rev": "1-old"})))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"error": "conflict"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/ticketry_service_tickets/ST-1"))
        .and(body_partial_json(json!({"_rev": "2-new"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true, "rev": "3-x"})))
        .mount(&server)
        .await;

    let store = store(&server);
    let record = TicketRecord::from(ticket("ST-1"));

    let error = store
        .replace(&region(), StoredTicket::new("ST-1", record.clone()), Some("1-old"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Conflict);

    assert!(store
        .replace(&region(), StoredTicket::new("ST-1", record), Some("2-new"))
        .await
        .unwrap());
}

#[tokio::test]
async fn remove_uses_current_revision() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticketry_service_tickets/ST-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document("ST-1", "5-rev")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/ticketry_service_tickets/ST-1"))
        .and(query_param("rev", "5-rev"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ticketry_service_tickets/ST-2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = store(&server);
    assert!(store.remove(&region(), "ST-1", None).await.unwrap());
    assert!(!store.remove(&region(), "ST-2", None).await.unwrap());
}

#[tokio::test]
async fn scan_and_count_skip_design_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticketry_service_tickets/_all_docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 3,
            "rows": [
                {"id": "_design/views", "doc": {"_id": "_design/views"}},
                {"id": "ST-1", "doc": document("ST-1", "1-a")},
                {"id": "ST-2", "doc": document("ST-2", "1-b")},
            ]
        })))
        .mount(&server)
        .await;

    let store = store(&server);
    let scanned = store.scan(&region()).await.unwrap();
    assert_eq!(scanned.len(), 2);
    assert_eq!(store.count(&region()).await.unwrap(), 2);
}

#[tokio::test]
async fn clear_deletes_in_bulk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticketry_service_tickets/_all_docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [
                {"id": "ST-1", "doc": document("ST-1", "1-a")},
                {"id": "ST-2", "doc": document("ST-2", "1-b")},
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ticketry_service_tickets/_bulk_docs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"ok": true, "id": "ST-1", "rev": "2-a"},
            {"id": "ST-2", "error": "conflict", "reason": "Document update conflict."},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(store(&server).clear(&region()).await.unwrap(), 1);
}

#[tokio::test]
async fn slow_server_is_a_timeout_and_errors_are_backend_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticketry_service_tickets/ST-slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ticketry_service_tickets/ST-broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = store(&server);
    let error = store.fetch(&region(), "ST-slow").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Timeout);

    let error = store.fetch(&region(), "ST-broken").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unavailable);
    assert!(error.to_string().contains("500"));
}
