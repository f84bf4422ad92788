//! Integration tests for the knowledge client using wiremock.

use futures::StreamExt;
use graphlens_client::{KnowledgeClient, NodeDraft, TermKind};
use graphlens_stream::StreamRecord;
use graphlens_types::{
    ElementId, GraphQuery, LibFilter, LibId, QueryBackend, ReturnMethod, SearchRequest,
    SearchScope, SearchType, SubjectId, SummaryType, TransportError,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn search_request() -> SearchRequest {
    SearchRequest {
        text: "what is ownership".into(),
        messages: vec!["what is ownership".into()],
        lib_id: LibId::new(7),
        subject_id: Some(SubjectId::new(2)),
        search_scopes: SearchScope::ALL.to_vec(),
        search_type: SearchType::Vector,
        message_count: 3,
        is_summary: true,
        summary_type: SummaryType::Stuff,
        only_title: false,
        return_method: ReturnMethod::Sync,
        llm_name: Some("wizardlm2".into()),
        limit: 5,
        offset: 0,
        prompt_element_id: None,
        related_node_element_id: None,
    }
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "code": 0,
        "msg": "success",
        "data": data,
    }))
}

fn ndjson(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/x-ndjson")
}

// ─── Streaming search ────────────────────────────────────────────────────────

#[tokio::test]
async fn streaming_search_sends_protocol_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .and(header("authorization", "Bearer t0k"))
        .and(header("accept", "application/x-ndjson"))
        .and(header("content-type", "application/json"))
        .and(header("x-streaming-response", "true"))
        .and(header("accept-language", "zh-CN"))
        .and(body_partial_json(serde_json::json!({
            "text": "what is ownership",
            "libId": 7,
            "subjectId": 2,
            "returnMethod": "stream",
            "searchScopes": ["question", "page", "document", "webpage", "node"],
        })))
        .respond_with(ndjson("{\"text\":\"a\"}\n{\"end\":true}\n"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new()
        .base_url(mock_server.uri())
        .token("t0k")
        .locale("zh-CN");

    let result = client.open_search(search_request()).await;
    assert!(result.is_ok(), "expected Ok, got: {:?}", result.err());
}

#[tokio::test]
async fn streaming_search_body_decodes_into_records() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .respond_with(ndjson(concat!(
            "{\"text\":\"Ownership\",\"mainNode\":{\"elementId\":\"n1\",\"title\":\"Ownership\"}}\n",
            "not-json\n",
            "{\"error\":\"llm timeout\"}\n",
            "{\"text\":\" is a set of rules\"}\n",
            "{\"end\":true}\n",
        )))
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let records: Vec<_> = client
        .search_records(search_request())
        .await
        .expect("stream should open")
        .collect()
        .await;

    assert_eq!(records.len(), 4);
    assert!(matches!(&records[0], Ok(StreamRecord::Payload(v)) if v["text"] == "Ownership"));
    assert!(matches!(&records[1], Ok(StreamRecord::Error(msg)) if msg == "llm timeout"));
    assert!(matches!(&records[2], Ok(StreamRecord::Payload(_))));
    assert!(matches!(&records[3], Ok(StreamRecord::End)));
}

#[tokio::test]
async fn streaming_search_server_error_fails_before_streaming() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let err = client
        .search_stream(search_request())
        .await
        .err()
        .expect("should fail");

    assert!(matches!(&err, TransportError::Status { status: 500, body } if body == "internal error"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn streaming_search_rejected_token_is_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"detail": "Not authenticated"})),
        )
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let err = client
        .open_search(search_request())
        .await
        .err()
        .expect("should fail");

    assert!(matches!(err, TransportError::Unauthorized(msg) if msg == "Not authenticated"));
}

#[tokio::test]
async fn streaming_search_empty_body_is_missing_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let err = client
        .open_search(search_request())
        .await
        .err()
        .expect("should fail");

    assert!(matches!(err, TransportError::MissingBody));
}

// ─── Sync search ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_search_unwraps_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .and(body_partial_json(serde_json::json!({"returnMethod": "sync"})))
        .respond_with(ok(serde_json::json!({
            "text": "Ownership is a set of rules",
            "mainNode": {"elementId": "n1", "title": "Ownership", "content": "..."},
            "entities": [{"elementId": "e1", "content": "borrow checker"}],
            "keywords": [],
            "tags": [],
            "prompts": [],
            "webpage": null,
            "document": null,
            "relatedNodes": [{"elementId": "n2", "title": "Borrowing"}],
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let mut request = search_request();
    request.return_method = ReturnMethod::Stream;
    let result = client.search(request).await.expect("should succeed");

    assert_eq!(result.text.as_deref(), Some("Ownership is a set of rules"));
    assert_eq!(result.entities.len(), 1);
    assert_eq!(result.related_nodes[0].element_id.as_str(), "n2");
}

#[tokio::test]
async fn sync_search_failed_envelope_is_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 1,
            "msg": "Empty result",
            "data": null,
        })))
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let err = client
        .search_once(search_request())
        .await
        .expect_err("should fail");

    assert!(matches!(err, TransportError::Api { code: 1, msg } if msg == "Empty result"));
}

#[tokio::test]
async fn expired_token_code_is_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/llm/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 50012,
            "msg": "Token expired",
        })))
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let err = client.all_models().await.expect_err("should fail");
    assert!(matches!(err, TransportError::Unauthorized(msg) if msg == "Token expired"));
}

// ─── Cancellation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancel_posts_to_library_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/cancel/7"))
        .respond_with(ok(serde_json::json!({"success": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    assert!(client.cancel_generation(Some(LibId::new(7))).await.unwrap());
}

#[tokio::test]
async fn cancel_without_library_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ok(serde_json::json!({"success": true})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    assert!(!client.cancel_generation(None).await.unwrap());
    assert!(!client.cancel_generation(Some(LibId::new(0))).await.unwrap());
    client.cancel(LibId::new(0)).await.unwrap();
}

#[tokio::test]
async fn cancel_rejected_by_backend_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/cancel/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 1,
            "msg": "no running job",
            "data": null,
        })))
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let err = client.cancel(LibId::new(7)).await.expect_err("should fail");
    assert!(matches!(err, TransportError::Api { code: 1, .. }));
}

// ─── CRUD collaborators ──────────────────────────────────────────────────────

#[tokio::test]
async fn query_graph_posts_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/query/7"))
        .and(body_partial_json(serde_json::json!({"subjectIds": [2]})))
        .respond_with(ok(serde_json::json!({
            "nodes": [
                {"elementId": "n1", "content": "root", "contentVector": [0.1]},
                {"elementId": "n2", "content": "child"},
            ],
            "links": [
                {"elementId": "r1", "sourceElementId": "n1", "targetElementId": "n2", "type": "INCLUDE"},
            ],
            "overview": {"nodes": [{"type": "node", "count": 2}], "links": []},
            "status": "PUBLISHED",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let query = GraphQuery {
        subject_ids: vec![SubjectId::new(2)],
        ..Default::default()
    };
    let graph = client
        .query_graph(LibId::new(7), query)
        .await
        .expect("should succeed");

    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.links[0].rel_type.as_deref(), Some("INCLUDE"));
    assert_eq!(graph.overview.expect("overview").nodes[0].count, 2);
}

#[tokio::test]
async fn all_models_lists_catalog() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/llm/all"))
        .respond_with(ok(serde_json::json!({
            "llms": ["wizardlm2", "llama3"],
            "embeddings": ["sbert"],
        })))
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let catalog = client.all_models().await.expect("should succeed");
    assert_eq!(catalog.llms, vec!["wizardlm2", "llama3"]);
}

#[tokio::test]
async fn add_node_returns_node_and_link() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/graph/node"))
        .and(body_partial_json(serde_json::json!({
            "parentElementId": "n1",
            "content": "Lifetimes",
        })))
        .respond_with(ok(serde_json::json!({
            "node": {"elementId": "n9", "content": "Lifetimes"},
            "relationship": {"elementId": "r9", "sourceElementId": "n1", "targetElementId": "n9"},
        })))
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let created = client
        .add_node(&NodeDraft {
            lib_id: Some(LibId::new(7)),
            parent_element_id: Some(ElementId::new("n1")),
            content: "Lifetimes".into(),
            ..Default::default()
        })
        .await
        .expect("should succeed");

    assert_eq!(created.node.element_id.as_str(), "n9");
    assert!(created.relationship.is_some());
}

#[tokio::test]
async fn unlink_term_deletes_by_kind() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/graph/node/keyword/k1/n1"))
        .respond_with(ok(serde_json::json!({"success": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    client
        .unlink_term(TermKind::Keyword, &ElementId::new("k1"), &ElementId::new("n1"))
        .await
        .expect("should succeed");
}

#[tokio::test]
async fn find_libs_posts_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/knowledge/lib/find"))
        .and(body_partial_json(serde_json::json!({"keyword": "rust"})))
        .respond_with(ok(serde_json::json!([
            {"id": 7, "title": "Rust", "content": "", "status": "GENERATING"},
        ])))
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let libs = client
        .find_libs(&LibFilter {
            keyword: Some("rust".into()),
            ..Default::default()
        })
        .await
        .expect("should succeed");

    assert_eq!(libs.len(), 1);
    assert_eq!(libs[0].id, Some(LibId::new(7)));
    assert!(libs[0].is_busy());
}

#[tokio::test]
async fn delete_subject_reports_http_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/knowledge/subject/3"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let client = KnowledgeClient::new().base_url(mock_server.uri());
    let err = client
        .delete_subject(SubjectId::new(3))
        .await
        .expect_err("should fail");
    assert!(matches!(err, TransportError::Status { status: 404, .. }));
}
