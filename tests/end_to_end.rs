//! The HTTP client driving a query session against a mock backend.

use graphlens_client::KnowledgeClient;
use graphlens_session::{JobState, QuerySession, SearchConfig, SessionEvent};
use graphlens_types::{ElementId, GraphQuery, LibId, SessionError, TransportError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIB: LibId = LibId::new(7);

fn ndjson(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/x-ndjson")
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": 0, "msg": "success", "data": data}))
}

async fn session_for(server: &MockServer) -> QuerySession<KnowledgeClient> {
    let client = KnowledgeClient::new().base_url(server.uri()).token("test-token");
    QuerySession::new(client)
}

#[tokio::test]
async fn streamed_query_builds_history_and_graph() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("x-streaming-response", "true"))
        .and(body_partial_json(json!({
            "text": "what is a graph",
            "libId": 7,
            "returnMethod": "stream",
            "searchType": "vector",
        })))
        .respond_with(ndjson(concat!(
            "{\"text\":\"Graphs are\",\"mainNode\":{\"elementId\":\"n1\",\"content\":\"What is a graph?\"}}\n",
            "not-json\n",
            "{\"text\":\" nodes.\",\"relatedNodes\":[{\"elementId\":\"n2\"}]}\n",
            "{\"end\":true}\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server).await;
    let handle = session
        .submit_query("what is a graph", &SearchConfig::library(LIB))
        .await
        .unwrap();
    assert_eq!(session.drive().await.unwrap(), JobState::Completed);

    let answer = &session.messages()[1];
    assert_eq!(answer.content, "Graphs are nodes.");
    assert!(answer.frozen);
    assert_eq!(session.job(handle).unwrap().result.related_nodes.len(), 1);
    assert_eq!(session.snapshot().nodes().len(), 2);
    assert!(session.snapshot().node(&ElementId::new("n2")).is_some());
}

#[tokio::test]
async fn in_band_error_fails_the_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .respond_with(ndjson(concat!(
            "{\"text\":\"partial\"}\n",
            "{\"error\":\"llm timeout\"}\n",
            "{\"end\":true}\n",
        )))
        .mount(&server)
        .await;

    let mut session = session_for(&server).await;
    let handle = session
        .submit_query("q", &SearchConfig::library(LIB))
        .await
        .unwrap();
    assert_eq!(session.drive().await.unwrap(), JobState::Failed);
    assert!(session.drain_events().contains(&SessionEvent::JobFailed {
        handle,
        error: "llm timeout".into(),
    }));
}

#[tokio::test]
async fn rejected_search_fails_without_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "token expired"})))
        .mount(&server)
        .await;

    let mut session = session_for(&server).await;
    let handle = session
        .submit_query("q", &SearchConfig::library(LIB))
        .await
        .unwrap();
    let job = session.job(handle).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.error.as_deref(), Some("unauthorized: token expired"));
    assert!(!session.is_streaming());
}

#[tokio::test]
async fn cancel_goes_through_the_cancel_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .respond_with(ndjson("{\"text\":\"partial\"}\n"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/graph/cancel/7"))
        .respond_with(ok(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server).await;
    let handle = session
        .submit_query("q", &SearchConfig::library(LIB))
        .await
        .unwrap();
    assert!(session.cancel_job(Some(LIB)).await.unwrap());
    assert_eq!(session.job(handle).unwrap().state, JobState::Cancelled);
    assert!(!session.is_streaming());
}

#[tokio::test]
async fn refused_cancel_keeps_job_running() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graph/search"))
        .respond_with(ndjson("{\"text\":\"partial\"}\n{\"end\":true}\n"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/graph/cancel/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1, "msg": "no running job", "data": null
        })))
        .mount(&server)
        .await;

    let mut session = session_for(&server).await;
    let handle = session
        .submit_query("q", &SearchConfig::library(LIB))
        .await
        .unwrap();
    let err = session.cancel_job(Some(LIB)).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::CancelFailed {
            source: TransportError::Api { code: 1, .. },
            ..
        }
    ));
    assert_eq!(session.job(handle).unwrap().state, JobState::Running);
    assert_eq!(session.drive().await.unwrap(), JobState::Completed);
}

#[tokio::test]
async fn load_graph_fills_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graph/query/7"))
        .respond_with(ok(json!({
            "nodes": [{"elementId": "n1", "type": "question"}, {"elementId": "n2"}],
            "links": [{"elementId": "r1", "sourceElementId": "n1", "targetElementId": "n2", "type": "ANSWER"}]
        })))
        .mount(&server)
        .await;

    let mut session = session_for(&server).await;
    let stats = session.load_graph(LIB, GraphQuery::default()).await.unwrap();
    assert_eq!(stats.inserted, 3);
    assert_eq!(session.snapshot().relationships().len(), 1);
}
