use fleet_metric_collector::prometheus::{PromAuth, PromClient};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

fn vector_response(results: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "status": "success",
        "data": { "resultType": "vector", "result": results }
    }))
}

#[tokio::test]
async fn query_parses_workload_health_samples() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(query_param("query", "workload_health"))
        .respond_with(vector_response(serde_json::json!([
            {
                "metric": {
                    "namespace": "ns",
                    "app": "app",
                    "workload_kind": "Deployment",
                    "pod": "app-1"
                },
                "value": [1700000000.0, "1"]
            },
            {
                "metric": {"namespace": "ns", "app": "app", "pod": "app-2"},
                "value": [1700000000.0, "0"]
            },
            {
                // No identity labels; must be dropped silently.
                "metric": {"instance": "10.0.0.1:8080"},
                "value": [1700000000.0, "1"]
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = PromClient::new(PromAuth::None).unwrap();
    let samples = client.query_workload_health(&server.uri()).await.unwrap();

    assert_eq!(samples.len(), 2);
    assert!(samples[0].health);
    assert_eq!(samples[0].workload_kind.as_deref(), Some("Deployment"));
    assert!(!samples[1].health);
    assert_eq!(samples[1].pod_name.as_deref(), Some("app-2"));
}

#[tokio::test]
async fn query_tolerates_trailing_slash_in_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(vector_response(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = PromClient::new(PromAuth::None).unwrap();
    let samples = client
        .query_workload_health(&format!("{}/", server.uri()))
        .await
        .unwrap();
    assert!(samples.is_empty());
}

#[tokio::test]
async fn bearer_auth_is_sent_as_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(header("Authorization", "Bearer secret-token"))
        .respond_with(vector_response(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = PromClient::new(PromAuth::Bearer {
        token: "secret-token".into(),
    })
    .unwrap();
    client.query_workload_health(&server.uri()).await.unwrap();
}

#[tokio::test]
async fn basic_auth_is_sent_as_authorization_header() {
    let server = MockServer::start().await;
    // "user:pass" base64-encoded.
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(vector_response(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = PromClient::new(PromAuth::Basic {
        username: "user".into(),
        password: "pass".into(),
    })
    .unwrap();
    client.query_workload_health(&server.uri()).await.unwrap();
}

#[tokio::test]
async fn server_error_surfaces_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = PromClient::new(PromAuth::None).unwrap();
    let err = client
        .query_workload_health(&server.uri())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("500"), "{err}");
}

#[tokio::test]
async fn api_level_failure_surfaces_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"status": "error", "error": "query timed out"}),
        ))
        .mount(&server)
        .await;

    let client = PromClient::new(PromAuth::None).unwrap();
    let err = client
        .query_workload_health(&server.uri())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("query timed out"), "{err}");
}

#[tokio::test]
async fn malformed_body_surfaces_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = PromClient::new(PromAuth::None).unwrap();
    assert!(client.query_workload_health(&server.uri()).await.is_err());
}
