//! Integration tests for typed CRUD on resource pages.
//!
//! These tests run the full pipeline against a mock server: request
//! construction, authentication headers, the response envelope, error
//! classification and decoding.

use std::sync::Arc;

use bc_api::auth::StaticTokenProvider;
use bc_api::{
    ApiRoute, Client, ClientConfig, CompanyId, DeleteOptions, EnvironmentName, Error, ErrorKind,
    GetOptions, RootUrl, ResourcePage, TenantId, Validate, ValidationError, WriteOptions,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, header_exists, method, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT: &str = "8a4e2f4c-1d2b-4c5a-9f7e-0b3c6d1e2f3a";
const COMPANY: &str = "2b1c9e3d-5f6a-4b7c-8d9e-0f1a2b3c4d5e";
const ITEM_ID: &str = "5f6a7b8c-9d0e-4f1a-8b2c-3d4e5f6a7b8c";
const CORRELATION: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Item {
    id: Uuid,
    number: String,
    #[serde(default)]
    unit_price: f64,
    #[serde(default)]
    item_category: Option<Category>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Category {
    code: String,
}

impl Validate for Item {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.unit_price < 0.0 {
            return Err(ValidationError::field("unitPrice", "must not be negative"));
        }
        Ok(())
    }
}

/// Creates a client pointed at the mock server.
fn create_client(server: &MockServer) -> Client {
    let config = ClientConfig::builder()
        .tenant_id(TenantId::new(TENANT).unwrap())
        .environment(EnvironmentName::new("Production").unwrap())
        .company_id(CompanyId::new(COMPANY).unwrap())
        .route(ApiRoute::standard())
        .root_url(RootUrl::new(server.uri()).unwrap())
        .build()
        .unwrap();
    Client::new(config, Arc::new(StaticTokenProvider::new("test-token"))).unwrap()
}

fn items(server: &MockServer) -> ResourcePage<Item> {
    ResourcePage::new(&create_client(server), "items").unwrap()
}

fn item_id() -> Uuid {
    Uuid::parse_str(ITEM_ID).unwrap()
}

fn has_header(request: &wiremock::Request, name: &str) -> bool {
    request
        .headers
        .iter()
        .any(|(key, _)| key.as_str().eq_ignore_ascii_case(name))
}

fn record_path() -> String {
    format!(r"/companies\({COMPANY}\)/items\({ITEM_ID}\)$")
}

// ============================================================================
// Get
// ============================================================================

#[tokio::test]
async fn test_get_sends_conventional_headers_and_decodes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(record_path()))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/json;odata.metadata=none"))
        .and(header("data-access-intent", "ReadOnly"))
        .and(header_exists("user-agent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": ITEM_ID, "number": "1000", "unitPrice": 12.5})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let item = items(&server)
        .get(item_id(), &GetOptions::default())
        .await
        .unwrap();

    assert_eq!(item.number, "1000");
    assert!((item.unit_price - 12.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_get_failed_validation_is_decode_kind() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(record_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": ITEM_ID, "number": "1000", "unitPrice": -1.0})),
        )
        .mount(&server)
        .await;

    let error = items(&server)
        .get(item_id(), &GetOptions::default())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Decode);
    assert!(matches!(error, Error::Invalid { .. }));
}

#[tokio::test]
async fn test_get_with_live_replica_omits_read_intent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(record_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": ITEM_ID, "number": "1000"})),
        )
        .mount(&server)
        .await;

    items(&server)
        .get(
            item_id(),
            &GetOptions {
                use_live_replica: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert!(!has_header(&received[0], "data-access-intent"));
}

// ============================================================================
// Error Classification
// ============================================================================

#[tokio::test]
async fn test_not_found_carries_code_and_correlation_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(record_path()))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("request-id", "req-42")
                .set_body_json(json!({
                    "error": {
                        "code": "BadRequest_NotFound",
                        "message": format!("The record does not exist.  CorrelationId:  {CORRELATION}.")
                    }
                })),
        )
        .mount(&server)
        .await;

    let error = items(&server)
        .get(item_id(), &GetOptions::default())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::RemoteApi);
    assert_eq!(error.status_code(), Some(404));
    let api = error.api_error().unwrap();
    assert_eq!(api.code, "BadRequest_NotFound");
    assert_eq!(api.message, "The record does not exist.");
    assert_eq!(api.correlation_id, Some(Uuid::parse_str(CORRELATION).unwrap()));
    assert_eq!(api.request_id.as_deref(), Some("req-42"));
}

#[tokio::test]
async fn test_unstructured_error_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(record_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let error = items(&server)
        .get(item_id(), &GetOptions::default())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::MalformedErrorBody);
    match error {
        Error::MalformedErrorBody { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, b"Internal Server Error");
        }
        other => panic!("Expected MalformedErrorBody, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_envelope_with_extra_field_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(record_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "BadRequest", "message": "nope", "target": "number"}
        })))
        .mount(&server)
        .await;

    let error = items(&server)
        .get(item_id(), &GetOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, Error::MalformedErrorBody { status: 400, .. }));
}

// ============================================================================
// Create and Update
// ============================================================================

#[tokio::test]
async fn test_create_posts_json_without_if_match() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"/items$"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"number": "1000"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": ITEM_ID, "number": "1000"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let item = items(&server)
        .create(&json!({"number": "1000"}), &WriteOptions::default())
        .await
        .unwrap();

    assert_eq!(item.id, item_id());
    let received = server.received_requests().await.unwrap();
    assert!(!has_header(&received[0], "if-match"));
}

#[tokio::test]
async fn test_create_with_expand_rereads_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"/items$"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": ITEM_ID, "number": "1000"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(record_path()))
        .and(query_param("$expand", "itemCategory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": ITEM_ID,
            "number": "1000",
            "itemCategory": {"code": "FURNITURE"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = items(&server).with_default_expand(["itemCategory"]);
    let item = page
        .create(&json!({"number": "1000"}), &WriteOptions::default())
        .await
        .unwrap();

    assert_eq!(
        item.item_category,
        Some(Category {
            code: "FURNITURE".to_string()
        })
    );
}

#[tokio::test]
async fn test_update_sends_etag_as_if_match() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path_regex(record_path()))
        .and(header("if-match", "W/\"JzQ0O0VnQUFBQUo3\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": ITEM_ID, "number": "1001"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let item = items(&server)
        .update(
            item_id(),
            &json!({"number": "1001"}),
            &WriteOptions {
                etag: Some("W/\"JzQ0O0VnQUFBQUo3\"".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(item.number, "1001");
}

#[tokio::test]
async fn test_update_with_expand_issues_follow_up_get() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path_regex(record_path()))
        .and(header("if-match", "*"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": ITEM_ID, "number": "1001"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(record_path()))
        .and(query_param("$expand", "itemCategory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": ITEM_ID,
            "number": "1001",
            "itemCategory": {"code": "CHAIR"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = items(&server)
        .update(
            item_id(),
            &json!({"number": "1001"}),
            &WriteOptions {
                expand: vec!["itemCategory".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(item.item_category.unwrap().code, "CHAIR");
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    assert!(!has_header(&received[1], "data-access-intent"));
}

#[tokio::test]
async fn test_update_conflict_skips_follow_up_get() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path_regex(record_path()))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({
            "error": {"code": "Request_EntityChanged", "message": "Another user has already changed the record."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let error = items(&server)
        .with_default_expand(["itemCategory"])
        .update(item_id(), &json!({"number": "1001"}), &WriteOptions::default())
        .await
        .unwrap_err();

    assert_eq!(error.api_error().unwrap().code, "Request_EntityChanged");
    assert!(error.api_error().unwrap().correlation_id.is_none());
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_sends_if_match_and_no_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path_regex(record_path()))
        .and(header("if-match", "*"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    items(&server)
        .delete(item_id(), &DeleteOptions::default())
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert!(received[0].body.is_empty());
    assert!(!has_header(&received[0], "content-type"));
}

#[tokio::test]
async fn test_delete_error_is_classified() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path_regex(record_path()))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "Authorization_InsufficientPermissions", "message": "Forbidden"}
        })))
        .mount(&server)
        .await;

    let error = items(&server)
        .delete(
            item_id(),
            &DeleteOptions {
                etag: Some("W/\"abc\"".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(error.status_code(), Some(403));
    assert_eq!(error.kind(), ErrorKind::RemoteApi);
}
