//! HTTP behaviour of the CES client.
//!
//! Uses wiremock to mock the CES API and test request construction,
//! pagination and error mapping.

use std::time::Duration;

use cesapi::{CesClient, CesError, ClientConfig, FilterSet, ProjectListQuery, Query, Transport};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> CesClient {
    let config = ClientConfig::new("test-token", &server.uri())
        .with_retries(2, 2)
        .with_rate_limit_delay(Duration::from_millis(10));
    CesClient::with_config(config).unwrap()
}

#[tokio::test]
async fn test_sends_auth_token_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/terms"))
        .and(header("AuthToken", "test-token"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "pageSize": 100,
            "resultList": [{"id": 1, "name": "Fall 2023"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let terms = client(&mock_server)
        .list_terms(&FilterSet::new())
        .await
        .unwrap();

    assert_eq!(terms.len(), 1);
    assert_eq!(terms.kind_name(), "Term");
}

#[tokio::test]
async fn test_follows_pages_until_short_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/courses"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "pageSize": 2,
            "resultList": [{"id": 1}, {"id": 2}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/courses"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 2,
            "pageSize": 2,
            "resultList": [{"id": 3}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let courses = client(&mock_server)
        .list_courses(&FilterSet::new())
        .await
        .unwrap();

    let ids: Vec<i64> = courses.rows().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_null_entries_do_not_end_pagination() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/courses"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "pageSize": 2,
            "resultList": [{"id": 1}, null]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/courses"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 2,
            "pageSize": 2,
            "resultList": [{"id": 3}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let courses = client(&mock_server)
        .list_courses(&FilterSet::new())
        .await
        .unwrap();

    let ids: Vec<i64> = courses.rows().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_typed_query_parameters_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(query_param("projectStatus", "2"))
        .and(query_param("includeSubaccounts", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "pageSize": 100,
            "resultList": [{"id": 10, "title": "Fall"}, {"id": 11, "title": "Spring"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = ProjectListQuery {
        project_status: Some(2),
        include_subaccounts: Some(true),
        ..Default::default()
    };
    let filters = FilterSet::new().with("title", "Fa*").unwrap();

    let projects = client(&mock_server)
        .list_projects(&query, &filters)
        .await
        .unwrap();

    assert_eq!(projects.len(), 1);
    assert_eq!(projects.row(0).unwrap()["id"], json!(10));
}

#[tokio::test]
async fn test_single_object_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/projects/10"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 10, "title": "Fall"})),
        )
        .mount(&mock_server)
        .await;

    let project = client(&mock_server).get_project(10).await.unwrap();

    assert_eq!(project.len(), 1);
    assert_eq!(project.kind_name(), "Project");
}

#[tokio::test]
async fn test_status_mapping() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/account"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/surveys/422"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "bad survey id"})),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/courses/500"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);

    assert!(matches!(client.account().await, Err(CesError::Unauthorized)));
    assert!(matches!(
        client.get_project(404).await,
        Err(CesError::NotFound { path }) if path == "projects/404"
    ));
    assert!(matches!(
        client.get_survey(422).await,
        Err(CesError::UnprocessableEntity(msg)) if msg == "bad survey id"
    ));
    assert!(matches!(
        client.get_course(500).await,
        Err(CesError::ApiError { status_code: Some(500), message }) if message == "boom"
    ));
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/terms"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/terms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let terms = client(&mock_server)
        .list_terms(&FilterSet::new())
        .await
        .unwrap();
    assert_eq!(terms.len(), 1);
}

#[tokio::test]
async fn test_rate_limit_gives_up_after_max_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/terms"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).list_terms(&FilterSet::new()).await;

    assert!(matches!(
        result,
        Err(CesError::RateLimited {
            retry_after_secs: Some(0)
        })
    ));
}

#[tokio::test]
async fn test_transport_fetch_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/metadata"))
        .and(query_param("username", "jdoe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "pageSize": 50,
            "resultList": [{"name": "department", "value": "Biology"}]
        })))
        .mount(&mock_server)
        .await;

    let records = client(&mock_server)
        .fetch("users/metadata?username=jdoe", &Query::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["value"], json!("Biology"));
}

#[tokio::test]
async fn test_user_flags() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/hasInProgressSurvey"))
        .and(query_param("username", "jdoe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    assert!(client.user_has_in_progress_survey("jdoe").await.unwrap());
}

#[test]
fn test_rejects_api_path_in_base_url() {
    assert!(matches!(
        CesClient::new("token", "https://ces.example.edu/api/"),
        Err(CesError::InvalidConfig(_))
    ));
}
