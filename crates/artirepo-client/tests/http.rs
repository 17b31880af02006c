//! HTTP transport against a local mock server

use std::time::Duration;

use artirepo_client::{
    ApiRequest, ClientError, Credentials, HttpRestClient, ProviderConfig, RestClient,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIBS: &str = "/artifactory/api/repositories/libs";

fn client(server: &MockServer, credentials: Credentials) -> HttpRestClient {
    let base = Url::parse(&format!("{}/", server.uri())).unwrap();
    HttpRestClient::with_parts(base, credentials, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn sends_bearer_token_and_parses_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIBS))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "libs", "rclass": "local"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, Credentials::bearer("tok"))
        .send(ApiRequest::get(LIBS))
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.body, Some(json!({"key": "libs", "rclass": "local"})));
}

#[tokio::test]
async fn sends_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(LIBS))
        .and(header("X-JFrog-Art-Api", "AKC123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, Credentials::api_key("AKC123"))
        .send(ApiRequest::delete(LIBS))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, None);
}

#[tokio::test]
async fn sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(LIBS))
        .and(body_json(json!({"key": "libs", "rclass": "local", "packageType": "generic"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("Successfully created repository 'libs'"))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, Credentials::basic("admin", "password"))
        .send(ApiRequest::put(
            LIBS,
            json!({"key": "libs", "rclass": "local", "packageType": "generic"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.body, Some(json!("Successfully created repository 'libs'")));
}

#[tokio::test]
async fn not_found_is_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIBS))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"status": 404, "message": "Repository libs not found"}]
        })))
        .mount(&server)
        .await;

    let response = client(&server, Credentials::bearer("tok"))
        .send(ApiRequest::get(LIBS))
        .await
        .unwrap();

    assert!(response.is_not_found());
}

#[tokio::test]
async fn maps_auth_failures() {
    let server = MockServer::start().await;
    Mock::given(path("/artifactory/api/repositories/secret"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(path("/artifactory/api/repositories/private"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let client = client(&server, Credentials::bearer("tok"));

    let unauthorized = client
        .send(ApiRequest::get("/artifactory/api/repositories/secret"))
        .await;
    assert!(matches!(unauthorized, Err(ClientError::AuthRequired { .. })));

    let forbidden = client
        .send(ApiRequest::get("/artifactory/api/repositories/private"))
        .await;
    assert!(matches!(forbidden, Err(ClientError::AuthFailed { .. })));
}

#[tokio::test]
async fn maps_rate_limiting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "5"))
        .mount(&server)
        .await;

    let result = client(&server, Credentials::bearer("tok"))
        .send(ApiRequest::get(LIBS))
        .await;

    assert!(matches!(result, Err(ClientError::RateLimited { retry_after: 5 })));
}

#[tokio::test]
async fn surfaces_artifactory_error_messages() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"status": 400, "message": "Case insensitive repository key already exists"}]
        })))
        .mount(&server)
        .await;

    let err = client(&server, Credentials::bearer("tok"))
        .send(ApiRequest::put(LIBS, json!({"key": "libs"})))
        .await
        .unwrap_err();

    insta::assert_snapshot!(err, @"HTTP error: 400 - Case insensitive repository key already exists");
}

#[tokio::test]
async fn builds_from_provider_config() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(LIBS))
        .and(header("Authorization", "Bearer from-env"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let mut config = ProviderConfig::default();
    config.apply_env_from(|name| match name {
        "JFROG_URL" => Some(uri.clone()),
        "JFROG_ACCESS_TOKEN" => Some("from-env".to_string()),
        _ => None,
    });

    let client = HttpRestClient::new(&config).unwrap();
    let response = client.send(ApiRequest::head(LIBS)).await.unwrap();

    assert_eq!(response.status, 200);
}

#[test]
fn rejects_invalid_config() {
    let config = ProviderConfig {
        url: Some("https://acme.example.com".to_string()),
        ..Default::default()
    };

    assert!(matches!(
        HttpRestClient::new(&config),
        Err(ClientError::MissingCredentials)
    ));
}
