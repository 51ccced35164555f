// Integration tests for `PanelClient` using wiremock.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use remnapromo_api::{
    CreateUserRequest, Error, PanelAuth, PanelClient, TransportConfig, UserStatus,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PanelClient) {
    let server = MockServer::start().await;
    let client = PanelClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn user(uuid: &str, username: &str) -> serde_json::Value {
    json!({
        "uuid": uuid,
        "shortUuid": format!("s-{uuid}"),
        "username": username,
        "status": "ACTIVE",
        "usedTrafficBytes": 0,
        "trafficLimitBytes": 1_073_741_824_u64,
        "subscriptionUrl": format!("https://sub.example.com/{uuid}")
    })
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_base_url_is_normalized_to_api_prefix() {
    let a = PanelClient::from_reqwest("https://panel.example.com", reqwest::Client::new()).unwrap();
    let b =
        PanelClient::from_reqwest("https://panel.example.com/api/", reqwest::Client::new()).unwrap();

    assert_eq!(a.base_url().as_str(), "https://panel.example.com/api/");
    assert_eq!(b.base_url().as_str(), "https://panel.example.com/api/");
}

#[tokio::test]
async fn test_list_users_page() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("start", "0"))
        .and(query_param("size", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "users": [user("u1", "promo-aaaa1111-spring"), user("u2", "alice")],
                "total": 2
            }
        })))
        .mount(&server)
        .await;

    let (users, total) = client.list_users(0, 25).await.unwrap();

    assert_eq!(total, Some(2));
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].username, "promo-aaaa1111-spring");
    assert_eq!(users[1].uuid.as_deref(), Some("u2"));
}

#[tokio::test]
async fn test_list_users_skips_undecodable_records() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [user("u1", "a"), { "username": 42 }, "garbage"]
        })))
        .mount(&server)
        .await;

    let (users, total) = client.list_users(0, 25).await.unwrap();

    assert_eq!(total, None);
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn test_list_all_users_walks_pages() {
    let (server, client) = setup().await;
    let client = client.with_page_size(2);

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "users": [user("u1", "a"), user("u2", "b")], "total": 3 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("start", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "users": [user("u3", "c")], "total": 3 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let users = client.list_all_users().await.unwrap();
    let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();

    assert_eq!(names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_list_all_users_stops_when_panel_returns_everything_at_once() {
    let (server, client) = setup().await;
    let client = client.with_page_size(2);

    // No `total`, and `start`/`size` are ignored.
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [user("u1", "a"), user("u2", "b"), user("u3", "c")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let users = tokio::time::timeout(std::time::Duration::from_secs(5), client.list_all_users())
        .await
        .expect("listing must terminate")
        .unwrap();

    assert_eq!(users.len(), 3);
}

#[tokio::test]
async fn test_list_all_users_stops_on_repeated_page() {
    let (server, client) = setup().await;
    let client = client.with_page_size(2);

    // Exactly one page worth of users, served for every offset.
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([user("u1", "a"), user("u2", "b")])),
        )
        .expect(2)
        .mount(&server)
        .await;

    let users = tokio::time::timeout(std::time::Duration::from_secs(5), client.list_all_users())
        .await
        .expect("listing must terminate")
        .unwrap();
    let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();

    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn test_create_user_sends_full_shape() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(body_partial_json(json!({
            "username": "promo-abcd1234-summer",
            "trafficLimitBytes": 16_106_127_360_u64,
            "trafficLimitStrategy": "NO_RESET",
            "status": "ACTIVE",
            "activateAllInbounds": true,
            "tag": "summer"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "response": user("new-1", "promo-abcd1234-summer") })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateUserRequest::full(
        "promo-abcd1234-summer",
        chrono::Utc::now(),
        16_106_127_360,
        "summer",
    );
    let created = client.create_user(&request).await.unwrap();

    assert_eq!(created.uuid.as_deref(), Some("new-1"));
    assert_eq!(created.status, UserStatus::Active);
    assert_eq!(
        created.subscription_link(),
        Some("https://sub.example.com/new-1")
    );
}

#[tokio::test]
async fn test_lookup_endpoints() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": user("u1", "a") })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/by-short-uuid/s-u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user("u1", "a")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/by-username/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": user("u1", "a") })))
        .mount(&server)
        .await;

    assert_eq!(client.get_user_by_uuid("u1").await.unwrap().username, "a");
    assert_eq!(
        client.get_user_by_short_uuid("s-u1").await.unwrap().username,
        "a"
    );
    assert_eq!(
        client.get_user_by_username("a").await.unwrap().uuid.as_deref(),
        Some("u1")
    );
}

#[tokio::test]
async fn test_delete_user() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/users/u1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "response": { "isDeleted": true } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    client.delete_user("u1").await.unwrap();
}

#[tokio::test]
async fn test_auth_headers_are_sent() {
    let server = MockServer::start().await;
    let auth = PanelAuth {
        token: SecretString::from("tok-123".to_owned()),
        proxy_key: Some(SecretString::from("proxy-key".to_owned())),
    };
    let client = PanelClient::new(&server.uri(), &auth, &TransportConfig::default()).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("x-api-key", "proxy-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let users = client.list_all_users().await.unwrap();
    assert!(users.is_empty());
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_users(0, 10).await.unwrap_err();
    assert!(err.is_auth_failure(), "expected auth failure, got: {err:?}");
}

#[tokio::test]
async fn test_not_found_carries_panel_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "User not found",
            "errorCode": "A063"
        })))
        .mount(&server)
        .await;

    let err = client.get_user_by_uuid("missing").await.unwrap_err();
    assert!(err.is_not_found());
    match err {
        Error::Panel {
            status,
            message,
            code,
        } => {
            assert_eq!(status, 404);
            assert_eq!(message, "User not found");
            assert_eq!(code.as_deref(), Some("A063"));
        }
        other => panic!("expected Panel error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let request = CreateUserRequest::minimal("u", chrono::Utc::now(), 1);
    let err = client.create_user(&request).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_create_without_record_is_missing_payload() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": [] })))
        .mount(&server)
        .await;

    let request = CreateUserRequest::minimal("u", chrono::Utc::now(), 1);
    let err = client.create_user(&request).await.unwrap_err();
    assert!(matches!(err, Error::MissingPayload { .. }));
}

#[tokio::test]
async fn test_refused_delete_is_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/users/u1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "response": { "isDeleted": false } })),
        )
        .mount(&server)
        .await;

    assert!(client.delete_user("u1").await.is_err());
}
