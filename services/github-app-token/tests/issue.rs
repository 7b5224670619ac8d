//! End-to-end issuance against a mock GitHub API.

mod common;

use base64::Engine as _;
use chrono::{TimeZone, Utc};
use common::*;
use github_app_token::github::RepositorySelection;
use github_app_token::{IssueError, IssueRequest};
use wiremock::matchers::{any, body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_app(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/app"))
        .and(header_exists("authorization"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app_body()))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_scoped_token_end_to_end() {
    let server = MockServer::start().await;
    mount_app(&server).await;

    Mock::given(method("POST"))
        .and(path("/app/installations/12345/access_tokens"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "repository_ids": [10, 20],
            "permissions": {"contents": "read"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "token": "ghs_scoped",
            "expires_at": "2024-05-01T13:00:00Z",
            "permissions": {"contents": "read"},
            "repository_selection": "selected",
            "repositories": [
                {"id": 10, "name": "api", "full_name": "acme/api"},
                {"id": 20, "name": "web", "full_name": "acme/web"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = IssueRequest {
        client_id: Some("Iv1.test".to_string()),
        pem: Some(private_key_pem()),
        installation: Some("12345".to_string()),
        repo_ids: Some("10,20".to_string()),
        permissions: Some("contents:read".to_string()),
        ..Default::default()
    };

    let now = Utc::now();
    let bundle = issuer_for(&server).issue(&request, now).await.unwrap();

    let token = bundle.token.as_ref().unwrap();
    assert_eq!(token.token, "ghs_scoped");
    assert_eq!(token.repository_selection, Some(RepositorySelection::Selected));
    assert_eq!(token.repositories.len(), 2);
    assert_eq!(bundle.repository_count, 2);
    assert_eq!(bundle.permissions["contents"], "read");

    let claims = decode_claims(&bundle.jwt);
    assert_eq!(claims.iss, "Iv1.test");
    assert_eq!(claims.iat, now.timestamp());
    assert_eq!(claims.exp - claims.iat, 600);
}

#[tokio::test]
async fn test_unscoped_exchange_sends_no_body() {
    let server = MockServer::start().await;
    mount_app(&server).await;

    Mock::given(method("POST"))
        .and(path("/app/installations/12345/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let request = IssueRequest {
        installation: Some("12345".to_string()),
        ..app_request()
    };

    let bundle = issuer_for(&server).issue(&request, Utc::now()).await.unwrap();
    assert_eq!(
        bundle.token.as_ref().unwrap().repository_selection,
        Some(RepositorySelection::All)
    );
    assert_eq!(bundle.repository_count, 0);

    let requests = server.received_requests().await.unwrap();
    let exchange = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    assert!(exchange.body.is_empty());
    assert!(exchange.headers.get("content-type").is_none());
}

#[tokio::test]
async fn test_every_identity_and_key_source_combination() {
    let pem = private_key_pem();
    let b64 = base64::engine::general_purpose::STANDARD.encode(&pem);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    for (app_id, client_id, issuer) in [
        (Some("123456"), None, "123456"),
        (None, Some("Iv1.test"), "Iv1.test"),
    ] {
        for key in 0..3 {
            let server = MockServer::start().await;
            mount_app(&server).await;

            let request = IssueRequest {
                app_id: app_id.map(str::to_string),
                client_id: client_id.map(str::to_string),
                pem: (key == 0).then(|| pem.clone()),
                pem_file: (key == 1).then(private_key_path),
                pem_b64: (key == 2).then(|| b64.clone()),
                ..Default::default()
            };

            let bundle = issuer_for(&server).issue(&request, now).await.unwrap();
            let claims = decode_claims(&bundle.jwt);
            assert_eq!(claims.iss, issuer);
            assert_eq!(claims.exp - claims.iat, 600);
            assert!(bundle.token.is_none());
        }
    }
}

#[tokio::test]
async fn test_identity_errors_happen_before_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let issuer = issuer_for(&server);

    let both = IssueRequest {
        client_id: Some("Iv1.test".to_string()),
        ..app_request()
    };
    assert!(matches!(
        issuer.issue(&both, Utc::now()).await,
        Err(IssueError::AmbiguousIdentity)
    ));

    let neither = IssueRequest {
        app_id: None,
        ..app_request()
    };
    assert!(matches!(
        issuer.issue(&neither, Utc::now()).await,
        Err(IssueError::MissingIdentity)
    ));
}

#[tokio::test]
async fn test_option_errors_happen_before_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let issuer = issuer_for(&server);

    let selection_without_installation = IssueRequest {
        repo_names: Some("api".to_string()),
        ..app_request()
    };
    assert!(matches!(
        issuer.issue(&selection_without_installation, Utc::now()).await,
        Err(IssueError::InvalidSelection(_))
    ));

    let two_keys = IssueRequest {
        pem_file: Some(private_key_path()),
        ..app_request()
    };
    assert!(matches!(
        issuer.issue(&two_keys, Utc::now()).await,
        Err(IssueError::KeyMaterial(_))
    ));

    let bad_key = IssueRequest {
        pem: Some("this is not a private key".into()),
        ..app_request()
    };
    assert!(matches!(
        issuer.issue(&bad_key, Utc::now()).await,
        Err(IssueError::KeyMaterial(_))
    ));
}

#[tokio::test]
async fn test_rejected_jwt_stops_before_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/app"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"message":"A JSON web token could not be decoded"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(token_body()))
        .expect(0)
        .mount(&server)
        .await;

    let request = IssueRequest {
        installation: Some("12345".to_string()),
        ..app_request()
    };

    let err = issuer_for(&server)
        .issue(&request, Utc::now())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, IssueError::ValidationFailed(msg) if msg.contains("401")));
}

#[tokio::test]
async fn test_malformed_identity_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not valid json"))
        .mount(&server)
        .await;

    assert!(matches!(
        issuer_for(&server).issue(&app_request(), Utc::now()).await,
        Err(IssueError::ValidationFailed(_))
    ));
}

#[tokio::test]
async fn test_failed_exchange() {
    let server = MockServer::start().await;
    mount_app(&server).await;

    Mock::given(method("POST"))
        .and(path("/app/installations/999/access_tokens"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Not Found"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let request = IssueRequest {
        installation: Some("999".to_string()),
        ..app_request()
    };

    let err = issuer_for(&server)
        .issue(&request, Utc::now())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, IssueError::TokenExchangeFailed(msg) if msg.contains("404")));
}

#[tokio::test]
async fn test_malformed_permissions_stop_exchange() {
    let server = MockServer::start().await;
    mount_app(&server).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(token_body()))
        .expect(0)
        .mount(&server)
        .await;

    let request = IssueRequest {
        installation: Some("12345".to_string()),
        permissions: Some("contents:read:extra".to_string()),
        ..app_request()
    };

    assert!(matches!(
        issuer_for(&server).issue(&request, Utc::now()).await,
        Err(IssueError::MalformedPermissionSpec(msg)) if msg.contains("contents:read:extra")
    ));
}
