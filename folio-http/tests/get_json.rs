use folio_http::{HttpClient, HttpError, RequestOpts};
use serde_json::{Value, json};
use std::borrow::Cow;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(&server.uri())
        .unwrap()
        .with_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn decodes_json_and_sends_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search/suggest"))
        .and(query_param("q", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "suggestions": ["rust async", "rust traits"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .get_json(
            "/api/search/suggest",
            RequestOpts {
                query: Some(vec![("q", Cow::Borrowed("rust"))]),
                ..Default::default()
            },
        )
        .await
        .expect("suggestions");

    assert_eq!(got["suggestions"][1], "rust traits");
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .with_retries(1)
        .get_json("/flaky", RequestOpts::default())
        .await
        .expect("second attempt succeeds");
    assert_eq!(got, json!({ "ok": true }));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .with_retries(3)
        .get_json::<Value>("/missing", RequestOpts::default())
        .await
        .unwrap_err();

    match err {
        HttpError::Api { status, message, .. } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(message, "Not found.");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_json::<Value>("/html", RequestOpts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Decode(_, ref snippet) if snippet.contains("oops")));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({ "message": "bad gateway" })))
        .expect(2)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .with_retries(1)
        .get_json::<Value>("/down", RequestOpts::default())
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert!(matches!(err, HttpError::Api { status, .. } if status.as_u16() == 502));
    server.verify().await;
}

#[tokio::test]
async fn unreachable_host_is_retried_then_reported_as_network_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let err = HttpClient::new(&uri)
        .unwrap()
        .with_timeout(Duration::from_secs(2))
        .with_retries(1)
        .get_json::<Value>("/gone", RequestOpts::default())
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Network(_)), "unexpected: {err:?}");
    assert!(err.is_transient());
}
