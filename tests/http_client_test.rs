use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use backplane::error::ErrorCategory;
use backplane::{HttpClient, HttpConfig};

#[derive(Debug, Deserialize, PartialEq)]
struct Order {
    id: u64,
    city: String,
}

fn client() -> HttpClient {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    HttpClient::new(&HttpConfig::default()).unwrap()
}

#[tokio::test]
async fn get_decodes_into_the_target_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/42"))
        .and(query_param("expand", "city"))
        .and(header("x-correlation-id", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "city": "Bandung",
        })))
        .mount(&server)
        .await;

    let query = HashMap::from([("expand".to_string(), "city".to_string())]);
    let headers = HashMap::from([("x-correlation-id".to_string(), "abc".to_string())]);
    let response = client()
        .get::<Order>(&format!("{}/orders/42", server.uri()), &query, &headers)
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert!(!response.is_error_state());
    assert_eq!(
        response.body,
        Some(Order {
            id: 42,
            city: "Bandung".into()
        })
    );
}

#[tokio::test]
async fn post_sends_json_and_decodes_the_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_json(json!({"city": "Jakarta"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 7, "city": "Jakarta"})),
        )
        .mount(&server)
        .await;

    let response = client()
        .post::<Order, _>(
            &format!("{}/orders", server.uri()),
            &json!({"city": "Jakarta"}),
            &HashMap::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.body.unwrap().id, 7);
}

#[tokio::test]
async fn error_status_returns_without_a_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&server)
        .await;

    let response = client()
        .get::<Order>(
            &format!("{}/orders/404", server.uri()),
            &HashMap::new(),
            &HashMap::new(),
        )
        .await
        .unwrap();

    assert!(response.is_error_state());
    assert_eq!(response.status.as_u16(), 404);
    assert!(response.body.is_none());
}

#[tokio::test]
async fn undecodable_success_body_is_a_deserialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("definitely not json"))
        .mount(&server)
        .await;

    let err = client()
        .get::<Order>(
            &format!("{}/orders/1", server.uri()),
            &HashMap::new(),
            &HashMap::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Deserialization);
}

#[tokio::test]
async fn put_and_delete_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/orders/42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 42, "city": "Surabaya"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/orders/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
        .mount(&server)
        .await;

    let put = client()
        .put::<Order, _>(
            &format!("{}/orders/42", server.uri()),
            &json!({"city": "Surabaya"}),
            &HashMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(put.body.unwrap().city, "Surabaya");

    let delete = client()
        .delete::<serde_json::Value>(
            &format!("{}/orders/42", server.uri()),
            &HashMap::new(),
            &HashMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(delete.body.unwrap()["deleted"], json!(true));
}

#[tokio::test]
async fn upload_posts_multipart_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/attachments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stored": true})))
        .mount(&server)
        .await;

    let fields = HashMap::from([("kind".to_string(), "invoice".to_string())]);
    let response = client()
        .upload::<serde_json::Value>(
            &format!("{}/attachments", server.uri()),
            &fields,
            &HashMap::new(),
            "file",
            "invoice.pdf",
            b"%PDF-1.4 fake".to_vec(),
        )
        .await
        .unwrap();

    assert_eq!(response.body.unwrap()["stored"], json!(true));
}
