//! HTTP-level tests for the billsplit router.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; the
//! vision model is replaced by a scripted [`VisionModel`], so these tests
//! need neither a network nor an API key.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use billsplit::{build_router, AppState, BillSplitError, ImageData, ServiceConfig, VisionModel};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────────

const BOUNDARY: &str = "----billsplit-test-boundary";

/// Vision model that always gives the same reply and remembers every image.
struct ScriptedModel {
    reply: Result<String, String>,
    seen: Mutex<Vec<ImageData>>,
}

impl ScriptedModel {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(msg: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(msg.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn describe(
        &self,
        image: &ImageData,
        _instruction: &str,
    ) -> Result<String, BillSplitError> {
        self.seen.lock().unwrap().push(image.clone());
        self.reply.clone().map_err(BillSplitError::UpstreamFailure)
    }
}

fn app_with(model: Arc<ScriptedModel>, config: ServiceConfig) -> Router {
    build_router(Arc::new(AppState::new(config, model))).expect("router")
}

fn app(model: Arc<ScriptedModel>) -> Router {
    app_with(model, ServiceConfig::default())
}

fn multipart_body(field: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(field: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/parse-bill")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, filename, content_type, bytes)))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
    };
    (status, body)
}

fn approx(v: &Value, expected: f64) -> bool {
    (v.as_f64().unwrap() - expected).abs() < 1e-9
}

// ── GET / ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn root_returns_banner() {
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(ScriptedModel::replying("{}")), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Bill Splitting API"}));
}

// ── POST /parse-bill ─────────────────────────────────────────────────────────

#[tokio::test]
async fn parse_bill_returns_model_json() {
    let model = ScriptedModel::replying(
        r#"{"items": [{"name": "Margherita", "price": 14.5, "quantity": 2}], "tax": 2.61}"#,
    );
    let req = upload_request("file", "receipt.jpg", "image/jpeg", b"\xFF\xD8\xFFfake");
    let (status, body) = send(app(model.clone()), req).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["items"][0]["name"], "Margherita");
    assert_eq!(body["items"][0]["quantity"], 2);
    assert_eq!(body["tax"], 2.61);

    let seen = model.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].media_type, "image/jpeg");
    assert_eq!(STANDARD.decode(&seen[0].data).unwrap(), b"\xFF\xD8\xFFfake");
}

#[tokio::test]
async fn parse_bill_tolerates_missing_tax() {
    let model = ScriptedModel::replying(r#"{"items": []}"#);
    let req = upload_request("file", "r.png", "image/png", b"png");
    let (status, body) = send(app(model), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"items": []}));
}

#[tokio::test]
async fn parse_bill_rejects_non_image() {
    let model = ScriptedModel::replying("{}");
    let req = upload_request("file", "bill.pdf", "application/pdf", b"%PDF-1.7");
    let (status, body) = send(app(model.clone()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "File must be an image");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn parse_bill_rejects_corrupt_heic() {
    let model = ScriptedModel::replying("{}");
    let req = upload_request("file", "IMG_2048.HEIC", "image/heic", b"not really heic");
    let (status, body) = send(app(model.clone()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["detail"].as_str().unwrap().starts_with("Error converting HEIC image"),
        "body: {body}"
    );
    assert_eq!(model.calls(), 0);
}

#[cfg(feature = "heic")]
#[tokio::test]
async fn parse_bill_converts_heic_to_jpeg() {
    let heic = std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/sample.heic"))
        .unwrap();
    let model = ScriptedModel::replying(r#"{"items": [], "tax": 0.5}"#);
    let req = upload_request("file", "IMG_0001.HEIC", "image/heic", &heic);
    let (status, body) = send(app(model.clone()), req).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["tax"], 0.5);

    let seen = model.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].media_type, "image/jpeg");
    let jpeg = STANDARD.decode(&seen[0].data).unwrap();
    assert_eq!(image::guess_format(&jpeg).unwrap(), image::ImageFormat::Jpeg);
}

#[tokio::test]
async fn parse_bill_requires_file_field() {
    let model = ScriptedModel::replying("{}");
    let req = upload_request("photo", "receipt.jpg", "image/jpeg", b"jpeg");
    let (status, body) = send(app(model), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("'file'"));
}

#[tokio::test]
async fn parse_bill_non_json_reply_is_500_with_raw_text() {
    let model = ScriptedModel::replying("I'm sorry, the photo is too dark.");
    let req = upload_request("file", "receipt.jpg", "image/jpeg", b"jpeg");
    let (status, body) = send(app(model), req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Error parsing bill"), "detail: {detail}");
    assert!(detail.contains("too dark"), "detail: {detail}");
}

#[tokio::test]
async fn parse_bill_upstream_failure_is_500() {
    let model = ScriptedModel::failing("vision model returned HTTP 401: invalid x-api-key");
    let req = upload_request("file", "receipt.jpg", "image/jpeg", b"jpeg");
    let (status, body) = send(app(model), req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("401"));
}

#[tokio::test]
async fn parse_bill_enforces_upload_limit() {
    let config = ServiceConfig::builder().max_upload_bytes(1024).build().unwrap();
    let model = ScriptedModel::replying("{}");
    let req = upload_request("file", "huge.jpg", "image/jpeg", &vec![0u8; 8 * 1024]);
    let (status, _) = send(app_with(model.clone(), config), req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(model.calls(), 0);
}

// ── POST /split-equal ────────────────────────────────────────────────────────

#[tokio::test]
async fn split_equal_pizza_example() {
    let req = json_request(
        "/split-equal",
        json!({
            "items": [{"name": "Pizza", "price": 20.00, "quantity": 1}],
            "tax": 2.00,
            "tip": 3.00,
            "people_count": 5,
            "split_type": "equal"
        }),
    );
    let (status, body) = send(app(ScriptedModel::replying("{}")), req).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert!(approx(&body["subtotal"], 20.0));
    assert!(approx(&body["tax"], 2.0));
    assert!(approx(&body["tip"], 3.0));
    assert!(approx(&body["total"], 25.0));
    assert!(approx(&body["per_person"], 5.0));
    assert!(approx(&body["tax_per_person"], 0.4));
    assert!(approx(&body["tip_per_person"], 0.6));
}

#[tokio::test]
async fn split_equal_zero_people_is_400() {
    let req = json_request(
        "/split-equal",
        json!({"items": [], "tax": 0, "tip": 0, "people_count": 0, "split_type": "equal"}),
    );
    let (status, body) = send(app(ScriptedModel::replying("{}")), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("people_count"));
}

#[tokio::test]
async fn split_equal_schema_violation_is_422() {
    let req = json_request(
        "/split-equal",
        json!({"items": [{"name": "Pizza", "price": "twenty"}], "people_count": 2}),
    );
    let (status, body) = send(app(ScriptedModel::replying("{}")), req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn split_equal_missing_field_is_422() {
    let full = json!({
        "items": [{"name": "Pizza", "price": 20}],
        "tax": 2,
        "tip": 3,
        "people_count": 2,
        "split_type": "equal"
    });
    for field in ["tax", "tip", "people_count", "split_type"] {
        let mut body = full.clone();
        body.as_object_mut().unwrap().remove(field);
        let (status, body) = send(
            app(ScriptedModel::replying("{}")),
            json_request("/split-equal", body),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "without {field}: {body}");
        assert!(body["detail"].as_str().unwrap().contains(field), "body: {body}");
    }
}

#[tokio::test]
async fn split_equal_oversized_body_is_413() {
    let config = ServiceConfig::builder().max_upload_bytes(256).build().unwrap();
    let items: Vec<Value> = (0..64)
        .map(|i| json!({"name": format!("Item {i}"), "price": 1.0}))
        .collect();
    let req = json_request(
        "/split-equal",
        json!({"items": items, "tax": 0, "tip": 0, "people_count": 2, "split_type": "equal"}),
    );
    let (status, _) = send(app_with(ScriptedModel::replying("{}"), config), req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn split_equal_without_json_content_type_is_415() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/split-equal")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(
            r#"{"items": [], "tax": 0, "tip": 0, "people_count": 1, "split_type": "equal"}"#,
        ))
        .unwrap();
    let (status, body) = send(app(ScriptedModel::replying("{}")), req).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["detail"].is_string());
}

// ── POST /split-by-item ──────────────────────────────────────────────────────

#[tokio::test]
async fn split_by_item_example() {
    let req = json_request(
        "/split-by-item",
        json!({
            "items": [
                {"name": "Burger", "price": 10, "quantity": 1},
                {"name": "Salad", "price": 20, "quantity": 1}
            ],
            "tax": 0,
            "tip": 0,
            "assignments": [[1, 0], [0, 1]]
        }),
    );
    let (status, body) = send(app(ScriptedModel::replying("{}")), req).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["person_totals"], json!([10.0, 20.0]));
    assert_eq!(body["person_subtotals"], json!([10.0, 20.0]));
    assert!(approx(&body["total"], 30.0));
}

#[tokio::test]
async fn split_by_item_unassigned_item_is_400() {
    let req = json_request(
        "/split-by-item",
        json!({
            "items": [
                {"name": "Burger", "price": 10, "quantity": 1},
                {"name": "Dessert", "price": 7, "quantity": 1}
            ],
            "tax": 1,
            "tip": 2,
            "assignments": [[1, 1], [0, 0]]
        }),
    );
    let (status, body) = send(app(ScriptedModel::replying("{}")), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Item 'Dessert' has no people assigned");
}

#[tokio::test]
async fn split_by_item_missing_assignments_is_422() {
    let req = json_request(
        "/split-by-item",
        json!({"items": [{"name": "Burger", "price": 10}], "tax": 0, "tip": 0}),
    );
    let (status, _) = send(app(ScriptedModel::replying("{}")), req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn split_by_item_missing_tax_or_tip_is_422() {
    for field in ["tax", "tip"] {
        let mut body = json!({
            "items": [{"name": "Burger", "price": 10}],
            "tax": 1,
            "tip": 2,
            "assignments": [[1]]
        });
        body.as_object_mut().unwrap().remove(field);
        let (status, body) = send(
            app(ScriptedModel::replying("{}")),
            json_request("/split-by-item", body),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "without {field}: {body}");
    }
}

// ── CORS ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cors_allows_configured_origin() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/split-equal")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let resp = app(ScriptedModel::replying("{}")).oneshot(req).await.unwrap();
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "POST");
}

#[tokio::test]
async fn cors_ignores_other_origins() {
    let req = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let resp = app(ScriptedModel::replying("{}")).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
