//! Router-level tests: requests go through `build_router` with an in-memory
//! database, a temporary document directory and a scripted model.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use db::DBService;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use services::services::{
    claude_api::ClaudeApiError, document_store::DocumentStore,
    loading_optimizer::LoadingOptimizer, scripted_generator::ScriptedGenerator,
};
use tempfile::TempDir;
use tower::ServiceExt;
use trucktetris_server::{AppState, build_router};

const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<<>>\n%%EOF\n";

struct TestApp {
    router: Router,
    generator: Arc<ScriptedGenerator>,
    _documents: TempDir,
}

async fn app(generator: Option<ScriptedGenerator>) -> TestApp {
    let documents = tempfile::tempdir().unwrap();
    let generator = generator.map(Arc::new);

    let state = AppState {
        db: DBService::in_memory().await.unwrap(),
        documents: DocumentStore::new(documents.path()),
        optimizer: generator.clone().map(|g| LoadingOptimizer::new(g)),
        max_upload_bytes: 1024 * 1024,
    };

    TestApp {
        router: build_router(state),
        generator: generator.unwrap_or_else(|| Arc::new(ScriptedGenerator::default())),
        _documents: documents,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn upload(&self) -> String {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/orders")
            .header(header::CONTENT_TYPE, "application/pdf")
            .body(Body::from(PDF))
            .unwrap();
        let (status, body) = self.send(request).await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

fn line_items() -> Value {
    json!([{
        "item": "10202638",
        "quantityOrdered": 20,
        "qtyPerPallet": 7,
        "totalPallets": 3,
        "length": 24,
        "width": 18,
        "height": 12,
        "overhang": "NO",
        "overhangBothSides": "NO",
        "oneSideOverhang": "0",
        "otherSideOverhang": "0"
    }])
}

fn trucks_answer(numbers: &[u32]) -> Result<String, ClaudeApiError> {
    let trucks: Vec<Value> = numbers
        .iter()
        .map(|n| {
            json!({
                "truckNumber": n,
                "loadingPlan": format!("Truck {n}: pairs from the nose"),
                "sequence": ["1. Load Item #10202638 (2 pallets) at 0-4 feet from front, left side"],
                "itemPlacements": [],
                "specialNotes": "",
                "spaceUtilization": "40%",
                "heightClearance": "60 inches"
            })
        })
        .collect();
    Ok(format!("```json\n{}\n```", json!({ "trucks": trucks })))
}

#[tokio::test]
async fn health_check_answers() {
    let app = app(None).await;
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": "OK" }));
}

#[tokio::test]
async fn optimize_without_api_key_is_a_configuration_error() {
    let app = app(None).await;
    let (status, body) = app
        .json(
            Method::POST,
            "/api/optimize-loading",
            json!({ "lineItems": line_items(), "numTrucks": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "API configuration error" }));

    let (status, _) = app
        .json(
            Method::POST,
            "/api/regenerate-instructions",
            json!({ "feedback": "x", "isFullRegeneration": true }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn optimize_rejects_bad_input_without_calling_the_model() {
    let app = app(Some(ScriptedGenerator::default())).await;

    for body in [
        json!({ "lineItems": [], "numTrucks": 2 }),
        json!({ "numTrucks": 2 }),
    ] {
        let (status, response) = app.json(Method::POST, "/api/optimize-loading", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Invalid or empty line items");
    }

    let (status, response) = app
        .json(
            Method::POST,
            "/api/optimize-loading",
            json!({ "lineItems": "nope", "numTrucks": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].is_string());

    for trucks in [json!(0), json!(-3), Value::Null] {
        let (status, response) = app
            .json(
                Method::POST,
                "/api/optimize-loading",
                json!({ "lineItems": line_items(), "numTrucks": trucks }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Invalid number of trucks");
    }

    assert!(app.generator.calls().is_empty());
}

#[tokio::test]
async fn optimize_batches_trucks_and_returns_the_merged_plan() {
    let app = app(Some(ScriptedGenerator::new([
        trucks_answer(&[1, 2]),
        trucks_answer(&[3]),
    ])))
    .await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/optimize-loading",
            json!({ "lineItems": line_items(), "numTrucks": 3, "allowStacking": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let numbers: Vec<u64> = body["data"]["trucks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["truckNumber"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(body["data"]["summary"], "Loading plan generated successfully");
    assert_eq!(body["data"]["warnings"].as_array().unwrap().len(), 2);

    let calls = app.generator.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].prompt.contains("(trucks 1 to 2)"));
    assert!(calls[1].prompt.contains("(trucks 3 to 3)"));
    assert!(calls[0].prompt.contains("STRICTLY PROHIBITED"));
}

#[tokio::test]
async fn order_lifecycle_through_ocr_and_edits() {
    let app = app(None).await;
    let id = app.upload().await;

    let (status, body) = app.get(&format!("/api/orders/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/orders/{id}/ocr"),
            json!({
                "raw_ocr_data": {
                    "orderHeader": { "orderNumber": "SO-1042", "ackDate": "03/01/2025", "poNumber": "PO-77" },
                    "lineItems": [
                        { "item": "10202638", "quantityOrdered": "20", "qtyPerPallet": "7", "totalPallets": "3" },
                        { "item": "Currency: USD", "quantityOrdered": 0, "amount": "1,200.00" }
                    ]
                }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    let items = body["data"]["order_data"]["lineItems"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["item"], "10202638");

    let (status, body) = app
        .json(
            Method::PUT,
            &format!("/api/orders/{id}/line-items"),
            json!({ "lineItems": [
                { "item": "10202638", "quantityOrdered": 21, "qtyPerPallet": 7, "totalPallets": 99 },
                { "item": "10195770", "quantityOrdered": 5, "qtyPerPallet": 0, "totalPallets": 4 }
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["order_data"]["lineItems"].as_array().unwrap();
    assert_eq!(items[0]["totalPallets"], 3);
    assert_eq!(items[1]["totalPallets"], 0);
    assert_eq!(body["data"]["order_data"]["orderHeader"]["poNumber"], "PO-77");

    let (status, body) = app
        .json(
            Method::PUT,
            &format!("/api/orders/{id}/status"),
            json!({ "status": "processing" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "processing");

    let (status, body) = app.get("/api/orders").await;
    assert_eq!(status, StatusCode::OK);
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["order_number"], "SO-1042");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/orders/{id}/document"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], PDF);
}

#[tokio::test]
async fn upload_rejects_non_pdf_bodies() {
    let app = app(None).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/orders")
        .body(Body::from("hello"))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/orders").await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = app(Some(ScriptedGenerator::default())).await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = app.get(&format!("/api/orders/{missing}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Order not found");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/optimize-loading",
            json!({ "orderId": missing, "lineItems": line_items(), "numTrucks": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.generator.calls().is_empty());
}

#[tokio::test]
async fn optimized_plan_is_stored_and_failures_store_nothing() {
    let app = app(Some(ScriptedGenerator::new([
        trucks_answer(&[1, 2]),
        Ok("```json\n{\"trucks\": [\n```".to_string()),
        trucks_answer(&[1]),
    ])))
    .await;
    let id = app.upload().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/optimize-loading",
            json!({ "orderId": id, "lineItems": line_items(), "numTrucks": 3, "allowStacking": true }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to optimize loading");
    assert!(body["message"].is_string());

    let (status, _) = app.get(&format!("/api/orders/{id}/loading")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/optimize-loading",
            json!({ "orderId": id, "lineItems": line_items(), "numTrucks": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/api/orders/{id}/loading")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["trucks"][0]["truckNumber"], 1);
}

#[tokio::test]
async fn regenerating_one_truck_updates_the_stored_plan() {
    let app = app(Some(ScriptedGenerator::new([
        trucks_answer(&[1, 2]),
        Ok(json!({
            "truckNumber": 2,
            "loadingPlan": "Heavy pallets over the axles",
            "sequence": []
        })
        .to_string()),
    ])))
    .await;
    let id = app.upload().await;

    let (_, optimized) = app
        .json(
            Method::POST,
            "/api/optimize-loading",
            json!({ "orderId": id, "lineItems": line_items(), "numTrucks": 2 }),
        )
        .await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/regenerate-instructions",
            json!({
                "orderId": id,
                "truckIndex": 1,
                "feedback": "move the heavy pallets to the middle",
                "currentPlan": optimized["data"],
                "lineItems": line_items(),
                "isFullRegeneration": false
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["loadingPlan"], "Heavy pallets over the axles");

    let (_, stored) = app.get(&format!("/api/orders/{id}/loading")).await;
    assert_eq!(
        stored["data"]["trucks"][0],
        optimized["data"]["trucks"][0]
    );
    assert_eq!(
        stored["data"]["trucks"][1]["loadingPlan"],
        "Heavy pallets over the axles"
    );

    let calls = app.generator.calls();
    assert!(calls[1].prompt.contains("move the heavy pallets to the middle"));
}

#[tokio::test]
async fn regeneration_input_errors_are_bad_requests() {
    let app = app(Some(ScriptedGenerator::default())).await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/regenerate-instructions",
            json!({ "truckIndex": 0, "feedback": "  ", "currentPlan": { "trucks": [{ "truckNumber": 1 }] } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Feedback is required");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/regenerate-instructions",
            json!({ "feedback": "more room at the doors" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/regenerate-instructions",
            json!({ "truckIndex": 4, "feedback": "more room", "currentPlan": { "trucks": [] } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.generator.calls().is_empty());
}

#[tokio::test]
async fn full_regeneration_returns_a_whole_plan() {
    let app = app(Some(ScriptedGenerator::new([trucks_answer(&[1, 2])]))).await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/regenerate-instructions",
            json!({
                "feedback": "use fewer rows",
                "currentPlan": { "trucks": [{ "truckNumber": 1 }] },
                "lineItems": line_items(),
                "isFullRegeneration": true
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["trucks"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["summary"], "Loading plan generated successfully");
}

#[tokio::test]
async fn model_trucks_are_stored_verbatim() {
    let truck = json!({
        "truckNumber": "Truck 1",
        "loadingPlan": "Pairs from the nose",
        "itemPlacements": null,
        "placements": [{ "palletCount": "2-3", "stacked": "partially" }]
    });
    let app = app(Some(ScriptedGenerator::new([Ok(format!(
        "```json\n{}\n```",
        json!({ "trucks": [truck.clone()] })
    ))])))
    .await;
    let id = app.upload().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/optimize-loading",
            json!({ "orderId": id, "lineItems": line_items(), "numTrucks": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["trucks"][0], truck);

    let (_, stored) = app.get(&format!("/api/orders/{id}/loading")).await;
    assert_eq!(stored["data"]["trucks"][0], truck);
}

#[tokio::test]
async fn maximum_truck_count_is_planned_one_batch_at_a_time() {
    let app = app(Some(ScriptedGenerator::new([trucks_answer(&[1, 2])]))).await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/optimize-loading",
            json!({ "lineItems": line_items(), "numTrucks": u32::MAX }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to optimize loading");

    let calls = app.generator.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].prompt.contains("(trucks 3 to 4)"));
}
