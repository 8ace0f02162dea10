use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;
use trove_engine::api::{self, AppState};
use trove_engine::collaborators::{InMemoryProtocol, ManualClock};
use trove_engine::db::init_db;
use trove_engine::domain::{Address, AssetId, TimeMs, Wad};
use trove_engine::{BorrowerOperations, Config, Orchestrator, Repository};

struct TestApp {
    app: axum::Router,
    orchestrator: Arc<Orchestrator>,
    _temp: TempDir,
}

async fn setup_test_app(price: Option<u64>) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let mut env = std::collections::HashMap::new();
    env.insert("DATABASE_PATH".to_string(), db_path);
    let config = Config::from_env_map(env).unwrap();
    let setup = Arc::new(config.protocol_setup().unwrap());

    let clock = ManualClock::new(TimeMs::new(0));
    let mut protocol = InMemoryProtocol::new(setup.registry(), Arc::new(clock));
    if let Some(price) = price {
        protocol
            .prices
            .set_price(AssetId::NATIVE, Wad::from_units(price));
    }

    let orchestrator = Arc::new(
        Orchestrator::resume(BorrowerOperations::new(setup), protocol, repo)
            .await
            .unwrap(),
    );
    let app = api::create_router(AppState::new(orchestrator.clone()));

    TestApp {
        app,
        orchestrator,
        _temp: temp_dir,
    }
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

async fn post(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn open(app: &axum::Router, caller: &str, coll: &str, debt: &str) -> (StatusCode, Value) {
    post(
        app,
        "/v1/troves/open",
        json!({
            "caller": caller,
            "coll": coll,
            "debt": debt,
            "maxFeePercentage": "0.05"
        }),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let test_app = setup_test_app(Some(2_000)).await;
    let (status, body) = get(&test_app.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_ready_requires_prices() {
    let test_app = setup_test_app(None).await;
    let (status, body) = get(&test_app.app, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");

    let test_app = setup_test_app(Some(2_000)).await;
    let (status, _) = get(&test_app.app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_open_trove_endpoint() {
    let test_app = setup_test_app(Some(2_000)).await;

    let (status, body) = open(&test_app.app, "0xAlice", "2", "2000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"], "0xalice");
    assert_eq!(body["operation"], "openTrove");
    assert_eq!(body["fee"], "10");
    assert_eq!(body["debt"], "2210");
    assert_eq!(body["events"].as_array().unwrap().len(), 3);

    let (status, body) = get(&test_app.app, "/v1/troves/0xalice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["coll"], "2");

    let (status, body) = get(&test_app.app, "/v1/system").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "normal");
    assert_eq!(body["recoveryMode"], false);
    assert_eq!(body["totalDebt"], "2210");
    assert_eq!(body["assets"][0]["symbol"], "ETH");
}

#[tokio::test]
async fn test_rejection_maps_to_unprocessable() {
    let test_app = setup_test_app(Some(2_000)).await;

    let (status, body) = open(&test_app.app, "0xalice", "1", "1900").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "ICR_BELOW_REQUIRED_THRESHOLD");
    assert!(body["error"].is_string());

    let (_, body) = get(&test_app.app, "/v1/troves/0xalice").await;
    assert_eq!(body["status"], "nonExistent");

    let (_, body) = get(&test_app.app, "/v1/events").await;
    assert!(body["events"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_price_is_server_error() {
    let test_app = setup_test_app(None).await;
    let (status, _) = open(&test_app.app, "0xalice", "2", "2000").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_bad_requests() {
    let test_app = setup_test_app(Some(2_000)).await;

    let (status, _) = open(&test_app.app, "   ", "2", "2000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&test_app.app, "/v1/events?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // negative amounts do not deserialize
    let (status, _) = open(&test_app.app, "0xalice", "-2", "2000").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_adjust_close_and_events() {
    let test_app = setup_test_app(Some(2_000)).await;
    open(&test_app.app, "0xalice", "2", "2000").await;
    open(&test_app.app, "0xbob", "10", "2000").await;

    let (status, body) = post(
        &test_app.app,
        "/v1/troves/adjust",
        json!({ "caller": "0xalice", "collTopUp": "1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["coll"], "3");

    let (status, body) = post(
        &test_app.app,
        "/v1/troves/adjust",
        json!({ "caller": "0xalice", "collTopUp": "1", "collWithdrawal": "1" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "BOTH_COLLATERAL_DIRECTIONS_NON_ZERO");

    // alice received 2000 but owes 2010 on close
    test_app
        .orchestrator
        .with_protocol(|protocol| {
            protocol.stable.transfer(
                &Address::new("0xbob"),
                &Address::new("0xalice"),
                Wad::from_units(10),
            )
        })
        .await;

    let (status, body) = post(
        &test_app.app,
        "/v1/troves/close",
        json!({ "caller": "0xalice" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["operation"], "closeTrove");

    let (_, body) = get(&test_app.app, "/v1/troves/0xalice").await;
    assert_eq!(body["status"], "closedByOwner");

    let (status, body) = get(&test_app.app, "/v1/events?owner=0xalice").await;
    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    let kinds: Vec<&str> = events.iter().map(|e| e["kind"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        vec![
            "troveCreated",
            "troveUpdated",
            "borrowingFeePaid",
            "troveUpdated",
            "troveUpdated"
        ]
    );
    let seqs: Vec<i64> = events.iter().map(|e| e["opSeq"].as_i64().unwrap()).collect();
    assert_eq!(seqs, vec![1, 1, 1, 3, 4]);
}

#[tokio::test]
async fn test_claim_collateral_endpoint() {
    let test_app = setup_test_app(Some(2_000)).await;

    let (status, body) = post(
        &test_app.app,
        "/v1/collateral/claim",
        json!({ "caller": "0xalice" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "NO_COLLATERAL_TO_CLAIM");

    test_app
        .orchestrator
        .with_protocol(|protocol| {
            protocol
                .surplus
                .credit(&Address::new("0xalice"), AssetId::NATIVE, Wad::from_units(1))
        })
        .await;

    let (status, body) = post(
        &test_app.app,
        "/v1/collateral/claim",
        json!({ "caller": "0xalice" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["claimed"][0]["amount"], "1");
}
