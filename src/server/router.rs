use axum::extract::{Query, State};
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use cartpilot_core_types::{LineItem, OrderError, OrderRequest, OrderStatus, OtpKind, StockDecision};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::error::HttpError;
use super::state::ServeState;

type ApiResult = Result<Json<Value>, HttpError>;

pub fn build_router(state: ServeState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/catalog", get(catalog_handler))
        .route("/status", get(status_handler))
        .route("/order", post(order_handler))
        .route("/order/multi", post(multi_order_handler))
        .route("/otp/login", post(login_otp_handler))
        .route("/otp/payment", post(payment_otp_handler))
        .route("/stop", post(stop_handler))
        .route("/stock-decision", post(stock_decision_handler))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
struct OrderItemBody {
    product_name: Option<String>,
    item_url: Option<String>,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct SingleOrderBody {
    product_name: Option<String>,
    item_url: Option<String>,
    quantity: Option<u32>,
    phone_number: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MultiOrderBody {
    #[serde(default)]
    items: Vec<OrderItemBody>,
    phone_number: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OtpBody {
    otp: String,
}

#[derive(Debug, Deserialize)]
struct StockDecisionBody {
    decision: String,
    #[serde(default)]
    replacement_items: Vec<OrderItemBody>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusQuery {
    #[serde(default)]
    history: bool,
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "cartpilot",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn catalog_handler(State(state): State<ServeState>) -> Json<Value> {
    let products = state.catalog.list();
    Json(json!({
        "count": products.len(),
        "products": products,
    }))
}

async fn status_handler(
    State(state): State<ServeState>,
    Query(query): Query<StatusQuery>,
) -> Json<Value> {
    let snapshot = state.engine.status();
    let mut body = json!({
        "status": snapshot.status,
        "waiting_for": snapshot.waiting_for,
        "pending_otp": snapshot.pending_otp,
        "message": snapshot.last_message,
        "line_items": snapshot.line_items,
        "out_of_stock_items": snapshot.out_of_stock_items,
        "successfully_added": snapshot.successfully_added,
    });
    if query.history {
        body["history"] = json!(state.engine.history());
    }
    Json(body)
}

async fn order_handler(
    State(state): State<ServeState>,
    Json(body): Json<SingleOrderBody>,
) -> ApiResult {
    reject_if_in_flight(&state)?;
    let url = state
        .catalog
        .resolve(body.product_name.as_deref(), body.item_url.as_deref())?;
    let item = LineItem::new(url.clone(), body.quantity.unwrap_or(1));
    let request = build_request(&state, vec![item], body.phone_number, body.address)?;

    let txn = state.engine.submit(request)?;
    info!(%txn, product = %url, "order accepted");
    Ok(Json(json!({
        "message": "Order started",
        "status": OrderStatus::Starting,
        "product_url": url,
        "transaction_id": txn,
    })))
}

async fn multi_order_handler(
    State(state): State<ServeState>,
    Json(body): Json<MultiOrderBody>,
) -> ApiResult {
    reject_if_in_flight(&state)?;
    if body.items.is_empty() {
        return Err(HttpError::bad_request("No items provided"));
    }
    let items = resolve_items(&state, &body.items)?;
    let request = build_request(&state, items, body.phone_number, body.address)?;
    let count = request.items().len();

    let txn = state.engine.submit(request)?;
    info!(%txn, items = count, "multi-item order accepted");
    Ok(Json(json!({
        "message": "Multi-item order started",
        "status": OrderStatus::Starting,
        "items_count": count,
        "transaction_id": txn,
    })))
}

async fn login_otp_handler(State(state): State<ServeState>, Json(body): Json<OtpBody>) -> ApiResult {
    state.engine.submit_otp(OtpKind::Login, &body.otp)?;
    Ok(Json(json!({ "message": "Login OTP submitted", "status": "processing" })))
}

async fn payment_otp_handler(
    State(state): State<ServeState>,
    Json(body): Json<OtpBody>,
) -> ApiResult {
    state.engine.submit_otp(OtpKind::Payment, &body.otp)?;
    Ok(Json(json!({ "message": "Payment OTP submitted", "status": "processing" })))
}

async fn stop_handler(State(state): State<ServeState>) -> Json<Value> {
    let from = state.engine.stop().await;
    Json(json!({
        "message": "Order stopped",
        "status": OrderStatus::Cancelled,
        "previous_status": from,
    }))
}

async fn stock_decision_handler(
    State(state): State<ServeState>,
    Json(body): Json<StockDecisionBody>,
) -> ApiResult {
    let current = state.engine.status().status;
    if current != OrderStatus::WaitingStockDecision {
        return Err(OrderError::NotWaiting {
            expected: "stock decision",
            current,
        }
        .into());
    }
    let replacements = resolve_items(&state, &body.replacement_items)?;
    let decision = StockDecision::parse(&body.decision, replacements)?;
    let label = decision.as_str();

    state.engine.submit_stock_decision(decision)?;
    Ok(Json(json!({
        "message": format!("Stock decision '{label}' submitted"),
        "status": "processing",
    })))
}

fn reject_if_in_flight(state: &ServeState) -> Result<(), HttpError> {
    let current = state.engine.status().status;
    if current.is_in_flight() {
        return Err(OrderError::Concurrency(current).into());
    }
    Ok(())
}

fn resolve_items(state: &ServeState, items: &[OrderItemBody]) -> Result<Vec<LineItem>, HttpError> {
    items
        .iter()
        .map(|item| {
            state
                .catalog
                .resolve(item.product_name.as_deref(), item.item_url.as_deref())
                .map(|url| LineItem::new(url, item.quantity))
                .map_err(|err| HttpError::bad_request(format!("Invalid item: {err}")))
        })
        .collect()
}

fn build_request(
    state: &ServeState,
    items: Vec<LineItem>,
    phone: Option<String>,
    address: Option<String>,
) -> Result<OrderRequest, HttpError> {
    let phone = state
        .phone_or_default(phone)
        .ok_or_else(|| HttpError::bad_request("Phone number is required"))?;
    let address = state
        .address_or_default(address)
        .ok_or_else(|| HttpError::bad_request("Address is required"))?;
    Ok(OrderRequest::new(items, phone, address)?)
}
