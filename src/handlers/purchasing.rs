// src/handlers/purchasing.rs

use crate::{
    auth::AuthUser,
    errors::{AppError, AppResult},
    handlers::{attachment, ensure_owned},
    models::finance::{
        CreatePurchaseOrderRequest, PurchaseOrder, ReceiptOutcome, ReceivePurchaseOrderRequest,
    },
    policy::{Action, Resource},
    services::{
        ledger,
        numbering::{self, PURCHASE_ORDER_PREFIX},
        reports,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/v1/finance/purchase-orders",
    responses((status = 200, description = "Purchase orders", body = Vec<PurchaseOrder>)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn list_purchase_orders(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    auth.require(Resource::Finance, Action::Read)?;
    let orders = sqlx::query_as::<_, PurchaseOrder>(
        r#"SELECT *, unit_price * quantity AS total FROM purchase_orders
           WHERE school_id = $1
           ORDER BY order_date DESC, po_number DESC"#,
    )
    .bind(auth.school_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(orders))
}

/// Order stock from a vendor
#[utoipa::path(
    post,
    path = "/api/v1/finance/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created", body = PurchaseOrder),
        (status = 400, description = "Invalid quantity or price"),
        (status = 404, description = "Vendor or item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn create_purchase_order(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreatePurchaseOrderRequest>,
) -> AppResult<(StatusCode, Json<PurchaseOrder>)> {
    auth.require(Resource::Finance, Action::Write)?;
    if body.quantity <= 0 {
        return Err(AppError::Validation("Quantity must be positive".to_string()));
    }
    if body.unit_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(AppError::Validation(
            "Unit price cannot be negative".to_string(),
        ));
    }
    ensure_owned(&state.db, "vendors", "Vendor", body.vendor_id, auth.school_id).await?;

    let item_price: Decimal =
        sqlx::query_scalar("SELECT unit_price FROM items WHERE id = $1 AND school_id = $2")
            .bind(body.item_id)
            .bind(auth.school_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", body.item_id)))?;

    let mut tx = state.db.begin().await?;
    let po_number = numbering::next_number(&mut tx, auth.school_id, PURCHASE_ORDER_PREFIX).await?;
    let order = sqlx::query_as::<_, PurchaseOrder>(
        r#"INSERT INTO purchase_orders
             (id, school_id, po_number, vendor_id, item_id, quantity, unit_price, order_date)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
           RETURNING *, unit_price * quantity AS total"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(&po_number)
    .bind(body.vendor_id)
    .bind(body.item_id)
    .bind(body.quantity)
    .bind(body.unit_price.unwrap_or(item_price))
    .bind(body.order_date.unwrap_or_else(|| Utc::now().date_naive()))
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(po = %order.po_number, total = %order.total, "purchase order created");
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get one purchase order
#[utoipa::path(
    get,
    path = "/api/v1/finance/purchase-orders/{po_id}",
    params(("po_id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order", body = PurchaseOrder),
        (status = 404, description = "Purchase order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn get_purchase_order(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    auth.require(Resource::Finance, Action::Read)?;
    let mut conn = state.db.acquire().await?;
    let order = ledger::fetch_purchase_order(&mut conn, auth.school_id, po_id).await?;
    Ok(Json(order))
}

/// Receive the goods: restocks the item and books the expense (none for a free order). Safe to repeat.
#[utoipa::path(
    post,
    path = "/api/v1/finance/purchase-orders/{po_id}/receive",
    request_body = ReceivePurchaseOrderRequest,
    params(("po_id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Order received", body = ReceiptOutcome),
        (status = 400, description = "No treasury configured"),
        (status = 404, description = "Purchase order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn receive_purchase_order(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(po_id): Path<Uuid>,
    body: Option<Json<ReceivePurchaseOrderRequest>>,
) -> AppResult<Json<ReceiptOutcome>> {
    auth.require(Resource::Finance, Action::Write)?;
    let Json(body) = body.unwrap_or_default();

    let mut tx = state.db.begin().await?;
    let outcome = ledger::receive_purchase_order(
        &mut tx,
        auth.school_id,
        po_id,
        body.treasury_id,
        Utc::now().date_naive(),
    )
    .await?;
    tx.commit().await?;
    Ok(Json(outcome))
}

/// Download the purchase order as PDF
#[utoipa::path(
    get,
    path = "/api/v1/finance/purchase-orders/{po_id}/pdf",
    params(("po_id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order PDF", content_type = "application/pdf"),
        (status = 404, description = "Purchase order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn purchase_order_pdf(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(po_id): Path<Uuid>,
) -> AppResult<Response> {
    auth.require(Resource::Finance, Action::Read)?;
    let doc = reports::purchase_order_document(&state.db, auth.school_id, po_id).await?;
    Ok(attachment(&doc.file_name, doc.content_type, doc.bytes))
}
