// src/handlers/inventory.rs

use crate::{
    auth::AuthUser,
    errors::{AppError, AppResult},
    handlers::{ensure_owned, require_text},
    models::{
        MessageResponse,
        inventory::{
            CreateCustodyRequest, CreateItemRequest, CreateStockTakeRequest, CreateVendorRequest,
            Custodian, CustodyAssignment, CustodyQuery, Item, ItemQuery, ReturnCustodyRequest,
            StockTake, StockTakeQuery, UpdateItemRequest, Vendor,
        },
    },
    policy::{Action, Resource},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

const STOCK_TAKE_SELECT: &str = r#"SELECT t.id, t.school_id, t.item_id, i.name AS item_name, t.date,
       t.counted_quantity, i.quantity AS system_quantity, t.responsible_staff_id,
       t.notes, t.created_at
  FROM stock_takes t JOIN items i ON i.id = t.item_id"#;

fn check_levels(values: &[Option<i32>]) -> AppResult<()> {
    if values.iter().flatten().any(|v| *v < 0) {
        return Err(AppError::Validation(
            "Quantities and stock levels cannot be negative".to_string(),
        ));
    }
    Ok(())
}

// ─── Vendors ─────────────────────────────────────────────────────────────────

/// List vendors
#[utoipa::path(
    get,
    path = "/api/v1/inventory/vendors",
    responses((status = 200, description = "Vendors", body = Vec<Vendor>)),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_vendors(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Vendor>>> {
    auth.require(Resource::Inventory, Action::Read)?;
    let vendors =
        sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE school_id = $1 ORDER BY name")
            .bind(auth.school_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(vendors))
}

/// Register a vendor
#[utoipa::path(
    post,
    path = "/api/v1/inventory/vendors",
    request_body = CreateVendorRequest,
    responses((status = 201, description = "Vendor created", body = Vendor)),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn create_vendor(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateVendorRequest>,
) -> AppResult<(StatusCode, Json<Vendor>)> {
    auth.require(Resource::Inventory, Action::Write)?;
    require_text(&body.name, "name")?;
    let vendor = sqlx::query_as::<_, Vendor>(
        r#"INSERT INTO vendors (id, school_id, name, contact_email, phone)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.name.trim())
    .bind(body.contact_email.trim())
    .bind(body.phone.trim())
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// List items, optionally only those at or below their reorder level
#[utoipa::path(
    get,
    path = "/api/v1/inventory/items",
    params(
        ("category" = Option<String>, Query, description = "UNIFORM, BOOK, EQUIP, TOY or ASSET"),
        ("vendor_id" = Option<Uuid>, Query, description = "Filter by vendor"),
        ("search" = Option<String>, Query, description = "Name or SKU contains"),
        ("low_stock" = Option<bool>, Query, description = "Only items needing reorder"),
    ),
    responses((status = 200, description = "Items", body = Vec<Item>)),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_items(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<ItemQuery>,
) -> AppResult<Json<Vec<Item>>> {
    auth.require(Resource::Inventory, Action::Read)?;
    let search = q
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let items = sqlx::query_as::<_, Item>(
        r#"SELECT * FROM items
           WHERE school_id = $1
             AND ($2::item_category IS NULL OR category = $2)
             AND ($3::uuid IS NULL OR vendor_id = $3)
             AND ($4::text IS NULL OR name ILIKE $4 OR sku ILIKE $4)
             AND (NOT $5 OR quantity <= reorder_level)
           ORDER BY name"#,
    )
    .bind(auth.school_id)
    .bind(q.category)
    .bind(q.vendor_id)
    .bind(search)
    .bind(q.low_stock)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(items))
}

/// Add an item to the catalogue
#[utoipa::path(
    post,
    path = "/api/v1/inventory/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 409, description = "SKU already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn create_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<Item>)> {
    auth.require(Resource::Inventory, Action::Write)?;
    require_text(&body.name, "name")?;
    require_text(&body.sku, "sku")?;
    check_levels(&[
        Some(body.quantity),
        Some(body.min_required),
        Some(body.reorder_level),
    ])?;
    if body.unit_price < Decimal::ZERO {
        return Err(AppError::Validation("Unit price cannot be negative".to_string()));
    }
    if let Some(vendor) = body.vendor_id {
        ensure_owned(&state.db, "vendors", "Vendor", vendor, auth.school_id).await?;
    }

    let item = sqlx::query_as::<_, Item>(
        r#"INSERT INTO items
             (id, school_id, name, sku, vendor_id, category, unit_price, quantity, min_required, reorder_level)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.name.trim())
    .bind(body.sku.trim())
    .bind(body.vendor_id)
    .bind(body.category)
    .bind(body.unit_price)
    .bind(body.quantity)
    .bind(body.min_required)
    .bind(body.reorder_level)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Get one item
#[utoipa::path(
    get,
    path = "/api/v1/inventory/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item", body = Item),
        (status = 404, description = "Item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn get_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Item>> {
    auth.require(Resource::Inventory, Action::Read)?;
    let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 AND school_id = $2")
        .bind(item_id)
        .bind(auth.school_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {item_id} not found")))?;
    Ok(Json(item))
}

/// Update an item
#[utoipa::path(
    patch,
    path = "/api/v1/inventory/items/{item_id}",
    request_body = UpdateItemRequest,
    params(("item_id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 404, description = "Item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn update_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(body): Json<UpdateItemRequest>,
) -> AppResult<Json<Item>> {
    auth.require(Resource::Inventory, Action::Write)?;
    check_levels(&[body.quantity, body.min_required, body.reorder_level])?;
    if body.unit_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(AppError::Validation("Unit price cannot be negative".to_string()));
    }
    if let Some(vendor) = body.vendor_id {
        ensure_owned(&state.db, "vendors", "Vendor", vendor, auth.school_id).await?;
    }

    let item = sqlx::query_as::<_, Item>(
        r#"UPDATE items SET
             name = COALESCE($3, name),
             vendor_id = COALESCE($4, vendor_id),
             category = COALESCE($5, category),
             unit_price = COALESCE($6, unit_price),
             quantity = COALESCE($7, quantity),
             min_required = COALESCE($8, min_required),
             reorder_level = COALESCE($9, reorder_level),
             updated_at = NOW()
           WHERE id = $1 AND school_id = $2
           RETURNING *"#,
    )
    .bind(item_id)
    .bind(auth.school_id)
    .bind(body.name.as_deref().map(str::trim))
    .bind(body.vendor_id)
    .bind(body.category)
    .bind(body.unit_price)
    .bind(body.quantity)
    .bind(body.min_required)
    .bind(body.reorder_level)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Item {item_id} not found")))?;
    if item.is_low_stock() {
        tracing::debug!(sku = %item.sku, quantity = item.quantity, "item at or below reorder level");
    }
    Ok(Json(item))
}

/// Delete an item that no purchase order references
#[utoipa::path(
    delete,
    path = "/api/v1/inventory/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item deleted", body = MessageResponse),
        (status = 404, description = "Item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn delete_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Inventory, Action::Delete)?;
    let deleted = sqlx::query("DELETE FROM items WHERE id = $1 AND school_id = $2")
        .bind(item_id)
        .bind(auth.school_id)
        .execute(&state.db)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::NotFound(format!("Item {item_id} not found")));
    }
    Ok(Json(MessageResponse::new("Item deleted")))
}

// ─── Custody ─────────────────────────────────────────────────────────────────

/// Hand an item to a staff member or a student
#[utoipa::path(
    post,
    path = "/api/v1/inventory/custody",
    request_body = CreateCustodyRequest,
    responses(
        (status = 201, description = "Custody recorded", body = CustodyAssignment),
        (status = 400, description = "Exactly one holder is required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn create_custody(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateCustodyRequest>,
) -> AppResult<(StatusCode, Json<CustodyAssignment>)> {
    auth.require(Resource::Inventory, Action::Write)?;
    let custodian = body
        .custodian()
        .map_err(|msg| AppError::Validation(msg.to_string()))?;
    if body.quantity <= 0 {
        return Err(AppError::Validation("Quantity must be positive".to_string()));
    }
    ensure_owned(&state.db, "items", "Item", body.item_id, auth.school_id).await?;
    match custodian {
        Custodian::Staff(id) => {
            ensure_owned(&state.db, "staff", "Staff member", id, auth.school_id).await?
        }
        Custodian::Student(id) => {
            ensure_owned(&state.db, "students", "Student", id, auth.school_id).await?
        }
    }

    let row = sqlx::query_as::<_, CustodyAssignment>(
        r#"INSERT INTO custody_assignments
             (id, school_id, item_id, quantity, staff_id, student_id, assigned_on, notes)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.item_id)
    .bind(body.quantity)
    .bind(body.staff_id)
    .bind(body.student_id)
    .bind(body.assigned_on.unwrap_or_else(|| Utc::now().date_naive()))
    .bind(&body.notes)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// List custody assignments
#[utoipa::path(
    get,
    path = "/api/v1/inventory/custody",
    params(
        ("staff_id" = Option<Uuid>, Query, description = "Held by staff member"),
        ("student_id" = Option<Uuid>, Query, description = "Held by student"),
        ("open_only" = Option<bool>, Query, description = "Only items not yet returned"),
    ),
    responses((status = 200, description = "Custody assignments", body = Vec<CustodyAssignment>)),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_custody(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<CustodyQuery>,
) -> AppResult<Json<Vec<CustodyAssignment>>> {
    auth.require(Resource::Inventory, Action::Read)?;
    let rows = sqlx::query_as::<_, CustodyAssignment>(
        r#"SELECT * FROM custody_assignments
           WHERE school_id = $1
             AND ($2::uuid IS NULL OR staff_id = $2)
             AND ($3::uuid IS NULL OR student_id = $3)
             AND (NOT $4 OR return_date IS NULL)
           ORDER BY assigned_on DESC"#,
    )
    .bind(auth.school_id)
    .bind(q.staff_id)
    .bind(q.student_id)
    .bind(q.open_only)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// Record the return of an item in custody
#[utoipa::path(
    post,
    path = "/api/v1/inventory/custody/{custody_id}/return",
    request_body = ReturnCustodyRequest,
    params(("custody_id" = Uuid, Path, description = "Custody assignment ID")),
    responses(
        (status = 200, description = "Item returned", body = CustodyAssignment),
        (status = 400, description = "Return date before assignment"),
        (status = 404, description = "Assignment not found"),
        (status = 422, description = "Already returned"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn return_custody(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(custody_id): Path<Uuid>,
    Json(body): Json<ReturnCustodyRequest>,
) -> AppResult<Json<CustodyAssignment>> {
    auth.require(Resource::Inventory, Action::Write)?;
    let return_date = body.return_date.unwrap_or_else(|| Utc::now().date_naive());

    let row = sqlx::query_as::<_, CustodyAssignment>(
        r#"UPDATE custody_assignments SET return_date = $3
           WHERE id = $1 AND school_id = $2 AND return_date IS NULL AND assigned_on <= $3
           RETURNING *"#,
    )
    .bind(custody_id)
    .bind(auth.school_id)
    .bind(return_date)
    .fetch_optional(&state.db)
    .await?;
    if let Some(row) = row {
        return Ok(Json(row));
    }

    let returned: Option<NaiveDate> = sqlx::query_scalar(
        "SELECT return_date FROM custody_assignments WHERE id = $1 AND school_id = $2",
    )
    .bind(custody_id)
    .bind(auth.school_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Custody assignment {custody_id} not found")))?;

    match returned {
        Some(on) => Err(AppError::InvalidState(format!(
            "Custody assignment {custody_id} was already returned on {on}"
        ))),
        None => Err(AppError::Validation(
            "Return date cannot be before the assignment date".to_string(),
        )),
    }
}

// ─── Stock takes ─────────────────────────────────────────────────────────────

/// Record a physical count; the discrepancy is computed against current stock
#[utoipa::path(
    post,
    path = "/api/v1/inventory/stock-takes",
    request_body = CreateStockTakeRequest,
    responses((status = 201, description = "Stock take recorded", body = StockTake)),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn create_stock_take(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateStockTakeRequest>,
) -> AppResult<(StatusCode, Json<StockTake>)> {
    auth.require(Resource::Inventory, Action::Write)?;
    check_levels(&[Some(body.counted_quantity)])?;
    ensure_owned(&state.db, "items", "Item", body.item_id, auth.school_id).await?;
    if let Some(staff) = body.responsible_staff_id {
        ensure_owned(&state.db, "staff", "Staff member", staff, auth.school_id).await?;
    }

    let id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO stock_takes
             (id, school_id, item_id, date, counted_quantity, responsible_staff_id, notes)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING id"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.item_id)
    .bind(body.date.unwrap_or_else(|| Utc::now().date_naive()))
    .bind(body.counted_quantity)
    .bind(body.responsible_staff_id)
    .bind(&body.notes)
    .fetch_one(&state.db)
    .await?;

    let take = sqlx::query_as::<_, StockTake>(&format!("{STOCK_TAKE_SELECT} WHERE t.id = $1"))
        .bind(id)
        .fetch_one(&state.db)
        .await?;
    Ok((StatusCode::CREATED, Json(take.with_discrepancy())))
}

/// List stock takes with their discrepancies
#[utoipa::path(
    get,
    path = "/api/v1/inventory/stock-takes",
    params(
        ("item_id" = Option<Uuid>, Query, description = "Filter by item"),
        ("date" = Option<chrono::NaiveDate>, Query, description = "Filter by day"),
    ),
    responses((status = 200, description = "Stock takes", body = Vec<StockTake>)),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_stock_takes(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<StockTakeQuery>,
) -> AppResult<Json<Vec<StockTake>>> {
    auth.require(Resource::Inventory, Action::Read)?;
    let sql = format!(
        r#"{STOCK_TAKE_SELECT}
           WHERE t.school_id = $1
             AND ($2::uuid IS NULL OR t.item_id = $2)
             AND ($3::date IS NULL OR t.date = $3)
           ORDER BY t.date DESC, t.created_at DESC"#
    );
    let takes = sqlx::query_as::<_, StockTake>(&sql)
        .bind(auth.school_id)
        .bind(q.item_id)
        .bind(q.date)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(
        takes.into_iter().map(StockTake::with_discrepancy).collect(),
    ))
}
