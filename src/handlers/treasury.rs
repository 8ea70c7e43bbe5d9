// src/handlers/treasury.rs

use crate::{
    auth::AuthUser,
    errors::{AppError, AppResult},
    models::{
        MessageResponse,
        finance::{
            CreateManualEntryRequest, CreateTreasuryRequest, TransactionQuery, Treasury,
            TreasuryReconciliation, TreasuryTransaction,
        },
    },
    policy::{Action, Resource},
    services::ledger,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

/// List treasuries with their balances
#[utoipa::path(
    get,
    path = "/api/v1/finance/treasuries",
    responses((status = 200, description = "Treasuries", body = Vec<Treasury>)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn list_treasuries(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Treasury>>> {
    auth.require(Resource::Finance, Action::Read)?;
    let rows = sqlx::query_as::<_, Treasury>(
        "SELECT * FROM treasuries WHERE school_id = $1 ORDER BY created_at, id",
    )
    .bind(auth.school_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// Open a treasury, optionally with an opening balance
#[utoipa::path(
    post,
    path = "/api/v1/finance/treasuries",
    request_body = CreateTreasuryRequest,
    responses(
        (status = 201, description = "Treasury created", body = Treasury),
        (status = 409, description = "Name already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn create_treasury(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateTreasuryRequest>,
) -> AppResult<(StatusCode, Json<Treasury>)> {
    auth.require(Resource::Finance, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let treasury =
        ledger::create_treasury(&mut tx, auth.school_id, &body, Utc::now().date_naive()).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(treasury)))
}

/// Get one treasury
#[utoipa::path(
    get,
    path = "/api/v1/finance/treasuries/{treasury_id}",
    params(("treasury_id" = Uuid, Path, description = "Treasury ID")),
    responses(
        (status = 200, description = "Treasury", body = Treasury),
        (status = 404, description = "Treasury not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn get_treasury(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(treasury_id): Path<Uuid>,
) -> AppResult<Json<Treasury>> {
    auth.require(Resource::Finance, Action::Read)?;
    let treasury =
        sqlx::query_as::<_, Treasury>("SELECT * FROM treasuries WHERE id = $1 AND school_id = $2")
            .bind(treasury_id)
            .bind(auth.school_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Treasury {treasury_id} not found")))?;
    Ok(Json(treasury))
}

/// Compare the stored balance with the journal
#[utoipa::path(
    get,
    path = "/api/v1/finance/treasuries/{treasury_id}/reconcile",
    params(("treasury_id" = Uuid, Path, description = "Treasury ID")),
    responses((status = 200, description = "Reconciliation", body = TreasuryReconciliation)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn check_reconciliation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(treasury_id): Path<Uuid>,
) -> AppResult<Json<TreasuryReconciliation>> {
    auth.require(Resource::Finance, Action::Read)?;
    let mut tx = state.db.begin().await?;
    let report = ledger::reconcile_treasury(&mut tx, auth.school_id, treasury_id, false).await?;
    tx.commit().await?;
    Ok(Json(report))
}

/// Rewrite the stored balance from the journal
#[utoipa::path(
    post,
    path = "/api/v1/finance/treasuries/{treasury_id}/reconcile",
    params(("treasury_id" = Uuid, Path, description = "Treasury ID")),
    responses((status = 200, description = "Reconciliation", body = TreasuryReconciliation)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn reconcile(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(treasury_id): Path<Uuid>,
) -> AppResult<Json<TreasuryReconciliation>> {
    auth.require(Resource::Finance, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let report = ledger::reconcile_treasury(&mut tx, auth.school_id, treasury_id, true).await?;
    tx.commit().await?;
    Ok(Json(report))
}

/// Journal entries, newest first
#[utoipa::path(
    get,
    path = "/api/v1/finance/transactions",
    params(
        ("treasury_id" = Option<Uuid>, Query, description = "Filter by treasury"),
        ("source_kind" = Option<String>, Query, description = "OPENING, MANUAL, PAYMENT, EXPENSE or SALARY_PAYMENT"),
        ("from" = Option<chrono::NaiveDate>, Query, description = "First day, inclusive"),
        ("to" = Option<chrono::NaiveDate>, Query, description = "Last day, inclusive"),
    ),
    responses((status = 200, description = "Transactions", body = Vec<TreasuryTransaction>)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn list_transactions(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<TransactionQuery>,
) -> AppResult<Json<Vec<TreasuryTransaction>>> {
    auth.require(Resource::Finance, Action::Read)?;
    let rows = sqlx::query_as::<_, TreasuryTransaction>(
        r#"SELECT * FROM treasury_transactions
           WHERE school_id = $1
             AND ($2::uuid IS NULL OR treasury_id = $2)
             AND ($3::ledger_source IS NULL OR source_kind = $3)
             AND ($4::date IS NULL OR date >= $4)
             AND ($5::date IS NULL OR date <= $5)
           ORDER BY date DESC, created_at DESC
           LIMIT 500"#,
    )
    .bind(auth.school_id)
    .bind(q.treasury_id)
    .bind(q.source_kind)
    .bind(q.from)
    .bind(q.to)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// Post a manual deposit or withdrawal
#[utoipa::path(
    post,
    path = "/api/v1/finance/transactions",
    request_body = CreateManualEntryRequest,
    responses(
        (status = 201, description = "Entry posted", body = TreasuryTransaction),
        (status = 400, description = "Amount must be positive"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn create_manual_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateManualEntryRequest>,
) -> AppResult<(StatusCode, Json<TreasuryTransaction>)> {
    auth.require(Resource::Finance, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let entry =
        ledger::post_manual_entry(&mut tx, auth.school_id, &body, Utc::now().date_naive()).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Remove a manual entry
#[utoipa::path(
    delete,
    path = "/api/v1/finance/transactions/{entry_id}",
    params(("entry_id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Entry deleted", body = MessageResponse),
        (status = 409, description = "Entry was posted by another record"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn delete_manual_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Finance, Action::Delete)?;
    let mut tx = state.db.begin().await?;
    ledger::delete_manual_entry(&mut tx, auth.school_id, entry_id).await?;
    tx.commit().await?;
    Ok(Json(MessageResponse::new("Entry deleted")))
}
