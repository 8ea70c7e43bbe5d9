//! Router tests that need real accounts: role checks, account revalidation,
//! and the HR and student record endpoints.

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use common::token_for;
use school_erp::policy::Role;

fn get(uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, bearer: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A fresh school with one account of `role`; returns the router and its token.
async fn signed_in(pool: &PgPool, role: Role) -> (Router, Uuid, Uuid, String) {
    let school_id = common::school(pool).await;
    let user_id = common::user(pool, school_id, role).await;
    let token = token_for(user_id, school_id, role);
    (common::app(pool.clone()), school_id, user_id, token)
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deactivated_account_is_rejected_despite_a_valid_token() {
    let Some(pool) = common::pool().await else { return };
    let (app, _, user_id, token) = signed_in(&pool, Role::Administrator).await;

    let res = app.clone().oneshot(get("/api/v1/core/permissions", &token)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    let res = app.oneshot(get("/api/v1/core/permissions", &token)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn demoted_account_loses_the_role_in_its_token() {
    let Some(pool) = common::pool().await else { return };
    let (app, _, user_id, token) = signed_in(&pool, Role::Administrator).await;

    sqlx::query("UPDATE users SET role = 'teacher' WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    let res = app.clone().oneshot(get("/api/v1/finance/invoices", &token)).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.oneshot(get("/api/v1/core/permissions", &token)).await.unwrap();
    assert_eq!(json_body(res).await["role"], "TEACHER");
}

#[tokio::test]
async fn token_for_an_unknown_account_is_unauthorized() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let token = token_for(Uuid::new_v4(), school_id, Role::Administrator);

    let res = common::app(pool)
        .oneshot(get("/api/v1/core/permissions", &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// ─── Roles ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn teacher_cannot_read_finance_or_dashboard() {
    let Some(pool) = common::pool().await else { return };
    let (app, _, _, token) = signed_in(&pool, Role::Teacher).await;
    for uri in ["/api/v1/finance/invoices", "/api/v1/core/dashboard", "/api/v1/hr/staff"] {
        let res = app.clone().oneshot(get(uri, &token)).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn permissions_reflect_the_role() {
    let Some(pool) = common::pool().await else { return };
    let (app, _, _, token) = signed_in(&pool, Role::FinanceManager).await;
    let res = app.oneshot(get("/api/v1/core/permissions", &token)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["role"], "FINANCE_MANAGER");
    assert_eq!(body["can_access_finance"], true);
    assert_eq!(body["can_access_student"], true);
    assert_eq!(body["can_access_hr"], true);
}

#[tokio::test]
async fn report_needs_read_access_to_its_sources() {
    let Some(pool) = common::pool().await else { return };
    // Inventory managers can request reports but cannot read finance data.
    let (app, _, _, token) = signed_in(&pool, Role::InventoryManager).await;
    let res = app
        .oneshot(post_json(
            "/api/v1/reporting/jobs",
            &token,
            json!({"report_type": "PNL", "parameters": {"start": "2025-01-01", "end": "2025-01-31"}}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ranged_report_without_dates_is_rejected() {
    let Some(pool) = common::pool().await else { return };
    let (app, _, _, token) = signed_in(&pool, Role::FinanceManager).await;
    let res = app
        .oneshot(post_json(
            "/api/v1/reporting/jobs",
            &token,
            json!({"report_type": "PNL", "parameters": {}}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn custody_requires_exactly_one_holder() {
    let Some(pool) = common::pool().await else { return };
    let (app, _, _, token) = signed_in(&pool, Role::InventoryManager).await;
    let res = app
        .oneshot(post_json(
            "/api/v1/inventory/custody",
            &token,
            json!({
                "item_id": Uuid::new_v4(),
                "staff_id": Uuid::new_v4(),
                "student_id": Uuid::new_v4()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn purchase_order_quantity_must_be_positive() {
    let Some(pool) = common::pool().await else { return };
    let (app, _, _, token) = signed_in(&pool, Role::FinanceManager).await;
    let res = app
        .oneshot(post_json(
            "/api/v1/finance/purchase-orders",
            &token,
            json!({"vendor_id": Uuid::new_v4(), "item_id": Uuid::new_v4(), "quantity": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ─── HR records ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn vacation_requests_start_unapproved_until_approved() {
    let Some(pool) = common::pool().await else { return };
    let (app, school_id, _, token) = signed_in(&pool, Role::HrManager).await;
    let staff_id = common::staff(&pool, school_id).await;

    let res = app
        .clone()
        .oneshot(post_json(
            "/api/v1/hr/vacations",
            &token,
            json!({"staff_id": staff_id, "start_date": "2025-07-10", "end_date": "2025-07-01"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(post_json(
            "/api/v1/hr/vacations",
            &token,
            json!({
                "staff_id": staff_id,
                "start_date": "2025-07-01",
                "end_date": "2025-07-10",
                "note": "Summer"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let vacation = json_body(res).await;
    assert_eq!(vacation["approved"], false);
    let id = vacation["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(post_json(&format!("/api/v1/hr/vacations/{id}/approve"), &token, json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["approved"], true);

    let res = app
        .oneshot(get("/api/v1/hr/vacations?approved=true", &token))
        .await
        .unwrap();
    let listed = json_body(res).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["note"], "Summer");
}

#[tokio::test]
async fn staff_evaluations_are_listed_per_member() {
    let Some(pool) = common::pool().await else { return };
    let (app, school_id, _, token) = signed_in(&pool, Role::HrManager).await;
    let staff_id = common::staff(&pool, school_id).await;

    let res = app
        .clone()
        .oneshot(post_json(
            "/api/v1/hr/evaluations",
            &token,
            json!({"staff_id": staff_id, "summary": "   "}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(post_json(
            "/api/v1/hr/evaluations",
            &token,
            json!({"staff_id": staff_id, "eval_date": "2025-06-30", "summary": "Strong term"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .oneshot(get(&format!("/api/v1/hr/staff/{staff_id}/evaluations"), &token))
        .await
        .unwrap();
    let listed = json_body(res).await;
    assert_eq!(listed[0]["summary"], "Strong term");
    assert_eq!(listed[0]["eval_date"], "2025-06-30");
}

// ─── Student records ─────────────────────────────────────────────────────────

#[tokio::test]
async fn student_evaluation_defaults_to_on_track() {
    let Some(pool) = common::pool().await else { return };
    let (app, school_id, _, token) = signed_in(&pool, Role::Teacher).await;
    let student_id = common::student(&pool, school_id, None).await;

    let res = app
        .clone()
        .oneshot(post_json(
            "/api/v1/student/evaluations",
            &token,
            json!({"student_id": student_id, "date": "2025-05-01", "follow_up_date": "2025-04-01"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(post_json(
            "/api/v1/student/evaluations",
            &token,
            json!({
                "student_id": student_id,
                "date": "2025-05-01",
                "general_notes": "Reads well",
                "follow_up_date": "2025-06-01"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(json_body(res).await["status"], "ON_TRACK");

    let res = app
        .oneshot(get(&format!("/api/v1/student/students/{student_id}/evaluations"), &token))
        .await
        .unwrap();
    let listed = json_body(res).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["general_notes"], "Reads well");
}
