// src/models/inventory.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Vendor ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Vendor {
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    pub contact_email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVendorRequest {
    pub name: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub phone: String,
}

// ─── Item ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "item_category", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    Uniform,
    Book,
    Equip,
    Toy,
    Asset,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    pub sku: String,
    pub vendor_id: Option<Uuid>,
    pub category: ItemCategory,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub min_required: i32,
    pub reorder_level: i32,
    pub last_restock: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    pub name: String,
    pub sku: String,
    pub vendor_id: Option<Uuid>,
    pub category: ItemCategory,
    pub unit_price: Decimal,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub min_required: i32,
    #[serde(default)]
    pub reorder_level: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub category: Option<ItemCategory>,
    pub unit_price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub min_required: Option<i32>,
    pub reorder_level: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    pub category: Option<ItemCategory>,
    pub vendor_id: Option<Uuid>,
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
}

// ─── Custody ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CustodyAssignment {
    pub id: Uuid,
    pub school_id: Uuid,
    pub item_id: Uuid,
    pub quantity: i32,
    pub staff_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub assigned_on: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCustodyRequest {
    pub item_id: Uuid,
    #[serde(default = "default_custody_quantity")]
    pub quantity: i32,
    pub staff_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub assigned_on: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

fn default_custody_quantity() -> i32 {
    1
}

/// The holder of a custody assignment: exactly one of staff or student.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Custodian {
    Staff(Uuid),
    Student(Uuid),
}

impl CreateCustodyRequest {
    pub fn custodian(&self) -> Result<Custodian, &'static str> {
        match (self.staff_id, self.student_id) {
            (Some(staff), None) => Ok(Custodian::Staff(staff)),
            (None, Some(student)) => Ok(Custodian::Student(student)),
            (None, None) => Err("Must assign to staff or student"),
            (Some(_), Some(_)) => Err("Choose either staff or student, not both"),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnCustodyRequest {
    pub return_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CustodyQuery {
    pub staff_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    #[serde(default)]
    pub open_only: bool,
}

// ─── Stock take ──────────────────────────────────────────────────────────────

/// A stock count joined with the item's current quantity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StockTake {
    pub id: Uuid,
    pub school_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub date: NaiveDate,
    pub counted_quantity: i32,
    pub system_quantity: i32,
    pub responsible_staff_id: Option<Uuid>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub discrepancy: i32,
}

impl StockTake {
    pub fn with_discrepancy(mut self) -> Self {
        self.discrepancy = discrepancy(self.counted_quantity, self.system_quantity);
        self
    }
}

/// Counted minus recorded quantity; negative means stock is missing.
pub fn discrepancy(counted_quantity: i32, system_quantity: i32) -> i32 {
    counted_quantity - system_quantity
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStockTakeRequest {
    pub item_id: Uuid,
    pub date: Option<NaiveDate>,
    pub counted_quantity: i32,
    pub responsible_staff_id: Option<Uuid>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct StockTakeQuery {
    pub item_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custody(staff: Option<Uuid>, student: Option<Uuid>) -> CreateCustodyRequest {
        CreateCustodyRequest {
            item_id: Uuid::new_v4(),
            quantity: 1,
            staff_id: staff,
            student_id: student,
            assigned_on: None,
            notes: String::new(),
        }
    }

    #[test]
    fn custody_needs_exactly_one_holder() {
        let staff = Uuid::new_v4();
        let student = Uuid::new_v4();
        assert_eq!(
            custody(Some(staff), None).custodian(),
            Ok(Custodian::Staff(staff))
        );
        assert_eq!(
            custody(None, Some(student)).custodian(),
            Ok(Custodian::Student(student))
        );
        assert!(custody(None, None).custodian().is_err());
        assert!(custody(Some(staff), Some(student)).custodian().is_err());
    }

    #[test]
    fn discrepancy_is_counted_minus_recorded() {
        assert_eq!(discrepancy(8, 10), -2);
        assert_eq!(discrepancy(12, 10), 2);
        assert_eq!(discrepancy(0, 0), 0);
    }
}
