// src/services/numbering.rs

use crate::errors::AppResult;
use sqlx::PgConnection;
use uuid::Uuid;

pub const INVOICE_PREFIX: &str = "INV";
pub const PURCHASE_ORDER_PREFIX: &str = "PO";

/// Allocate the next per-school number for `prefix`. The upsert holds the counter
/// row lock until the surrounding transaction ends, so numbers never repeat.
pub async fn next_number(conn: &mut PgConnection, school_id: Uuid, prefix: &str) -> AppResult<String> {
    let value: i32 = sqlx::query_scalar(
        r#"INSERT INTO document_sequences (school_id, prefix, last_value)
           VALUES ($1, $2, 1)
           ON CONFLICT (school_id, prefix)
           DO UPDATE SET last_value = document_sequences.last_value + 1
           RETURNING last_value"#,
    )
    .bind(school_id)
    .bind(prefix)
    .fetch_one(&mut *conn)
    .await?;

    Ok(format_number(prefix, value))
}

pub fn format_number(prefix: &str, value: i32) -> String {
    format!("{prefix}-{value:04}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_four_digits() {
        assert_eq!(format_number(INVOICE_PREFIX, 1), "INV-0001");
        assert_eq!(format_number(PURCHASE_ORDER_PREFIX, 42), "PO-0042");
        assert_eq!(format_number(INVOICE_PREFIX, 12345), "INV-12345");
    }
}
