// src/services/documents/mod.rs
//
// Report builders produce a `ReportTable`; the renderers turn it into bytes.

pub mod pdf;
pub mod xlsx;

use crate::errors::AppResult;
use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Money(Decimal),
    Int(i64),
    Date(NaiveDate),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Money(d) => format!("{:.2}", d.round_dp(2)),
            Cell::Int(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Empty => String::new(),
        }
    }
}

impl From<Option<NaiveDate>> for Cell {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map(Cell::Date).unwrap_or(Cell::Empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    pub title: String,
    pub subtitle: Vec<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Label/value lines printed under the table.
    pub totals: Vec<(String, Cell)>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn subtitle(mut self, line: impl Into<String>) -> Self {
        self.subtitle.push(line.into());
        self
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn push_total(&mut self, label: impl Into<String>, value: Cell) {
        self.totals.push((label.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Xlsx,
}

impl DocumentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn from_file_name(name: &str) -> Self {
        if name.ends_with(".xlsx") {
            DocumentFormat::Xlsx
        } else {
            DocumentFormat::Pdf
        }
    }
}

pub fn render(table: &ReportTable, format: DocumentFormat) -> AppResult<Vec<u8>> {
    match format {
        DocumentFormat::Pdf => pdf::render(table),
        DocumentFormat::Xlsx => xlsx::render(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cells_format_for_display() {
        assert_eq!(Cell::Money(dec!(12.5)).display(), "12.50");
        assert_eq!(Cell::Money(dec!(3.14159)).display(), "3.14");
        assert_eq!(Cell::Int(-4).display(), "-4");
        assert_eq!(
            Cell::Date(NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()).display(),
            "2025-01-09"
        );
        assert_eq!(Cell::from(None::<NaiveDate>), Cell::Empty);
    }

    #[test]
    fn formats_know_their_mime_types() {
        assert_eq!(DocumentFormat::Pdf.content_type(), "application/pdf");
        assert_eq!(DocumentFormat::from_file_name("report.xlsx"), DocumentFormat::Xlsx);
        assert_eq!(DocumentFormat::from_file_name("report.pdf"), DocumentFormat::Pdf);
    }
}
