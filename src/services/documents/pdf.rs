// src/services/documents/pdf.rs

use super::ReportTable;
use crate::errors::{AppError, AppResult};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};
use std::io::BufWriter;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT: f32 = 15.0;
const RIGHT: f32 = 195.0;
const TOP: f32 = 282.0;
const BOTTOM: f32 = 20.0;
const ROW_HEIGHT: f32 = 6.0;

struct Writer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    page: usize,
}

impl Writer {
    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.font };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn rule(&self) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(LEFT), Mm(self.y)), false),
                (Point::new(Mm(RIGHT), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page += 1;
        self.y = TOP;
    }

    /// Start a new page when fewer than `needed` millimetres remain.
    fn ensure_space(&mut self, needed: f32) -> bool {
        if self.y - needed < BOTTOM {
            self.new_page();
            true
        } else {
            false
        }
    }
}

/// Trim `text` to roughly fit `width_mm` at a 9pt font.
fn fit(text: &str, width_mm: f32) -> String {
    let max_chars = ((width_mm / 1.9).floor() as usize).max(3);
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars - 2).collect();
        format!("{kept}..")
    }
}

pub fn render(table: &ReportTable) -> AppResult<Vec<u8>> {
    let (doc, page1, layer1) =
        PdfDocument::new(&table.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Report(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::Report(e.to_string()))?;

    let mut w = Writer {
        doc,
        layer,
        font,
        bold,
        y: TOP,
        page: 1,
    };

    w.text(&table.title, 16.0, LEFT, true);
    w.y -= 8.0;
    for line in &table.subtitle {
        w.text(line, 10.0, LEFT, false);
        w.y -= 5.0;
    }
    w.y -= 3.0;

    let columns = table.headers.len().max(1);
    let col_width = (RIGHT - LEFT) / columns as f32;
    let col_x = |i: usize| LEFT + col_width * i as f32;

    let header = |w: &Writer| {
        for (i, h) in table.headers.iter().enumerate() {
            w.text(&fit(h, col_width), 9.0, col_x(i), true);
        }
    };

    header(&w);
    w.y -= 2.5;
    w.rule();
    w.y -= 5.0;

    for row in &table.rows {
        if w.ensure_space(ROW_HEIGHT) {
            header(&w);
            w.y -= 2.5;
            w.rule();
            w.y -= 5.0;
        }
        for (i, cell) in row.iter().enumerate().take(columns) {
            w.text(&fit(&cell.display(), col_width), 9.0, col_x(i), false);
        }
        w.y -= ROW_HEIGHT;
    }

    if !table.totals.is_empty() {
        w.ensure_space(8.0 + ROW_HEIGHT * table.totals.len() as f32);
        w.y += 2.0;
        w.rule();
        w.y -= 6.0;
        for (label, value) in &table.totals {
            w.text(label, 10.0, RIGHT - 75.0, true);
            w.text(&value.display(), 10.0, RIGHT - 30.0, true);
            w.y -= ROW_HEIGHT;
        }
    }

    let pages = w.page;
    let mut writer = BufWriter::new(Vec::<u8>::new());
    w.doc
        .save(&mut writer)
        .map_err(|e| AppError::Report(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Report(e.to_string()))?;

    tracing::debug!(title = %table.title, pages, bytes = bytes.len(), "pdf rendered");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::documents::Cell;
    use rust_decimal_macros::dec;

    #[test]
    fn fit_truncates_long_text() {
        assert_eq!(fit("short", 60.0), "short");
        let long = "a".repeat(100);
        let fitted = fit(&long, 20.0);
        assert!(fitted.ends_with(".."));
        assert!(fitted.chars().count() <= 10);
    }

    #[test]
    fn renders_a_multi_page_table() {
        let mut table = ReportTable::new("Low stock", &["Item", "SKU", "Qty"])
            .subtitle("Generated for tests");
        for n in 0..120 {
            table.push_row(vec![
                Cell::text(format!("Item {n}")),
                Cell::text(format!("SKU-{n}")),
                Cell::Int(n),
            ]);
        }
        table.push_total("Total", Cell::Money(dec!(10)));

        let bytes = render(&table).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
