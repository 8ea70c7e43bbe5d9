// src/services/documents/xlsx.rs
//
// Minimal SpreadsheetML package: one worksheet with inline strings.

use super::{Cell, ReportTable};
use crate::errors::{AppError, AppResult};
use std::io::{Cursor, Write};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

fn workbook(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
        escape(sheet_name)
    )
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' && c != '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Spreadsheet column letters: 0 -> A, 25 -> Z, 26 -> AA.
pub fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn cell_xml(col: usize, row: usize, cell: &Cell) -> String {
    let r = format!("{}{}", column_name(col), row);
    match cell {
        Cell::Money(_) => format!(r#"<c r="{r}"><v>{}</v></c>"#, cell.display()),
        Cell::Int(n) => format!(r#"<c r="{r}"><v>{n}</v></c>"#),
        Cell::Empty => String::new(),
        other => format!(
            r#"<c r="{r}" t="inlineStr"><is><t>{}</t></is></c>"#,
            escape(&other.display())
        ),
    }
}

fn row_xml(row: usize, cells: &[Cell]) -> String {
    let body: String = cells
        .iter()
        .enumerate()
        .map(|(col, cell)| cell_xml(col, row, cell))
        .collect();
    format!(r#"<row r="{row}">{body}</row>"#)
}

fn sheet(table: &ReportTable) -> String {
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    rows.push(vec![Cell::text(&table.title)]);
    for line in &table.subtitle {
        rows.push(vec![Cell::text(line)]);
    }
    rows.push(Vec::new());
    rows.push(table.headers.iter().map(Cell::text).collect());
    rows.extend(table.rows.iter().cloned());
    if !table.totals.is_empty() {
        rows.push(Vec::new());
        for (label, value) in &table.totals {
            rows.push(vec![Cell::text(label), value.clone()]);
        }
    }

    let data: String = rows
        .iter()
        .enumerate()
        .map(|(i, cells)| row_xml(i + 1, cells))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
    )
}

pub fn render(table: &ReportTable) -> AppResult<Vec<u8>> {
    let sheet_name: String = table.title.chars().take(31).collect();
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook(&sheet_name)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet(table)),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, body) in parts {
        zip.start_file(name, options)
            .map_err(|e| AppError::Report(e.to_string()))?;
        zip.write_all(body.as_bytes())
            .map_err(|e| AppError::Report(e.to_string()))?;
    }

    let cursor = zip.finish().map_err(|e| AppError::Report(e.to_string()))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Read;

    #[test]
    fn column_names_roll_over() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("Tom & Jerry <3"), "Tom &amp; Jerry &lt;3");
    }

    #[test]
    fn package_contains_the_worksheet() {
        let mut table = ReportTable::new("Inventory valuation", &["Item", "Qty", "Value"]);
        table.push_row(vec![Cell::text("Chalk & Co"), Cell::Int(4), Cell::Money(dec!(8.5))]);
        table.push_total("Total", Cell::Money(dec!(8.5)));

        let bytes = render(&table).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("[Content_Types].xml").is_ok());

        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();
        assert!(sheet.contains("Chalk &amp; Co"));
        assert!(sheet.contains(r#"<c r="B4"><v>4</v></c>"#));
        assert!(sheet.contains("<v>8.50</v>"));
    }
}
