//! Spreadsheet export of the catalog.
//!
//! [`rows`] lays out the cells and [`workbook`] renders them to xlsx bytes.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::{ProductError, ProductResult};
use crate::models::Product;

pub const SHEET_NAME: &str = "Products";

pub const HEADERS: [&str; 7] = [
    "ID",
    "Code",
    "Name",
    "Category",
    "Price",
    "Quantity",
    "Description",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

/// Header row followed by one row per product.
pub fn rows(products: &[Product]) -> Vec<Vec<Cell>> {
    let header = HEADERS.iter().map(|h| Cell::Text(h.to_string())).collect();

    std::iter::once(header)
        .chain(products.iter().map(|p| {
            vec![
                Cell::Number(p.id as f64),
                Cell::Text(p.product_code.clone()),
                Cell::Text(p.name.clone()),
                Cell::Text(p.category.clone()),
                Cell::Number(p.price.to_f64().unwrap_or_default()),
                Cell::Number(f64::from(p.quantity)),
                Cell::Text(p.description.clone().unwrap_or_default()),
            ]
        }))
        .collect()
}

/// Render `products` as an in-memory xlsx file.
pub fn workbook(products: &[Product]) -> ProductResult<Vec<u8>> {
    render(&rows(products)).map_err(|e| ProductError::Internal(format!("Export failed: {}", e)))
}

fn render(rows: &[Vec<Cell>]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (r, row) in rows.iter().enumerate() {
        let r = r as u32;
        for (c, cell) in row.iter().enumerate() {
            let c = c as u16;
            match cell {
                Cell::Text(text) if r == 0 => {
                    sheet.write_string_with_format(r, c, text, &bold)?;
                }
                Cell::Text(text) => {
                    sheet.write_string(r, c, text)?;
                }
                Cell::Number(n) => {
                    sheet.write_number(r, c, *n)?;
                }
            }
        }
    }

    workbook.save_to_buffer()
}

/// `products_<yyyy-MM-dd_HH-mm-ss>.xlsx`
pub fn file_name(now: DateTime<Utc>) -> String {
    format!("products_{}.xlsx", now.format("%Y-%m-%d_%H-%M-%S"))
}
