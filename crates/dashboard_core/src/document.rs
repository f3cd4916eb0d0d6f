//! crates/dashboard_core/src/document.rs
//!
//! The printable view of an invoice handed to a `DocumentRenderer`.
//! All amounts arrive already computed and formatted; renderers only lay them out.

use crate::domain::{CustomerSnapshot, Invoice};
use crate::invoice::{format_price, line_total};

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLine {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDocument {
    pub number: String,
    pub date: String,
    pub customer: CustomerSnapshot,
    pub lines: Vec<DocumentLine>,
    pub total: String,
    pub status: String,
    pub payment_method: String,
}

impl InvoiceDocument {
    pub fn from_invoice(invoice: &Invoice, currency_suffix: &str) -> Self {
        let lines = invoice
            .items
            .iter()
            .map(|item| DocumentLine {
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: format_price(item.unit_price, currency_suffix),
                line_total: format_price(line_total(item), currency_suffix),
            })
            .collect();

        Self {
            number: invoice.number.clone(),
            date: invoice.created_at.format("%Y-%m-%d").to_string(),
            customer: invoice.customer.clone(),
            lines,
            total: format_price(invoice.total, currency_suffix),
            status: invoice.status.as_str().to_string(),
            payment_method: invoice.payment_method.clone(),
        }
    }

    /// The download name, e.g. `invoice-INV-1736503200000-00001`.
    pub fn file_stem(&self) -> String {
        format!("invoice-{}", self.number)
    }
}

/// The output of a renderer, ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}
