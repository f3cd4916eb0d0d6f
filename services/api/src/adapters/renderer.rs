//! services/api/src/adapters/renderer.rs
//!
//! A PDF implementation of the `DocumentRenderer` port, built with `printpdf`.
//! Invoices are laid out as A4 pages of fixed line height, each with a
//! "Page n of m" footer.

use dashboard_core::document::{InvoiceDocument, RenderedDocument};
use dashboard_core::ports::{DocumentRenderer, PortError, PortResult};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 5.0;
const FONT_SIZE: f32 = 10.0;
const HEADING_SIZE: f32 = 16.0;
const RULE_WIDTH: usize = 60;

/// Lines reserved at the bottom of each page for the page counter.
const FOOTER_LINES: usize = 2;
const MIN_PAGE_LINES: usize = 10;
/// What fits between the margins of an A4 page at the fixed line height.
const MAX_PAGE_LINES: usize = ((PAGE_HEIGHT_MM - 2.0 * MARGIN_MM) / LINE_HEIGHT_MM) as usize;

#[derive(Clone, Debug)]
pub struct PdfInvoiceRenderer {
    heading: String,
    page_lines: usize,
}

impl PdfInvoiceRenderer {
    /// Creates a renderer. `page_lines` is clamped to what an A4 page can hold
    /// and never drops below ten.
    pub fn new(heading: impl Into<String>, page_lines: usize) -> Self {
        Self {
            heading: heading.into(),
            page_lines: page_lines.clamp(MIN_PAGE_LINES, MAX_PAGE_LINES),
        }
    }

    fn body_lines(&self, doc: &InvoiceDocument) -> Vec<String> {
        let rule = "-".repeat(RULE_WIDTH);
        let mut lines = vec![
            format!("Invoice number: {}", doc.number),
            format!("Date: {}", doc.date),
            String::new(),
            "Customer".to_string(),
            format!("  Name: {}", doc.customer.name),
            format!("  Email: {}", doc.customer.email),
            format!("  Phone: {}", doc.customer.phone),
            format!("  Address: {}", doc.customer.address),
            String::new(),
            "Products".to_string(),
            rule.clone(),
        ];
        for line in &doc.lines {
            lines.push(line.product_name.clone());
            lines.push(format!("  Quantity: {}", line.quantity));
            lines.push(format!("  Price: {}", line.unit_price));
            lines.push(format!("  Total: {}", line.line_total));
        }
        lines.push(rule);
        lines.push(format!("Invoice total: {}", doc.total));
        lines.push(format!("Payment status: {}", doc.status));
        lines.push(format!("Payment method: {}", doc.payment_method));
        lines
    }

    /// Splits the body into pages. The first page also carries the heading
    /// and a blank line under it.
    fn paginate(&self, doc: &InvoiceDocument) -> Vec<Vec<String>> {
        let per_page = self.page_lines - FOOTER_LINES;
        let mut body = self.body_lines(doc).into_iter();
        let mut pages = Vec::new();

        let first: Vec<String> = body.by_ref().take(per_page - 2).collect();
        pages.push(first);
        loop {
            let page: Vec<String> = body.by_ref().take(per_page).collect();
            if page.is_empty() {
                break;
            }
            pages.push(page);
        }
        pages
    }
}

fn pdf_error(e: printpdf::Error) -> PortError {
    PortError::Unexpected(format!("Failed to build PDF: {}", e))
}

fn write_lines(layer: &PdfLayerReference, font: &IndirectFontRef, lines: &[String], mut row: usize) {
    for line in lines {
        let y = PAGE_HEIGHT_MM - MARGIN_MM - LINE_HEIGHT_MM * row as f32;
        layer.use_text(line.as_str(), FONT_SIZE, Mm(MARGIN_MM), Mm(y), font);
        row += 1;
    }
}

impl DocumentRenderer for PdfInvoiceRenderer {
    fn render_invoice(&self, document: &InvoiceDocument) -> PortResult<RenderedDocument> {
        let pages = self.paginate(document);
        let page_count = pages.len();
        let title = format!("{} {}", self.heading, document.number);

        let (doc, first_page, first_layer) = PdfDocument::new(
            title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Page 1",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        for (index, lines) in pages.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) = doc.add_page(
                    Mm(PAGE_WIDTH_MM),
                    Mm(PAGE_HEIGHT_MM),
                    format!("Page {}", index + 1),
                );
                doc.get_page(page).get_layer(layer)
            };

            let mut row = 0;
            if index == 0 {
                layer.use_text(
                    self.heading.as_str(),
                    HEADING_SIZE,
                    Mm(MARGIN_MM),
                    Mm(PAGE_HEIGHT_MM - MARGIN_MM),
                    &bold,
                );
                row = 2;
            }
            write_lines(&layer, &font, lines, row);

            layer.use_text(
                format!("Page {} of {}", index + 1, page_count),
                FONT_SIZE,
                Mm(MARGIN_MM),
                Mm(MARGIN_MM),
                &font,
            );
        }

        let body = doc.save_to_bytes().map_err(pdf_error)?;
        Ok(RenderedDocument {
            file_name: format!("{}.pdf", document.file_stem()),
            content_type: "application/pdf",
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::document::DocumentLine;
    use dashboard_core::domain::CustomerSnapshot;

    fn document(items: usize) -> InvoiceDocument {
        InvoiceDocument {
            number: "INV-1736503200000-00001".to_string(),
            date: "2025-01-10".to_string(),
            customer: CustomerSnapshot {
                name: "Salim".to_string(),
                email: "salim@example.com".to_string(),
                phone: "99887766".to_string(),
                address: "Sohar".to_string(),
            },
            lines: (0..items)
                .map(|i| DocumentLine {
                    product_name: format!("Item {}", i),
                    quantity: 1,
                    unit_price: "1.000 OMR".to_string(),
                    line_total: "1.000 OMR".to_string(),
                })
                .collect(),
            total: format!("{}.000 OMR", items),
            status: "Completed".to_string(),
            payment_method: "Credit Card".to_string(),
        }
    }

    fn page_count(pdf: &[u8]) -> usize {
        lopdf::Document::load_mem(pdf).unwrap().get_pages().len()
    }

    #[test]
    fn short_invoice_is_a_single_page_pdf() {
        let rendered = PdfInvoiceRenderer::new("INVOICE", 50)
            .render_invoice(&document(2))
            .unwrap();

        assert_eq!(rendered.file_name, "invoice-INV-1736503200000-00001.pdf");
        assert_eq!(rendered.content_type, "application/pdf");
        assert!(rendered.body.starts_with(b"%PDF-"));
        assert_eq!(page_count(&rendered.body), 1);
    }

    #[test]
    fn long_invoice_spans_several_pages() {
        let renderer = PdfInvoiceRenderer::new("INVOICE", 10);
        let invoice = document(40);
        let layout = renderer.paginate(&invoice);
        let rendered = renderer.render_invoice(&invoice).unwrap();

        assert!(layout.len() > 1);
        for page in &layout {
            assert!(page.len() <= 10 - FOOTER_LINES);
        }
        assert!(rendered.body.starts_with(b"%PDF-"));
        assert_eq!(page_count(&rendered.body), layout.len());
    }

    #[test]
    fn page_height_is_clamped_to_the_paper() {
        assert_eq!(PdfInvoiceRenderer::new("INVOICE", 1).page_lines, MIN_PAGE_LINES);
        assert_eq!(PdfInvoiceRenderer::new("INVOICE", 500).page_lines, MAX_PAGE_LINES);
    }

    #[test]
    fn every_body_line_lands_on_some_page() {
        let renderer = PdfInvoiceRenderer::new("INVOICE", 12);
        let invoice = document(7);
        let flattened: Vec<String> = renderer.paginate(&invoice).concat();
        assert_eq!(flattened, renderer.body_lines(&invoice));
        assert_eq!(flattened.last().unwrap(), "Payment method: Credit Card");
    }
}
