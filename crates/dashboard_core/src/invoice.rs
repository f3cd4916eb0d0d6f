//! crates/dashboard_core/src/invoice.rs
//!
//! Pure invoice arithmetic: line totals, invoice totals, invoice numbers,
//! money formatting and subscription contract windows.

use chrono::{DateTime, Months, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::{ContractDuration, Invoice, InvoiceItem, InvoiceItemDraft, InvoiceStatus};
use crate::error::DashboardError;

/// Number of decimal places every displayed amount carries.
pub const PRICE_DECIMALS: u32 = 3;

/// Payment method recorded when the caller does not name one.
pub const DEFAULT_PAYMENT_METHOD: &str = "Credit Card";

/// Anything with a unit price and a quantity.
pub trait Priced {
    fn unit_price(&self) -> Decimal;
    fn quantity(&self) -> u32;
}

impl Priced for InvoiceItem {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
    fn quantity(&self) -> u32 {
        self.quantity
    }
}

impl Priced for InvoiceItemDraft {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Largest count (stock or quantity) the store can hold in a signed 32-bit column.
pub const MAX_COUNT: u32 = i32::MAX as u32;

/// Rejects quantities below one or above [`MAX_COUNT`].
pub fn check_quantity(quantity: u32) -> Result<u32, DashboardError> {
    if quantity == 0 {
        return Err(DashboardError::ValidationFailed(
            "Quantity must be at least 1".to_string(),
        ));
    }
    if quantity > MAX_COUNT {
        return Err(DashboardError::ValidationFailed(format!(
            "Quantity cannot exceed {}",
            MAX_COUNT
        )));
    }
    Ok(quantity)
}

pub fn line_total<P: Priced>(item: &P) -> Decimal {
    item.unit_price() * Decimal::from(item.quantity())
}

/// Sum of all line totals. An empty invoice totals zero.
pub fn invoice_total<'a, P, I>(items: I) -> Decimal
where
    P: Priced + 'a,
    I: IntoIterator<Item = &'a P>,
{
    items.into_iter().map(line_total).sum()
}

/// Builds `INV-<timestamp>-<sequence>` where the sequence is the existing
/// invoice count plus one, zero-padded to five digits.
pub fn next_invoice_number(existing_count: u64, timestamp_millis: i64) -> String {
    format!("INV-{}-{:05}", timestamp_millis, existing_count + 1)
}

/// Issues invoice numbers whose timestamp part strictly increases within the
/// process, so two invoices created in the same millisecond still differ.
#[derive(Debug, Default)]
pub struct InvoiceNumberGenerator {
    last_timestamp: AtomicI64,
}

impl InvoiceNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, existing_count: u64, now: DateTime<Utc>) -> String {
        let wanted = now.timestamp_millis();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(wanted.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        let issued = wanted.max(previous + 1);
        next_invoice_number(existing_count, issued)
    }
}

/// Formats an amount for display, e.g. `25.000 OMR`.
pub fn format_price(value: Decimal, currency_suffix: &str) -> String {
    let rounded = value.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.prec$} {}", rounded, currency_suffix, prec = PRICE_DECIMALS as usize)
}

/// Derives a contract window of `duration` starting at `start`.
pub fn contract_window(
    duration: ContractDuration,
    start: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let end = start.checked_add_months(Months::new(duration.months()))?;
    Some((start, end))
}

/// Invoice totals grouped by payment status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceSummary {
    pub invoice_count: usize,
    pub completed_total: Decimal,
    pub pending_total: Decimal,
    pub failed_total: Decimal,
}

pub fn summarize(invoices: &[Invoice]) -> InvoiceSummary {
    invoices
        .iter()
        .fold(InvoiceSummary::default(), |mut summary, invoice| {
            summary.invoice_count += 1;
            match invoice.status {
                InvoiceStatus::Completed => summary.completed_total += invoice.total,
                InvoiceStatus::Pending => summary.pending_total += invoice.total,
                InvoiceStatus::Failed => summary.failed_total += invoice.total,
            }
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductType;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn draft(price: i64, quantity: u32) -> InvoiceItemDraft {
        InvoiceItemDraft {
            product_id: Uuid::new_v4(),
            product_name: "Widget".to_string(),
            product_type: ProductType::Physical,
            quantity,
            unit_price: Decimal::from(price),
            contract_start: None,
            contract_end: None,
        }
    }

    #[test]
    fn empty_invoice_totals_zero() {
        let items: Vec<InvoiceItemDraft> = Vec::new();
        assert_eq!(invoice_total(&items), Decimal::ZERO);
    }

    #[test]
    fn total_sums_price_times_quantity() {
        let items = vec![draft(10, 2), draft(5, 1)];
        assert_eq!(line_total(&items[0]), Decimal::from(20));
        assert_eq!(invoice_total(&items), Decimal::from(25));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(matches!(check_quantity(0), Err(DashboardError::ValidationFailed(_))));
        assert_eq!(check_quantity(3).unwrap(), 3);
    }

    #[test]
    fn quantity_above_column_range_is_rejected() {
        assert_eq!(check_quantity(MAX_COUNT).unwrap(), MAX_COUNT);
        assert!(matches!(
            check_quantity(MAX_COUNT + 1),
            Err(DashboardError::ValidationFailed(_))
        ));
        assert!(matches!(
            check_quantity(3_000_000_000),
            Err(DashboardError::ValidationFailed(_))
        ));
    }

    #[test]
    fn numbers_differ_for_same_count_at_different_times() {
        let a = next_invoice_number(4, 1_736_503_200_000);
        let b = next_invoice_number(4, 1_736_503_200_001);
        assert_eq!(a, "INV-1736503200000-00005");
        assert_ne!(a, b);
    }

    #[test]
    fn generator_never_repeats_within_a_millisecond() {
        let generator = InvoiceNumberGenerator::new();
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap();
        let first = generator.next(0, now);
        let second = generator.next(0, now);
        let third = generator.next(0, now);
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(first, format!("INV-{}-00001", now.timestamp_millis()));
        assert_eq!(second, format!("INV-{}-00001", now.timestamp_millis() + 1));
    }

    #[test]
    fn prices_always_show_three_decimals() {
        assert_eq!(format_price(Decimal::from(25), "OMR"), "25.000 OMR");
        assert_eq!(format_price(Decimal::new(12345, 4), "OMR"), "1.235 OMR");
        assert_eq!(format_price(Decimal::new(5, 1), "USD"), "0.500 USD");
    }

    #[test]
    fn contract_window_adds_calendar_months() {
        let start = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let (_, end) = contract_window(ContractDuration::OneMonth, start).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
        let (_, end) = contract_window(ContractDuration::OneYear, start).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap());
    }
}
