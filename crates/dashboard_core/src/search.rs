//! crates/dashboard_core/src/search.rs
//!
//! Search-box filtering for list screens. An empty query matches everything.

use crate::domain::{Customer, Invoice, Product};

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Name and email match case-insensitively; phone numbers match as typed.
pub fn customer_matches(customer: &Customer, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let lower = query.to_lowercase();
    contains_ignore_case(&customer.name, &lower)
        || contains_ignore_case(&customer.email, &lower)
        || customer.phone.contains(query)
}

pub fn product_matches(product: &Product, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || contains_ignore_case(&product.name, &query.to_lowercase())
}

/// Matches on the customer name, the invoice number or the payment method.
pub fn invoice_matches(invoice: &Invoice, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let lower = query.to_lowercase();
    contains_ignore_case(&invoice.customer.name, &lower)
        || contains_ignore_case(&invoice.number, &lower)
        || contains_ignore_case(&invoice.payment_method, &lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn customer() -> Customer {
        Customer {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Aisha Al-Harthy".to_string(),
            email: "Aisha@Example.com".to_string(),
            phone: "+968 9123 4567".to_string(),
            address: "Muscat".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn customer_search_covers_name_email_and_phone() {
        let c = customer();
        assert!(customer_matches(&c, ""));
        assert!(customer_matches(&c, "aisha"));
        assert!(customer_matches(&c, "EXAMPLE.COM"));
        assert!(customer_matches(&c, "9123"));
        assert!(!customer_matches(&c, "muscat"));
    }
}
