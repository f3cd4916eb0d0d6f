//! crates/dashboard_core/src/domain.rs
//!
//! Defines the pure, core data structures for the dashboard.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// The id of the user account a record belongs to.
pub type UserId = Uuid;

//=========================================================================================
// Users & Auth
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: UserId,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Customers
//=========================================================================================

/// A customer record owned by one user account.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub owner_id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

//=========================================================================================
// Products
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProductStatus::Active),
            "inactive" => Some(ProductStatus::Inactive),
            _ => None,
        }
    }
}

/// The discriminant of a [`ProductKind`], also stored on invoice items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductType {
    Physical,
    Subscription,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Physical => "physical",
            ProductType::Subscription => "subscription",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "physical" => Some(ProductType::Physical),
            "subscription" => Some(ProductType::Subscription),
            _ => None,
        }
    }
}

/// How long a subscription contract runs once sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractDuration {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl ContractDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractDuration::OneMonth => "1-month",
            ContractDuration::ThreeMonths => "3-months",
            ContractDuration::SixMonths => "6-months",
            ContractDuration::OneYear => "1-year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1-month" => Some(ContractDuration::OneMonth),
            "3-months" => Some(ContractDuration::ThreeMonths),
            "6-months" => Some(ContractDuration::SixMonths),
            "1-year" => Some(ContractDuration::OneYear),
            _ => None,
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            ContractDuration::OneMonth => 1,
            ContractDuration::ThreeMonths => 3,
            ContractDuration::SixMonths => 6,
            ContractDuration::OneYear => 12,
        }
    }
}

/// Kind-specific product data. A physical product never carries subscription
/// fields and vice versa.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductKind {
    Physical {
        stock: u32,
        purchase_price: Decimal,
    },
    Subscription {
        details: String,
        contract_duration: ContractDuration,
    },
}

impl ProductKind {
    pub fn product_type(&self) -> ProductType {
        match self {
            ProductKind::Physical { .. } => ProductType::Physical,
            ProductKind::Subscription { .. } => ProductType::Subscription,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: UserId,
    pub name: String,
    pub kind: ProductKind,
    pub selling_price: Decimal,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub kind: ProductKind,
    pub selling_price: Decimal,
    pub status: ProductStatus,
}

/// A partial update to a product. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub selling_price: Option<Decimal>,
    pub status: Option<ProductStatus>,
}

//=========================================================================================
// Invoices
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Completed,
    Pending,
    Failed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Completed => "Completed",
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Completed" => Some(InvoiceStatus::Completed),
            "Pending" => Some(InvoiceStatus::Pending),
            "Failed" => Some(InvoiceStatus::Failed),
            _ => None,
        }
    }
}

/// Customer fields copied onto an invoice at creation time.
/// Later edits to the customer record never reach existing invoices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerSnapshot {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// A line of a stored invoice. `unit_price` and the contract window are frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_type: ProductType,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub contract_start: Option<DateTime<Utc>>,
    pub contract_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: Uuid,
    pub owner_id: UserId,
    pub number: String,
    pub customer: CustomerSnapshot,
    pub items: Vec<InvoiceItem>,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

/// One requested line of a new invoice. The price is resolved from the
/// product when the invoice is created.
#[derive(Debug, Clone)]
pub struct NewInvoiceLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub contract_start: Option<DateTime<Utc>>,
    pub contract_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub customer: CustomerSnapshot,
    pub lines: Vec<NewInvoiceLine>,
    pub status: Option<InvoiceStatus>,
    pub payment_method: Option<String>,
}

/// A fully priced item ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceItemDraft {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_type: ProductType,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub contract_start: Option<DateTime<Utc>>,
    pub contract_end: Option<DateTime<Utc>>,
}

/// A fully computed invoice ready to be persisted.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub number: String,
    pub customer: CustomerSnapshot,
    pub items: Vec<InvoiceItemDraft>,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Calendar
//=========================================================================================

/// A calendar event. Its status is derived on read, see [`crate::status`].
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

//=========================================================================================
// Subscriptions
//=========================================================================================

/// An invoice item joined with its invoice and product, as read from storage.
#[derive(Debug, Clone)]
pub struct SubscriptionLine {
    pub item_id: Uuid,
    pub invoice_owner_id: UserId,
    pub invoice_number: String,
    pub invoice_status: InvoiceStatus,
    pub customer_name: String,
    pub product_name: String,
    pub product_type: ProductType,
    pub contract_start: Option<DateTime<Utc>>,
    pub contract_end: Option<DateTime<Utc>>,
}
