//! services/api/src/web/dto.rs
//!
//! JSON payloads of the REST and WebSocket APIs, and their conversions to and
//! from the core domain types.

use chrono::{DateTime, Utc};
use dashboard_core::domain::{
    ContractDuration, Customer, CustomerSnapshot, Event, Invoice, InvoiceItem, InvoiceStatus,
    NewCustomer, NewEvent, NewInvoice, NewInvoiceLine, NewProduct, Product, ProductKind,
    ProductPatch, ProductStatus, ProductType,
};
use dashboard_core::invoice::{format_price, line_total, InvoiceSummary};
use dashboard_core::status::{ClassifiedEvent, EventStatus, SubscriptionStatus, SubscriptionWatch};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Shared
//=========================================================================================

/// Query string accepted by the list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Free-text search applied to the list.
    pub q: Option<String>,
    /// Products only: return active products only.
    pub active_only: Option<bool>,
}

impl ListQuery {
    pub fn search(&self) -> &str {
        self.q.as_deref().unwrap_or("")
    }
}

//=========================================================================================
// Customers
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl From<CreateCustomerRequest> for NewCustomer {
    fn from(req: CreateCustomerRequest) -> Self {
        NewCustomer {
            name: req.name,
            email: req.email,
            phone: req.phone,
            address: req.address,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
            address: c.address,
            created_at: c.created_at,
        }
    }
}

//=========================================================================================
// Products
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductTypeDto {
    Physical,
    Subscription,
}

impl From<ProductType> for ProductTypeDto {
    fn from(t: ProductType) -> Self {
        match t {
            ProductType::Physical => ProductTypeDto::Physical,
            ProductType::Subscription => ProductTypeDto::Subscription,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatusDto {
    Active,
    Inactive,
}

impl From<ProductStatus> for ProductStatusDto {
    fn from(s: ProductStatus) -> Self {
        match s {
            ProductStatus::Active => ProductStatusDto::Active,
            ProductStatus::Inactive => ProductStatusDto::Inactive,
        }
    }
}

impl From<ProductStatusDto> for ProductStatus {
    fn from(s: ProductStatusDto) -> Self {
        match s {
            ProductStatusDto::Active => ProductStatus::Active,
            ProductStatusDto::Inactive => ProductStatus::Inactive,
        }
    }
}

/// A new product. Physical products take `stock` and `purchase_price`;
/// subscriptions take `subscription_details` and `contract_duration`.
/// Sending fields of the other kind is rejected.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: ProductTypeDto,
    #[schema(value_type = String)]
    pub selling_price: Decimal,
    pub status: Option<ProductStatusDto>,
    pub stock: Option<u32>,
    #[schema(value_type = Option<String>)]
    pub purchase_price: Option<Decimal>,
    pub subscription_details: Option<String>,
    /// One of `1-month`, `3-months`, `6-months`, `1-year`.
    pub contract_duration: Option<String>,
}

impl TryFrom<CreateProductRequest> for NewProduct {
    type Error = String;

    fn try_from(req: CreateProductRequest) -> Result<Self, Self::Error> {
        let kind = match req.product_type {
            ProductTypeDto::Physical => {
                if req.subscription_details.is_some() || req.contract_duration.is_some() {
                    return Err("Physical products cannot carry subscription fields".to_string());
                }
                ProductKind::Physical {
                    stock: req.stock.ok_or("stock is required for physical products")?,
                    purchase_price: req
                        .purchase_price
                        .ok_or("purchase_price is required for physical products")?,
                }
            }
            ProductTypeDto::Subscription => {
                if req.stock.is_some() || req.purchase_price.is_some() {
                    return Err("Subscriptions cannot carry stock or purchase price".to_string());
                }
                let duration = req
                    .contract_duration
                    .ok_or("contract_duration is required for subscriptions")?;
                ProductKind::Subscription {
                    details: req.subscription_details.unwrap_or_default(),
                    contract_duration: ContractDuration::parse(&duration)
                        .ok_or_else(|| format!("Unknown contract duration '{}'", duration))?,
                }
            }
        };
        Ok(NewProduct {
            name: req.name,
            kind,
            selling_price: req.selling_price,
            status: req.status.map(Into::into).unwrap_or(ProductStatus::Active),
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    #[schema(value_type = Option<String>)]
    pub selling_price: Option<Decimal>,
    pub status: Option<ProductStatusDto>,
}

impl From<UpdateProductRequest> for ProductPatch {
    fn from(req: UpdateProductRequest) -> Self {
        ProductPatch {
            selling_price: req.selling_price,
            status: req.status.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: ProductTypeDto,
    #[schema(value_type = String)]
    pub selling_price: Decimal,
    pub status: ProductStatusDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub purchase_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_duration: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        let product_type = p.kind.product_type().into();
        let (stock, purchase_price, subscription_details, contract_duration) = match p.kind {
            ProductKind::Physical {
                stock,
                purchase_price,
            } => (Some(stock), Some(purchase_price), None, None),
            ProductKind::Subscription {
                details,
                contract_duration,
            } => (None, None, Some(details), Some(contract_duration.as_str().to_string())),
        };
        Self {
            id: p.id,
            name: p.name,
            product_type,
            selling_price: p.selling_price,
            status: p.status.into(),
            stock,
            purchase_price,
            subscription_details,
            contract_duration,
            created_at: p.created_at,
        }
    }
}

//=========================================================================================
// Invoices
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum InvoiceStatusDto {
    Completed,
    Pending,
    Failed,
}

impl From<InvoiceStatus> for InvoiceStatusDto {
    fn from(s: InvoiceStatus) -> Self {
        match s {
            InvoiceStatus::Completed => InvoiceStatusDto::Completed,
            InvoiceStatus::Pending => InvoiceStatusDto::Pending,
            InvoiceStatus::Failed => InvoiceStatusDto::Failed,
        }
    }
}

impl From<InvoiceStatusDto> for InvoiceStatus {
    fn from(s: InvoiceStatusDto) -> Self {
        match s {
            InvoiceStatusDto::Completed => InvoiceStatus::Completed,
            InvoiceStatusDto::Pending => InvoiceStatus::Pending,
            InvoiceStatusDto::Failed => InvoiceStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerSnapshotDto {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl From<CustomerSnapshotDto> for CustomerSnapshot {
    fn from(c: CustomerSnapshotDto) -> Self {
        CustomerSnapshot {
            name: c.name,
            email: c.email,
            phone: c.phone,
            address: c.address,
        }
    }
}

impl From<CustomerSnapshot> for CustomerSnapshotDto {
    fn from(c: CustomerSnapshot) -> Self {
        Self {
            name: c.name,
            email: c.email,
            phone: c.phone,
            address: c.address,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvoiceItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    /// Subscriptions only; defaults to the invoice date.
    pub contract_start_date: Option<DateTime<Utc>>,
    /// Subscriptions only; defaults to the start plus the product's contract duration.
    pub contract_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    pub customer: CustomerSnapshotDto,
    pub items: Vec<CreateInvoiceItemRequest>,
    pub status: Option<InvoiceStatusDto>,
    pub payment_method: Option<String>,
}

impl From<CreateInvoiceRequest> for NewInvoice {
    fn from(req: CreateInvoiceRequest) -> Self {
        NewInvoice {
            customer: req.customer.into(),
            lines: req
                .items
                .into_iter()
                .map(|item| NewInvoiceLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    contract_start: item.contract_start_date,
                    contract_end: item.contract_end_date,
                })
                .collect(),
            status: req.status.map(Into::into),
            payment_method: req.payment_method,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_type: ProductTypeDto,
    pub quantity: u32,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub line_total_display: String,
    pub contract_start_date: Option<DateTime<Utc>>,
    pub contract_end_date: Option<DateTime<Utc>>,
}

impl InvoiceItemResponse {
    fn from_item(item: InvoiceItem, currency_suffix: &str) -> Self {
        Self {
            line_total_display: format_price(line_total(&item), currency_suffix),
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            product_type: item.product_type.into(),
            quantity: item.quantity,
            price: item.unit_price,
            contract_start_date: item.contract_start,
            contract_end_date: item.contract_end,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub number: String,
    pub customer: CustomerSnapshotDto,
    pub items: Vec<InvoiceItemResponse>,
    #[schema(value_type = String)]
    pub total: Decimal,
    /// The total formatted for display, e.g. `25.000 OMR`.
    pub total_display: String,
    pub status: InvoiceStatusDto,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

impl InvoiceResponse {
    pub fn from_invoice(invoice: Invoice, currency_suffix: &str) -> Self {
        Self {
            id: invoice.id,
            number: invoice.number,
            customer: invoice.customer.into(),
            items: invoice
                .items
                .into_iter()
                .map(|item| InvoiceItemResponse::from_item(item, currency_suffix))
                .collect(),
            total: invoice.total,
            total_display: format_price(invoice.total, currency_suffix),
            status: invoice.status.into(),
            payment_method: invoice.payment_method,
            created_at: invoice.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInvoiceStatusRequest {
    pub status: InvoiceStatusDto,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteInvoicesRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteInvoicesResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceSummaryResponse {
    pub invoice_count: usize,
    #[schema(value_type = String)]
    pub completed_total: Decimal,
    #[schema(value_type = String)]
    pub pending_total: Decimal,
    #[schema(value_type = String)]
    pub failed_total: Decimal,
    pub completed_display: String,
    pub pending_display: String,
    pub failed_display: String,
}

impl InvoiceSummaryResponse {
    pub fn from_summary(summary: InvoiceSummary, currency_suffix: &str) -> Self {
        Self {
            invoice_count: summary.invoice_count,
            completed_display: format_price(summary.completed_total, currency_suffix),
            pending_display: format_price(summary.pending_total, currency_suffix),
            failed_display: format_price(summary.failed_total, currency_suffix),
            completed_total: summary.completed_total,
            pending_total: summary.pending_total,
            failed_total: summary.failed_total,
        }
    }
}

//=========================================================================================
// Events
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatusDto {
    Upcoming,
    Ongoing,
    Completed,
}

impl From<EventStatus> for EventStatusDto {
    fn from(s: EventStatus) -> Self {
        match s {
            EventStatus::Upcoming => EventStatusDto::Upcoming,
            EventStatus::Ongoing => EventStatusDto::Ongoing,
            EventStatus::Completed => EventStatusDto::Completed,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(req: CreateEventRequest) -> Self {
        NewEvent {
            title: req.title,
            description: req.description,
            start_time: req.start_date,
            end_time: req.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Derived from the current time on every read.
    pub status: EventStatusDto,
}

impl From<ClassifiedEvent> for EventResponse {
    fn from(c: ClassifiedEvent) -> Self {
        let Event {
            id,
            title,
            description,
            start_time,
            end_time,
            ..
        } = c.event;
        Self {
            id,
            title,
            description,
            start_date: start_time,
            end_date: end_time,
            status: c.status.into(),
        }
    }
}

//=========================================================================================
// Subscriptions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatusDto {
    Active,
    ExpiringSoon,
    Expired,
}

impl From<SubscriptionStatus> for SubscriptionStatusDto {
    fn from(s: SubscriptionStatus) -> Self {
        match s {
            SubscriptionStatus::Active => SubscriptionStatusDto::Active,
            SubscriptionStatus::ExpiringSoon => SubscriptionStatusDto::ExpiringSoon,
            SubscriptionStatus::Expired => SubscriptionStatusDto::Expired,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_name: String,
    pub product_name: String,
    pub contract_start_date: Option<DateTime<Utc>>,
    pub contract_end_date: DateTime<Utc>,
    pub days_remaining: i64,
    /// Derived from the current time on every read.
    pub status: SubscriptionStatusDto,
}

impl From<SubscriptionWatch> for SubscriptionResponse {
    fn from(w: SubscriptionWatch) -> Self {
        Self {
            id: w.item_id,
            invoice_number: w.invoice_number,
            customer_name: w.customer_name,
            product_name: w.product_name,
            contract_start_date: w.contract_start,
            contract_end_date: w.contract_end,
            days_remaining: w.days_remaining,
            status: w.status.into(),
        }
    }
}
