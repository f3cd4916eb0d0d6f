//! crates/dashboard_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the dashboard's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the storage backend, the document renderer and the clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::document::{InvoiceDocument, RenderedDocument};
use crate::domain::{
    Customer, Event, Invoice, InvoiceDraft, InvoiceStatus, NewCustomer, NewEvent, NewProduct,
    Product, ProductPatch, SubscriptionLine, User, UserCredentials, UserId,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Owner-scoped data access. Every method that takes an `owner_id` must
/// neither return nor modify rows belonging to another owner.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Methods ---
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the session's user if the session exists and has not expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Customers ---
    /// Newest first.
    async fn list_customers(&self, owner_id: UserId) -> PortResult<Vec<Customer>>;

    async fn create_customer(&self, owner_id: UserId, customer: &NewCustomer)
        -> PortResult<Customer>;

    async fn delete_customer(&self, owner_id: UserId, customer_id: Uuid) -> PortResult<()>;

    // --- Products ---
    /// Newest first.
    async fn list_products(&self, owner_id: UserId, active_only: bool) -> PortResult<Vec<Product>>;

    async fn get_product(&self, owner_id: UserId, product_id: Uuid) -> PortResult<Product>;

    async fn create_product(&self, owner_id: UserId, product: &NewProduct) -> PortResult<Product>;

    async fn update_product(
        &self,
        owner_id: UserId,
        product_id: Uuid,
        patch: &ProductPatch,
    ) -> PortResult<Product>;

    // --- Invoices ---
    /// Reserves the next invoice sequence value and returns how many were
    /// reserved before it. Values never repeat; deleting invoices does not
    /// rewind the sequence.
    async fn reserve_invoice_sequence(&self) -> PortResult<u64>;

    /// Stores the invoice and all of its items atomically.
    async fn insert_invoice(&self, owner_id: UserId, draft: &InvoiceDraft) -> PortResult<Invoice>;

    /// Newest first, items included.
    async fn list_invoices(&self, owner_id: UserId) -> PortResult<Vec<Invoice>>;

    async fn get_invoice(&self, owner_id: UserId, invoice_id: Uuid) -> PortResult<Invoice>;

    async fn update_invoice_status(
        &self,
        owner_id: UserId,
        invoice_id: Uuid,
        status: InvoiceStatus,
    ) -> PortResult<()>;

    /// Deletes exactly the given invoices (and their items). Returns how many were removed.
    async fn delete_invoices(&self, owner_id: UserId, invoice_ids: &[Uuid]) -> PortResult<u64>;

    // --- Events ---
    /// Ordered by start time.
    async fn list_events(&self, owner_id: UserId) -> PortResult<Vec<Event>>;

    async fn create_event(&self, owner_id: UserId, event: &NewEvent) -> PortResult<Event>;

    async fn delete_event(&self, owner_id: UserId, event_id: Uuid) -> PortResult<()>;

    // --- Subscriptions ---
    /// Subscription items of the owner's completed invoices that carry a contract end.
    async fn list_subscription_lines(&self, owner_id: UserId) -> PortResult<Vec<SubscriptionLine>>;
}

/// Turns a fully resolved invoice into a downloadable file.
pub trait DocumentRenderer: Send + Sync {
    fn render_invoice(&self, document: &InvoiceDocument) -> PortResult<RenderedDocument>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
