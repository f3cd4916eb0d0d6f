//! crates/dashboard_core/src/service.rs
//!
//! The operation boundary of the dashboard.
//!
//! Every operation takes an explicit `RequestContext`, refuses to touch data
//! without a current user, validates its input before writing, and converts
//! every failure into a `DashboardError` after logging it.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::document::{InvoiceDocument, RenderedDocument};
use crate::domain::{
    Customer, Event, Invoice, InvoiceDraft, InvoiceItemDraft, InvoiceStatus, NewCustomer,
    NewEvent, NewInvoice, NewProduct, Product, ProductKind, ProductPatch, ProductStatus, UserId,
};
use crate::error::{DashboardError, DashboardResult};
use crate::invoice::{
    check_quantity, contract_window, invoice_total, summarize, InvoiceNumberGenerator,
    InvoiceSummary, DEFAULT_PAYMENT_METHOD, MAX_COUNT,
};
use crate::ports::{Clock, DatabaseService, DocumentRenderer, PortError, SystemClock};
use crate::search::{customer_matches, invoice_matches, product_matches};
use crate::status::{classify_events, project_subscriptions, ClassifiedEvent, SubscriptionWatch};

/// Currency suffix used when none is configured.
pub const DEFAULT_CURRENCY_SUFFIX: &str = "OMR";

//=========================================================================================
// Request Context
//=========================================================================================

/// Who is performing an operation. Built per request, never stored globally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    user_id: Option<UserId>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn require_user(&self) -> DashboardResult<UserId> {
        self.user_id.ok_or_else(|| {
            warn!("Rejected operation without an authenticated user.");
            DashboardError::Unauthenticated
        })
    }
}

/// Maps a port failure into the operation's error, logging it on the way.
fn remote(action: &'static str) -> impl FnOnce(PortError) -> DashboardError {
    move |source| {
        error!("Failed to {}: {:?}", action, source);
        match source {
            PortError::NotFound(what) => DashboardError::NotFound(what),
            source => DashboardError::RemoteOperationFailed { action, source },
        }
    }
}

fn invalid(reason: &str) -> DashboardError {
    warn!("Validation failed: {}", reason);
    DashboardError::ValidationFailed(reason.to_string())
}

fn require_text(value: &str, field: &str) -> DashboardResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(&format!("{} is required", field)));
    }
    Ok(())
}

fn require_non_negative(value: Decimal, field: &str) -> DashboardResult<()> {
    if value.is_sign_negative() {
        return Err(invalid(&format!("{} cannot be negative", field)));
    }
    Ok(())
}

//=========================================================================================
// Dashboard
//=========================================================================================

pub struct Dashboard {
    db: Arc<dyn DatabaseService>,
    renderer: Arc<dyn DocumentRenderer>,
    clock: Arc<dyn Clock>,
    numbers: InvoiceNumberGenerator,
    currency_suffix: String,
}

impl Dashboard {
    pub fn new(db: Arc<dyn DatabaseService>, renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self {
            db,
            renderer,
            clock: Arc::new(SystemClock),
            numbers: InvoiceNumberGenerator::new(),
            currency_suffix: DEFAULT_CURRENCY_SUFFIX.to_string(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_currency_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.currency_suffix = suffix.into();
        self
    }

    pub fn currency_suffix(&self) -> &str {
        &self.currency_suffix
    }

    // --- Customers ---

    pub async fn list_customers(
        &self,
        ctx: &RequestContext,
        search: &str,
    ) -> DashboardResult<Vec<Customer>> {
        let owner = ctx.require_user()?;
        let customers = self
            .db
            .list_customers(owner)
            .await
            .map_err(remote("load customers"))?;
        Ok(customers
            .into_iter()
            .filter(|c| customer_matches(c, search))
            .collect())
    }

    pub async fn create_customer(
        &self,
        ctx: &RequestContext,
        customer: NewCustomer,
    ) -> DashboardResult<Customer> {
        let owner = ctx.require_user()?;
        require_text(&customer.name, "Customer name")?;
        let created = self
            .db
            .create_customer(owner, &customer)
            .await
            .map_err(remote("create customer"))?;
        info!("Customer {} created for user {}", created.id, owner);
        Ok(created)
    }

    pub async fn delete_customer(&self, ctx: &RequestContext, customer_id: Uuid) -> DashboardResult<()> {
        let owner = ctx.require_user()?;
        self.db
            .delete_customer(owner, customer_id)
            .await
            .map_err(remote("delete customer"))
    }

    // --- Products ---

    pub async fn list_products(
        &self,
        ctx: &RequestContext,
        search: &str,
        active_only: bool,
    ) -> DashboardResult<Vec<Product>> {
        let owner = ctx.require_user()?;
        let products = self
            .db
            .list_products(owner, active_only)
            .await
            .map_err(remote("load products"))?;
        Ok(products
            .into_iter()
            .filter(|p| product_matches(p, search))
            .collect())
    }

    pub async fn create_product(
        &self,
        ctx: &RequestContext,
        product: NewProduct,
    ) -> DashboardResult<Product> {
        let owner = ctx.require_user()?;
        require_text(&product.name, "Product name")?;
        require_non_negative(product.selling_price, "Selling price")?;
        if let ProductKind::Physical {
            stock,
            purchase_price,
        } = &product.kind
        {
            require_non_negative(*purchase_price, "Purchase price")?;
            if *stock > MAX_COUNT {
                return Err(invalid(&format!("Stock cannot exceed {}", MAX_COUNT)));
            }
        }
        let created = self
            .db
            .create_product(owner, &product)
            .await
            .map_err(remote("create product"))?;
        info!("Product {} created for user {}", created.id, owner);
        Ok(created)
    }

    /// Changes a product's price or status. Existing invoices keep the prices
    /// they were created with.
    pub async fn update_product(
        &self,
        ctx: &RequestContext,
        product_id: Uuid,
        patch: ProductPatch,
    ) -> DashboardResult<Product> {
        let owner = ctx.require_user()?;
        if let Some(price) = patch.selling_price {
            require_non_negative(price, "Selling price")?;
        }
        self.db
            .update_product(owner, product_id, &patch)
            .await
            .map_err(remote("update product"))
    }

    // --- Invoices ---

    pub async fn list_invoices(
        &self,
        ctx: &RequestContext,
        search: &str,
    ) -> DashboardResult<Vec<Invoice>> {
        let owner = ctx.require_user()?;
        let invoices = self
            .db
            .list_invoices(owner)
            .await
            .map_err(remote("load invoices"))?;
        Ok(invoices
            .into_iter()
            .filter(|i| invoice_matches(i, search))
            .collect())
    }

    pub async fn get_invoice(&self, ctx: &RequestContext, invoice_id: Uuid) -> DashboardResult<Invoice> {
        let owner = ctx.require_user()?;
        self.db
            .get_invoice(owner, invoice_id)
            .await
            .map_err(remote("load invoice"))
    }

    /// Creates an invoice, freezing each product's current selling price and
    /// the customer's details onto it.
    pub async fn create_invoice(
        &self,
        ctx: &RequestContext,
        request: NewInvoice,
    ) -> DashboardResult<Invoice> {
        let owner = ctx.require_user()?;
        require_text(&request.customer.name, "Customer name")?;
        if request.lines.is_empty() {
            return Err(invalid("An invoice needs at least one product"));
        }

        let now = self.clock.now();
        let mut items = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let quantity = check_quantity(line.quantity)?;
            let product = self
                .db
                .get_product(owner, line.product_id)
                .await
                .map_err(remote("load product"))?;
            if product.status != ProductStatus::Active {
                return Err(invalid(&format!("Product '{}' is inactive", product.name)));
            }

            let (contract_start, contract_end) = match &product.kind {
                ProductKind::Subscription {
                    contract_duration, ..
                } => {
                    let start = line.contract_start.unwrap_or(now);
                    let end = match line.contract_end {
                        Some(end) => end,
                        None => contract_window(*contract_duration, start)
                            .map(|(_, end)| end)
                            .ok_or_else(|| invalid("Contract end is out of range"))?,
                    };
                    if end < start {
                        return Err(invalid("Contract end must not precede its start"));
                    }
                    (Some(start), Some(end))
                }
                ProductKind::Physical { .. } => {
                    if line.contract_start.is_some() || line.contract_end.is_some() {
                        return Err(invalid(&format!(
                            "Product '{}' is not a subscription and has no contract dates",
                            product.name
                        )));
                    }
                    (None, None)
                }
            };

            items.push(InvoiceItemDraft {
                product_id: product.id,
                product_type: product.kind.product_type(),
                product_name: product.name,
                quantity,
                unit_price: product.selling_price,
                contract_start,
                contract_end,
            });
        }

        let total = invoice_total(&items);
        let existing = self
            .db
            .reserve_invoice_sequence()
            .await
            .map_err(remote("create invoice"))?;
        let draft = InvoiceDraft {
            number: self.numbers.next(existing, now),
            customer: request.customer,
            items,
            total,
            status: request.status.unwrap_or(InvoiceStatus::Completed),
            payment_method: request
                .payment_method
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            created_at: now,
        };

        let invoice = self
            .db
            .insert_invoice(owner, &draft)
            .await
            .map_err(remote("create invoice"))?;
        info!("Invoice {} created for user {}", invoice.number, owner);
        Ok(invoice)
    }

    pub async fn update_invoice_status(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
        status: InvoiceStatus,
    ) -> DashboardResult<()> {
        let owner = ctx.require_user()?;
        self.db
            .update_invoice_status(owner, invoice_id, status)
            .await
            .map_err(remote("update invoice status"))?;
        info!("Invoice {} marked {}", invoice_id, status.as_str());
        Ok(())
    }

    /// Deletes exactly the selected invoices. An empty selection is a no-op.
    pub async fn delete_invoices(&self, ctx: &RequestContext, invoice_ids: &[Uuid]) -> DashboardResult<u64> {
        let owner = ctx.require_user()?;
        if invoice_ids.is_empty() {
            return Ok(0);
        }
        let removed = self
            .db
            .delete_invoices(owner, invoice_ids)
            .await
            .map_err(remote("delete invoices"))?;
        info!("Deleted {} invoices for user {}", removed, owner);
        Ok(removed)
    }

    pub async fn invoice_summary(&self, ctx: &RequestContext) -> DashboardResult<InvoiceSummary> {
        let owner = ctx.require_user()?;
        let invoices = self
            .db
            .list_invoices(owner)
            .await
            .map_err(remote("load invoices"))?;
        Ok(summarize(&invoices))
    }

    pub async fn render_invoice(
        &self,
        ctx: &RequestContext,
        invoice_id: Uuid,
    ) -> DashboardResult<RenderedDocument> {
        let invoice = self.get_invoice(ctx, invoice_id).await?;
        let document = InvoiceDocument::from_invoice(&invoice, &self.currency_suffix);
        self.renderer
            .render_invoice(&document)
            .map_err(remote("render invoice"))
    }

    // --- Events ---

    /// Events ordered by start, each classified against the current time.
    pub async fn list_events(&self, ctx: &RequestContext) -> DashboardResult<Vec<ClassifiedEvent>> {
        let owner = ctx.require_user()?;
        let events = self
            .db
            .list_events(owner)
            .await
            .map_err(remote("load events"))?;
        Ok(classify_events(self.clock.now(), events))
    }

    pub async fn create_event(&self, ctx: &RequestContext, event: NewEvent) -> DashboardResult<Event> {
        let owner = ctx.require_user()?;
        require_text(&event.title, "Event title")?;
        if event.end_time < event.start_time {
            return Err(invalid("Event end must not precede its start"));
        }
        self.db
            .create_event(owner, &event)
            .await
            .map_err(remote("create event"))
    }

    pub async fn delete_event(&self, ctx: &RequestContext, event_id: Uuid) -> DashboardResult<()> {
        let owner = ctx.require_user()?;
        self.db
            .delete_event(owner, event_id)
            .await
            .map_err(remote("delete event"))
    }

    // --- Subscriptions ---

    pub async fn list_subscriptions(&self, ctx: &RequestContext) -> DashboardResult<Vec<SubscriptionWatch>> {
        let owner = ctx.require_user()?;
        let lines = self
            .db
            .list_subscription_lines(owner)
            .await
            .map_err(remote("load subscriptions"))?;
        Ok(project_subscriptions(self.clock.now(), owner, lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContractDuration, CustomerSnapshot, NewInvoiceLine};
    use crate::memory::InMemoryDatabase;
    use crate::ports::{FixedClock, PortResult};
    use crate::status::{EventStatus, SubscriptionStatus};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    struct EchoRenderer;

    impl DocumentRenderer for EchoRenderer {
        fn render_invoice(&self, document: &InvoiceDocument) -> PortResult<RenderedDocument> {
            Ok(RenderedDocument {
                file_name: format!("{}.txt", document.file_stem()),
                content_type: "text/plain",
                body: document.total.clone().into_bytes(),
            })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 11, 0, 0).unwrap()
    }

    fn dashboard() -> (Dashboard, Arc<InMemoryDatabase>) {
        let db = Arc::new(InMemoryDatabase::new());
        let dashboard = Dashboard::new(db.clone(), Arc::new(EchoRenderer))
            .with_clock(Arc::new(FixedClock(now())));
        (dashboard, db)
    }

    fn physical(name: &str, price: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            kind: ProductKind::Physical {
                stock: 10,
                purchase_price: Decimal::from(1),
            },
            selling_price: Decimal::from(price),
            status: ProductStatus::Active,
        }
    }

    fn subscription(name: &str, price: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            kind: ProductKind::Subscription {
                details: "Monthly support".to_string(),
                contract_duration: ContractDuration::OneMonth,
            },
            selling_price: Decimal::from(price),
            status: ProductStatus::Active,
        }
    }

    fn customer() -> CustomerSnapshot {
        CustomerSnapshot {
            name: "Salim".to_string(),
            email: "salim@example.com".to_string(),
            phone: "99887766".to_string(),
            address: "Sohar".to_string(),
        }
    }

    fn line(product_id: Uuid, quantity: u32) -> NewInvoiceLine {
        NewInvoiceLine {
            product_id,
            quantity,
            contract_start: None,
            contract_end: None,
        }
    }

    fn invoice_of(lines: Vec<NewInvoiceLine>) -> NewInvoice {
        NewInvoice {
            customer: customer(),
            lines,
            status: None,
            payment_method: None,
        }
    }

    #[tokio::test]
    async fn anonymous_requests_never_reach_storage() {
        let (dashboard, db) = dashboard();
        db.set_unavailable(true);
        let ctx = RequestContext::anonymous();

        let err = dashboard.list_customers(&ctx, "").await.unwrap_err();
        assert!(matches!(err, DashboardError::Unauthenticated));
        assert_eq!(err.user_message(), "User not authenticated");
        assert!(matches!(
            dashboard.list_subscriptions(&ctx).await,
            Err(DashboardError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn backend_failures_become_a_single_message() {
        let (dashboard, db) = dashboard();
        db.set_unavailable(true);
        let ctx = RequestContext::for_user(Uuid::new_v4());

        let err = dashboard.list_invoices(&ctx, "").await.unwrap_err();
        assert!(matches!(err, DashboardError::RemoteOperationFailed { .. }));
        assert_eq!(err.user_message(), "Failed to load invoices");
    }

    #[tokio::test]
    async fn stock_beyond_storable_range_is_rejected() {
        let (dashboard, db) = dashboard();
        let owner = Uuid::new_v4();
        let ctx = RequestContext::for_user(owner);
        let mut product = physical("Pallet", 5);
        product.kind = ProductKind::Physical {
            stock: 3_000_000_000,
            purchase_price: Decimal::from(1),
        };

        let err = dashboard.create_product(&ctx, product).await.unwrap_err();
        assert!(matches!(err, DashboardError::ValidationFailed(_)));
        assert!(db.list_products(owner, false).await.unwrap().is_empty());

        let mut largest = physical("Pallet", 5);
        largest.kind = ProductKind::Physical {
            stock: MAX_COUNT,
            purchase_price: Decimal::from(1),
        };
        assert!(dashboard.create_product(&ctx, largest).await.is_ok());
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_before_writing() {
        let (dashboard, db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        db.set_unavailable(true);

        let err = dashboard
            .create_customer(&ctx, NewCustomer::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::ValidationFailed(_)));

        let err = dashboard.create_invoice(&ctx, invoice_of(vec![])).await.unwrap_err();
        assert!(matches!(err, DashboardError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn invoice_total_and_prices_are_frozen() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let widget = dashboard.create_product(&ctx, physical("Widget", 10)).await.unwrap();
        let cable = dashboard.create_product(&ctx, physical("Cable", 5)).await.unwrap();

        let invoice = dashboard
            .create_invoice(&ctx, invoice_of(vec![line(widget.id, 2), line(cable.id, 1)]))
            .await
            .unwrap();
        assert_eq!(invoice.total, Decimal::from(25));
        assert_eq!(invoice.status, InvoiceStatus::Completed);
        assert_eq!(invoice.payment_method, "Credit Card");

        dashboard
            .update_product(
                &ctx,
                widget.id,
                ProductPatch {
                    selling_price: Some(Decimal::from(99)),
                    status: None,
                },
            )
            .await
            .unwrap();

        let stored = dashboard.get_invoice(&ctx, invoice.id).await.unwrap();
        assert_eq!(stored.total, Decimal::from(25));
        assert_eq!(stored.items[0].unit_price, Decimal::from(10));
    }

    #[tokio::test]
    async fn zero_quantity_lines_are_rejected() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let widget = dashboard.create_product(&ctx, physical("Widget", 10)).await.unwrap();

        let err = dashboard
            .create_invoice(&ctx, invoice_of(vec![line(widget.id, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn invoice_numbers_are_unique_even_at_the_same_instant() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let widget = dashboard.create_product(&ctx, physical("Widget", 10)).await.unwrap();

        let first = dashboard
            .create_invoice(&ctx, invoice_of(vec![line(widget.id, 1)]))
            .await
            .unwrap();
        let second = dashboard
            .create_invoice(&ctx, invoice_of(vec![line(widget.id, 1)]))
            .await
            .unwrap();
        assert_ne!(first.number, second.number);
        assert!(first.number.ends_with("-00001"));
        assert!(second.number.ends_with("-00002"));
    }

    #[tokio::test]
    async fn invoice_sequence_does_not_rewind_after_deletion() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let widget = dashboard.create_product(&ctx, physical("Widget", 10)).await.unwrap();

        let first = dashboard
            .create_invoice(&ctx, invoice_of(vec![line(widget.id, 1)]))
            .await
            .unwrap();
        let second = dashboard
            .create_invoice(&ctx, invoice_of(vec![line(widget.id, 1)]))
            .await
            .unwrap();
        dashboard.delete_invoices(&ctx, &[second.id]).await.unwrap();

        let third = dashboard
            .create_invoice(&ctx, invoice_of(vec![line(widget.id, 1)]))
            .await
            .unwrap();
        assert!(first.number.ends_with("-00001"));
        assert!(third.number.ends_with("-00003"));
    }

    #[tokio::test]
    async fn deleting_invoices_removes_only_the_selection() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let widget = dashboard.create_product(&ctx, physical("Widget", 10)).await.unwrap();

        let mut ids = Vec::new();
        for quantity in 1..=3 {
            let invoice = dashboard
                .create_invoice(&ctx, invoice_of(vec![line(widget.id, quantity)]))
                .await
                .unwrap();
            ids.push(invoice.id);
        }
        dashboard
            .update_invoice_status(&ctx, ids[2], InvoiceStatus::Pending)
            .await
            .unwrap();

        let removed = dashboard.delete_invoices(&ctx, &ids[..2]).await.unwrap();
        assert_eq!(removed, 2);

        let remaining = dashboard.list_invoices(&ctx, "").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, ids[2]);
        assert_eq!(remaining[0].total, Decimal::from(30));
        assert_eq!(remaining[0].status, InvoiceStatus::Pending);
    }

    #[tokio::test]
    async fn records_are_isolated_per_owner() {
        let (dashboard, _db) = dashboard();
        let alice = RequestContext::for_user(Uuid::new_v4());
        let bob = RequestContext::for_user(Uuid::new_v4());
        let widget = dashboard.create_product(&alice, physical("Widget", 10)).await.unwrap();
        let invoice = dashboard
            .create_invoice(&alice, invoice_of(vec![line(widget.id, 1)]))
            .await
            .unwrap();

        assert!(dashboard.list_invoices(&bob, "").await.unwrap().is_empty());
        assert!(matches!(
            dashboard.get_invoice(&bob, invoice.id).await,
            Err(DashboardError::NotFound(_))
        ));
        assert_eq!(dashboard.delete_invoices(&bob, &[invoice.id]).await.unwrap(), 0);
        assert!(matches!(
            dashboard
                .create_invoice(&bob, invoice_of(vec![line(widget.id, 1)]))
                .await,
            Err(DashboardError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn summary_groups_totals_by_status() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let widget = dashboard.create_product(&ctx, physical("Widget", 10)).await.unwrap();
        let pending = dashboard
            .create_invoice(&ctx, invoice_of(vec![line(widget.id, 2)]))
            .await
            .unwrap();
        dashboard
            .create_invoice(&ctx, invoice_of(vec![line(widget.id, 1)]))
            .await
            .unwrap();
        dashboard
            .update_invoice_status(&ctx, pending.id, InvoiceStatus::Pending)
            .await
            .unwrap();

        let summary = dashboard.invoice_summary(&ctx).await.unwrap();
        assert_eq!(summary.invoice_count, 2);
        assert_eq!(summary.completed_total, Decimal::from(10));
        assert_eq!(summary.pending_total, Decimal::from(20));
        assert_eq!(summary.failed_total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn subscriptions_derive_contract_window_and_status() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let support = dashboard.create_product(&ctx, subscription("Support", 30)).await.unwrap();
        let widget = dashboard.create_product(&ctx, physical("Widget", 10)).await.unwrap();

        let mut ending_soon = line(support.id, 1);
        ending_soon.contract_start = Some(now() - Duration::days(25));
        ending_soon.contract_end = Some(now() + Duration::days(3));

        dashboard
            .create_invoice(&ctx, invoice_of(vec![line(support.id, 1), line(widget.id, 1)]))
            .await
            .unwrap();
        dashboard
            .create_invoice(&ctx, invoice_of(vec![ending_soon]))
            .await
            .unwrap();

        let watches = dashboard.list_subscriptions(&ctx).await.unwrap();
        assert_eq!(watches.len(), 2);
        assert_eq!(watches[0].status, SubscriptionStatus::ExpiringSoon);
        assert_eq!(watches[0].days_remaining, 3);
        assert_eq!(watches[1].status, SubscriptionStatus::Active);
        assert_eq!(watches[1].days_remaining, 31);
    }

    #[tokio::test]
    async fn pending_invoices_are_not_watched() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let support = dashboard.create_product(&ctx, subscription("Support", 30)).await.unwrap();
        let mut request = invoice_of(vec![line(support.id, 1)]);
        request.status = Some(InvoiceStatus::Pending);
        dashboard.create_invoice(&ctx, request).await.unwrap();

        assert!(dashboard.list_subscriptions(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn physical_products_reject_contract_dates() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let widget = dashboard.create_product(&ctx, physical("Widget", 10)).await.unwrap();
        let mut dated = line(widget.id, 1);
        dated.contract_end = Some(now());

        let err = dashboard.create_invoice(&ctx, invoice_of(vec![dated])).await.unwrap_err();
        assert!(matches!(err, DashboardError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn events_are_classified_on_read() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let day = |h| Utc.with_ymd_and_hms(2025, 1, 10, h, 0, 0).unwrap();
        for (title, start, end) in [("Later", 12, 14), ("Standup", 10, 12), ("Breakfast", 7, 8)] {
            dashboard
                .create_event(
                    &ctx,
                    NewEvent {
                        title: title.to_string(),
                        description: String::new(),
                        start_time: day(start),
                        end_time: day(end),
                    },
                )
                .await
                .unwrap();
        }

        let events = dashboard.list_events(&ctx).await.unwrap();
        let statuses: Vec<_> = events.iter().map(|e| (e.event.title.as_str(), e.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("Breakfast", EventStatus::Completed),
                ("Standup", EventStatus::Ongoing),
                ("Later", EventStatus::Upcoming),
            ]
        );
    }

    #[tokio::test]
    async fn events_ending_before_they_start_are_rejected() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let err = dashboard
            .create_event(
                &ctx,
                NewEvent {
                    title: "Backwards".to_string(),
                    description: String::new(),
                    start_time: now(),
                    end_time: now() - Duration::hours(1),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn rendered_invoice_uses_formatted_totals() {
        let (dashboard, _db) = dashboard();
        let ctx = RequestContext::for_user(Uuid::new_v4());
        let widget = dashboard.create_product(&ctx, physical("Widget", 10)).await.unwrap();
        let invoice = dashboard
            .create_invoice(&ctx, invoice_of(vec![line(widget.id, 2)]))
            .await
            .unwrap();

        let rendered = dashboard.render_invoice(&ctx, invoice.id).await.unwrap();
        assert_eq!(rendered.file_name, format!("invoice-{}.txt", invoice.number));
        assert_eq!(rendered.body, b"20.000 OMR".to_vec());
    }
}
