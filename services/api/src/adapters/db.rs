//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every query that reads or writes owned rows filters on `user_id` explicitly.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashboard_core::domain::{
    ContractDuration, Customer, CustomerSnapshot, Event, Invoice, InvoiceDraft, InvoiceItem,
    InvoiceStatus, NewCustomer, NewEvent, NewProduct, Product, ProductKind, ProductPatch,
    ProductStatus, ProductType, SubscriptionLine, User, UserCredentials, UserId,
};
use dashboard_core::ports::{DatabaseService, PortError, PortResult};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn corrupt(column: &str, value: &str) -> PortError {
    PortError::Unexpected(format!("Unexpected value '{}' in column {}", value, column))
}

fn to_count(value: i32, column: &str) -> PortResult<u32> {
    u32::try_from(value).map_err(|_| corrupt(column, &value.to_string()))
}

/// Counts are stored in `INTEGER` columns; anything above `i32::MAX` is refused
/// instead of wrapping.
fn to_column<T>(value: T, column: &str) -> PortResult<i32>
where
    T: Copy + std::fmt::Display + TryInto<i32>,
{
    value.try_into().map_err(|_| {
        PortError::Unexpected(format!("Value {} does not fit column {}", value, column))
    })
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct AuthSessionRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CustomerRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    email: String,
    phone: String,
    address: String,
    created_at: DateTime<Utc>,
}
impl CustomerRecord {
    fn to_domain(self) -> Customer {
        Customer {
            id: self.id,
            owner_id: self.user_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ProductRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    #[sqlx(rename = "type")]
    product_type: String,
    stock: Option<i32>,
    purchase_price: Option<Decimal>,
    selling_price: Decimal,
    subscription_details: Option<String>,
    contract_duration: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}
impl ProductRecord {
    fn to_domain(self) -> PortResult<Product> {
        let kind = match ProductType::parse(&self.product_type) {
            Some(ProductType::Physical) => ProductKind::Physical {
                stock: to_count(self.stock.unwrap_or_default(), "products.stock")?,
                purchase_price: self.purchase_price.unwrap_or_default(),
            },
            Some(ProductType::Subscription) => {
                let duration = self.contract_duration.unwrap_or_default();
                ProductKind::Subscription {
                    details: self.subscription_details.unwrap_or_default(),
                    contract_duration: ContractDuration::parse(&duration)
                        .ok_or_else(|| corrupt("products.contract_duration", &duration))?,
                }
            }
            None => return Err(corrupt("products.type", &self.product_type)),
        };
        let status = ProductStatus::parse(&self.status)
            .ok_or_else(|| corrupt("products.status", &self.status))?;
        Ok(Product {
            id: self.id,
            owner_id: self.user_id,
            name: self.name,
            kind,
            selling_price: self.selling_price,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct InvoiceRecord {
    id: Uuid,
    user_id: Uuid,
    number: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    customer_address: String,
    total: Decimal,
    status: String,
    payment_method: String,
    created_at: DateTime<Utc>,
}
impl InvoiceRecord {
    fn to_domain(self, items: Vec<InvoiceItem>) -> PortResult<Invoice> {
        let status = InvoiceStatus::parse(&self.status)
            .ok_or_else(|| corrupt("invoices.status", &self.status))?;
        Ok(Invoice {
            id: self.id,
            owner_id: self.user_id,
            number: self.number,
            customer: CustomerSnapshot {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
                address: self.customer_address,
            },
            items,
            total: self.total,
            status,
            payment_method: self.payment_method,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct InvoiceItemRecord {
    id: Uuid,
    invoice_id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_type: String,
    quantity: i32,
    price: Decimal,
    contract_start_date: Option<DateTime<Utc>>,
    contract_end_date: Option<DateTime<Utc>>,
}
impl InvoiceItemRecord {
    fn to_domain(self) -> PortResult<InvoiceItem> {
        let product_type = ProductType::parse(&self.product_type)
            .ok_or_else(|| corrupt("invoice_items.product_type", &self.product_type))?;
        Ok(InvoiceItem {
            id: self.id,
            product_id: self.product_id,
            product_name: self.product_name,
            product_type,
            quantity: to_count(self.quantity, "invoice_items.quantity")?,
            unit_price: self.price,
            contract_start: self.contract_start_date,
            contract_end: self.contract_end_date,
        })
    }
}

#[derive(FromRow)]
struct EventRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}
impl EventRecord {
    fn to_domain(self) -> Event {
        Event {
            id: self.id,
            owner_id: self.user_id,
            title: self.title,
            description: self.description,
            start_time: self.start_date,
            end_time: self.end_date,
        }
    }
}

#[derive(FromRow)]
struct SubscriptionLineRecord {
    item_id: Uuid,
    invoice_owner_id: Uuid,
    invoice_number: String,
    invoice_status: String,
    customer_name: String,
    product_name: String,
    product_type: String,
    contract_start_date: Option<DateTime<Utc>>,
    contract_end_date: Option<DateTime<Utc>>,
}
impl SubscriptionLineRecord {
    fn to_domain(self) -> PortResult<SubscriptionLine> {
        Ok(SubscriptionLine {
            item_id: self.item_id,
            invoice_owner_id: self.invoice_owner_id,
            invoice_number: self.invoice_number,
            invoice_status: InvoiceStatus::parse(&self.invoice_status)
                .ok_or_else(|| corrupt("invoices.status", &self.invoice_status))?,
            customer_name: self.customer_name,
            product_name: self.product_name,
            product_type: ProductType::parse(&self.product_type)
                .ok_or_else(|| corrupt("invoice_items.product_type", &self.product_type))?,
            contract_start: self.contract_start_date,
            contract_end: self.contract_end_date,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, user_id, name, type, stock, purchase_price, selling_price, \
     subscription_details, contract_duration, status, created_at";

const INVOICE_COLUMNS: &str = "id, user_id, number, customer_name, customer_email, customer_phone, \
     customer_address, total, status, payment_method, created_at";

const ITEM_COLUMNS: &str = "id, invoice_id, product_id, product_name, product_type, quantity, price, \
     contract_start_date, contract_end_date";

impl DbAdapter {
    /// Loads the items of the given invoices, grouped by invoice and kept in line order.
    async fn load_items(&self, invoice_ids: &[Uuid]) -> PortResult<HashMap<Uuid, Vec<InvoiceItem>>> {
        let records = sqlx::query_as::<_, InvoiceItemRecord>(&format!(
            "SELECT {} FROM invoice_items WHERE invoice_id = ANY($1) ORDER BY invoice_id, position ASC",
            ITEM_COLUMNS
        ))
        .bind(invoice_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut grouped: HashMap<Uuid, Vec<InvoiceItem>> = HashMap::new();
        for record in records {
            let invoice_id = record.invoice_id;
            grouped.entry(invoice_id).or_default().push(record.to_domain()?);
        }
        Ok(grouped)
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Auth Methods ---

    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(email)
            .bind(hashed_password)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User with email {} not found", email)))?;
        Ok(UserCredentials {
            user_id: record.user_id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT user_id, expires_at FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)?;

        if record.expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        Ok(record.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Customers ---

    async fn list_customers(&self, owner_id: UserId) -> PortResult<Vec<Customer>> {
        let records = sqlx::query_as::<_, CustomerRecord>(
            "SELECT id, user_id, name, email, phone, address, created_at FROM customers \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_customer(&self, owner_id: UserId, customer: &NewCustomer) -> PortResult<Customer> {
        let record = sqlx::query_as::<_, CustomerRecord>(
            "INSERT INTO customers (id, user_id, name, email, phone, address) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, user_id, name, email, phone, address, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_customer(&self, owner_id: UserId, customer_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE user_id = $1 AND id = $2")
            .bind(owner_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Customer {} not found", customer_id)));
        }
        Ok(())
    }

    // --- Products ---

    async fn list_products(&self, owner_id: UserId, active_only: bool) -> PortResult<Vec<Product>> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products WHERE user_id = $1 AND ($2 = FALSE OR status = 'active') \
             ORDER BY created_at DESC",
            PRODUCT_COLUMNS
        ))
        .bind(owner_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_product(&self, owner_id: UserId, product_id: Uuid) -> PortResult<Product> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products WHERE user_id = $1 AND id = $2",
            PRODUCT_COLUMNS
        ))
        .bind(owner_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("Product {} not found", product_id)))?;
        record.to_domain()
    }

    async fn create_product(&self, owner_id: UserId, product: &NewProduct) -> PortResult<Product> {
        let (stock, purchase_price, details, duration) = match &product.kind {
            ProductKind::Physical {
                stock,
                purchase_price,
            } => (
                Some(to_column(*stock, "products.stock")?),
                Some(*purchase_price),
                None,
                None,
            ),
            ProductKind::Subscription {
                details,
                contract_duration,
            } => (None, None, Some(details.clone()), Some(contract_duration.as_str())),
        };

        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "INSERT INTO products (id, user_id, name, type, stock, purchase_price, selling_price, \
             subscription_details, contract_duration, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&product.name)
        .bind(product.kind.product_type().as_str())
        .bind(stock)
        .bind(purchase_price)
        .bind(product.selling_price)
        .bind(details)
        .bind(duration)
        .bind(product.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn update_product(
        &self,
        owner_id: UserId,
        product_id: Uuid,
        patch: &ProductPatch,
    ) -> PortResult<Product> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "UPDATE products SET selling_price = COALESCE($3, selling_price), \
             status = COALESCE($4, status) WHERE user_id = $1 AND id = $2 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(owner_id)
        .bind(product_id)
        .bind(patch.selling_price)
        .bind(patch.status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("Product {} not found", product_id)))?;
        record.to_domain()
    }

    // --- Invoices ---

    async fn reserve_invoice_sequence(&self) -> PortResult<u64> {
        // Global sequence, not COUNT(*): it never rewinds after deletions and
        // reveals nothing about other owners' rows. A failed insert leaves a gap.
        let (reserved,): (i64,) = sqlx::query_as("SELECT nextval('invoice_number_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        u64::try_from(reserved).map_err(|_| corrupt("invoice_number_seq", &reserved.to_string()))
    }

    async fn insert_invoice(&self, owner_id: UserId, draft: &InvoiceDraft) -> PortResult<Invoice> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, InvoiceRecord>(&format!(
            "INSERT INTO invoices (id, user_id, number, customer_name, customer_email, \
             customer_phone, customer_address, total, status, payment_method, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            INVOICE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&draft.number)
        .bind(&draft.customer.name)
        .bind(&draft.customer.email)
        .bind(&draft.customer.phone)
        .bind(&draft.customer.address)
        .bind(draft.total)
        .bind(draft.status.as_str())
        .bind(&draft.payment_method)
        .bind(draft.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        let mut items = Vec::with_capacity(draft.items.len());
        for (position, item) in draft.items.iter().enumerate() {
            let item_record = sqlx::query_as::<_, InvoiceItemRecord>(&format!(
                "INSERT INTO invoice_items (id, invoice_id, position, product_id, product_name, \
                 product_type, quantity, price, contract_start_date, contract_end_date) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
                ITEM_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(record.id)
            .bind(to_column(position, "invoice_items.position")?)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.product_type.as_str())
            .bind(to_column(item.quantity, "invoice_items.quantity")?)
            .bind(item.unit_price)
            .bind(item.contract_start)
            .bind(item.contract_end)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;
            items.push(item_record.to_domain()?);
        }

        tx.commit().await.map_err(unexpected)?;
        record.to_domain(items)
    }

    async fn list_invoices(&self, owner_id: UserId) -> PortResult<Vec<Invoice>> {
        let records = sqlx::query_as::<_, InvoiceRecord>(&format!(
            "SELECT {} FROM invoices WHERE user_id = $1 ORDER BY created_at DESC",
            INVOICE_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut items = self.load_items(&ids).await?;
        records
            .into_iter()
            .map(|r| {
                let invoice_items = items.remove(&r.id).unwrap_or_default();
                r.to_domain(invoice_items)
            })
            .collect()
    }

    async fn get_invoice(&self, owner_id: UserId, invoice_id: Uuid) -> PortResult<Invoice> {
        let record = sqlx::query_as::<_, InvoiceRecord>(&format!(
            "SELECT {} FROM invoices WHERE user_id = $1 AND id = $2",
            INVOICE_COLUMNS
        ))
        .bind(owner_id)
        .bind(invoice_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("Invoice {} not found", invoice_id)))?;

        let mut items = self.load_items(&[record.id]).await?;
        let invoice_items = items.remove(&record.id).unwrap_or_default();
        record.to_domain(invoice_items)
    }

    async fn update_invoice_status(
        &self,
        owner_id: UserId,
        invoice_id: Uuid,
        status: InvoiceStatus,
    ) -> PortResult<()> {
        let result = sqlx::query("UPDATE invoices SET status = $3 WHERE user_id = $1 AND id = $2")
            .bind(owner_id)
            .bind(invoice_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Invoice {} not found", invoice_id)));
        }
        Ok(())
    }

    async fn delete_invoices(&self, owner_id: UserId, invoice_ids: &[Uuid]) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM invoices WHERE user_id = $1 AND id = ANY($2)")
            .bind(owner_id)
            .bind(invoice_ids)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    // --- Events ---

    async fn list_events(&self, owner_id: UserId) -> PortResult<Vec<Event>> {
        let records = sqlx::query_as::<_, EventRecord>(
            "SELECT id, user_id, title, description, start_date, end_date FROM events \
             WHERE user_id = $1 ORDER BY start_date ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_event(&self, owner_id: UserId, event: &NewEvent) -> PortResult<Event> {
        let record = sqlx::query_as::<_, EventRecord>(
            "INSERT INTO events (id, user_id, title, description, start_date, end_date) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, user_id, title, description, start_date, end_date",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_time)
        .bind(event.end_time)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_event(&self, owner_id: UserId, event_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE user_id = $1 AND id = $2")
            .bind(owner_id)
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Event {} not found", event_id)));
        }
        Ok(())
    }

    // --- Subscriptions ---

    async fn list_subscription_lines(&self, owner_id: UserId) -> PortResult<Vec<SubscriptionLine>> {
        // Plain inner join with every condition in WHERE, so a row is only
        // dropped for an explicit reason.
        let records = sqlx::query_as::<_, SubscriptionLineRecord>(
            "SELECT ii.id AS item_id, i.user_id AS invoice_owner_id, i.number AS invoice_number, \
             i.status AS invoice_status, i.customer_name, ii.product_name, ii.product_type, \
             ii.contract_start_date, ii.contract_end_date \
             FROM invoice_items ii JOIN invoices i ON i.id = ii.invoice_id \
             WHERE i.user_id = $1 AND i.status = 'Completed' \
             AND ii.product_type = 'subscription' AND ii.contract_end_date IS NOT NULL \
             ORDER BY ii.contract_end_date ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }
}
