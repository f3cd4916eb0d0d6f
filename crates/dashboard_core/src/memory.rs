//! crates/dashboard_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port.
//! Used by tests across the workspace in place of a live database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AuthSession, Customer, Event, Invoice, InvoiceDraft, InvoiceItem, InvoiceStatus, NewCustomer,
    NewEvent, NewProduct, Product, ProductPatch, ProductStatus, ProductType, SubscriptionLine,
    User, UserCredentials, UserId,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    auth_sessions: HashMap<String, AuthSession>,
    customers: Vec<Customer>,
    products: Vec<Product>,
    invoices: Vec<Invoice>,
    invoice_sequence: u64,
    events: Vec<Event>,
}

#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn tables(&self) -> PortResult<MutexGuard<'_, Tables>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("backend unavailable".to_string()));
        }
        self.tables
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

fn newest_first<T>(mut rows: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut tables = self.tables()?;
        if tables.users.iter().any(|u| u.email == email) {
            return Err(PortError::Unexpected(format!("Email {} already registered", email)));
        }
        let user_id = Uuid::new_v4();
        tables.users.push(UserCredentials {
            user_id,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        });
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables()?
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables()?.auth_sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId> {
        let tables = self.tables()?;
        match tables.auth_sessions.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables()?.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn list_customers(&self, owner_id: UserId) -> PortResult<Vec<Customer>> {
        let rows = self
            .tables()?
            .customers
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |c: &Customer| c.created_at))
    }

    async fn create_customer(&self, owner_id: UserId, customer: &NewCustomer) -> PortResult<Customer> {
        let created = Customer {
            id: Uuid::new_v4(),
            owner_id,
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            created_at: Utc::now(),
        };
        self.tables()?.customers.push(created.clone());
        Ok(created)
    }

    async fn delete_customer(&self, owner_id: UserId, customer_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        let before = tables.customers.len();
        tables
            .customers
            .retain(|c| !(c.owner_id == owner_id && c.id == customer_id));
        if tables.customers.len() == before {
            return Err(PortError::NotFound(format!("Customer {} not found", customer_id)));
        }
        Ok(())
    }

    async fn list_products(&self, owner_id: UserId, active_only: bool) -> PortResult<Vec<Product>> {
        let rows = self
            .tables()?
            .products
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .filter(|p| !active_only || p.status == ProductStatus::Active)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Product| p.created_at))
    }

    async fn get_product(&self, owner_id: UserId, product_id: Uuid) -> PortResult<Product> {
        self.tables()?
            .products
            .iter()
            .find(|p| p.owner_id == owner_id && p.id == product_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Product {} not found", product_id)))
    }

    async fn create_product(&self, owner_id: UserId, product: &NewProduct) -> PortResult<Product> {
        let created = Product {
            id: Uuid::new_v4(),
            owner_id,
            name: product.name.clone(),
            kind: product.kind.clone(),
            selling_price: product.selling_price,
            status: product.status,
            created_at: Utc::now(),
        };
        self.tables()?.products.push(created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        owner_id: UserId,
        product_id: Uuid,
        patch: &ProductPatch,
    ) -> PortResult<Product> {
        let mut tables = self.tables()?;
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.owner_id == owner_id && p.id == product_id)
            .ok_or_else(|| PortError::NotFound(format!("Product {} not found", product_id)))?;
        if let Some(price) = patch.selling_price {
            product.selling_price = price;
        }
        if let Some(status) = patch.status {
            product.status = status;
        }
        Ok(product.clone())
    }

    async fn reserve_invoice_sequence(&self) -> PortResult<u64> {
        let mut tables = self.tables()?;
        let reserved = tables.invoice_sequence;
        tables.invoice_sequence += 1;
        Ok(reserved)
    }

    async fn insert_invoice(&self, owner_id: UserId, draft: &InvoiceDraft) -> PortResult<Invoice> {
        let mut tables = self.tables()?;
        if tables.invoices.iter().any(|i| i.number == draft.number) {
            return Err(PortError::Unexpected(format!(
                "Invoice number {} already exists",
                draft.number
            )));
        }
        let invoice = Invoice {
            id: Uuid::new_v4(),
            owner_id,
            number: draft.number.clone(),
            customer: draft.customer.clone(),
            items: draft
                .items
                .iter()
                .map(|item| InvoiceItem {
                    id: Uuid::new_v4(),
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    product_type: item.product_type,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    contract_start: item.contract_start,
                    contract_end: item.contract_end,
                })
                .collect(),
            total: draft.total,
            status: draft.status,
            payment_method: draft.payment_method.clone(),
            created_at: draft.created_at,
        };
        tables.invoices.push(invoice.clone());
        Ok(invoice)
    }

    async fn list_invoices(&self, owner_id: UserId) -> PortResult<Vec<Invoice>> {
        let rows = self
            .tables()?
            .invoices
            .iter()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |i: &Invoice| i.created_at))
    }

    async fn get_invoice(&self, owner_id: UserId, invoice_id: Uuid) -> PortResult<Invoice> {
        self.tables()?
            .invoices
            .iter()
            .find(|i| i.owner_id == owner_id && i.id == invoice_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Invoice {} not found", invoice_id)))
    }

    async fn update_invoice_status(
        &self,
        owner_id: UserId,
        invoice_id: Uuid,
        status: InvoiceStatus,
    ) -> PortResult<()> {
        let mut tables = self.tables()?;
        let invoice = tables
            .invoices
            .iter_mut()
            .find(|i| i.owner_id == owner_id && i.id == invoice_id)
            .ok_or_else(|| PortError::NotFound(format!("Invoice {} not found", invoice_id)))?;
        invoice.status = status;
        Ok(())
    }

    async fn delete_invoices(&self, owner_id: UserId, invoice_ids: &[Uuid]) -> PortResult<u64> {
        let mut tables = self.tables()?;
        let before = tables.invoices.len();
        tables
            .invoices
            .retain(|i| !(i.owner_id == owner_id && invoice_ids.contains(&i.id)));
        Ok((before - tables.invoices.len()) as u64)
    }

    async fn list_events(&self, owner_id: UserId) -> PortResult<Vec<Event>> {
        let mut rows: Vec<Event> = self
            .tables()?
            .events
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.start_time);
        Ok(rows)
    }

    async fn create_event(&self, owner_id: UserId, event: &NewEvent) -> PortResult<Event> {
        let created = Event {
            id: Uuid::new_v4(),
            owner_id,
            title: event.title.clone(),
            description: event.description.clone(),
            start_time: event.start_time,
            end_time: event.end_time,
        };
        self.tables()?.events.push(created.clone());
        Ok(created)
    }

    async fn delete_event(&self, owner_id: UserId, event_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        let before = tables.events.len();
        tables
            .events
            .retain(|e| !(e.owner_id == owner_id && e.id == event_id));
        if tables.events.len() == before {
            return Err(PortError::NotFound(format!("Event {} not found", event_id)));
        }
        Ok(())
    }

    async fn list_subscription_lines(&self, owner_id: UserId) -> PortResult<Vec<SubscriptionLine>> {
        let tables = self.tables()?;
        let lines = tables
            .invoices
            .iter()
            .filter(|i| i.owner_id == owner_id && i.status == InvoiceStatus::Completed)
            .flat_map(|invoice| {
                invoice
                    .items
                    .iter()
                    .filter(|item| item.product_type == ProductType::Subscription)
                    .filter(|item| item.contract_end.is_some())
                    .map(move |item| SubscriptionLine {
                        item_id: item.id,
                        invoice_owner_id: invoice.owner_id,
                        invoice_number: invoice.number.clone(),
                        invoice_status: invoice.status,
                        customer_name: invoice.customer.name.clone(),
                        product_name: item.product_name.clone(),
                        product_type: item.product_type,
                        contract_start: item.contract_start,
                        contract_end: item.contract_end,
                    })
            })
            .collect();
        Ok(lines)
    }
}
