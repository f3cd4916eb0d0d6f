pub mod document;
pub mod domain;
pub mod error;
pub mod invoice;
pub mod memory;
pub mod ports;
pub mod search;
pub mod service;
pub mod status;

pub use document::{DocumentLine, InvoiceDocument, RenderedDocument};
pub use domain::{
    AuthSession, ContractDuration, Customer, CustomerSnapshot, Event, Invoice, InvoiceItem,
    InvoiceStatus, NewCustomer, NewEvent, NewInvoice, NewInvoiceLine, NewProduct, Product,
    ProductKind, ProductPatch, ProductStatus, ProductType, User, UserCredentials, UserId,
};
pub use error::{DashboardError, DashboardResult};
pub use invoice::{format_price, InvoiceSummary};
pub use memory::InMemoryDatabase;
pub use ports::{Clock, DatabaseService, DocumentRenderer, FixedClock, PortError, PortResult, SystemClock};
pub use service::{Dashboard, RequestContext};
pub use status::{ClassifiedEvent, EventStatus, SubscriptionStatus, SubscriptionWatch};
