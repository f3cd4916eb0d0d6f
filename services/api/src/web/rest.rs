//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Every handler receives the `RequestContext` resolved by the auth
//! middleware and delegates to the `Dashboard`; failures are mapped to HTTP
//! responses by `error::to_response`.

use crate::{
    error::to_response,
    web::{auth, dto::*, state::AppState},
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use dashboard_core::{NewProduct, RequestContext};
use std::sync::Arc;
use tracing::warn;
use utoipa::OpenApi;
use uuid::Uuid;

type HandlerResult<T> = Result<T, (StatusCode, String)>;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        list_customers_handler,
        create_customer_handler,
        delete_customer_handler,
        list_products_handler,
        create_product_handler,
        update_product_handler,
        list_invoices_handler,
        create_invoice_handler,
        delete_invoices_handler,
        invoice_summary_handler,
        get_invoice_handler,
        update_invoice_status_handler,
        invoice_document_handler,
        list_events_handler,
        create_event_handler,
        delete_event_handler,
        list_subscriptions_handler,
    ),
    components(
        schemas(
            auth::SignupRequest, auth::LoginRequest, auth::AuthResponse,
            CreateCustomerRequest, CustomerResponse,
            ProductTypeDto, ProductStatusDto, CreateProductRequest, UpdateProductRequest, ProductResponse,
            InvoiceStatusDto, CustomerSnapshotDto, CreateInvoiceItemRequest, CreateInvoiceRequest,
            InvoiceItemResponse, InvoiceResponse, UpdateInvoiceStatusRequest,
            DeleteInvoicesRequest, DeleteInvoicesResponse, InvoiceSummaryResponse,
            EventStatusDto, CreateEventRequest, EventResponse,
            SubscriptionStatusDto, SubscriptionResponse,
        )
    ),
    tags(
        (name = "Business Dashboard API", description = "Customers, products, invoices, events and subscription tracking.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Customers
//=========================================================================================

/// List the current user's customers, optionally filtered by `q`.
#[utoipa::path(
    get,
    path = "/customers",
    params(ListQuery),
    responses(
        (status = 200, description = "Customers of the current user", body = [CustomerResponse]),
        (status = 401, description = "User not authenticated"),
        (status = 502, description = "Data store failure")
    )
)]
pub async fn list_customers_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> HandlerResult<Json<Vec<CustomerResponse>>> {
    let customers = app_state
        .dashboard
        .list_customers(&ctx, query.search())
        .await
        .map_err(to_response)?;
    Ok(Json(customers.into_iter().map(CustomerResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Invalid customer"),
        (status = 401, description = "User not authenticated")
    )
)]
pub async fn create_customer_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CreateCustomerRequest>,
) -> HandlerResult<impl IntoResponse> {
    let customer = app_state
        .dashboard
        .create_customer(&ctx, req.into())
        .await
        .map_err(to_response)?;
    Ok((StatusCode::CREATED, Json(CustomerResponse::from(customer))))
}

#[utoipa::path(
    delete,
    path = "/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 401, description = "User not authenticated"),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn delete_customer_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> HandlerResult<StatusCode> {
    app_state
        .dashboard
        .delete_customer(&ctx, id)
        .await
        .map_err(to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Products
//=========================================================================================

/// List products; `active_only=true` restricts to products that can be invoiced.
#[utoipa::path(
    get,
    path = "/products",
    params(ListQuery),
    responses(
        (status = 200, description = "Products of the current user", body = [ProductResponse]),
        (status = 401, description = "User not authenticated")
    )
)]
pub async fn list_products_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> HandlerResult<Json<Vec<ProductResponse>>> {
    let products = app_state
        .dashboard
        .list_products(&ctx, query.search(), query.active_only.unwrap_or(false))
        .await
        .map_err(to_response)?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product"),
        (status = 401, description = "User not authenticated")
    )
)]
pub async fn create_product_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CreateProductRequest>,
) -> HandlerResult<impl IntoResponse> {
    let product = NewProduct::try_from(req).map_err(|reason| {
        warn!("Rejected product payload: {}", reason);
        (StatusCode::BAD_REQUEST, reason)
    })?;
    let product = app_state
        .dashboard
        .create_product(&ctx, product)
        .await
        .map_err(to_response)?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

/// Change a product's selling price or status. Existing invoices are unaffected.
#[utoipa::path(
    patch,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid update"),
        (status = 401, description = "User not authenticated"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn update_product_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> HandlerResult<Json<ProductResponse>> {
    let product = app_state
        .dashboard
        .update_product(&ctx, id, req.into())
        .await
        .map_err(to_response)?;
    Ok(Json(product.into()))
}

//=========================================================================================
// Invoices
//=========================================================================================

/// List invoices, newest first, optionally filtered by `q`.
#[utoipa::path(
    get,
    path = "/invoices",
    params(ListQuery),
    responses(
        (status = 200, description = "Invoices of the current user", body = [InvoiceResponse]),
        (status = 401, description = "User not authenticated")
    )
)]
pub async fn list_invoices_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> HandlerResult<Json<Vec<InvoiceResponse>>> {
    let dashboard = &app_state.dashboard;
    let invoices = dashboard
        .list_invoices(&ctx, query.search())
        .await
        .map_err(to_response)?;
    Ok(Json(
        invoices
            .into_iter()
            .map(|i| InvoiceResponse::from_invoice(i, dashboard.currency_suffix()))
            .collect(),
    ))
}

/// Create an invoice. Unit prices are frozen from the products' current selling prices.
#[utoipa::path(
    post,
    path = "/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = InvoiceResponse),
        (status = 400, description = "Invalid invoice"),
        (status = 401, description = "User not authenticated"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn create_invoice_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CreateInvoiceRequest>,
) -> HandlerResult<impl IntoResponse> {
    let dashboard = &app_state.dashboard;
    let invoice = dashboard
        .create_invoice(&ctx, req.into())
        .await
        .map_err(to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse::from_invoice(invoice, dashboard.currency_suffix())),
    ))
}

/// Delete a selection of invoices together with their items.
#[utoipa::path(
    delete,
    path = "/invoices",
    request_body = DeleteInvoicesRequest,
    responses(
        (status = 200, description = "Invoices deleted", body = DeleteInvoicesResponse),
        (status = 401, description = "User not authenticated")
    )
)]
pub async fn delete_invoices_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<DeleteInvoicesRequest>,
) -> HandlerResult<Json<DeleteInvoicesResponse>> {
    let deleted = app_state
        .dashboard
        .delete_invoices(&ctx, &req.ids)
        .await
        .map_err(to_response)?;
    Ok(Json(DeleteInvoicesResponse { deleted }))
}

#[utoipa::path(
    get,
    path = "/invoices/summary",
    responses(
        (status = 200, description = "Totals per invoice status", body = InvoiceSummaryResponse),
        (status = 401, description = "User not authenticated")
    )
)]
pub async fn invoice_summary_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> HandlerResult<Json<InvoiceSummaryResponse>> {
    let dashboard = &app_state.dashboard;
    let summary = dashboard.invoice_summary(&ctx).await.map_err(to_response)?;
    Ok(Json(InvoiceSummaryResponse::from_summary(
        summary,
        dashboard.currency_suffix(),
    )))
}

#[utoipa::path(
    get,
    path = "/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "The invoice", body = InvoiceResponse),
        (status = 401, description = "User not authenticated"),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn get_invoice_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> HandlerResult<Json<InvoiceResponse>> {
    let dashboard = &app_state.dashboard;
    let invoice = dashboard.get_invoice(&ctx, id).await.map_err(to_response)?;
    Ok(Json(InvoiceResponse::from_invoice(
        invoice,
        dashboard.currency_suffix(),
    )))
}

#[utoipa::path(
    put,
    path = "/invoices/{id}/status",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body = UpdateInvoiceStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = InvoiceResponse),
        (status = 401, description = "User not authenticated"),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn update_invoice_status_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInvoiceStatusRequest>,
) -> HandlerResult<Json<InvoiceResponse>> {
    let dashboard = &app_state.dashboard;
    dashboard
        .update_invoice_status(&ctx, id, req.status.into())
        .await
        .map_err(to_response)?;
    let invoice = dashboard.get_invoice(&ctx, id).await.map_err(to_response)?;
    Ok(Json(InvoiceResponse::from_invoice(
        invoice,
        dashboard.currency_suffix(),
    )))
}

/// Download the printable invoice document.
#[utoipa::path(
    get,
    path = "/invoices/{id}/document",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "The rendered invoice PDF", content_type = "application/pdf"),
        (status = 401, description = "User not authenticated"),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn invoice_document_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> HandlerResult<impl IntoResponse> {
    let document = app_state
        .dashboard
        .render_invoice(&ctx, id)
        .await
        .map_err(to_response)?;
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.file_name),
            ),
        ],
        document.body,
    ))
}

//=========================================================================================
// Events
//=========================================================================================

/// List calendar events ordered by start, each with its status at the time of the request.
#[utoipa::path(
    get,
    path = "/events",
    responses(
        (status = 200, description = "Events of the current user", body = [EventResponse]),
        (status = 401, description = "User not authenticated")
    )
)]
pub async fn list_events_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> HandlerResult<Json<Vec<EventResponse>>> {
    let events = app_state
        .dashboard
        .list_events(&ctx)
        .await
        .map_err(to_response)?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created"),
        (status = 400, description = "Invalid event"),
        (status = 401, description = "User not authenticated")
    )
)]
pub async fn create_event_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CreateEventRequest>,
) -> HandlerResult<impl IntoResponse> {
    let event = app_state
        .dashboard
        .create_event(&ctx, req.into())
        .await
        .map_err(to_response)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": event.id }))))
}

#[utoipa::path(
    delete,
    path = "/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 401, description = "User not authenticated"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn delete_event_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> HandlerResult<StatusCode> {
    app_state
        .dashboard
        .delete_event(&ctx, id)
        .await
        .map_err(to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Subscriptions
//=========================================================================================

/// Subscription contracts from completed invoices, soonest expiry first.
#[utoipa::path(
    get,
    path = "/subscriptions",
    responses(
        (status = 200, description = "Tracked subscriptions", body = [SubscriptionResponse]),
        (status = 401, description = "User not authenticated")
    )
)]
pub async fn list_subscriptions_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> HandlerResult<Json<Vec<SubscriptionResponse>>> {
    let subscriptions = app_state
        .dashboard
        .list_subscriptions(&ctx)
        .await
        .map_err(to_response)?;
    Ok(Json(
        subscriptions
            .into_iter()
            .map(SubscriptionResponse::from)
            .collect(),
    ))
}
