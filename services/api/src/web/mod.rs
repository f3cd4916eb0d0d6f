pub mod auth;
pub mod dto;
pub mod middleware;
pub mod protocol;
pub mod refresh_task;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use self::{
    auth::{login_handler, logout_handler, signup_handler},
    middleware::resolve_user,
    rest::*,
    state::AppState,
};
pub use ws_handler::ws_handler;

/// Builds the complete application router: auth, REST, the live feed and the
/// Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    let mut cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    match app_state.config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => warn!(
            "Ignoring invalid CORS origin '{}': {}",
            app_state.config.cors_origin, e
        ),
    }

    // Public routes (no user required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Routes that run with the caller's RequestContext
    let dashboard_routes = Router::new()
        .route(
            "/customers",
            get(list_customers_handler).post(create_customer_handler),
        )
        .route("/customers/{id}", delete(delete_customer_handler))
        .route(
            "/products",
            get(list_products_handler).post(create_product_handler),
        )
        .route("/products/{id}", patch(update_product_handler))
        .route(
            "/invoices",
            get(list_invoices_handler)
                .post(create_invoice_handler)
                .delete(delete_invoices_handler),
        )
        .route("/invoices/summary", get(invoice_summary_handler))
        .route("/invoices/{id}", get(get_invoice_handler))
        .route("/invoices/{id}/status", put(update_invoice_status_handler))
        .route("/invoices/{id}/document", get(invoice_document_handler))
        .route("/events", get(list_events_handler).post(create_event_handler))
        .route("/events/{id}", delete(delete_event_handler))
        .route("/subscriptions", get(list_subscriptions_handler))
        .route("/ws/live", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            resolve_user,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(dashboard_routes)
        .layer(cors)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()))
}
