//! HTTP surface: cron trigger, downloads, signed file serving, admin uploads

pub mod error;
pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::context::PortalContext;

pub use handlers::RunSummary;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn router(ctx: PortalContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/cron/generate-receipts", post(handlers::generate_receipts))
        .route("/api/download", get(handlers::download))
        .route("/files/*path", get(handlers::serve_file))
        .route(
            "/api/admin/documents",
            post(handlers::upload_document).get(handlers::list_documents),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
