//! Invoice and transaction handlers for the Admin Portal

use crate::dto::{ApiResponse, InvoiceListParams, PaginationParams, TransactionListParams};
use crate::factory::ServiceFactory;
use crate::handlers::record_audit;
use actix_web::{web, HttpResponse};
use edufund_auth::{AdminUser, StaffUser};
use edufund_core::models::{AuditEntity, AuditLog};
use edufund_core::AppError;
use serde_json::json;
use tracing::{info, instrument};

/// GET /api/v1/admin/invoices
#[instrument(skip(factory, _user))]
pub async fn list_invoices(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    params: web::Query<InvoiceListParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.to_query(&page, factory.today())?;
    let result = factory.invoices().list(&query).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/v1/admin/invoices/{id}
#[instrument(skip(factory, _user))]
pub async fn get_invoice(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let invoice = factory.invoices().get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(invoice)))
}

/// POST /api/v1/admin/invoices/{id}/cancel
#[instrument(skip(factory, user))]
pub async fn cancel_invoice(
    factory: web::Data<ServiceFactory>,
    user: AdminUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let invoice = factory.invoices().cancel(id).await?;

    info!(actor = %user.username, invoice_number = %invoice.invoice_number, "Invoice cancelled");
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "cancel_invoice", AuditEntity::Invoice)
            .entity_id(id)
            .details(json!({ "amount": invoice.amount }))
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(invoice, "Invoice cancelled")))
}

/// GET /api/v1/admin/transactions
#[instrument(skip(factory, _user))]
pub async fn list_transactions(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    params: web::Query<TransactionListParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.to_query(&page)?;
    let result = factory.transactions().list(&query).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/v1/admin/transactions/{id}
#[instrument(skip(factory, _user))]
pub async fn get_transaction(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let transaction = factory.transactions().get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(transaction)))
}

/// Mount `/invoices` and the transaction ledger
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/invoices")
            .route("", web::get().to(list_invoices))
            .route("/{id}", web::get().to(get_invoice))
            .route("/{id}/cancel", web::post().to(cancel_invoice)),
    )
    .service(
        web::scope("/transactions")
            .route("", web::get().to(list_transactions))
            .route("/{id}", web::get().to(get_transaction)),
    );
}
