//! The signed-in holder's invoices, payments and transaction history

use crate::dto::{ApiResponse, InvoiceListParams, PaginationParams, PayInvoiceRequest, PaymentResponse, TransactionListParams};
use crate::factory::ServiceFactory;
use crate::handlers::{client_ip, record_audit};
use actix_web::{web, HttpRequest, HttpResponse};
use edufund_auth::HolderUser;
use edufund_core::models::{AuditEntity, AuditLog};
use edufund_core::AppError;
use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

/// GET /api/v1/eservice/transactions
#[instrument(skip(factory, holder), fields(holder_id = holder.holder_id))]
pub async fn list_transactions(
    factory: web::Data<ServiceFactory>,
    holder: HolderUser,
    params: web::Query<TransactionListParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.to_query(&page)?;
    let result = factory
        .transactions()
        .list_for_holder(holder.holder_id, query)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/v1/eservice/invoices
#[instrument(skip(factory, holder), fields(holder_id = holder.holder_id))]
pub async fn list_invoices(
    factory: web::Data<ServiceFactory>,
    holder: HolderUser,
    params: web::Query<InvoiceListParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let mut query = params.to_query(&page, factory.today())?;
    query.holder_id = Some(holder.holder_id);
    let result = factory.invoices().list(&query).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/v1/eservice/invoices/{id}
#[instrument(skip(factory, holder), fields(holder_id = holder.holder_id))]
pub async fn get_invoice(
    factory: web::Data<ServiceFactory>,
    holder: HolderUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let invoice = factory
        .invoices()
        .get_for_holder(holder.holder_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(invoice)))
}

/// POST /api/v1/eservice/invoices/{id}/pay
///
/// Settles an outstanding invoice from the account balance, an external
/// method, or both.
#[instrument(skip(factory, holder, req, http_req), fields(holder_id = holder.holder_id))]
pub async fn pay_invoice(
    factory: web::Data<ServiceFactory>,
    holder: HolderUser,
    path: web::Path<i32>,
    req: web::Json<PayInvoiceRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let invoice_id = path.into_inner();

    let (invoice, transactions) = factory
        .invoices()
        .pay(holder.holder_id, invoice_id, req.into_inner().into(), &holder.nric)
        .await?;

    info!(
        invoice_number = %invoice.invoice_number,
        transactions = transactions.len(),
        "Invoice paid"
    );
    record_audit(
        &factory,
        AuditLog::builder(&holder.nric, "pay_invoice", AuditEntity::Invoice)
            .entity_id(invoice_id)
            .details(json!({
                "amount": invoice.amount,
                "transaction_ids": transactions.iter().map(|t| t.id).collect::<Vec<_>>(),
            }))
            .ip_address(client_ip(&http_req))
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        PaymentResponse { invoice, transactions },
        "Payment received",
    )))
}

/// Mount the holder invoice and transaction routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/transactions", web::get().to(list_transactions))
        .service(
            web::scope("/invoices")
                .route("", web::get().to(list_invoices))
                .route("/{id}", web::get().to(get_invoice))
                .route("/{id}/pay", web::post().to(pay_invoice)),
        );
}
