use actix_web::{Responder, get, web};
use common::{
    error::{AppError, Res},
    http::Success,
};
use logger::PaymentLog;
use serde_json::json;

use crate::dtos::sub::PaymentLogQuery;

const DEFAULT_LOG_COUNT: usize = 10;
const MAX_LOG_COUNT: usize = 500;

/// Most recent payment log entries, newest first.
/// `?errors=true` reads the error log instead of the transaction log.
#[get("/admin/payment-logs", wrap = "api_auth::admin_middleware()")]
pub async fn get_payment_logs(
    query: web::Query<PaymentLogQuery>,
    payments: web::Data<PaymentLog>,
) -> Res<impl Responder> {
    let count = query.count.unwrap_or(DEFAULT_LOG_COUNT).min(MAX_LOG_COUNT);
    let logs = payments
        .recent(count, query.errors.unwrap_or(false))
        .map_err(|e| AppError::Internal(format!("Failed to read payment logs: {}", e)))?;
    Success::ok(json!({ "count": logs.len(), "logs": logs }))
}
