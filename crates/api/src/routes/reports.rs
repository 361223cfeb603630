//! Report endpoint: a fixed set of per-user aggregates.

use serde_json::json;
use storefront_core::ApiError;

use crate::dispatch::{Failure, HandlerCx};
use crate::models::ReportModel;
use crate::routes::Reply;

/// GET /report/:reportId. The report id maps to a known query; anything
/// else is a 404.
pub async fn show(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let user_id = cx.session()?.user_id;
    let report_id = cx.request.param("reportId");

    let model = ReportModel::new(cx.db());
    let result = match report_id.as_str() {
        "orderStats" => model.order_stats(user_id).await?,
        "topProducts" => model.top_products(user_id).await?,
        "recentOrders" => model.recent_orders(user_id).await?,
        _ => {
            return Err(ApiError::not_found("Report not found")
                .with_context("reportId", report_id.as_str())
                .into());
        }
    };

    Ok(Reply::data(json!(result)))
}
