//! Order endpoints. Listings and lookups require a session; the status
//! taxonomy is public.

use serde_json::json;
use storefront_core::ApiError;
use storefront_core::sanitize::IntegerOptions;

use crate::dispatch::{Failure, HandlerCx};
use crate::models::OrderModel;
use crate::routes::Reply;

/// GET /orders.
pub async fn list(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let offset = cx.request.query_integer(
        "offset",
        &IntegerOptions {
            min: Some(0),
            ..Default::default()
        },
    );
    let limit = cx.request.query_integer(
        "limit",
        &IntegerOptions {
            min: Some(0),
            default: 10,
            ..Default::default()
        },
    );

    let result = OrderModel::new(cx.db()).read_all(offset, limit).await?;
    Ok(Reply::data(json!(result)))
}

/// GET /orders/:id.
pub async fn show(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let id = cx.request.param_integer("id", &IntegerOptions::default());
    if id == 0 {
        return Err(ApiError::missing_parameters("Order id is required").into());
    }

    let result = OrderModel::new(cx.db()).read(id).await?;
    Ok(Reply::data(json!(result)))
}

/// GET /orders/statuses.
pub async fn statuses(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let result = OrderModel::new(cx.db()).read_statuses().await?;
    Ok(Reply::data(json!(result)))
}

/// GET /orders/status/:name.
pub async fn by_status(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let name = cx.request.param("name");
    if name.is_empty() {
        return Err(ApiError::missing_parameters("Order status name is required").into());
    }

    let result = OrderModel::new(cx.db()).read_status(&name).await?;
    Ok(Reply::data(json!(result)))
}
