//! Product endpoints. Reads are public; writes require a session.

use serde_json::json;
use storefront_core::ApiError;
use storefront_core::sanitize::{BooleanOptions, FloatOptions, IntegerOptions, StringOptions, UrlOptions};
use storefront_infra::SqlValue;

use crate::dispatch::{Failure, HandlerCx};
use crate::models::ProductModel;
use crate::routes::Reply;

fn paging(cx: &HandlerCx<'_>) -> (i64, i64) {
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
    (offset, limit)
}

/// GET /products.
pub async fn list(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let (offset, limit) = paging(cx);

    let result = ProductModel::new(cx.db()).read_all(offset, limit).await?;
    Ok(Reply::data(json!(result)))
}

/// GET /products/:id.
pub async fn show(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let id = cx.request.param_integer("id", &IntegerOptions::default());
    if id == 0 {
        return Err(ApiError::missing_parameters("Product id is required").into());
    }

    let result = ProductModel::new(cx.db()).read(id).await?;
    Ok(Reply::data(match result {
        Some(row) => json!(row),
        None => json!([]),
    }))
}

/// GET /products/categories.
pub async fn categories(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let result = ProductModel::new(cx.db()).read_categories().await?;
    Ok(Reply::data(json!(result)))
}

/// GET /products/category/:name.
pub async fn by_category(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let name = cx.request.param("name");
    if name.is_empty() {
        return Err(ApiError::missing_parameters("Product category name is required").into());
    }

    let result = ProductModel::new(cx.db()).read_category(&name).await?;
    Ok(Reply::data(json!(result)))
}

/// PUT /products/:id — update whichever fields the request provides.
pub async fn update(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let id = cx.request.param_integer("id", &IntegerOptions::default());
    if id == 0 {
        return Err(ApiError::missing_parameters("Product id is required").into());
    }

    let request = cx.request;
    let mut fields: Vec<(&str, SqlValue)> = Vec::new();

    if request.has_value("name") {
        fields.push(("name", request.string("name", &StringOptions::default()).into()));
    }
    if request.has_value("description") {
        fields.push((
            "description",
            request.string("description", &StringOptions::default()).into(),
        ));
    }
    if request.has_value("price") {
        fields.push((
            "price",
            request
                .float(
                    "price",
                    &FloatOptions {
                        min: Some(0.0),
                        decimals: Some(2),
                        ..Default::default()
                    },
                )
                .into(),
        ));
    }
    if request.has_value("stock") {
        fields.push((
            "stock",
            request
                .integer(
                    "stock",
                    &IntegerOptions {
                        min: Some(0),
                        ..Default::default()
                    },
                )
                .into(),
        ));
    }
    if request.has_value("category") {
        fields.push((
            "category",
            request.string("category", &StringOptions::default()).into(),
        ));
    }
    if request.has_value("image_url") {
        fields.push(("image_url", request.url("image_url", &UrlOptions::default()).into()));
    }
    if request.has_value("is_active") {
        fields.push((
            "is_active",
            request.boolean("is_active", &BooleanOptions::default()).into(),
        ));
    }

    let updated = ProductModel::new(cx.db()).update(id, &fields).await?;
    if !updated {
        return Err(ApiError::validation("Failed to update product").into());
    }

    Ok(Reply::data(json!([])))
}

/// DELETE /products/:id.
pub async fn delete(cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    let id = cx.request.param_integer("id", &IntegerOptions::default());
    if id == 0 {
        return Err(ApiError::missing_parameters("Product id is required").into());
    }

    let deleted = ProductModel::new(cx.db()).delete(id).await?;
    if !deleted {
        return Err(ApiError::validation("Failed to delete product").into());
    }

    Ok(Reply::data(json!([])))
}
