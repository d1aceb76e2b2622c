use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use shop::models::{ProductFilter, ProductSort};
use uuid::Uuid;

use crate::{error::ApiResult, state::AppState};

/// Query parameters of the product listing
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        ProductFilter {
            category: query.category,
            search: query.search,
            sort: query
                .sort
                .as_deref()
                .map(ProductSort::parse)
                .unwrap_or_default(),
        }
    }
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<impl IntoResponse> {
    let products = state.catalog.list_products(&query.into()).await?;
    let categories = state.catalog.categories().await?;

    Ok(Json(json!({
        "success": true,
        "total": products.len(),
        "products": products,
        "categories": categories,
    })))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (product, similar) = state.catalog.product_with_similar(id).await?;

    Ok(Json(json!({
        "success": true,
        "product": product,
        "similarProducts": similar,
    })))
}
