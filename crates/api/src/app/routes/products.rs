use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use validator::Validate;

use bazaar_core::ProductId;
use bazaar_products::{CatalogQuery, ListProductsRequest, ProductView};

use crate::app::dto::{self, Envelope};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::CallerContext;
use crate::middleware::{self, AuthState};

pub fn router(auth: AuthState) -> Router {
    let required = axum::middleware::from_fn_with_state(auth.clone(), middleware::auth_middleware);
    let optional = axum::middleware::from_fn_with_state(auth, middleware::optional_auth_middleware);

    Router::new()
        .route(
            "/",
            get(list_products)
                .layer(optional)
                .merge(post(create_product).layer(required.clone())),
        )
        .route(
            "/:id",
            get(get_product).merge(
                axum::routing::patch(update_product)
                    .delete(delete_product)
                    .layer(required.clone()),
            ),
        )
        .route("/:id/stock", post(update_stock).layer(required.clone()))
        .route("/:id/buy", post(buy_product).layer(required))
}

fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub async fn create_product(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<CallerContext>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };
    if let Err(e) = body.validate() {
        return errors::validation_errors_to_response(e);
    }

    match services.products.create(caller.identity(), body.into_draft()).await {
        Ok(created) => (
            StatusCode::OK,
            Json(Envelope::data(
                "Product created successfully",
                ProductView::new(&created.product, created.tags, 0),
            )),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<AppServices>,
    caller: Option<Extension<CallerContext>>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection(e),
    };

    let request = ListProductsRequest::from_pairs(params);
    if matches!(request.wants_user_only(), Ok(true)) && caller.is_none() {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "userOnly requires a bearer token",
        );
    }

    let query = match CatalogQuery::from_request(&request, caller.map(|Extension(c)| c.user_id())) {
        Ok(q) => q,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog.list(&query).await {
        Ok(page) => (StatusCode::OK, Json(Envelope::page("ok", page.items, page.meta))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<AppServices>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.catalog.detail(product_id).await {
        Ok(detail) => (StatusCode::OK, Json(Envelope::data("ok", detail))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };
    if let Err(e) = body.validate() {
        return errors::validation_errors_to_response(e);
    }

    match services
        .products
        .update(product_id, caller.user_id(), body.into_patch())
        .await
    {
        Ok(updated) => (
            StatusCode::OK,
            Json(Envelope::data(
                "Product updated successfully",
                ProductView::new(&updated.product, updated.tags, 0),
            )),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.products.delete(product_id, caller.user_id()).await {
        Ok(()) => (StatusCode::OK, Json(Envelope::message("Product deleted successfully"))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_stock(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };
    if let Err(e) = body.validate() {
        return errors::validation_errors_to_response(e);
    }

    match services
        .products
        .update_stock(product_id, caller.user_id(), body.stock)
        .await
    {
        Ok(product) => (
            StatusCode::OK,
            Json(Envelope::data("Stock updated successfully", serde_json::json!({
                "productId": product.id,
                "stock": product.stock,
            }))),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn buy_product(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::BuyProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };
    if let Err(e) = body.validate() {
        return errors::validation_errors_to_response(e);
    }

    match services
        .orders
        .place_order(product_id, caller.user_id(), body.into())
        .await
    {
        Ok(order) => (
            StatusCode::OK,
            Json(Envelope::data("success", serde_json::json!({
                "orderId": order.id,
                "productId": order.product_id,
                "bankAccountId": order.bank_account_id,
                "paymentProofImageUrl": order.payment_proof_image_url,
                "quantity": order.quantity,
            }))),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
