//! JSON API for products, nested under `/api/products`

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use axum_helpers::{
    errors::responses::{
        BadRequestIdResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse,
    },
    AuditEvent, AuditOutcome, IdPath, ValidatedJson,
};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::entity;
use crate::error::ProductResult;
use crate::models::{CatalogStatistics, CategoryCount, Product, SaveProduct};
use crate::repository::ProductRepository;
use crate::service::ProductService;

/// Path the JSON API is mounted at, used for `Location` headers
pub const API_BASE_PATH: &str = "/api/products";

/// OpenAPI documentation for the products JSON API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        list_categories,
        get_statistics,
        get_product,
        update_product,
        delete_product,
    ),
    components(
        schemas(Product, SaveProduct, CatalogStatistics, CategoryCount),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestIdResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = entity::Model::TAG, description = "Product catalog endpoints")
    )
)]
pub struct ApiDoc;

/// Create the products router with all JSON endpoints
pub fn router<R: ProductRepository + 'static>(service: ProductService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/categories", get(list_categories))
        .route("/statistics", get(get_statistics))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .with_state(shared_service)
}

/// List every product in id order
#[utoipa::path(
    get,
    path = "",
    tag = entity::Model::TAG,
    responses(
        (status = 200, description = "All products", body = Vec<Product>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service.all_products().await?;
    Ok(Json(products))
}

/// Create a product; any `id` in the body is ignored
#[utoipa::path(
    post,
    path = "",
    tag = entity::Model::TAG,
    request_body = SaveProduct,
    responses(
        (status = 201, description = "Product created", body = Product,
            headers(("Location" = String, description = "URL of the new product"))),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<SaveProduct>,
) -> ProductResult<impl IntoResponse> {
    let product = service.save(SaveProduct { id: None, ..input }).await?;

    AuditEvent::new("product.create", AuditOutcome::Success)
        .with_resource(format!("product:{}", product.id))
        .with_request_headers(&headers)
        .with_details(json!({
            "product_code": product.product_code,
            "category": product.category,
        }))
        .log();

    let location = format!("{}/{}", API_BASE_PATH, product.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(product),
    ))
}

/// Distinct categories, sorted
#[utoipa::path(
    get,
    path = "/categories",
    tag = entity::Model::TAG,
    responses(
        (status = 200, description = "Category labels", body = Vec<String>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_categories<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
) -> ProductResult<Json<Vec<String>>> {
    let categories = service.categories().await?;
    Ok(Json(categories))
}

/// Catalog statistics
#[utoipa::path(
    get,
    path = "/statistics",
    tag = entity::Model::TAG,
    responses(
        (status = 200, description = "Aggregates over the catalog", body = CatalogStatistics),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_statistics<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
) -> ProductResult<Json<CatalogStatistics>> {
    let statistics = service.statistics().await?;
    Ok(Json(statistics))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
) -> ProductResult<Json<Product>> {
    let product = service.get_product(id).await?;
    Ok(Json(product))
}

/// Replace a product's editable fields
#[utoipa::path(
    put,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = SaveProduct,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<SaveProduct>,
) -> ProductResult<Json<Product>> {
    // 404 takes precedence over a code conflict
    service.get_product(id).await?;

    let product = service.save(SaveProduct { id: Some(id), ..input }).await?;

    AuditEvent::new("product.update", AuditOutcome::Success)
        .with_resource(format!("product:{}", id))
        .with_request_headers(&headers)
        .log();

    Ok(Json(product))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = entity::Model::TAG,
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
    headers: HeaderMap,
) -> ProductResult<impl IntoResponse> {
    service.delete(id).await?;

    AuditEvent::new("product.delete", AuditOutcome::Success)
        .with_resource(format!("product:{}", id))
        .with_request_headers(&headers)
        .log();

    Ok(StatusCode::NO_CONTENT)
}
