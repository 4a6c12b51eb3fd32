//! Page endpoints: dashboard, product list/search, form, save/delete and export.
//!
//! Every page answers with its view model as JSON. Mutations redirect back
//! to `/products` and leave a one-shot flash message in a cookie that the
//! next list view consumes.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_helpers::{AppError, AuditEvent, AuditOutcome, IdPath, QueryParams};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::export;
use crate::models::{
    field_errors, non_blank, AdvancedSearchQuery, CatalogStatistics, CategoryCount, Page,
    PageQuery, Product, SaveProduct, LOW_STOCK_THRESHOLD,
};
use crate::repository::ProductRepository;
use crate::service::ProductService;
use crate::storage::FileStorage;

pub const FLASH_COOKIE: &str = "flash";
pub const LIST_PATH: &str = "/products";

/// Uploads larger than this are rejected before reaching the handler
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared state of the page routes
pub struct PageState<R: ProductRepository> {
    pub service: ProductService<R>,
    pub storage: FileStorage,
}

/// Create the page router
pub fn router<R: ProductRepository + 'static>(
    service: ProductService<R>,
    storage: FileStorage,
) -> Router {
    let state = Arc::new(PageState { service, storage });

    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/products", get(list_products))
        .route("/products/", get(list_products))
        .route("/products/new", get(new_form))
        .route("/products/edit/{id}", get(edit_form))
        .route(
            "/products/save",
            post(save_product).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/products/delete/{id}", get(delete_product))
        .route("/products/search", get(search_products))
        .route("/products/advanced-search", get(advanced_search))
        .route("/export/excel", get(export_excel))
        .with_state(state)
}

// ===== Flash messages =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FlashKind {
    Message,
    Error,
}

/// One-shot notice shown on the next list view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

impl Flash {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Message,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            text: text.into(),
        }
    }

    /// Cookie value: `<kind>:<url-encoded text>`
    pub fn encode(&self) -> String {
        format!("{}:{}", self.kind, urlencoding::encode(&self.text))
    }

    pub fn decode(value: &str) -> Option<Self> {
        let (kind, text) = value.split_once(':')?;
        Some(Self {
            kind: FlashKind::from_str(kind).ok()?,
            text: urlencoding::decode(text).ok()?.into_owned(),
        })
    }
}

fn flash_cookie(value: String) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Take the pending flash (if any) and clear the cookie.
fn take_flash(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let flash = jar
        .get(FLASH_COOKIE)
        .and_then(|cookie| Flash::decode(cookie.value()));

    match flash {
        Some(flash) => (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), Some(flash)),
        None => (jar, None),
    }
}

/// 303 to the product list carrying `flash`
fn redirect_with(jar: CookieJar, flash: Flash) -> Response {
    let jar = jar.add(flash_cookie(flash.encode()));
    (jar, Redirect::to(LIST_PATH)).into_response()
}

// ===== View models =====

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub total_products: u64,
    pub total_value: Decimal,
    pub average_price: Option<Decimal>,
    pub category_counts: Vec<CategoryCount>,
    pub low_stock_products: Vec<Product>,
    pub low_stock_threshold: i32,
    pub recent_products: Vec<Product>,
}

impl From<CatalogStatistics> for DashboardView {
    fn from(stats: CatalogStatistics) -> Self {
        Self {
            total_products: stats.total_products,
            total_value: stats.total_value,
            average_price: stats.average_price,
            category_counts: stats.category_counts,
            low_stock_products: stats.low_stock_products,
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            recent_products: stats.recent_products,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub products: Vec<Product>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub size: u64,
    pub sort_by: Option<String>,
    pub sort_dir: String,
    pub selected_category: Option<String>,
    pub categories: Vec<String>,
    /// Echo of the simple search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Echo of the advanced search criteria
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<AdvancedSearchQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

impl ListView {
    fn new(page: Page<Product>, query: &PageQuery, categories: Vec<String>) -> Self {
        Self {
            products: page.content,
            current_page: page.page,
            total_pages: page.total_pages,
            total_items: page.total_elements,
            size: page.size,
            sort_by: non_blank(query.sort_by.clone()),
            sort_dir: query.sort_dir.clone(),
            selected_category: None,
            categories,
            keyword: None,
            search: None,
            flash: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub product: SaveProduct,
    pub categories: Vec<String>,
    /// Field name to messages; empty when the form is valid
    pub errors: BTreeMap<String, Vec<String>>,
}

// ===== Handlers =====

async fn dashboard<R: ProductRepository>(
    State(state): State<Arc<PageState<R>>>,
) -> ProductResult<Json<DashboardView>> {
    let statistics = state.service.statistics().await?;
    Ok(Json(statistics.into()))
}

#[derive(Debug, Deserialize)]
struct CategoryQuery {
    category: Option<String>,
}

async fn list_products<R: ProductRepository>(
    State(state): State<Arc<PageState<R>>>,
    jar: CookieJar,
    QueryParams(filter): QueryParams<CategoryQuery>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ProductResult<(CookieJar, Json<ListView>)> {
    let category = non_blank(filter.category);
    let page = state
        .service
        .list_page(category.clone(), query.to_page_request()?)
        .await?;
    let categories = state.service.categories().await?;

    let (jar, flash) = take_flash(jar);
    let view = ListView {
        selected_category: category,
        flash,
        ..ListView::new(page, &query, categories)
    };
    Ok((jar, Json(view)))
}

#[derive(Debug, Deserialize)]
struct KeywordQuery {
    keyword: Option<String>,
}

async fn search_products<R: ProductRepository>(
    State(state): State<Arc<PageState<R>>>,
    QueryParams(search): QueryParams<KeywordQuery>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ProductResult<Json<ListView>> {
    let page = state
        .service
        .search(search.keyword.clone(), query.to_page_request()?)
        .await?;
    let categories = state.service.categories().await?;

    Ok(Json(ListView {
        keyword: Some(search.keyword.unwrap_or_default()),
        ..ListView::new(page, &query, categories)
    }))
}

async fn advanced_search<R: ProductRepository>(
    State(state): State<Arc<PageState<R>>>,
    QueryParams(search): QueryParams<AdvancedSearchQuery>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ProductResult<Json<ListView>> {
    let page = state
        .service
        .advanced_search(search.to_filter()?, query.to_page_request()?)
        .await?;
    let categories = state.service.categories().await?;

    Ok(Json(ListView {
        selected_category: non_blank(search.category.clone()),
        search: Some(search),
        ..ListView::new(page, &query, categories)
    }))
}

async fn new_form<R: ProductRepository>(
    State(state): State<Arc<PageState<R>>>,
) -> ProductResult<Json<FormView>> {
    Ok(Json(FormView {
        product: SaveProduct::default(),
        categories: state.service.categories().await?,
        errors: BTreeMap::new(),
    }))
}

async fn edit_form<R: ProductRepository>(
    State(state): State<Arc<PageState<R>>>,
    jar: CookieJar,
    IdPath(id): IdPath,
) -> ProductResult<Response> {
    let product = match state.service.get_product(id).await {
        Ok(product) => product,
        Err(ProductError::NotFound(_)) => {
            return Ok(redirect_with(jar, Flash::error("Product not found")));
        }
        Err(e) => return Err(e),
    };

    let view = FormView {
        product: product.into(),
        categories: state.service.categories().await?,
        errors: BTreeMap::new(),
    };
    Ok(Json(view).into_response())
}

/// Upload part of the product form
struct ImageUpload {
    file_name: String,
    bytes: Bytes,
}

/// Raw multipart form; numbers stay text until [`ProductForm::into_input`]
#[derive(Default)]
struct ProductForm {
    fields: BTreeMap<String, String>,
    image: Option<ImageUpload>,
}

impl ProductForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "imageFile" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload { file_name, bytes });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    fn text(&self, name: &str) -> Option<String> {
        non_blank(self.fields.get(name).cloned())
    }

    /// Parse into a normalized input plus any field errors.
    fn into_input(&self) -> (SaveProduct, BTreeMap<String, Vec<String>>) {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();

        let id = match self.text("id").map(|raw| raw.parse::<i64>()) {
            Some(Ok(id)) => Some(id),
            Some(Err(_)) => {
                errors.entry("id".into()).or_default().push("Invalid id".into());
                None
            }
            None => None,
        };

        let price = match self.text("price").map(|raw| Decimal::from_str(&raw)) {
            Some(Ok(price)) => price,
            Some(Err(_)) => {
                errors
                    .entry("price".into())
                    .or_default()
                    .push("Price must be a number".into());
                Decimal::ZERO
            }
            None => {
                errors
                    .entry("price".into())
                    .or_default()
                    .push("Price is required".into());
                Decimal::ZERO
            }
        };

        let quantity = match self.text("quantity").map(|raw| raw.parse::<i32>()) {
            Some(Ok(quantity)) => quantity,
            Some(Err(_)) => {
                errors
                    .entry("quantity".into())
                    .or_default()
                    .push("Quantity must be a whole number".into());
                0
            }
            None => {
                errors
                    .entry("quantity".into())
                    .or_default()
                    .push("Quantity is required".into());
                0
            }
        };

        let input = SaveProduct {
            id,
            product_code: self.text("productCode").unwrap_or_default(),
            name: self.text("name").unwrap_or_default(),
            category: self.text("category").unwrap_or_default(),
            price,
            quantity,
            description: self.text("description"),
            // Only an update keeps the previously stored image
            image_path: id.and_then(|_| self.text("imagePath")),
        }
        .normalized();

        if let Err(validation) = input.validate() {
            for (field, messages) in field_errors(&validation) {
                errors.entry(field).or_default().extend(messages);
            }
        }

        (input, errors)
    }
}

async fn save_product<R: ProductRepository>(
    State(state): State<Arc<PageState<R>>>,
    jar: CookieJar,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = ProductForm::read(multipart).await?;
    let (mut input, errors) = form.into_input();

    if !errors.is_empty() {
        let view = FormView {
            product: input,
            categories: state.service.categories().await?,
            errors,
        };
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(view)).into_response());
    }

    let stored = match &form.image {
        Some(image) => Some(state.storage.store(&image.bytes, &image.file_name).await?),
        None => None,
    };
    if let Some(name) = &stored {
        input.image_path = Some(name.clone());
    }

    // Chosen before saving: a create returns a product that has an id
    let (action, notice) = match input.id {
        None => ("product.create", "Product added successfully!"),
        Some(_) => ("product.update", "Product updated successfully!"),
    };

    match state.service.save(input).await {
        Ok(product) => {
            AuditEvent::new(action, AuditOutcome::Success)
                .with_resource(format!("product:{}", product.id))
                .with_request_headers(&headers)
                .log();
            Ok(redirect_with(jar, Flash::message(notice)))
        }
        Err(e) => {
            // Nothing references an upload from a failed save
            if let Some(name) = &stored {
                state.storage.remove(name).await;
            }
            AuditEvent::new(action, AuditOutcome::Failure)
                .with_request_headers(&headers)
                .with_details(serde_json::json!({ "reason": e.to_string() }))
                .log();
            Ok(redirect_with(
                jar,
                Flash::error(format!("Error saving product: {}", e)),
            ))
        }
    }
}

async fn delete_product<R: ProductRepository>(
    State(state): State<Arc<PageState<R>>>,
    jar: CookieJar,
    IdPath(id): IdPath,
    headers: HeaderMap,
) -> Response {
    let result = state.service.delete(id).await;

    let outcome = match &result {
        Ok(()) => AuditOutcome::Success,
        Err(_) => AuditOutcome::Failure,
    };
    let mut event = AuditEvent::new("product.delete", outcome)
        .with_resource(format!("product:{}", id))
        .with_request_headers(&headers);
    if let Err(e) = &result {
        event = event.with_details(serde_json::json!({ "reason": e.to_string() }));
    }
    event.log();

    match result {
        Ok(()) => redirect_with(jar, Flash::message("Product deleted successfully!")),
        Err(e) => redirect_with(jar, Flash::error(format!("Error deleting product: {}", e))),
    }
}

async fn export_excel<R: ProductRepository>(
    State(state): State<Arc<PageState<R>>>,
) -> ProductResult<impl IntoResponse> {
    let products = state.service.all_products().await?;
    let bytes = export::workbook(&products)?;

    tracing::info!(rows = products.len(), "Exported catalog");

    let disposition = format!(
        "attachment; filename={}",
        export::file_name(chrono::Utc::now())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
