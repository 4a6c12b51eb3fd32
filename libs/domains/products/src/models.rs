use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{ProductError, ProductResult};

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u64 = 1000;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Products with quantity strictly below this are reported as low stock
pub const LOW_STOCK_THRESHOLD: i32 = 10;
pub const RECENT_PRODUCTS_LIMIT: u64 = 5;

/// Upper bound (exclusive) of a `NUMERIC(12,2)` price
const MAX_PRICE: i64 = 10_000_000_000;

/// Product entity as exposed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Surrogate key, assigned on creation
    pub id: i64,
    /// Business code, unique across the catalog
    pub product_code: String,
    pub name: String,
    /// Free-text category label
    pub category: String,
    /// Unit price with two decimal places
    pub price: Decimal,
    /// Quantity on hand
    pub quantity: i32,
    pub description: Option<String>,
    /// File name of the uploaded image, served under `/uploads/`
    pub image_path: Option<String>,
    /// Insertion time; never changed by updates
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Inventory value of this line (price × quantity)
    pub fn stock_value(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Write input for both create (`id` absent) and update (`id` present)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveProduct {
    /// Absent for new products
    #[serde(default)]
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 50, message = "Product code is required (max 50 characters)"))]
    pub product_code: String,
    #[validate(length(min = 1, max = 100, message = "Name is required (max 100 characters)"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Category is required (max 50 characters)"))]
    pub category: String,
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub image_path: Option<String>,
}

impl SaveProduct {
    /// Trim text fields, drop blank optionals and round the price to cents.
    ///
    /// Validation runs on the normalized value, so a whitespace-only code
    /// fails the "required" rule.
    pub fn normalized(self) -> Self {
        Self {
            id: self.id,
            product_code: self.product_code.trim().to_string(),
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            price: self.price.round_dp(2),
            quantity: self.quantity,
            description: non_blank(self.description),
            image_path: non_blank(self.image_path),
        }
    }
}

impl From<Product> for SaveProduct {
    fn from(product: Product) -> Self {
        Self {
            id: Some(product.id),
            product_code: product.product_code,
            name: product.name,
            category: product.category,
            price: product.price,
            quantity: product.quantity,
            description: product.description,
            image_path: product.image_path,
        }
    }
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        return Err(
            ValidationError::new("non_negative").with_message("Price must not be negative".into()),
        );
    }
    if *price >= Decimal::from(MAX_PRICE) {
        return Err(ValidationError::new("range").with_message("Price is too large".into()));
    }
    Ok(())
}

/// Flatten validator output into `field -> messages` for form views.
pub fn field_errors(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code))
                })
                .collect();
            (to_camel_case(&field), messages)
        })
        .collect()
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Trimmed value, or `None` when missing or blank
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Columns a page may be ordered by
///
/// Accepts the camelCase names used in query strings and their snake_case
/// column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[strum(to_string = "id")]
    Id,
    #[strum(to_string = "productCode", serialize = "product_code")]
    ProductCode,
    #[strum(to_string = "name")]
    Name,
    #[strum(to_string = "category")]
    Category,
    #[strum(to_string = "price")]
    Price,
    #[strum(to_string = "quantity")]
    Quantity,
    #[strum(to_string = "createdAt", serialize = "created_at")]
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `asc` in any letter case is ascending; every other value is descending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Validated paging parameters; `page` is zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
    /// `None` keeps insertion order (id ascending)
    pub sort: Option<Sort>,
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> ProductResult<Self> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(ProductError::Validation(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        // The row offset must fit a SQL BIGINT
        if page.checked_mul(size).is_none_or(|offset| offset > i64::MAX as u64) {
            return Err(ProductError::Validation(format!(
                "Page {} is out of range for size {}",
                page, size
            )));
        }
        Ok(Self {
            page,
            size,
            sort: None,
        })
    }

    pub fn sorted(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort = Some(Sort { field, direction });
        self
    }

    /// Build from raw query values. A blank `sort_by` means unsorted; an
    /// unknown one is rejected.
    pub fn from_params(
        page: u64,
        size: u64,
        sort_by: Option<&str>,
        sort_dir: Option<&str>,
    ) -> ProductResult<Self> {
        let request = Self::new(page, size)?;

        let Some(sort_by) = sort_by.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(request);
        };

        let field = SortField::from_str(sort_by)
            .map_err(|_| ProductError::Validation(format!("Unknown sort field: {}", sort_by)))?;
        let direction = sort_dir.map(SortDirection::parse).unwrap_or_default();

        Ok(request.sorted(field, direction))
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

/// Paging query string shared by list and search endpoints
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Zero-based page index
    #[serde(default)]
    pub page: u64,
    /// Page size (1-1000)
    #[serde(default = "default_page_size")]
    pub size: u64,
    /// Sort column, e.g. `name` or `createdAt`
    #[serde(default)]
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    #[serde(default = "default_sort_dir")]
    pub sort_dir: String,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_dir: default_sort_dir(),
        }
    }
}

impl PageQuery {
    pub fn to_page_request(&self) -> ProductResult<PageRequest> {
        PageRequest::from_params(
            self.page,
            self.size,
            self.sort_by.as_deref(),
            Some(self.sort_dir.as_str()),
        )
    }
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_sort_dir() -> String {
    "asc".to_string()
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(request.size),
        }
    }
}

/// Conjunctive product predicates; every field is optional
///
/// Constructors trim text and treat blank values as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Case-sensitive substring of the name
    pub name_contains: Option<String>,
    /// Exact category
    pub category: Option<String>,
    /// Inclusive lower price bound
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    pub fn new(
        name_contains: Option<String>,
        category: Option<String>,
        min_price: Option<Decimal>,
        max_price: Option<Decimal>,
    ) -> Self {
        Self {
            name_contains: non_blank(name_contains),
            category: non_blank(category),
            min_price,
            max_price,
        }
    }

    pub fn by_category(category: Option<String>) -> Self {
        Self::new(None, category, None, None)
    }

    pub fn by_name(keyword: Option<String>) -> Self {
        Self::new(keyword, None, None, None)
    }

    pub fn is_empty(&self) -> bool {
        self.name_contains.is_none()
            && self.category.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(ref name) = self.name_contains {
            if !product.name.contains(name.as_str()) {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if product.category != *category {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        true
    }
}

/// Query string of the advanced search
///
/// Prices arrive as text so an empty `minPrice=` is treated as absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AdvancedSearchQuery {
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

impl AdvancedSearchQuery {
    pub fn to_filter(&self) -> ProductResult<ProductFilter> {
        Ok(ProductFilter::new(
            self.name.clone(),
            self.category.clone(),
            parse_price("minPrice", self.min_price.as_deref())?,
            parse_price("maxPrice", self.max_price.as_deref())?,
        ))
    }
}

fn parse_price(field: &str, raw: Option<&str>) -> ProductResult<Option<Decimal>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => Decimal::from_str(value)
            .map(Some)
            .map_err(|_| ProductError::Validation(format!("{} is not a number: {}", field, value))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Aggregates over the whole catalog, read in one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatistics {
    pub total_products: u64,
    /// Σ price × quantity; zero for an empty catalog
    pub total_value: Decimal,
    /// Absent for an empty catalog
    pub average_price: Option<Decimal>,
    /// Ordered by category
    pub category_counts: Vec<CategoryCount>,
    pub low_stock_products: Vec<Product>,
    /// Newest first
    pub recent_products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn product(name: &str, category: &str, price: Decimal) -> Product {
        Product {
            id: 1,
            product_code: "P-1".to_string(),
            name: name.to_string(),
            category: category.to_string(),
            price,
            quantity: 3,
            description: None,
            image_path: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    fn valid_input() -> SaveProduct {
        SaveProduct {
            product_code: "P-1".to_string(),
            name: "Widget".to_string(),
            category: "Tools".to_string(),
            price: dec("9.99"),
            quantity: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_blank_filter_values_are_absent() {
        let filter = ProductFilter::new(
            Some("   ".to_string()),
            Some(String::new()),
            None,
            None,
        );
        assert!(filter.is_empty());
        assert_eq!(filter, ProductFilter::default());
    }

    #[test]
    fn test_filter_values_are_trimmed() {
        let filter = ProductFilter::by_category(Some("  Tools ".to_string()));
        assert_eq!(filter.category.as_deref(), Some("Tools"));
    }

    #[test]
    fn test_filter_name_match_is_case_sensitive() {
        let filter = ProductFilter::by_name(Some("Widg".to_string()));
        assert!(filter.matches(&product("Blue Widget", "Tools", dec("1"))));
        assert!(!filter.matches(&product("blue widget", "Tools", dec("1"))));
    }

    #[test]
    fn test_filter_price_bounds_are_inclusive() {
        let filter = ProductFilter::new(None, None, Some(dec("10")), Some(dec("20")));
        assert!(filter.matches(&product("a", "x", dec("10"))));
        assert!(filter.matches(&product("a", "x", dec("20"))));
        assert!(!filter.matches(&product("a", "x", dec("9.99"))));
        assert!(!filter.matches(&product("a", "x", dec("20.01"))));
    }

    #[test]
    fn test_filter_predicates_are_conjunctive() {
        let filter = ProductFilter::new(
            Some("Widget".to_string()),
            Some("Tools".to_string()),
            None,
            None,
        );
        assert!(filter.matches(&product("Widget", "Tools", dec("1"))));
        assert!(!filter.matches(&product("Widget", "Garden", dec("1"))));
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(PageRequest::new(0, 1).is_ok());
        assert!(PageRequest::new(0, MAX_PAGE_SIZE).is_ok());
        assert!(matches!(PageRequest::new(0, 0), Err(ProductError::Validation(_))));
        assert!(matches!(
            PageRequest::new(0, MAX_PAGE_SIZE + 1),
            Err(ProductError::Validation(_))
        ));
    }

    #[test]
    fn test_page_offset_must_fit_bigint() {
        assert!(matches!(
            PageRequest::new(1 << 61, 8),
            Err(ProductError::Validation(_))
        ));
        assert!(matches!(
            PageRequest::new(u64::MAX, 2),
            Err(ProductError::Validation(_))
        ));

        let last = i64::MAX as u64 / MAX_PAGE_SIZE;
        let request = PageRequest::new(last, MAX_PAGE_SIZE).unwrap();
        assert!(request.offset() <= i64::MAX as u64);
    }

    #[test]
    fn test_sort_field_accepts_camel_and_snake_case() {
        assert_eq!(SortField::from_str("productCode").unwrap(), SortField::ProductCode);
        assert_eq!(SortField::from_str("product_code").unwrap(), SortField::ProductCode);
        assert_eq!(SortField::from_str("created_at").unwrap(), SortField::CreatedAt);
        assert_eq!(SortField::CreatedAt.to_string(), "createdAt");
    }

    #[test]
    fn test_unknown_sort_field_is_rejected() {
        let result = PageRequest::from_params(0, 10, Some("password"), Some("asc"));
        assert!(matches!(result, Err(ProductError::Validation(msg)) if msg.contains("password")));
    }

    #[test]
    fn test_blank_sort_by_is_unsorted() {
        let request = PageRequest::from_params(2, 10, Some("  "), Some("desc")).unwrap();
        assert_eq!(request.sort, None);
        assert_eq!(request.offset(), 20);
    }

    #[test]
    fn test_sort_direction_parsing() {
        assert_eq!(SortDirection::parse("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::parse("ASC"), SortDirection::Asc);
        assert_eq!(SortDirection::parse("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::parse("sideways"), SortDirection::Desc);
        assert_eq!(SortDirection::parse(""), SortDirection::Desc);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let request = PageRequest::new(0, 10).unwrap();
        assert_eq!(Page::<Product>::new(vec![], &request, 25).total_pages, 3);
        assert_eq!(Page::<Product>::new(vec![], &request, 20).total_pages, 2);
        assert_eq!(Page::<Product>::new(vec![], &request, 0).total_pages, 0);
    }

    #[test]
    fn test_save_product_validation() {
        assert!(valid_input().validate().is_ok());

        let negative_price = SaveProduct {
            price: dec("-0.01"),
            ..valid_input()
        };
        let errors = negative_price.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));

        let negative_quantity = SaveProduct {
            quantity: -1,
            ..valid_input()
        };
        assert!(negative_quantity.validate().is_err());
    }

    #[test]
    fn test_normalized_blank_code_fails_validation() {
        let input = SaveProduct {
            product_code: "   ".to_string(),
            description: Some("  ".to_string()),
            ..valid_input()
        }
        .normalized();

        assert_eq!(input.description, None);
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(
            errors.get("productCode").map(Vec::as_slice),
            Some(&["Product code is required (max 50 characters)".to_string()][..])
        );
    }

    #[test]
    fn test_normalized_rounds_price_to_cents() {
        let input = SaveProduct {
            price: dec("1.006"),
            ..valid_input()
        }
        .normalized();
        assert_eq!(input.price, dec("1.01"));
    }

    #[test]
    fn test_advanced_query_blank_prices_are_absent() {
        let query = AdvancedSearchQuery {
            min_price: Some(" ".to_string()),
            max_price: Some("20".to_string()),
            ..Default::default()
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, Some(dec("20")));

        let bad = AdvancedSearchQuery {
            min_price: Some("ten".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad.to_filter(), Err(ProductError::Validation(_))));
    }

    #[test]
    fn test_product_serializes_camel_case() {
        let json = serde_json::to_value(product("Widget", "Tools", dec("2.50"))).unwrap();
        assert_eq!(json["productCode"], "P-1");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("imagePath").is_some());
    }
}
