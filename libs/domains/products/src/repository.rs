use async_trait::async_trait;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    CatalogStatistics, CategoryCount, Page, PageRequest, Product, ProductFilter, SaveProduct,
    SortDirection, SortField,
};

/// Repository trait for Product persistence
///
/// Inputs reaching the repository are already validated and normalized by
/// the service. Implementations still report a code collision as
/// [`ProductError::DuplicateCode`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a new product; `input.id` is ignored
    async fn create(&self, input: SaveProduct) -> ProductResult<Product>;

    /// Overwrite the editable columns of an existing product
    async fn update(&self, id: i64, input: SaveProduct) -> ProductResult<Product>;

    async fn get_by_id(&self, id: i64) -> ProductResult<Option<Product>>;

    async fn find_by_code(&self, code: &str) -> ProductResult<Option<Product>>;

    /// One page of products matching `filter`
    async fn find_page(&self, filter: ProductFilter, page: PageRequest)
    -> ProductResult<Page<Product>>;

    /// Every product, ordered by id
    async fn find_all(&self) -> ProductResult<Vec<Product>>;

    async fn count(&self) -> ProductResult<u64>;

    /// Distinct categories in lexicographic order
    async fn categories(&self) -> ProductResult<Vec<String>>;

    async fn statistics(
        &self,
        low_stock_threshold: i32,
        recent_limit: u64,
    ) -> ProductResult<CatalogStatistics>;

    /// Returns whether a row was removed
    async fn delete(&self, id: i64) -> ProductResult<bool>;
}

#[derive(Debug, Default)]
struct Store {
    last_id: i64,
    products: BTreeMap<i64, Product>,
}

impl Store {
    fn code_taken(&self, code: &str, except: Option<i64>) -> bool {
        self.products
            .values()
            .any(|p| p.product_code == code && Some(p.id) != except)
    }
}

/// In-memory implementation of ProductRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryProductRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(a: &Product, b: &Product, field: SortField) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::ProductCode => a.product_code.cmp(&b.product_code),
        SortField::Name => a.name.cmp(&b.name),
        SortField::Category => a.category.cmp(&b.category),
        SortField::Price => a.price.cmp(&b.price),
        SortField::Quantity => a.quantity.cmp(&b.quantity),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn create(&self, input: SaveProduct) -> ProductResult<Product> {
        let mut store = self.store.write().await;

        if store.code_taken(&input.product_code, None) {
            return Err(ProductError::DuplicateCode(input.product_code));
        }

        store.last_id += 1;
        let product = Product {
            id: store.last_id,
            product_code: input.product_code,
            name: input.name,
            category: input.category,
            price: input.price,
            quantity: input.quantity,
            description: input.description,
            image_path: input.image_path,
            created_at: chrono::Utc::now(),
        };
        store.products.insert(product.id, product.clone());

        tracing::info!(product_id = product.id, "Created product");
        Ok(product)
    }

    async fn update(&self, id: i64, input: SaveProduct) -> ProductResult<Product> {
        let mut store = self.store.write().await;

        if !store.products.contains_key(&id) {
            return Err(ProductError::NotFound(id));
        }
        if store.code_taken(&input.product_code, Some(id)) {
            return Err(ProductError::DuplicateCode(input.product_code));
        }

        let product = store
            .products
            .get_mut(&id)
            .ok_or(ProductError::NotFound(id))?;
        product.product_code = input.product_code;
        product.name = input.name;
        product.category = input.category;
        product.price = input.price;
        product.quantity = input.quantity;
        product.description = input.description;
        product.image_path = input.image_path;

        tracing::info!(product_id = id, "Updated product");
        Ok(product.clone())
    }

    async fn get_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let store = self.store.read().await;
        Ok(store.products.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> ProductResult<Option<Product>> {
        let store = self.store.read().await;
        Ok(store
            .products
            .values()
            .find(|p| p.product_code == code)
            .cloned())
    }

    async fn find_page(
        &self,
        filter: ProductFilter,
        page: PageRequest,
    ) -> ProductResult<Page<Product>> {
        let store = self.store.read().await;

        // BTreeMap iteration is already id ascending
        let mut matching: Vec<&Product> =
            store.products.values().filter(|p| filter.matches(p)).collect();

        if let Some(sort) = page.sort {
            matching.sort_by(|a, b| {
                let ordering = compare(a, b, sort.field);
                let ordering = match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                ordering.then(a.id.cmp(&b.id))
            });
        }

        let total = matching.len() as u64;
        let content = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size as usize)
            .cloned()
            .collect();

        Ok(Page::new(content, &page, total))
    }

    async fn find_all(&self) -> ProductResult<Vec<Product>> {
        let store = self.store.read().await;
        Ok(store.products.values().cloned().collect())
    }

    async fn count(&self) -> ProductResult<u64> {
        let store = self.store.read().await;
        Ok(store.products.len() as u64)
    }

    async fn categories(&self) -> ProductResult<Vec<String>> {
        let store = self.store.read().await;
        let categories: BTreeSet<&String> = store.products.values().map(|p| &p.category).collect();
        Ok(categories.into_iter().cloned().collect())
    }

    async fn statistics(
        &self,
        low_stock_threshold: i32,
        recent_limit: u64,
    ) -> ProductResult<CatalogStatistics> {
        let store = self.store.read().await;
        let products: Vec<&Product> = store.products.values().collect();

        let total_products = products.len() as u64;
        let total_value = products.iter().map(|p| p.stock_value()).sum::<Decimal>();
        let average_price = (total_products > 0).then(|| {
            let sum = products.iter().map(|p| p.price).sum::<Decimal>();
            (sum / Decimal::from(total_products)).round_dp(2)
        });

        let mut per_category: BTreeMap<&str, u64> = BTreeMap::new();
        for product in &products {
            *per_category.entry(product.category.as_str()).or_default() += 1;
        }
        let category_counts = per_category
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();

        let mut low_stock_products: Vec<Product> = products
            .iter()
            .filter(|p| p.quantity < low_stock_threshold)
            .map(|p| (*p).clone())
            .collect();
        low_stock_products.sort_by(|a, b| a.quantity.cmp(&b.quantity).then(a.id.cmp(&b.id)));

        let mut recent_products: Vec<Product> = products.iter().map(|p| (*p).clone()).collect();
        recent_products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        recent_products.truncate(usize::try_from(recent_limit).unwrap_or(usize::MAX));

        Ok(CatalogStatistics {
            total_products,
            total_value,
            average_price,
            category_counts,
            low_stock_products,
            recent_products,
        })
    }

    async fn delete(&self, id: i64) -> ProductResult<bool> {
        let mut store = self.store.write().await;

        if store.products.remove(&id).is_some() {
            tracing::info!(product_id = id, "Deleted product");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
