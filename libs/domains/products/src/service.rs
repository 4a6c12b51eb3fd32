//! Product Service - catalog use cases on top of a repository

use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    CatalogStatistics, Page, PageRequest, Product, ProductFilter, SaveProduct,
    LOW_STOCK_THRESHOLD, RECENT_PRODUCTS_LIMIT,
};
use crate::repository::ProductRepository;

/// Catalog query service
///
/// Thin façade over the repository: blank normalization, validation and the
/// duplicate-code pre-check live here, everything else is delegated.
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
}

impl<R: ProductRepository> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// A page of products, optionally restricted to one category
    #[instrument(skip(self))]
    pub async fn list_page(
        &self,
        category: Option<String>,
        page: PageRequest,
    ) -> ProductResult<Page<Product>> {
        self.repository
            .find_page(ProductFilter::by_category(category), page)
            .await
    }

    /// Products whose name contains `keyword`; blank means unfiltered
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        keyword: Option<String>,
        page: PageRequest,
    ) -> ProductResult<Page<Product>> {
        self.repository
            .find_page(ProductFilter::by_name(keyword), page)
            .await
    }

    /// Products matching every predicate present in `filter`
    #[instrument(skip(self))]
    pub async fn advanced_search(
        &self,
        filter: ProductFilter,
        page: PageRequest,
    ) -> ProductResult<Page<Product>> {
        self.repository.find_page(filter, page).await
    }

    #[instrument(skip(self))]
    pub async fn categories(&self) -> ProductResult<Vec<String>> {
        self.repository.categories().await
    }

    #[instrument(skip(self))]
    pub async fn statistics(&self) -> ProductResult<CatalogStatistics> {
        self.repository
            .statistics(LOW_STOCK_THRESHOLD, RECENT_PRODUCTS_LIMIT)
            .await
    }

    /// Create when `input.id` is absent, otherwise update that product.
    #[instrument(skip(self, input), fields(product_id = ?input.id, product_code = %input.product_code))]
    pub async fn save(&self, input: SaveProduct) -> ProductResult<Product> {
        let input = input.normalized();
        input.validate()?;

        if let Some(existing) = self.repository.find_by_code(&input.product_code).await? {
            if Some(existing.id) != input.id {
                return Err(ProductError::DuplicateCode(input.product_code));
            }
        }

        match input.id {
            None => self.repository.create(input).await,
            Some(id) => self.repository.update(id, input).await,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i64) -> ProductResult<Product> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Every product in id order
    #[instrument(skip(self))]
    pub async fn all_products(&self) -> ProductResult<Vec<Product>> {
        self.repository.find_all().await
    }

    #[instrument(skip(self))]
    pub async fn count_products(&self) -> ProductResult<u64> {
        self.repository.count().await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ProductResult<()> {
        let deleted = self.repository.delete(id).await?;

        if !deleted {
            return Err(ProductError::NotFound(id));
        }

        Ok(())
    }
}
