use async_trait::async_trait;
use database::BaseRepository;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Order};
use sea_orm::{
    AccessMode, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, SqlErr, TransactionTrait,
};

use crate::{
    entity,
    error::{ProductError, ProductResult},
    models::{
        CatalogStatistics, CategoryCount, Page, PageRequest, Product, ProductFilter, SaveProduct,
        SortDirection, SortField,
    },
    repository::ProductRepository,
};

pub struct PgProductRepository {
    base: BaseRepository<entity::Entity>,
}

impl PgProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn read_only(&self) -> Result<DatabaseTransaction, DbErr> {
        self.base
            .db()
            .begin_with_config(None, Some(AccessMode::ReadOnly))
            .await
    }
}

/// Add the filter's predicates to `query`; absent fields add nothing.
pub fn apply_filter(
    mut query: Select<entity::Entity>,
    filter: &ProductFilter,
) -> Select<entity::Entity> {
    if let Some(ref name) = filter.name_contains {
        query = query.filter(entity::Column::Name.contains(name.as_str()));
    }

    if let Some(ref category) = filter.category {
        query = query.filter(entity::Column::Category.eq(category.as_str()));
    }

    if let Some(min_price) = filter.min_price {
        query = query.filter(entity::Column::Price.gte(min_price));
    }

    if let Some(max_price) = filter.max_price {
        query = query.filter(entity::Column::Price.lte(max_price));
    }

    query
}

fn sort_column(field: SortField) -> entity::Column {
    match field {
        SortField::Id => entity::Column::Id,
        SortField::ProductCode => entity::Column::ProductCode,
        SortField::Name => entity::Column::Name,
        SortField::Category => entity::Column::Category,
        SortField::Price => entity::Column::Price,
        SortField::Quantity => entity::Column::Quantity,
        SortField::CreatedAt => entity::Column::CreatedAt,
    }
}

/// Order by the requested column with id as tie-breaker, so pages are stable.
fn apply_sort(query: Select<entity::Entity>, page: &PageRequest) -> Select<entity::Entity> {
    match page.sort {
        Some(sort) => {
            let order = match sort.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            query
                .order_by(sort_column(sort.field), order)
                .order_by_asc(entity::Column::Id)
        }
        None => query.order_by_asc(entity::Column::Id),
    }
}

/// Unique violations on insert/update can only come from `product_code`.
fn map_write_error(err: DbErr, code: &str) -> ProductError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ProductError::DuplicateCode(code.to_string()),
        _ => err.into(),
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, input: SaveProduct) -> ProductResult<Product> {
        let code = input.product_code.clone();
        let active_model: entity::ActiveModel = input.into();

        let model = self
            .base
            .insert(active_model)
            .await
            .map_err(|e| map_write_error(e, &code))?;

        tracing::info!(product_id = model.id, "Created product");
        Ok(model.into())
    }

    async fn update(&self, id: i64, input: SaveProduct) -> ProductResult<Product> {
        let model = self
            .base
            .find_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))?;

        let code = input.product_code.clone();
        let mut active_model: entity::ActiveModel = model.into();
        active_model.apply(input);

        let updated = self
            .base
            .update(active_model)
            .await
            .map_err(|e| map_write_error(e, &code))?;

        tracing::info!(product_id = id, "Updated product");
        Ok(updated.into())
    }

    async fn get_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let model = self.base.find_by_id(id).await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_code(&self, code: &str) -> ProductResult<Option<Product>> {
        let model = entity::Entity::find()
            .filter(entity::Column::ProductCode.eq(code))
            .one(self.base.db())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_page(
        &self,
        filter: ProductFilter,
        page: PageRequest,
    ) -> ProductResult<Page<Product>> {
        let query = apply_sort(apply_filter(entity::Entity::find(), &filter), &page);

        // Count and fetch see the same snapshot
        let txn = self.read_only().await?;
        let paginator = query.paginate(&txn, page.size);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.page).await?;
        txn.commit().await?;

        let content = models.into_iter().map(Into::into).collect();
        Ok(Page::new(content, &page, total))
    }

    async fn find_all(&self) -> ProductResult<Vec<Product>> {
        let models = entity::Entity::find()
            .order_by_asc(entity::Column::Id)
            .all(self.base.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn count(&self) -> ProductResult<u64> {
        let count = entity::Entity::find().count(self.base.db()).await?;
        Ok(count)
    }

    async fn categories(&self) -> ProductResult<Vec<String>> {
        let categories = entity::Entity::find()
            .select_only()
            .column(entity::Column::Category)
            .distinct()
            .order_by_asc(entity::Column::Category)
            .into_tuple::<String>()
            .all(self.base.db())
            .await?;
        Ok(categories)
    }

    async fn statistics(
        &self,
        low_stock_threshold: i32,
        recent_limit: u64,
    ) -> ProductResult<CatalogStatistics> {
        let txn = self.read_only().await?;

        let total_products = entity::Entity::find().count(&txn).await?;

        let (total_value, average_price) = entity::Entity::find()
            .select_only()
            .column_as(Expr::cust("COALESCE(SUM(price * quantity), 0)"), "total_value")
            .column_as(Expr::cust("AVG(price)"), "average_price")
            .into_tuple::<(Decimal, Option<Decimal>)>()
            .one(&txn)
            .await?
            .unwrap_or((Decimal::ZERO, None));

        let category_counts = entity::Entity::find()
            .select_only()
            .column(entity::Column::Category)
            .column_as(entity::Column::Id.count(), "count")
            .group_by(entity::Column::Category)
            .order_by_asc(entity::Column::Category)
            .into_tuple::<(String, i64)>()
            .all(&txn)
            .await?
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category,
                count: count.max(0) as u64,
            })
            .collect();

        let low_stock_products = entity::Entity::find()
            .filter(entity::Column::Quantity.lt(low_stock_threshold))
            .order_by_asc(entity::Column::Quantity)
            .order_by_asc(entity::Column::Id)
            .all(&txn)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        let recent_products = entity::Entity::find()
            .order_by_desc(entity::Column::CreatedAt)
            .order_by_desc(entity::Column::Id)
            .limit(recent_limit)
            .all(&txn)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        txn.commit().await?;

        Ok(CatalogStatistics {
            total_products,
            total_value: total_value.round_dp(2),
            average_price: average_price.map(|avg| avg.round_dp(2)),
            category_counts,
            low_stock_products,
            recent_products,
        })
    }

    async fn delete(&self, id: i64) -> ProductResult<bool> {
        let deleted = self.base.delete_by_id(id).await?;

        if deleted {
            tracing::info!(product_id = id, "Deleted product");
        }
        Ok(deleted)
    }
}
