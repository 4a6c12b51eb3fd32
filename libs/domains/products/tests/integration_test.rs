//! Integration tests for the Products domain
//!
//! These tests use real PostgreSQL via testcontainers to ensure:
//! - Queries, filters and ordering behave like the in-memory repository
//! - The unique product code constraint is enforced
//! - Statistics aggregate correctly in SQL

use domain_products::*;
use rust_decimal::Decimal;
use test_utils::{assertions::*, TestDatabase, TestDataBuilder};

fn input(code: String, name: &str, category: &str, price: i64, quantity: i32) -> SaveProduct {
    SaveProduct {
        id: None,
        product_code: code,
        name: name.to_string(),
        category: category.to_string(),
        price: Decimal::new(price, 2),
        quantity,
        description: Some("Integration test product".to_string()),
        image_path: None,
    }
}

// ============================================================================
// Repository Tests
// ============================================================================

#[tokio::test]
async fn test_create_and_get_product() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("create_and_get");

    let created = repo
        .create(input(builder.product_code(1), "Hammer", "Tools", 1250, 4))
        .await
        .unwrap();

    assert!(created.id > 0);
    assert_eq!(created.price, Decimal::new(1250, 2));

    let retrieved = repo.get_by_id(created.id).await.unwrap();
    let retrieved = assert_some(retrieved, "product should exist");
    assert_eq!(retrieved, created);

    let by_code = repo.find_by_code(&builder.product_code(1)).await.unwrap();
    assert_eq!(assert_some(by_code, "lookup by code").id, created.id);
}

#[tokio::test]
async fn test_update_keeps_id_and_created_at() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("update_keeps_created_at");

    let created = repo
        .create(input(builder.product_code(1), "Hammer", "Tools", 1000, 4))
        .await
        .unwrap();

    let mut change = input(builder.product_code(2), "Claw hammer", "Tools", 1199, 9);
    change.image_path = Some("photo.png".to_string());
    let updated = repo.update(created.id, change).await.unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.product_code, builder.product_code(2));
    assert_eq!(updated.quantity, 9);
    assert_eq!(updated.image_path.as_deref(), Some("photo.png"));
}

#[tokio::test]
async fn test_update_missing_product_is_not_found() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("update_missing");

    let result = repo
        .update(424242, input(builder.product_code(1), "Ghost", "Tools", 100, 1))
        .await;

    assert!(matches!(result, Err(ProductError::NotFound(424242))));
}

#[tokio::test]
async fn test_duplicate_code_constraint() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("duplicate_code");

    repo.create(input(builder.product_code(1), "First", "Tools", 100, 1))
        .await
        .unwrap();

    let result = repo
        .create(input(builder.product_code(1), "Second", "Tools", 100, 1))
        .await;

    assert!(
        matches!(result, Err(ProductError::DuplicateCode(_))),
        "expected DuplicateCode, got {:?}",
        result
    );
}

#[tokio::test]
async fn test_paging_reports_totals() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("paging_totals");

    for n in 1..=25 {
        repo.create(input(builder.product_code(n), "Item", "Bulk", 100 + n as i64, 50))
            .await
            .unwrap();
    }

    let first = repo
        .find_page(ProductFilter::default(), PageRequest::new(0, 10).unwrap())
        .await
        .unwrap();
    assert_eq!(first.total_elements, 25);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.content.len(), 10);
    assert_sorted_by(&first.content, |p| p.id, true, "unsorted pages are in id order");

    let last = repo
        .find_page(ProductFilter::default(), PageRequest::new(2, 10).unwrap())
        .await
        .unwrap();
    assert_eq!(last.content.len(), 5);

    let beyond = repo
        .find_page(ProductFilter::default(), PageRequest::new(9, 10).unwrap())
        .await
        .unwrap();
    assert!(beyond.content.is_empty());
    assert_eq!(beyond.total_elements, 25);
}

#[tokio::test]
async fn test_sorting_by_price_descending() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("sorting");

    for (n, price) in [(1, 500), (2, 1500), (3, 500), (4, 50)] {
        repo.create(input(builder.product_code(n), "Item", "Tools", price, 1))
            .await
            .unwrap();
    }

    let page = repo
        .find_page(
            ProductFilter::default(),
            PageRequest::new(0, 10)
                .unwrap()
                .sorted(SortField::Price, SortDirection::Desc),
        )
        .await
        .unwrap();

    assert_sorted_by(&page.content, |p| p.price, false, "price desc");
    // ties fall back to id
    assert!(page.content[1].id < page.content[2].id);
}

#[tokio::test]
async fn test_filters() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("filters");
    let tools = builder.category("tools");
    let toys = builder.category("toys");

    let seed = [
        (1, "Steel Hammer", &tools, 1500),
        (2, "Rubber hammer", &tools, 800),
        (3, "Hammer Toy", &toys, 1000),
        (4, "Wrench", &tools, 2000),
    ];
    for (n, name, category, price) in seed {
        repo.create(input(builder.product_code(n), name, category, price, 5))
            .await
            .unwrap();
    }

    let request = PageRequest::new(0, 50).unwrap();

    let in_tools = repo
        .find_page(ProductFilter::by_category(Some(tools.clone())), request)
        .await
        .unwrap();
    assert_eq!(in_tools.total_elements, 3);

    // name matching is case-sensitive
    let named = repo
        .find_page(ProductFilter::by_name(Some("Hammer".to_string())), request)
        .await
        .unwrap();
    assert_eq!(named.total_elements, 2);

    // bounds are inclusive
    let ranged = repo
        .find_page(
            ProductFilter::new(
                None,
                Some(tools.clone()),
                Some(Decimal::new(800, 2)),
                Some(Decimal::new(1500, 2)),
            ),
            request,
        )
        .await
        .unwrap();
    assert_eq!(ranged.total_elements, 2);

    let combined = repo
        .find_page(
            ProductFilter::new(
                Some("Hammer".to_string()),
                Some(toys.clone()),
                None,
                Some(Decimal::new(1000, 2)),
            ),
            request,
        )
        .await
        .unwrap();
    assert_eq!(combined.total_elements, 1);
    assert_eq!(combined.content[0].product_code, builder.product_code(3));

    let categories = repo.categories().await.unwrap();
    assert_eq!(categories, vec![tools, toys]);
}

#[tokio::test]
async fn test_statistics() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("statistics");

    let empty = repo.statistics(10, 5).await.unwrap();
    assert_eq!(empty.total_products, 0);
    assert_eq!(empty.total_value, Decimal::ZERO);
    assert_eq!(empty.average_price, None);
    assert!(empty.category_counts.is_empty());

    let seed = [
        (1, "Tools", 1000, 2),
        (2, "Tools", 2000, 10),
        (3, "Garden", 500, 0),
        (4, "Garden", 1250, 30),
        (5, "Kitchen", 300, 9),
        (6, "Kitchen", 700, 100),
    ];
    for (n, category, price, quantity) in seed {
        repo.create(input(builder.product_code(n), "Item", category, price, quantity))
            .await
            .unwrap();
    }

    let stats = repo.statistics(10, 5).await.unwrap();

    assert_eq!(stats.total_products, 6);
    // 20 + 200 + 0 + 375 + 27 + 700
    assert_eq!(stats.total_value, Decimal::new(132200, 2));
    // 57.50 / 6 = 9.5833..
    assert_eq!(stats.average_price, Some(Decimal::new(958, 2)));

    let counts: Vec<(String, u64)> = stats
        .category_counts
        .iter()
        .map(|c| (c.category.clone(), c.count))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("Garden".to_string(), 2),
            ("Kitchen".to_string(), 2),
            ("Tools".to_string(), 2),
        ]
    );

    let low: Vec<i32> = stats.low_stock_products.iter().map(|p| p.quantity).collect();
    assert_eq!(low, vec![0, 2, 9]);

    assert_eq!(stats.recent_products.len(), 5);
    assert_eq!(stats.recent_products[0].product_code, builder.product_code(6));
}

#[tokio::test]
async fn test_find_all_count_and_delete() {
    let db = TestDatabase::new().await;
    let repo = PgProductRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("delete");

    let first = repo
        .create(input(builder.product_code(1), "One", "Tools", 100, 1))
        .await
        .unwrap();
    let second = repo
        .create(input(builder.product_code(2), "Two", "Tools", 100, 1))
        .await
        .unwrap();

    assert_eq!(repo.count().await.unwrap(), 2);

    assert!(repo.delete(first.id).await.unwrap());
    assert!(!repo.delete(first.id).await.unwrap());

    let all = repo.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, second.id);
}

// ============================================================================
// Service Tests
// ============================================================================

#[tokio::test]
async fn test_service_save_and_duplicate_update() {
    let db = TestDatabase::new().await;
    let service = ProductService::new(PgProductRepository::new(db.connection()));
    let builder = TestDataBuilder::from_test_name("service_save");

    let a = service
        .save(input(builder.product_code(1), " Lamp ", "Home", 1999, 3))
        .await
        .unwrap();
    assert_eq!(a.name, "Lamp");

    let b = service
        .save(input(builder.product_code(2), "Rug", "Home", 4999, 1))
        .await
        .unwrap();

    let clash = SaveProduct {
        id: Some(b.id),
        ..input(builder.product_code(1), "Rug", "Home", 4999, 1)
    };
    assert!(matches!(
        service.save(clash).await,
        Err(ProductError::DuplicateCode(_))
    ));

    // saving a product under its own code is fine
    let same = SaveProduct {
        id: Some(a.id),
        ..input(builder.product_code(1), "Desk lamp", "Home", 2199, 3)
    };
    let updated = service.save(same).await.unwrap();
    assert_eq!(updated.id, a.id);
    assert_eq!(updated.name, "Desk lamp");
}
