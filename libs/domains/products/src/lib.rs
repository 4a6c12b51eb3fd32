//! Products Domain
//!
//! Product catalog backed by PostgreSQL: CRUD, paged listing, search,
//! statistics, image uploads and spreadsheet export.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐ ┌─────────────┐
//! │  Handlers   │ │    Pages    │  ← JSON API / page endpoints
//! └──────┬──────┘ └──────┬──────┘
//!        └───────┬───────┘
//! ┌──────────────▼──────────────┐
//! │           Service           │  ← Business rules, validation
//! └──────────────┬──────────────┘
//!                │
//! ┌──────────────▼──────────────┐
//! │         Repository          │  ← Data access (trait + Postgres / in-memory)
//! └──────────────┬──────────────┘
//!                │
//! ┌──────────────▼──────────────┐
//! │       Models / Entity       │  ← DTOs, sea-orm entity
//! └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_products::{
//!     handlers, pages,
//!     repository::InMemoryProductRepository,
//!     service::ProductService,
//!     storage::{FileStorage, StorageConfig},
//! };
//!
//! # async fn example() -> domain_products::ProductResult<()> {
//! let service = ProductService::new(InMemoryProductRepository::new());
//! let storage = FileStorage::new(&StorageConfig::default()).await?;
//!
//! let api = handlers::router(service.clone());
//! let pages = pages::router(service, storage);
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod export;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use error::{ProductError, ProductResult};
pub use handlers::ApiDoc;
pub use models::{
    AdvancedSearchQuery, CatalogStatistics, CategoryCount, Page, PageQuery, PageRequest, Product,
    ProductFilter, SaveProduct, Sort, SortDirection, SortField,
};
pub use postgres::PgProductRepository;
pub use repository::{InMemoryProductRepository, ProductRepository};
pub use service::ProductService;
pub use storage::{FileStorage, StorageConfig};
