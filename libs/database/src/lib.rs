//! PostgreSQL plumbing shared by the catalog services.
//!
//! - [`postgres`]: pool configuration, connecting (with retry), migrations, health checks
//! - [`repository`]: a thin generic CRUD helper over SeaORM entities
//! - [`common`]: error type and retry with exponential backoff
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use core_config::FromEnv;
//!
//! let db = postgres::connect_from_config_with_retry(PostgresConfig::from_env()?, None).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "catalog_api").await?;
//! ```

pub mod common;
pub mod postgres;
pub mod repository;

pub use common::{DatabaseError, DatabaseResult};
pub use repository::BaseRepository;
