//! Configuration for the Catalog API

use core_config::{app_info, server::ServerConfig, AppInfo, FromEnv};
use database::postgres::PostgresConfig;
use domain_products::StorageConfig;

pub use core_config::Environment;

/// Application configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // DATABASE_URL is required
        let server = ServerConfig::from_env()?;
        let storage = StorageConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            server,
            storage,
            environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_requires_database_url() {
        temp_env::with_var_unset("DATABASE_URL", || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://catalog@localhost/catalog")),
                ("PORT", Some("9090")),
                ("UPLOAD_DIR", Some("/srv/catalog/uploads")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.database.url, "postgres://catalog@localhost/catalog");
                assert_eq!(config.server.port, 9090);
                assert_eq!(
                    config.storage.upload_dir,
                    std::path::PathBuf::from("/srv/catalog/uploads")
                );
                assert_eq!(config.app.name, "catalog_api");
            },
        );
    }
}
