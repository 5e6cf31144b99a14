//! Configuration for the MySQL connection
//!
//! Provides a builder pattern for configuring the database handle.

use serde::Deserialize;
use sqlx::mysql::MySqlConnectOptions;

use crate::error::{QueryError, Result};

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_username() -> String {
    "root".to_string()
}

fn default_charset() -> String {
    "utf8".to_string()
}

/// Configuration for the database handle
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    /// Server host (default: "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port (default: 3306)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name, required
    pub database: String,
    /// User name (default: "root")
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Connection charset (default: "utf8")
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Prefix prepended to table names that do not already carry it
    #[serde(default)]
    pub prefix: String,
    /// Log every statement at debug level
    #[serde(default)]
    pub debug: bool,
    /// Run and log `EXPLAIN` for every generated SELECT
    #[serde(default)]
    pub explain: bool,
}

impl DbConfig {
    /// Create a new configuration builder
    pub fn builder(database: impl Into<String>) -> DbConfigBuilder {
        DbConfigBuilder::new(database)
    }

    /// Driver connection options built from the individual fields
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
            .charset(&self.charset)
    }

    /// Apply the table prefix unless `name` already starts with it
    pub fn table_name(&self, name: &str) -> String {
        if name.starts_with(&self.prefix) {
            name.to_string()
        } else {
            format!("{}{}", self.prefix, name)
        }
    }

    /// Check the configuration, e.g. after deserializing it
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(QueryError::config("Database name is required"));
        }
        crate::sql::ddl::validate_charset(&self.charset)
            .map_err(|e| QueryError::config(e.to_string()))
    }
}

/// Builder for DbConfig
#[derive(Debug)]
pub struct DbConfigBuilder {
    config: DbConfig,
}

impl DbConfigBuilder {
    /// Create a new builder with the database name
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            config: DbConfig {
                host: default_host(),
                port: default_port(),
                database: database.into(),
                username: default_username(),
                password: String::new(),
                charset: default_charset(),
                prefix: String::new(),
                debug: false,
                explain: false,
            },
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    /// Set the connection charset (default: "utf8")
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.config.charset = charset.into();
        self
    }

    /// Set the table prefix (default: none)
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Enable or disable statement logging (default: false)
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Enable or disable `EXPLAIN` logging (default: false)
    pub fn explain(mut self, enabled: bool) -> Self {
        self.config.explain = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<DbConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Default Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = DbConfig::builder("shop").build().unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3306);
        assert_eq!(config.database, "shop");
        assert_eq!(config.username, "root");
        assert_eq!(config.password, "");
        assert_eq!(config.charset, "utf8");
        assert_eq!(config.prefix, "");
        assert!(!config.debug);
        assert!(!config.explain);
    }

    #[test]
    fn test_missing_database() {
        let result = DbConfig::builder("").build();
        assert!(matches!(result, Err(QueryError::Config(_))));

        let result = DbConfig::builder("   ").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_charset() {
        let result = DbConfig::builder("shop").charset("utf8&x=1").build();
        assert!(matches!(result, Err(QueryError::Config(_))));
    }

    // =========================================================================
    // Builder Tests
    // =========================================================================

    #[test]
    fn test_full_custom_config() {
        let config = DbConfig::builder("shop")
            .host("db.internal")
            .port(3307)
            .username("app")
            .password("secret")
            .charset("utf8mb4")
            .prefix("pdf_")
            .debug(true)
            .explain(true)
            .build()
            .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.username, "app");
        assert_eq!(config.password, "secret");
        assert_eq!(config.charset, "utf8mb4");
        assert_eq!(config.prefix, "pdf_");
        assert!(config.debug);
        assert!(config.explain);
    }

    #[test]
    fn test_connect_options() {
        let config = DbConfig::builder("shop")
            .host("db.internal")
            .port(3307)
            .username("app")
            .password("secret")
            .charset("utf8mb4")
            .build()
            .unwrap();
        let options = config.connect_options();

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 3307);
        assert_eq!(options.get_username(), "app");
        assert_eq!(options.get_database(), Some("shop"));
        assert_eq!(options.get_charset(), "utf8mb4");
    }

    #[test]
    fn test_connect_options_special_password() {
        let config = DbConfig::builder("shop")
            .password("p@ss#word/1?x=y")
            .build()
            .unwrap();
        let options = config.connect_options();

        assert_eq!(options.get_host(), "127.0.0.1");
        assert_eq!(options.get_port(), 3306);
        assert_eq!(options.get_username(), "root");
        assert_eq!(options.get_database(), Some("shop"));
    }

    // =========================================================================
    // Table Prefix Tests
    // =========================================================================

    #[test]
    fn test_table_name_prefix() {
        let config = DbConfig::builder("shop").prefix("pdf_").build().unwrap();

        assert_eq!(config.table_name("admin"), "pdf_admin");
        assert_eq!(config.table_name("pdf_admin"), "pdf_admin");
    }

    #[test]
    fn test_table_name_without_prefix() {
        let config = DbConfig::builder("shop").build().unwrap();
        assert_eq!(config.table_name("admin"), "admin");
    }

    // =========================================================================
    // Deserialize Tests
    // =========================================================================

    #[test]
    fn test_deserialize_with_defaults() {
        let config: DbConfig =
            serde_json::from_str(r#"{"database": "shop", "prefix": "pdf_"}"#).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3306);
        assert_eq!(config.prefix, "pdf_");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_requires_database() {
        let result = serde_json::from_str::<DbConfig>(r#"{"host": "localhost"}"#);
        assert!(result.is_err());
    }
}
