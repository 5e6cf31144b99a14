//! # mysql-where
//!
//! A condition-driven SQL builder for MySQL.
//!
//! Conditions are described as raw fragments, column tuples or nested named
//! groups and compiled into a parameterized WHERE clause. Every bare
//! identifier in the result is backquoted and every value is passed as a
//! positional `?` placeholder.
//!
//! ## Features
//!
//! - **Condition Trees**: Raw fragments, `[column, value]` tuples and `and`/`or` groups
//! - **JSON Conditions**: Any `serde_json::Value` converts into a condition
//! - **Identifier Quoting**: Dotted and comma separated identifiers get backquoted
//! - **Statement Building**: SELECT, INSERT, UPDATE and DELETE with bound parameters
//! - **Async Execution**: Statements run on a `sqlx` MySQL pool
//!
//! ## Quick Start
//!
//! ```rust
//! use mysql_where::{Condition, Connective, build_condition_clause};
//! use serde_json::json;
//!
//! let condition = Condition::from(json!({
//!     "and": [["is_delete", 0], ["area", ">=", 30]],
//!     "or": [["name", "like", "%nick%"], ["name", "like", "%Lazy%"]],
//! }));
//!
//! let (clause, params) = build_condition_clause(&condition, &Connective::And).unwrap();
//! assert_eq!(
//!     clause,
//!     "(`is_delete` = ? and `area` >= ?) and (`name` like ? or `name` like ?)"
//! );
//! assert_eq!(params, vec![json!(0), json!(30), json!("%nick%"), json!("%Lazy%")]);
//! ```
//!
//! ## Running Queries
//!
//! ```rust,no_run
//! use mysql_where::{Condition, Database, DbConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DbConfig::builder("shop")
//!         .username("app")
//!         .password("secret")
//!         .prefix("pdf_")
//!         .build()?;
//!     let db = Database::connect(config).await?;
//!
//!     let query = db
//!         .table("admin")
//!         .filter(Condition::compare("area", ">=", 30))
//!         .order("id desc")
//!         .limit(10);
//!     let rows = db.select(&query).await?;
//!     let total = db.count(&query).await?;
//!     println!("{} of {}", rows.len(), total);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use mysql_where::DbConfig;
//!
//! let config = DbConfig::builder("shop")
//!     .host("127.0.0.1")   // Default host
//!     .port(3306)          // Default port
//!     .charset("utf8mb4")  // Connection charset (default: utf8)
//!     .prefix("pdf_")      // Prepended to table names
//!     .debug(true)         // Log statements at debug level
//!     .build()
//!     .unwrap();
//! assert_eq!(config.table_name("admin"), "pdf_admin");
//! ```

pub mod config;
pub mod error;
pub mod query;
pub mod sql;
pub mod store;

// Re-export main types for convenience
pub use config::{DbConfig, DbConfigBuilder};
pub use error::{QueryError, Result};
pub use query::{Query, Record};
pub use store::{Database, ExecResult, value_to_string};

pub use sql::condition::{Condition, Connective, Element, Tuple, build_condition_clause};
pub use sql::ddl::DdlGenerator;
pub use sql::sanitize::{autoquote, quote_identifier};
