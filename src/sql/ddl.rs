//! DDL Generation for database and table maintenance
//!
//! Generates MySQL statements for charset handling and table housekeeping.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::DbConfig;
use crate::error::{QueryError, Result};
use crate::sql::sanitize::quote_identifier;

static CHARSET_NAME: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$"));

/// Default collation for a character set
///
/// # Example
/// ```
/// use mysql_where::sql::collation_for;
///
/// assert_eq!(collation_for("utf8mb4"), "utf8mb4_general_ci");
/// assert_eq!(collation_for("gbk"), "gbk_chinese_ci");
/// ```
pub fn collation_for(charset: &str) -> String {
    match charset {
        "binary" => "binary".to_string(),
        "gbk" | "big5" | "gb2312" => format!("{}_chinese_ci", charset),
        "latin5" => "latin5_turkish_ci".to_string(),
        "euckr" => "euckr_korean_ci".to_string(),
        "hp8" => "hp8_english_ci".to_string(),
        "tis620" => "tis620_thai_ci".to_string(),
        "dec8" | "swe7" => format!("{}_swedish_ci", charset),
        "cp932" | "eucjpms" | "sjis" | "ujis" => format!("{}_japanese_ci", charset),
        _ => format!("{}_general_ci", charset),
    }
}

/// Validate a character set name before it is spliced into a statement
pub fn validate_charset(charset: &str) -> Result<()> {
    let pattern = CHARSET_NAME.as_ref().map_err(Clone::clone)?;
    if !pattern.is_match(charset) {
        return Err(QueryError::validation(format!(
            "Charset '{}' is invalid. Only letters, numbers and underscores are allowed.",
            charset
        )));
    }
    Ok(())
}

/// DDL Generator for database and table maintenance
///
/// Table names go through the configured prefix, database names do not.
pub struct DdlGenerator<'a> {
    config: &'a DbConfig,
}

impl<'a> DdlGenerator<'a> {
    /// Create a new DDL generator with the given configuration
    pub fn new(config: &'a DbConfig) -> Self {
        Self { config }
    }

    fn table(&self, name: &str) -> String {
        quote_identifier(&self.config.table_name(name), ",")
    }

    fn charset_clause(charset: &str) -> Result<String> {
        validate_charset(charset)?;
        Ok(format!(
            "CHARACTER SET {} COLLATE {}",
            charset,
            collation_for(charset)
        ))
    }

    pub fn use_database(&self, name: &str) -> String {
        format!("USE {}", quote_identifier(name, ","))
    }

    pub fn set_names(&self, charset: &str) -> Result<String> {
        validate_charset(charset)?;
        Ok(format!("SET NAMES {}", charset))
    }

    /// `CREATE DATABASE IF NOT EXISTS` with a default charset and its collation
    pub fn create_database(&self, name: &str, charset: &str) -> Result<String> {
        Ok(format!(
            "CREATE DATABASE IF NOT EXISTS {} DEFAULT {}",
            quote_identifier(name, ","),
            Self::charset_clause(charset)?
        ))
    }

    pub fn drop_database(&self, name: &str) -> String {
        format!("DROP DATABASE IF EXISTS {}", quote_identifier(name, ","))
    }

    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.table(table))
    }

    pub fn alter_database_charset(&self, name: &str, charset: &str) -> Result<String> {
        Ok(format!(
            "ALTER DATABASE {} {}",
            quote_identifier(name, ","),
            Self::charset_clause(charset)?
        ))
    }

    pub fn alter_table_charset(&self, table: &str, charset: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} {}",
            self.table(table),
            Self::charset_clause(charset)?
        ))
    }

    /// `ALTER TABLE ... ADD`, the column definition is used verbatim
    pub fn add_column(&self, table: &str, column: &str, definition: &str) -> String {
        format!(
            "ALTER TABLE {} ADD {} {}",
            self.table(table),
            quote_identifier(column, " "),
            definition.trim()
        )
    }

    /// `ALTER TABLE ... MODIFY`, the column definition is used verbatim
    pub fn modify_column(&self, table: &str, column: &str, definition: &str) -> String {
        format!(
            "ALTER TABLE {} MODIFY {} {}",
            self.table(table),
            quote_identifier(column, " "),
            definition.trim()
        )
    }

    pub fn auto_increment(&self, table: &str, value: u64) -> String {
        format!("ALTER TABLE {} AUTO_INCREMENT = {}", self.table(table), value)
    }

    pub fn truncate(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", self.table(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DbConfig {
        DbConfig::builder("shop").prefix("pdf_").build().unwrap()
    }

    // =========================================================================
    // collation_for Tests
    // =========================================================================

    #[test]
    fn test_collation_special_cases() {
        assert_eq!(collation_for("binary"), "binary");
        assert_eq!(collation_for("big5"), "big5_chinese_ci");
        assert_eq!(collation_for("gb2312"), "gb2312_chinese_ci");
        assert_eq!(collation_for("latin5"), "latin5_turkish_ci");
        assert_eq!(collation_for("euckr"), "euckr_korean_ci");
        assert_eq!(collation_for("hp8"), "hp8_english_ci");
        assert_eq!(collation_for("tis620"), "tis620_thai_ci");
        assert_eq!(collation_for("swe7"), "swe7_swedish_ci");
        assert_eq!(collation_for("sjis"), "sjis_japanese_ci");
    }

    #[test]
    fn test_collation_default() {
        assert_eq!(collation_for("utf8"), "utf8_general_ci");
        assert_eq!(collation_for("latin1"), "latin1_general_ci");
    }

    #[test]
    fn test_validate_charset() {
        assert!(validate_charset("utf8mb4").is_ok());
        assert!(validate_charset("utf8; DROP TABLE x").is_err());
        assert!(validate_charset("").is_err());
    }

    // =========================================================================
    // DdlGenerator Tests
    // =========================================================================

    #[test]
    fn test_create_database() {
        let config = test_config();
        let ddl = DdlGenerator::new(&config);

        assert_eq!(
            ddl.create_database("shop", "utf8").unwrap(),
            "CREATE DATABASE IF NOT EXISTS `shop` DEFAULT CHARACTER SET utf8 COLLATE utf8_general_ci"
        );
        assert!(ddl.create_database("shop", "utf8 x").is_err());
    }

    #[test]
    fn test_alter_charset() {
        let config = test_config();
        let ddl = DdlGenerator::new(&config);

        assert_eq!(
            ddl.alter_database_charset("shop", "gbk").unwrap(),
            "ALTER DATABASE `shop` CHARACTER SET gbk COLLATE gbk_chinese_ci"
        );
        assert_eq!(
            ddl.alter_table_charset("hot", "utf8mb4").unwrap(),
            "ALTER TABLE `pdf_hot` CHARACTER SET utf8mb4 COLLATE utf8mb4_general_ci"
        );
    }

    #[test]
    fn test_table_statements_apply_prefix() {
        let config = test_config();
        let ddl = DdlGenerator::new(&config);

        assert_eq!(ddl.drop_table("hot"), "DROP TABLE IF EXISTS `pdf_hot`");
        assert_eq!(ddl.truncate("pdf_hot"), "TRUNCATE TABLE `pdf_hot`");
        assert_eq!(
            ddl.auto_increment("hot", 1),
            "ALTER TABLE `pdf_hot` AUTO_INCREMENT = 1"
        );
    }

    #[test]
    fn test_column_statements() {
        let config = test_config();
        let ddl = DdlGenerator::new(&config);

        assert_eq!(
            ddl.add_column("hot", "views", "INT NOT NULL DEFAULT 0"),
            "ALTER TABLE `pdf_hot` ADD `views` INT NOT NULL DEFAULT 0"
        );
        assert_eq!(
            ddl.modify_column("hot", "name", " VARCHAR(64) "),
            "ALTER TABLE `pdf_hot` MODIFY `name` VARCHAR(64)"
        );
    }

    #[test]
    fn test_database_statements() {
        let config = test_config();
        let ddl = DdlGenerator::new(&config);

        assert_eq!(ddl.use_database("shop"), "USE `shop`");
        assert_eq!(ddl.drop_database("shop"), "DROP DATABASE IF EXISTS `shop`");
        assert_eq!(ddl.set_names("utf8").unwrap(), "SET NAMES utf8");
    }
}
