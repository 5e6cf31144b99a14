//! Statement builder
//!
//! [`Query`] collects the table, field list, condition, ordering and limit of a
//! statement and renders SELECT, COUNT, INSERT, UPDATE and DELETE statements
//! with `?` placeholders plus their bound values. Nothing here touches the
//! database.

use serde_json::Value;

use crate::error::{QueryError, Result};
use crate::sql::condition::{Condition, Connective, build_condition_clause};
use crate::sql::sanitize::quote_identifier;

/// A row, keyed by column name
pub type Record = serde_json::Map<String, Value>;

/// Builder for a single-table statement
///
/// # Example
/// ```
/// use mysql_where::{Condition, Query};
///
/// let (sql, params) = Query::new("users")
///     .alias("u")
///     .fields("id, name")
///     .filter(Condition::eq("u.status", 1))
///     .order("id desc")
///     .limit_offset(0, 10)
///     .build_select()
///     .unwrap();
///
/// assert_eq!(
///     sql,
///     "SELECT `id`, `name` FROM `users` u WHERE `u`.`status` = ? ORDER BY `id` desc LIMIT 0, 10"
/// );
/// assert_eq!(params, vec![serde_json::json!(1)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    table: String,
    alias: Option<String>,
    force_index: Option<String>,
    fields: Option<String>,
    where_clause: String,
    params: Vec<Value>,
    order: Option<String>,
    limit: Option<String>,
    /// Condition error, reported when a statement is built
    build_error: Option<String>,
}

impl Query {
    /// Create a new query on `table` (used as given, no prefix is applied)
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The WHERE clause built so far (without `WHERE`)
    pub fn where_clause(&self) -> &str {
        &self.where_clause
    }

    /// Values bound to the WHERE clause placeholders
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Table alias, written verbatim after the table name
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Add `FORCE INDEX(...)`
    pub fn force_index(mut self, index: impl Into<String>) -> Self {
        self.force_index = Some(index.into());
        self
    }

    /// Set the field list from a comma separated string (`"*"` is kept as is)
    pub fn fields(mut self, fields: &str) -> Self {
        self.fields = Some(quote_field(fields));
        self
    }

    /// Set the field list from individual names
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields: Vec<String> = columns
            .into_iter()
            .map(|c| quote_field(c.as_ref()))
            .collect();
        self.fields = Some(fields.join(", "));
        self
    }

    /// Set the condition, siblings joined with `and`
    pub fn filter(self, condition: impl Into<Condition>) -> Self {
        self.filter_with(condition, Connective::And)
    }

    /// Set the condition with an explicit connective
    ///
    /// Replaces any previous condition and its parameters.
    pub fn filter_with(
        mut self,
        condition: impl Into<Condition>,
        connective: impl Into<Connective>,
    ) -> Self {
        match build_condition_clause(&condition.into(), &connective.into()) {
            Ok((clause, params)) => {
                self.where_clause = clause;
                self.params = params;
                self.build_error = None;
            }
            Err(e) => {
                self.where_clause.clear();
                self.params.clear();
                self.build_error = Some(e.to_string());
            }
        }
        self
    }

    /// Set ORDER BY from a comma separated string, e.g. `"id desc, phone asc"`
    pub fn order(self, order: &str) -> Self {
        self.order_by(order.split(','))
    }

    /// Set ORDER BY from individual items, e.g. `["id desc", "phone"]`
    pub fn order_by<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items: Vec<String> = items
            .into_iter()
            .filter(|item| !item.as_ref().trim().is_empty())
            .map(|item| quote_identifier(item.as_ref(), " "))
            .collect();
        self.order = if items.is_empty() {
            None
        } else {
            Some(items.join(", "))
        };
        self
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count.to_string());
        self
    }

    /// `LIMIT offset, count`
    pub fn limit_offset(mut self, offset: u64, count: u64) -> Self {
        self.limit = Some(format!("{}, {}", offset, count));
        self
    }

    fn check(&self) -> Result<()> {
        match &self.build_error {
            Some(message) => Err(QueryError::InvalidCondition(message.clone())),
            None => Ok(()),
        }
    }

    fn quoted_table(&self) -> String {
        quote_identifier(&self.table, ",")
    }

    fn where_sql(&self) -> String {
        if self.where_clause.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clause)
        }
    }

    fn render_select(&self, fields: &str, with_order: bool, limit: Option<&str>) -> String {
        let mut sql = format!("SELECT {} FROM {}", fields, self.quoted_table());

        if let Some(alias) = &self.alias {
            sql.push(' ');
            sql.push_str(alias);
        }
        if let Some(index) = &self.force_index {
            sql.push_str(&format!(" FORCE INDEX({})", index));
        }
        sql.push_str(&self.where_sql());
        if with_order {
            if let Some(order) = &self.order {
                sql.push_str(&format!(" ORDER BY {}", order));
            }
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }

    /// `SELECT <fields> FROM ...`, fields default to `*`
    pub fn build_select(&self) -> Result<(String, Vec<Value>)> {
        self.check()?;
        let fields = self.fields.as_deref().unwrap_or("*");
        let sql = self.render_select(fields, true, self.limit.as_deref());
        Ok((sql, self.params.clone()))
    }

    /// Like [`Query::build_select`] but limited to one row
    pub fn build_find(&self) -> Result<(String, Vec<Value>)> {
        self.check()?;
        let fields = self.fields.as_deref().unwrap_or("*");
        let sql = self.render_select(fields, true, Some("1"));
        Ok((sql, self.params.clone()))
    }

    /// `SELECT count(1) FROM ...`, ordering and limit are not applied
    pub fn build_count(&self) -> Result<(String, Vec<Value>)> {
        self.check()?;
        let sql = self.render_select("count(1)", false, None);
        Ok((sql, self.params.clone()))
    }

    /// Select a single column of the first matching row
    ///
    /// Plain and dotted column names are quoted. `*` and expressions such as
    /// `max(id)` or `count(1) as n` are used verbatim.
    pub fn build_value(&self, field: &str) -> Result<(String, Vec<Value>)> {
        self.check()?;
        let field = if is_expression(field) {
            field.trim().to_string()
        } else {
            quote_identifier(field, "")
        };
        let limit = self.limit.as_deref().unwrap_or("1");
        let sql = self.render_select(&field, true, Some(limit));
        Ok((sql, self.params.clone()))
    }

    /// `INSERT INTO ... VALUES (?, ...)`, one placeholder per record entry
    pub fn build_insert(&self, record: &Record) -> Result<(String, Vec<Value>)> {
        if record.is_empty() {
            return Err(QueryError::validation("Insert requires at least one column"));
        }
        let columns: Vec<&str> = record.keys().map(String::as_str).collect();
        let values = record.values().cloned().collect();
        Ok((self.insert_sql(&columns), values))
    }

    /// Batch insert, columns are taken from the first record
    ///
    /// Returns the statement and one parameter row per record; keys missing
    /// from a later record are bound as NULL.
    pub fn build_insert_many(&self, records: &[Record]) -> Result<(String, Vec<Vec<Value>>)> {
        let first = records
            .first()
            .ok_or_else(|| QueryError::validation("Insert requires at least one record"))?;
        if first.is_empty() {
            return Err(QueryError::validation("Insert requires at least one column"));
        }
        let columns: Vec<&str> = first.keys().map(String::as_str).collect();
        let rows = records
            .iter()
            .map(|record| values_for(record, &columns))
            .collect();
        Ok((self.insert_sql(&columns), rows))
    }

    fn insert_sql(&self, columns: &[&str]) -> String {
        let quoted: Vec<String> = columns.iter().map(|c| quote_identifier(c, "")).collect();
        let placeholders = vec!["?"; columns.len()];
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quoted_table(),
            quoted.join(", "),
            placeholders.join(", ")
        )
    }

    /// `UPDATE ... SET ... [WHERE ...]`, SET values come before WHERE values
    pub fn build_update(&self, record: &Record) -> Result<(String, Vec<Value>)> {
        self.check()?;
        if record.is_empty() {
            return Err(QueryError::validation("Update requires at least one column"));
        }
        let columns: Vec<&str> = record.keys().map(String::as_str).collect();
        let mut params: Vec<Value> = record.values().cloned().collect();
        params.extend(self.params.iter().cloned());
        Ok((self.update_sql(&columns), params))
    }

    /// Batch update, columns are taken from the first record
    pub fn build_update_many(&self, records: &[Record]) -> Result<(String, Vec<Vec<Value>>)> {
        self.check()?;
        let first = records
            .first()
            .ok_or_else(|| QueryError::validation("Update requires at least one record"))?;
        if first.is_empty() {
            return Err(QueryError::validation("Update requires at least one column"));
        }
        let columns: Vec<&str> = first.keys().map(String::as_str).collect();
        let rows = records
            .iter()
            .map(|record| {
                let mut row = values_for(record, &columns);
                row.extend(self.params.iter().cloned());
                row
            })
            .collect();
        Ok((self.update_sql(&columns), rows))
    }

    fn update_sql(&self, columns: &[&str]) -> String {
        let assignments: Vec<String> = columns
            .iter()
            .map(|c| format!("{} = ?", quote_identifier(c, "")))
            .collect();
        format!(
            "UPDATE {} SET {}{}",
            self.quoted_table(),
            assignments.join(", "),
            self.where_sql()
        )
    }

    /// `DELETE FROM ... [WHERE ...]`
    pub fn build_delete(&self) -> Result<(String, Vec<Value>)> {
        self.check()?;
        let sql = format!("DELETE FROM {}{}", self.quoted_table(), self.where_sql());
        Ok((sql, self.params.clone()))
    }
}

fn is_expression(field: &str) -> bool {
    field
        .trim()
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '(' | '*' | '`'))
}

fn quote_field(field: &str) -> String {
    if field.trim() == "*" {
        "*".to_string()
    } else {
        quote_identifier(field, ",")
    }
}

fn values_for(record: &Record, columns: &[&str]) -> Vec<Value> {
    columns
        .iter()
        .map(|c| record.get(*c).cloned().unwrap_or(Value::Null))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    // ==================== Field Lists ====================

    #[test]
    fn test_fields_string() {
        let (sql, _) = Query::new("users")
            .fields("id, name, email")
            .build_select()
            .unwrap();

        assert_eq!(sql, "SELECT `id`, `name`, `email` FROM `users`");
    }

    #[test]
    fn test_columns_list() {
        let (sql, _) = Query::new("users")
            .columns(["id", "name", "phone"])
            .build_select()
            .unwrap();

        assert_eq!(sql, "SELECT `id`, `name`, `phone` FROM `users`");
    }

    #[test]
    fn test_star_kept() {
        let (sql, _) = Query::new("users").fields("*").build_select().unwrap();
        assert_eq!(sql, "SELECT * FROM `users`");

        let (sql, _) = Query::new("users")
            .columns(["*", "u.id"])
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT *, `u`.`id` FROM `users`");
    }

    // ==================== SELECT ====================

    #[test]
    fn test_full_select() {
        let (sql, params) = Query::new("users")
            .alias("u")
            .force_index("idx_phone")
            .fields("id, name")
            .filter(json!([["status", "1"], ["fail", ">", "5"]]))
            .order("id desc, phone asc")
            .limit(1)
            .build_select()
            .unwrap();

        assert_eq!(
            sql,
            "SELECT `id`, `name` FROM `users` u FORCE INDEX(idx_phone) \
             WHERE `status` = ? and `fail` > ? ORDER BY `id` desc, `phone` asc LIMIT 1"
        );
        assert_eq!(params, vec![json!("1"), json!("5")]);
    }

    #[test]
    fn test_filter_with_or() {
        let query = Query::new("users").filter_with(json!([["a", 1], ["b", 2]]), "or");

        assert_eq!(query.where_clause(), "`a` = ? or `b` = ?");
        assert_eq!(query.params().len(), 2);
    }

    #[test]
    fn test_filter_replaces_previous() {
        let query = Query::new("users")
            .filter(Condition::eq("a", 1))
            .filter("id = 2");

        assert_eq!(query.where_clause(), "`id` = 2");
        assert!(query.params().is_empty());
    }

    #[test]
    fn test_order_by_items() {
        let (sql, _) = Query::new("users")
            .order_by(["id desc", "phone asc"])
            .build_select()
            .unwrap();

        assert_eq!(sql, "SELECT * FROM `users` ORDER BY `id` desc, `phone` asc");
    }

    #[test]
    fn test_order_ignores_empty_items() {
        let (sql, _) = Query::new("users").order("id,").build_select().unwrap();
        assert_eq!(sql, "SELECT * FROM `users` ORDER BY `id`");
    }

    #[test]
    fn test_find_count_value() {
        let query = Query::new("admin")
            .filter("id = 1")
            .order("id")
            .limit_offset(0, 10);

        let (sql, _) = query.build_find().unwrap();
        assert_eq!(sql, "SELECT * FROM `admin` WHERE `id` = 1 ORDER BY `id` LIMIT 1");

        let (sql, _) = query.build_count().unwrap();
        assert_eq!(sql, "SELECT count(1) FROM `admin` WHERE `id` = 1");

        let (sql, _) = Query::new("admin")
            .filter("id = 1")
            .build_value("nickname")
            .unwrap();
        assert_eq!(sql, "SELECT `nickname` FROM `admin` WHERE `id` = 1 LIMIT 1");
    }

    #[test]
    fn test_value_expression_is_verbatim() {
        let query = Query::new("admin").filter(Condition::raw("status = 1"));

        let (sql, _) = query.build_value("max(id)").unwrap();
        assert_eq!(sql, "SELECT max(id) FROM `admin` WHERE `status` = 1 LIMIT 1");

        let (sql, _) = query.build_value(" count(1) as n ").unwrap();
        assert_eq!(sql, "SELECT count(1) as n FROM `admin` WHERE `status` = 1 LIMIT 1");

        let (sql, _) = query.build_value("u.name").unwrap();
        assert_eq!(sql, "SELECT `u`.`name` FROM `admin` WHERE `status` = 1 LIMIT 1");
    }

    #[test]
    fn test_dotted_table() {
        let (sql, _) = Query::new("shop.users").build_select().unwrap();
        assert_eq!(sql, "SELECT * FROM `shop`.`users`");
    }

    // ==================== INSERT ====================

    #[test]
    fn test_insert() {
        let (sql, params) = Query::new("pdf_hot")
            .build_insert(&record(json!({"cid": 1, "name": "test"})))
            .unwrap();

        assert_eq!(sql, "INSERT INTO `pdf_hot` (`cid`, `name`) VALUES (?, ?)");
        assert_eq!(params, vec![json!(1), json!("test")]);
    }

    #[test]
    fn test_insert_empty_record() {
        let result = Query::new("t").build_insert(&Record::new());
        assert!(matches!(result, Err(QueryError::Validation(_))));
    }

    #[test]
    fn test_insert_many_uses_first_record_columns() {
        let records = vec![
            record(json!({"cid": 1, "name": "a"})),
            record(json!({"name": "b", "cid": 2})),
            record(json!({"cid": 3})),
        ];
        let (sql, rows) = Query::new("hot").build_insert_many(&records).unwrap();

        assert_eq!(sql, "INSERT INTO `hot` (`cid`, `name`) VALUES (?, ?)");
        assert_eq!(
            rows,
            vec![
                vec![json!(1), json!("a")],
                vec![json!(2), json!("b")],
                vec![json!(3), Value::Null],
            ]
        );
    }

    #[test]
    fn test_insert_many_empty() {
        assert!(Query::new("hot").build_insert_many(&[]).is_err());
    }

    // ==================== UPDATE ====================

    #[test]
    fn test_update_params_order() {
        let (sql, params) = Query::new("hot")
            .filter(Condition::eq("id", 3))
            .build_update(&record(json!({"cid": 2, "name": "ce shi"})))
            .unwrap();

        assert_eq!(sql, "UPDATE `hot` SET `cid` = ?, `name` = ? WHERE `id` = ?");
        assert_eq!(params, vec![json!(2), json!("ce shi"), json!(3)]);
    }

    #[test]
    fn test_update_without_where() {
        let (sql, params) = Query::new("hot")
            .build_update(&record(json!({"cid": 2})))
            .unwrap();

        assert_eq!(sql, "UPDATE `hot` SET `cid` = ?");
        assert_eq!(params, vec![json!(2)]);
    }

    #[test]
    fn test_update_many_appends_where_params_once() {
        let records = vec![record(json!({"cid": 1})), record(json!({"cid": 2}))];
        let (sql, rows) = Query::new("hot")
            .filter(Condition::compare("id", ">", 10))
            .build_update_many(&records)
            .unwrap();

        assert_eq!(sql, "UPDATE `hot` SET `cid` = ? WHERE `id` > ?");
        assert_eq!(
            rows,
            vec![vec![json!(1), json!(10)], vec![json!(2), json!(10)]]
        );
    }

    // ==================== DELETE ====================

    #[test]
    fn test_delete() {
        let (sql, params) = Query::new("hot").filter("id = 3").build_delete().unwrap();
        assert_eq!(sql, "DELETE FROM `hot` WHERE `id` = 3");
        assert!(params.is_empty());

        let (sql, _) = Query::new("hot").build_delete().unwrap();
        assert_eq!(sql, "DELETE FROM `hot`");
    }
}
