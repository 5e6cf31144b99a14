//! Condition building for SQL WHERE clauses
//!
//! Lowers a [`Condition`] into a boolean expression with `?` placeholders and
//! the ordered list of values bound to them.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::sql::sanitize::{autoquote, quote_identifier};

/// Boolean joiner placed between sibling fragments
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Connective {
    #[default]
    And,
    Or,
    /// Any other joiner, inserted verbatim between single spaces
    Custom(String),
}

impl Connective {
    /// The joiner with its surrounding spaces, e.g. `" and "`
    pub fn as_sql(&self) -> String {
        match self {
            Connective::And => " and ".to_string(),
            Connective::Or => " or ".to_string(),
            Connective::Custom(joiner) => format!(" {} ", joiner.trim()),
        }
    }
}

impl From<&str> for Connective {
    fn from(joiner: &str) -> Self {
        match joiner.trim().to_lowercase().as_str() {
            "" | "and" => Connective::And,
            "or" => Connective::Or,
            _ => Connective::Custom(joiner.trim().to_string()),
        }
    }
}

/// A single column comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Tuple {
    /// Already valid SQL, emitted as is (e.g. `deleted_at is null`)
    Raw(String),
    /// `column = ?`
    Eq { column: String, value: Value },
    /// `column <operator> ?`, the operator is not validated
    Compare {
        column: String,
        operator: String,
        value: Value,
    },
}

impl Tuple {
    pub fn raw(sql: impl Into<String>) -> Self {
        Tuple::Raw(sql.into())
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Tuple::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn compare(
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Tuple::Compare {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Interpret a list of scalars by its arity
    ///
    /// Returns `None` for arity 0, arity above 3, or when the column (or
    /// operator) is not a string.
    pub fn from_values(values: Vec<Value>) -> Option<Self> {
        let mut values = values.into_iter();
        match (values.next(), values.next(), values.next(), values.next()) {
            (Some(Value::String(sql)), None, None, None) => Some(Tuple::Raw(sql)),
            (Some(Value::String(column)), Some(value), None, None) => {
                Some(Tuple::Eq { column, value })
            }
            (Some(Value::String(column)), Some(Value::String(operator)), Some(value), None) => {
                Some(Tuple::Compare {
                    column,
                    operator,
                    value,
                })
            }
            _ => None,
        }
    }

    fn build(&self) -> (String, Vec<Value>) {
        match self {
            Tuple::Raw(sql) => (sql.clone(), Vec::new()),
            Tuple::Eq { column, value } => (
                format!("{} = ?", quote_identifier(column, " ")),
                vec![value.clone()],
            ),
            Tuple::Compare {
                column,
                operator,
                value,
            } => (
                format!("{} {} ?", quote_identifier(column, " "), operator),
                vec![value.clone()],
            ),
        }
    }
}

/// One entry of a [`Condition::Mixed`] list
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Raw(String),
    Tuple(Tuple),
    Tuples(Vec<Tuple>),
}

impl Element {
    /// A nested list of raw clauses expands into one element per clause
    fn from_value(value: Value) -> Vec<Self> {
        match value {
            Value::String(sql) => vec![Element::Raw(sql)],
            Value::Array(items) if is_raw_list(&items) => raw_elements(items),
            Value::Array(items) if items.iter().all(is_scalar) => {
                Tuple::from_values(items).map(Element::Tuple).into_iter().collect()
            }
            Value::Array(items) if items.iter().all(is_tuple_array) => {
                vec![Element::Tuples(tuples_from_values(items))]
            }
            other => {
                tracing::trace!(element = %other, "dropping unsupported condition element");
                Vec::new()
            }
        }
    }
}

/// A filter condition in one of the accepted shapes
///
/// Built directly with the constructors, or converted from loosely-typed JSON:
///
/// ```
/// use mysql_where::{Condition, Connective, build_condition_clause};
///
/// let condition = Condition::from(serde_json::json!(["id = 1", ["phone", "12211"]]));
/// let (clause, params) = build_condition_clause(&condition, &Connective::And).unwrap();
///
/// assert_eq!(clause, "`id` = 1 and `phone` = ?");
/// assert_eq!(params, vec![serde_json::json!("12211")]);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum Condition {
    /// Free-form SQL, identifiers are quoted by [`autoquote`]
    Raw(String),
    Tuple(Tuple),
    /// Tuples joined by the connective of the call
    Tuples(Vec<Tuple>),
    Mixed(Vec<Element>),
    /// Named groups, keys starting with `and`/`or` pick the inner connective
    Groups(Vec<(String, Condition)>),
}

impl Condition {
    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Tuple(Tuple::eq(column, value))
    }

    pub fn compare(
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Condition::Tuple(Tuple::compare(column, operator, value))
    }

    pub fn tuples(tuples: Vec<Tuple>) -> Self {
        Condition::Tuples(tuples)
    }

    pub fn mixed(elements: Vec<Element>) -> Self {
        Condition::Mixed(elements)
    }

    pub fn groups<K: Into<String>>(groups: Vec<(K, Condition)>) -> Self {
        Condition::Groups(groups.into_iter().map(|(k, c)| (k.into(), c)).collect())
    }

    /// A condition that renders to an empty clause
    pub fn empty() -> Self {
        Condition::Mixed(Vec::new())
    }
}

impl From<Value> for Condition {
    fn from(value: Value) -> Self {
        match value {
            Value::String(sql) => Condition::Raw(sql),
            Value::Array(items) if is_raw_list(&items) => Condition::Mixed(raw_elements(items)),
            Value::Array(items) if items.iter().all(is_scalar) => Tuple::from_values(items)
                .map(Condition::Tuple)
                .unwrap_or_else(Condition::empty),
            Value::Array(items) if items.iter().all(is_tuple_array) => {
                Condition::Tuples(tuples_from_values(items))
            }
            Value::Array(items) => {
                Condition::Mixed(items.into_iter().flat_map(Element::from_value).collect())
            }
            Value::Object(map) => Condition::Groups(
                map.into_iter()
                    .map(|(key, value)| (key, Condition::from(value)))
                    .collect(),
            ),
            other => {
                tracing::trace!(condition = %other, "unsupported condition, using empty clause");
                Condition::empty()
            }
        }
    }
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::Raw(sql.to_string())
    }
}

impl From<Tuple> for Condition {
    fn from(tuple: Tuple) -> Self {
        Condition::Tuple(tuple)
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// All strings, and the first one is a clause rather than a column name
///
/// `["id = 1", "phone = 12211"]` is a list of clauses while `["status", "1"]`
/// and `["fail", ">", "5"]` are tuples.
fn is_raw_list(items: &[Value]) -> bool {
    let Some(Value::String(first)) = items.first() else {
        return false;
    };
    items.iter().all(Value::is_string)
        && first
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '=' | '<' | '>' | '('))
}

fn raw_elements(items: Vec<Value>) -> Vec<Element> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(sql) => Some(Element::Raw(sql)),
            _ => None,
        })
        .collect()
}

fn is_tuple_array(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.iter().all(is_scalar) && !is_raw_list(items))
}

fn tuples_from_values(items: Vec<Value>) -> Vec<Tuple> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Array(values) => Tuple::from_values(values),
            _ => None,
        })
        .collect()
}

/// Build SQL WHERE clause from a Condition
///
/// Returns (clause, params) tuple where:
/// - `clause` is the boolean expression with `?` placeholders (without `WHERE`)
/// - `params` holds the values to bind, in placeholder order
///
/// # Arguments
/// * `condition` - The Condition to convert
/// * `connective` - Joiner between sibling fragments; named groups use it
///   between groups and their own `and`/`or` inside
///
/// Empty conditions produce an empty clause.
pub fn build_condition_clause(
    condition: &Condition,
    connective: &Connective,
) -> Result<(String, Vec<Value>)> {
    let (fragments, params) = build_fragments(condition, connective)?;
    let joiner = connective.as_sql();
    let clause = autoquote(fragments.join(joiner.as_str()).trim())?;

    Ok((clause, params))
}

fn build_fragments(
    condition: &Condition,
    connective: &Connective,
) -> Result<(Vec<String>, Vec<Value>)> {
    let mut fragments = Vec::new();
    let mut params = Vec::new();

    match condition {
        Condition::Raw(sql) => fragments.push(autoquote(sql)?),
        Condition::Tuple(tuple) => {
            let (fragment, mut tuple_params) = tuple.build();
            fragments.push(fragment);
            params.append(&mut tuple_params);
        }
        Condition::Tuples(tuples) => {
            for tuple in tuples {
                let (fragment, mut tuple_params) = tuple.build();
                fragments.push(fragment);
                params.append(&mut tuple_params);
            }
        }
        Condition::Mixed(elements) => {
            for element in elements {
                match element {
                    Element::Raw(sql) => fragments.push(autoquote(sql)?),
                    Element::Tuple(tuple) => {
                        let (fragment, mut tuple_params) = tuple.build();
                        fragments.push(fragment);
                        params.append(&mut tuple_params);
                    }
                    Element::Tuples(tuples) => {
                        let nested = Condition::Tuples(tuples.clone());
                        let (clause, mut sub_params) = build_condition_clause(&nested, connective)?;
                        if !clause.is_empty() {
                            fragments.push(clause);
                        }
                        params.append(&mut sub_params);
                    }
                }
            }
        }
        Condition::Groups(groups) => {
            for (key, group) in groups {
                let inner = if key.starts_with("and") {
                    Connective::And
                } else if key.starts_with("or") {
                    Connective::Or
                } else {
                    tracing::trace!(key = %key, "ignoring condition group without and/or prefix");
                    continue;
                };

                let (clause, mut sub_params) = build_condition_clause(group, &inner)?;
                if !clause.is_empty() {
                    fragments.push(format!("({})", clause));
                }
                params.append(&mut sub_params);
            }
        }
    }

    fragments.retain(|fragment| !fragment.is_empty());
    Ok((fragments, params))
}
