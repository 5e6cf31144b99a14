//! SQL utilities
//!
//! Identifier quoting, WHERE clause building and DDL generation.

pub mod condition;
pub mod ddl;
pub mod sanitize;

pub use condition::{Condition, Connective, Element, Tuple, build_condition_clause};
pub use ddl::{DdlGenerator, collation_for, validate_charset};
pub use sanitize::{autoquote, quote_identifier};
