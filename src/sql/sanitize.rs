//! SQL Identifier Quoting Utilities
//!
//! Wraps MySQL column and table references in backquotes, and rewrites raw
//! boolean expressions so the bare identifiers inside them are quoted too.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;

const QUOTE: char = '`';

/// Identifier at the start of an expression, or after `and`, `or`, `(` or `.`
static BARE_IDENTIFIER: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?i)(^|\band\b|\bor\b|\(|\.)\s*([a-z_][a-z0-9_]*)"));

/// Quote a SQL identifier (or a list of them) with backquotes
///
/// `separator` controls how `identifier` is split:
/// - `","` (or any other non-space separator): every item is quoted and the
///   items are joined back, using `", "` for commas
/// - `" "`: only the first token is quoted, so `"id desc"` keeps its direction
///
/// Dotted paths are quoted per segment and already-quoted segments are not
/// quoted twice.
///
/// # Example
/// ```
/// use mysql_where::sql::quote_identifier;
///
/// assert_eq!(quote_identifier("id, name", ","), "`id`, `name`");
/// assert_eq!(quote_identifier("u.phone", ","), "`u`.`phone`");
/// assert_eq!(quote_identifier("id desc", " "), "`id` desc");
/// ```
pub fn quote_identifier(identifier: &str, separator: &str) -> String {
    let normalized = normalize_separators(identifier, separator);

    if separator.is_empty() {
        return quote_token(&normalized);
    }

    let mut tokens: Vec<String> = normalized.split(separator).map(str::to_string).collect();

    if separator == " " {
        if let Some(first) = tokens.first_mut() {
            *first = quote_token(first);
        }
    } else {
        for token in tokens.iter_mut() {
            *token = quote_token(token);
        }
    }

    let joiner = if separator == "," { ", " } else { separator };
    tokens.join(joiner)
}

/// Quote bare identifiers inside a raw SQL boolean expression
///
/// A word is treated as an identifier when it starts the expression or follows
/// `and`, `or`, `(` or `.` (keywords are matched case-insensitively). Numeric
/// literals and values after comparison operators are left alone.
///
/// String literals are not recognized: `'x and y'` has `y` quoted as well.
///
/// # Example
/// ```
/// use mysql_where::sql::autoquote;
///
/// let quoted = autoquote("status = 1 and type = 2").unwrap();
/// assert_eq!(quoted, "`status` = 1 and `type` = 2");
/// ```
pub fn autoquote(raw: &str) -> Result<String> {
    let pattern = BARE_IDENTIFIER.as_ref().map_err(Clone::clone)?;
    let quoted = pattern.replace_all(raw, "${1} `${2}`");

    Ok(quoted
        .replace(". ", ".")
        .replace("( ", "(")
        .trim()
        .to_string())
}

fn normalize_separators(identifier: &str, separator: &str) -> String {
    let mut normalized = if separator == " " {
        identifier.trim().to_string()
    } else {
        let trimmed = identifier.trim_matches(|c: char| c == ' ' || separator.contains(c));
        if separator.contains(' ') {
            trimmed.to_string()
        } else {
            trimmed.replace(' ', "")
        }
    };

    if !separator.is_empty() {
        let doubled = separator.repeat(2);
        while normalized.contains(&doubled) {
            normalized = normalized.replace(&doubled, separator);
        }
    }

    normalized
}

fn quote_token(token: &str) -> String {
    if token.is_empty() {
        return "``".to_string();
    }

    let mut quoted = token.replace('.', "`.`");
    if !quoted.starts_with(QUOTE) {
        quoted.insert(0, QUOTE);
    }
    // pre-quoted segments end up with doubled quotes next to the dot
    quoted = quoted.replace("``.", "`.").replace(".``", ".`");
    if !quoted.ends_with(QUOTE) {
        quoted.push(QUOTE);
    }

    quoted
}
