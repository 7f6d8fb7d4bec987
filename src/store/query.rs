//! Read-only query gateway
//!
//! Callers hand over raw SQL. A denylist scan runs before anything touches
//! the database; the scan is a plain substring check over the uppercased
//! text, so a SELECT that merely mentions a forbidden word in a literal is
//! rejected too. That false positive is accepted: the gate has no SQL
//! parser and stays deliberately blunt.

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use indexmap::IndexMap;
use rusqlite::types::ValueRef;
use serde_json::Value;
use thiserror::Error;

use super::SymbolStore;

/// Keywords that reject a query outright, wherever they appear
pub const FORBIDDEN_SQL: [&str; 8] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "REPLACE",
];

/// Why a query never reached the database
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryRejection {
    #[error("Forbidden SQL keyword: {keyword}. Only SELECT queries are allowed.")]
    ForbiddenKeyword { keyword: &'static str },
    #[error("Only SELECT queries are allowed.")]
    NotSelect,
}

/// One result row, columns in SELECT order
pub type QueryRow = IndexMap<String, Value>;

/// Gate a query: denylist scan first, then the SELECT prefix check
pub fn validate_query(sql: &str) -> Result<(), QueryRejection> {
    let upper = sql.to_uppercase();
    let upper = upper.trim();
    for keyword in FORBIDDEN_SQL {
        if upper.contains(keyword) {
            return Err(QueryRejection::ForbiddenKeyword { keyword });
        }
    }
    if !upper.starts_with("SELECT") {
        return Err(QueryRejection::NotSelect);
    }
    Ok(())
}

impl SymbolStore {
    /// Validate and run a SELECT, returning rows as ordered JSON objects
    pub fn run_query(&self, sql: &str) -> Result<Vec<QueryRow>> {
        validate_query(sql)?;

        let mut stmt = self.conn.prepare(sql)?;
        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut object = QueryRow::with_capacity(column_names.len());
            for (index, name) in column_names.iter().enumerate() {
                object.insert(name.clone(), cell_to_json(row.get_ref(index)?));
            }
            out.push(object);
        }
        Ok(out)
    }
}

/// JSON has no raw-byte type, so BLOB cells come back base64-encoded
fn cell_to_json(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::from(n),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::String(BASE64.encode(bytes)),
    }
}
