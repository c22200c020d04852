//! Encoding helpers between store types and their SQLite representations.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision) so creation order sorts lexicographically. UUIDs are stored as
//! hyphenated lowercase strings. Payloads are compact JSON text; filters
//! compile to `json_extract` predicates over it.

use chrono::{DateTime, SecondsFormat, Utc};
use repset_core::store::{Clause, Filter};
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid / DateTime ─────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Ok(Uuid::parse_str(s)?)
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Identifier validation ───────────────────────────────────────────────────

/// Collection names come from concept constructors; reject anything that is
/// not a lowercase identifier before it reaches an SQL string.
pub fn validate_collection_name(name: &str) -> Result<()> {
  let ok = !name.is_empty()
    && name.bytes().all(|b| b.is_ascii_lowercase() || b == b'_');
  if !ok {
    return Err(Error::InvalidCollectionName(name.to_owned()));
  }
  Ok(())
}

/// Field names appear inside `json_extract` paths; same rule plus digits.
pub fn validate_field_name(field: &str) -> Result<()> {
  let ok = !field.is_empty()
    && field
      .bytes()
      .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
  if !ok {
    return Err(Error::InvalidFieldName(field.to_owned()));
  }
  Ok(())
}

// ─── Filter compilation ──────────────────────────────────────────────────────

/// A compiled filter: an SQL boolean expression plus its positional
/// parameters, in textual order.
pub struct WhereClause {
  pub sql:    String,
  pub params: Vec<rusqlite::types::Value>,
}

/// Compile to SQL agreeing with [`Filter::matches`]: OR over branches, AND
/// within a branch, an empty branch matching everything and no branches
/// matching nothing.
pub fn compile_filter(filter: &Filter) -> Result<WhereClause> {
  let mut params = Vec::new();
  let mut branches = Vec::new();

  for branch in filter.branches() {
    if branch.is_empty() {
      branches.push("1".to_owned());
      continue;
    }
    let mut conds = Vec::new();
    for clause in branch {
      conds.push(compile_clause(clause, &mut params)?);
    }
    branches.push(format!("({})", conds.join(" AND ")));
  }

  let sql = if branches.is_empty() {
    "(0)".to_owned()
  } else {
    format!("({})", branches.join(" OR "))
  };
  Ok(WhereClause { sql, params })
}

fn compile_clause(
  clause: &Clause,
  params: &mut Vec<rusqlite::types::Value>,
) -> Result<String> {
  Ok(match clause {
    Clause::Eq(field, value) if field == "id" => {
      params.push(to_sql_param(value));
      "doc_id = ?".to_owned()
    }
    Clause::Eq(field, Value::Null) => {
      validate_field_name(field)?;
      format!("json_extract(doc, '$.{field}') IS NULL")
    }
    Clause::Eq(field, value) => {
      validate_field_name(field)?;
      params.push(to_sql_param(value));
      format!("json_extract(doc, '$.{field}') = ?")
    }
    Clause::Contains(field, value) => {
      validate_field_name(field)?;
      params.push(to_sql_param(value));
      format!(
        "EXISTS (SELECT 1 FROM json_each(doc, '$.{field}') \
         WHERE json_each.value = ?)"
      )
    }
  })
}

/// JSON scalars map to the SQL types `json_extract` yields for them:
/// booleans become 0/1 integers, numbers stay numeric, strings stay text.
/// Composite values compare by their compact JSON text.
pub fn to_sql_param(value: &Value) -> rusqlite::types::Value {
  match value {
    Value::Null => rusqlite::types::Value::Null,
    Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => rusqlite::types::Value::Integer(i),
      None => rusqlite::types::Value::Real(n.as_f64().unwrap_or(0.0)),
    },
    Value::String(s) => rusqlite::types::Value::Text(s.clone()),
    other => rusqlite::types::Value::Text(other.to_string()),
  }
}
