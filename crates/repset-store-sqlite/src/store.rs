//! [`SqliteStore`] and [`SqliteCollection`] — the SQLite implementation of
//! the document-store traits.

use std::marker::PhantomData;
use std::path::Path;

use chrono::Utc;
use repset_core::store::{
  Collection, Doc, DocStore, Document, Filter, FindOptions, Patch, Sort,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    WhereClause, compile_filter, decode_dt, decode_uuid, encode_dt,
    encode_uuid, validate_collection_name, validate_field_name,
  },
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A document store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, and all
/// statements on it are serialized, so cross-collection sequences never
/// interleave mid-statement.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_pragmas().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_pragmas().await?;
    Ok(store)
  }

  async fn init_pragmas(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(
          "PRAGMA journal_mode = WAL;
           PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl DocStore for SqliteStore {
  type Coll<T: Document> = SqliteCollection<T>;
  type Error = Error;

  async fn collection<'a, T: Document>(
    &'a self,
    name: &'a str,
  ) -> Result<SqliteCollection<T>> {
    validate_collection_name(name)?;
    let ddl = format!(
      "CREATE TABLE IF NOT EXISTS \"{name}\" (
         doc_id     TEXT PRIMARY KEY,
         created_at TEXT NOT NULL,
         updated_at TEXT NOT NULL,
         doc        TEXT NOT NULL
       );
       CREATE INDEX IF NOT EXISTS \"{name}_created_idx\"
         ON \"{name}\"(created_at);"
    );
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    Ok(SqliteCollection {
      conn:    self.conn.clone(),
      table:   name.to_owned(),
      _marker: PhantomData,
    })
  }
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// A typed handle on one table. `PhantomData<fn() -> T>` keeps the handle
/// `Clone`/`Send`/`Sync` regardless of `T`.
pub struct SqliteCollection<T> {
  conn:    tokio_rusqlite::Connection,
  table:   String,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for SqliteCollection<T> {
  fn clone(&self) -> Self {
    Self {
      conn:    self.conn.clone(),
      table:   self.table.clone(),
      _marker: PhantomData,
    }
  }
}

impl<T> std::fmt::Debug for SqliteCollection<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SqliteCollection")
      .field("table", &self.table)
      .finish_non_exhaustive()
  }
}

/// Raw strings read directly from a collection row.
struct RawDoc {
  doc_id:     String,
  created_at: String,
  updated_at: String,
  doc:        String,
}

impl RawDoc {
  fn into_doc<T: Document>(self) -> Result<Doc<T>> {
    Ok(Doc {
      id:         decode_uuid(&self.doc_id)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      data:       serde_json::from_str(&self.doc)?,
    })
  }
}

impl<T> SqliteCollection<T> {
  /// `rowid` is the insertion-order tie-break: equal timestamps still read
  /// back in creation order.
  fn order_sql(sort: Sort) -> &'static str {
    match sort {
      Sort::CreatedAsc => "ORDER BY created_at ASC, rowid ASC",
      Sort::CreatedDesc => "ORDER BY created_at DESC, rowid DESC",
    }
  }

  /// Subquery selecting the first matching row, for single-document
  /// mutations.
  fn first_match_sql(&self, where_sql: &str) -> String {
    format!(
      "(SELECT MIN(rowid) FROM \"{}\" WHERE {where_sql})",
      self.table
    )
  }

  async fn execute(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?)
      })
      .await?;
    Ok(changed)
  }
}

impl<T: Document> Collection<T> for SqliteCollection<T> {
  type Error = Error;

  async fn create_one(&self, data: T) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = encode_dt(Utc::now());
    let id_str = encode_uuid(id);
    let doc = serde_json::to_string(&data)?;
    let sql = format!(
      "INSERT INTO \"{}\" (doc_id, created_at, updated_at, doc)
       VALUES (?1, ?2, ?2, ?3)",
      self.table
    );
    self
      .conn
      .call(move |conn| {
        conn.execute(&sql, rusqlite::params![id_str, now, doc])?;
        Ok(())
      })
      .await?;
    Ok(id)
  }

  async fn read_one(&self, filter: Filter) -> Result<Option<Doc<T>>> {
    let WhereClause { sql: where_sql, params } = compile_filter(&filter)?;
    let sql = format!(
      "SELECT doc_id, created_at, updated_at, doc FROM \"{}\"
       WHERE {where_sql} {} LIMIT 1",
      self.table,
      Self::order_sql(Sort::CreatedAsc),
    );
    let raw: Option<RawDoc> = self
      .conn
      .call(move |conn| {
        use rusqlite::OptionalExtension as _;
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), |row| {
              Ok(RawDoc {
                doc_id:     row.get(0)?,
                created_at: row.get(1)?,
                updated_at: row.get(2)?,
                doc:        row.get(3)?,
              })
            })
            .optional()?,
        )
      })
      .await?;
    raw.map(RawDoc::into_doc).transpose()
  }

  async fn read_many(
    &self,
    filter: Filter,
    options: FindOptions,
  ) -> Result<Vec<Doc<T>>> {
    let WhereClause { sql: where_sql, params } = compile_filter(&filter)?;
    let limit_sql = options
      .limit
      .map(|n| format!(" LIMIT {n}"))
      .unwrap_or_default();
    let sql = format!(
      "SELECT doc_id, created_at, updated_at, doc FROM \"{}\"
       WHERE {where_sql} {}{limit_sql}",
      self.table,
      Self::order_sql(options.sort),
    );
    let raws: Vec<RawDoc> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(RawDoc {
              doc_id:     row.get(0)?,
              created_at: row.get(1)?,
              updated_at: row.get(2)?,
              doc:        row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawDoc::into_doc).collect()
  }

  async fn partial_update_one(
    &self,
    filter: Filter,
    patch: Patch,
  ) -> Result<bool> {
    let WhereClause { sql: where_sql, params: filter_params } =
      compile_filter(&filter)?;

    // json_set overwrites exactly the named paths; everything else in the
    // document is untouched.
    let mut set_paths = String::new();
    let mut params: Vec<rusqlite::types::Value> = Vec::new();
    for (field, value) in patch.fields() {
      validate_field_name(field)?;
      set_paths.push_str(&format!(", '$.{field}', json(?)"));
      params.push(rusqlite::types::Value::Text(value.to_string()));
    }
    let doc_expr = if set_paths.is_empty() {
      "doc".to_owned()
    } else {
      format!("json_set(doc{set_paths})")
    };

    params.push(rusqlite::types::Value::Text(encode_dt(Utc::now())));
    params.extend(filter_params);

    let sql = format!(
      "UPDATE \"{}\" SET doc = {doc_expr}, updated_at = ?
       WHERE rowid = {}",
      self.table,
      self.first_match_sql(&where_sql),
    );
    Ok(self.execute(sql, params).await? > 0)
  }

  async fn delete_one(&self, filter: Filter) -> Result<bool> {
    let WhereClause { sql: where_sql, params } = compile_filter(&filter)?;
    let sql = format!(
      "DELETE FROM \"{}\" WHERE rowid = {}",
      self.table,
      self.first_match_sql(&where_sql),
    );
    Ok(self.execute(sql, params).await? > 0)
  }

  async fn count(&self, filter: Filter) -> Result<u64> {
    let WhereClause { sql: where_sql, params } = compile_filter(&filter)?;
    let sql = format!(
      "SELECT COUNT(*) FROM \"{}\" WHERE {where_sql}",
      self.table
    );
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |row| {
          row.get(0)
        })?)
      })
      .await?;
    Ok(count.max(0) as u64)
  }

  async fn push_one<'a>(
    &'a self,
    filter: Filter,
    field: &'a str,
    value: Value,
  ) -> Result<bool> {
    validate_field_name(field)?;
    let WhereClause { sql: where_sql, params: filter_params } =
      compile_filter(&filter)?;

    // `json_insert` with a `[#]` path appends in a single statement, so two
    // concurrent appends to the same document both land.
    let sql = format!(
      "UPDATE \"{0}\" SET doc = json_insert(doc, '$.{field}[#]', json(?)),
       updated_at = ? WHERE rowid = {1}",
      self.table,
      self.first_match_sql(&where_sql),
    );
    let mut params = vec![
      rusqlite::types::Value::Text(value.to_string()),
      rusqlite::types::Value::Text(encode_dt(Utc::now())),
    ];
    params.extend(filter_params);
    Ok(self.execute(sql, params).await? > 0)
  }

  async fn pull_one<'a>(
    &'a self,
    filter: Filter,
    field: &'a str,
    key_field: &'a str,
    key: Value,
  ) -> Result<bool> {
    validate_field_name(field)?;
    validate_field_name(key_field)?;
    let WhereClause { sql: where_sql, params: filter_params } =
      compile_filter(&filter)?;

    // Rebuild the array without the matching elements in a single statement.
    // `IS NOT` keeps elements that lack the key field entirely; the `json()`
    // wrapper stops `json_set` from treating the rebuilt text as a string.
    let sql = format!(
      "UPDATE \"{0}\" SET doc = json_set(doc, '$.{field}', json((
         SELECT COALESCE(json_group_array(json(value)), '[]')
         FROM json_each(doc, '$.{field}')
         WHERE json_extract(value, '$.{key_field}') IS NOT ?
       ))), updated_at = ? WHERE rowid = {1}",
      self.table,
      self.first_match_sql(&where_sql),
    );
    let key_param = crate::encode::to_sql_param(&key);
    let mut params =
      vec![key_param, rusqlite::types::Value::Text(encode_dt(Utc::now()))];
    params.extend(filter_params);
    Ok(self.execute(sql, params).await? > 0)
  }
}
