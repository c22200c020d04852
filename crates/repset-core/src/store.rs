//! The document-store abstraction every concept persists through.
//!
//! The traits are implemented by storage backends (e.g.
//! `repset-store-sqlite`). Concepts hold exactly one typed [`Collection`]
//! handle each and never reach into another concept's collection; references
//! across concepts are plain ids with no integrity guarantee.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

// ─── Documents ───────────────────────────────────────────────────────────────

/// Marker for payload types a collection can persist.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Document for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// A persisted entity: the concept payload plus the store-assigned envelope.
/// Every entity gains its identifier and timestamps at creation; updates
/// touch `updated_at` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doc<T> {
  pub id:         Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[serde(flatten)]
  pub data:       T,
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// One predicate over a document. The field name `"id"` addresses the
/// envelope identifier; every other name addresses a payload field.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
  /// Field equals the given value.
  Eq(String, Value),
  /// Field is an array containing the given value.
  Contains(String, Value),
}

/// A disjunction of conjunctions: a document matches if every clause of at
/// least one branch holds. `Filter::new()` has a single empty branch and
/// matches every document.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
  branches: Vec<Vec<Clause>>,
}

impl Default for Filter {
  fn default() -> Self { Self::new() }
}

impl Filter {
  pub fn new() -> Self {
    Self { branches: vec![Vec::new()] }
  }

  /// Match by envelope identifier.
  pub fn by_id(id: Uuid) -> Self {
    Self::new().eq("id", id)
  }

  /// The union of several filters: a document matches if any of them does.
  pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
    let branches = filters.into_iter().flat_map(|f| f.branches).collect();
    Self { branches }
  }

  /// Require `field == value`. Applied to every branch, so combining with
  /// [`Filter::any`] distributes: `any([a, b]).eq(f, v)` matches
  /// `(a AND f=v) OR (b AND f=v)`.
  pub fn eq(mut self, field: &str, value: impl Serialize) -> Self {
    let v = to_value(value);
    for branch in &mut self.branches {
      branch.push(Clause::Eq(field.to_owned(), v.clone()));
    }
    self
  }

  /// Require the array `field` to contain `value`.
  pub fn contains(mut self, field: &str, value: impl Serialize) -> Self {
    let v = to_value(value);
    for branch in &mut self.branches {
      branch.push(Clause::Contains(field.to_owned(), v.clone()));
    }
    self
  }

  /// The branches of the disjunction; each branch is a conjunction.
  pub fn branches(&self) -> &[Vec<Clause>] {
    &self.branches
  }

  /// Evaluate against an envelope id and the payload as JSON. This is the
  /// reference semantics; backends that compile filters to queries must
  /// agree with it.
  pub fn matches(&self, id: Uuid, doc: &Value) -> bool {
    self
      .branches
      .iter()
      .any(|branch| branch.iter().all(|clause| clause_matches(clause, id, doc)))
  }
}

fn clause_matches(clause: &Clause, id: Uuid, doc: &Value) -> bool {
  match clause {
    Clause::Eq(field, value) if field == "id" => {
      *value == Value::String(id.hyphenated().to_string())
    }
    Clause::Eq(field, value) => doc.get(field) == Some(value),
    Clause::Contains(field, value) => doc
      .get(field)
      .and_then(Value::as_array)
      .is_some_and(|items| items.contains(value)),
  }
}

fn to_value(value: impl Serialize) -> Value {
  serde_json::to_value(value).unwrap_or(Value::Null)
}

// ─── Read options ────────────────────────────────────────────────────────────

/// Sort order for [`Collection::read_many`]. Creation order is the only key
/// the adapter guarantees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Sort {
  /// Newest first.
  #[default]
  CreatedDesc,
  /// Oldest first.
  CreatedAsc,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
  pub sort:  Sort,
  pub limit: Option<usize>,
}

impl FindOptions {
  pub fn newest_first() -> Self {
    Self { sort: Sort::CreatedDesc, limit: None }
  }

  pub fn oldest_first() -> Self {
    Self { sort: Sort::CreatedAsc, limit: None }
  }
}

// ─── Partial updates ─────────────────────────────────────────────────────────

/// A partial update: named payload fields to overwrite. Fields not present
/// in the patch are left untouched by the store — `None` at a call site
/// means "do not change", never "overwrite with empty".
#[derive(Debug, Clone, Default)]
pub struct Patch {
  fields: serde_json::Map<String, Value>,
}

impl Patch {
  pub fn new() -> Self {
    Self::default()
  }

  /// Overwrite `field` with `value`.
  pub fn set(mut self, field: &str, value: impl Serialize) -> Self {
    self.fields.insert(field.to_owned(), to_value(value));
    self
  }

  /// Overwrite `field` only when a value was supplied.
  pub fn set_if(self, field: &str, value: Option<impl Serialize>) -> Self {
    match value {
      Some(v) => self.set(field, v),
      None => self,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  pub fn fields(&self) -> &serde_json::Map<String, Value> {
    &self.fields
  }

  /// Merge into a payload object — the reference semantics for backends.
  pub fn apply(&self, doc: &mut Value) {
    if let Value::Object(map) = doc {
      for (k, v) in &self.fields {
        map.insert(k.clone(), v.clone());
      }
    }
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// A typed handle on one persisted collection.
///
/// `read_one` of a missing entity resolves to `None`, never an error, so
/// callers decide strictness. The mutating operations resolve to whether a
/// document matched.
pub trait Collection<T: Document>: Clone + Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new document; the store assigns id and timestamps.
  fn create_one(
    &self,
    data: T,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + '_;

  fn read_one(
    &self,
    filter: Filter,
  ) -> impl Future<Output = Result<Option<Doc<T>>, Self::Error>> + Send + '_;

  fn read_many(
    &self,
    filter: Filter,
    options: FindOptions,
  ) -> impl Future<Output = Result<Vec<Doc<T>>, Self::Error>> + Send + '_;

  /// Apply `patch` to the first matching document and touch `updated_at`.
  fn partial_update_one(
    &self,
    filter: Filter,
    patch: Patch,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn delete_one(
    &self,
    filter: Filter,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn count(
    &self,
    filter: Filter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Atomically append `value` to the embedded array `field` of the first
  /// matching document. A single storage-level statement — two concurrent
  /// appends to the same document both land.
  fn push_one<'a>(
    &'a self,
    filter: Filter,
    field: &'a str,
    value: Value,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Atomically remove the elements of the embedded array `field` whose
  /// `key_field` equals `key`, in the first matching document.
  fn pull_one<'a>(
    &'a self,
    filter: Filter,
    field: &'a str,
    key_field: &'a str,
    key: Value,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

/// A factory of typed collections, one per concept.
pub trait DocStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Coll<T: Document>: Collection<T, Error = Self::Error>;

  /// A typed handle on the named collection, creating it on first use.
  /// Names are lowercase identifiers (`[a-z_]+`).
  fn collection<'a, T: Document>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Self::Coll<T>, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn empty_filter_matches_everything() {
    let f = Filter::new();
    assert!(f.matches(Uuid::new_v4(), &json!({ "a": 1 })));
    assert!(f.matches(Uuid::new_v4(), &json!({})));
  }

  #[test]
  fn eq_matches_payload_field() {
    let f = Filter::new().eq("author", "alice");
    assert!(f.matches(Uuid::new_v4(), &json!({ "author": "alice" })));
    assert!(!f.matches(Uuid::new_v4(), &json!({ "author": "bob" })));
    assert!(!f.matches(Uuid::new_v4(), &json!({})));
  }

  #[test]
  fn by_id_matches_envelope_id_only() {
    let id = Uuid::new_v4();
    let f = Filter::by_id(id);
    assert!(f.matches(id, &json!({})));
    assert!(!f.matches(Uuid::new_v4(), &json!({})));
  }

  #[test]
  fn contains_matches_array_membership() {
    let user = Uuid::new_v4();
    let f = Filter::new().contains("participants", user);
    let doc = json!({ "participants": [user, Uuid::new_v4()] });
    assert!(f.matches(Uuid::new_v4(), &doc));
    assert!(!f.matches(Uuid::new_v4(), &json!({ "participants": [] })));
  }

  #[test]
  fn any_is_a_disjunction() {
    let f = Filter::any([
      Filter::new().eq("from", "a"),
      Filter::new().eq("to", "a"),
    ]);
    assert!(f.matches(Uuid::new_v4(), &json!({ "from": "a", "to": "b" })));
    assert!(f.matches(Uuid::new_v4(), &json!({ "from": "b", "to": "a" })));
    assert!(!f.matches(Uuid::new_v4(), &json!({ "from": "b", "to": "b" })));
  }

  #[test]
  fn eq_after_any_distributes_over_branches() {
    let f = Filter::any([
      Filter::new().eq("from", "a"),
      Filter::new().eq("to", "a"),
    ])
    .eq("status", "pending");
    assert!(
      f.matches(Uuid::new_v4(), &json!({ "from": "a", "status": "pending" }))
    );
    assert!(
      !f.matches(Uuid::new_v4(), &json!({ "from": "a", "status": "accepted" }))
    );
  }

  #[test]
  fn patch_apply_overwrites_only_named_fields() {
    let mut doc = json!({ "content": "old", "subject": "s", "extra": 1 });
    Patch::new()
      .set("content", "new")
      .set_if("subject", None::<String>)
      .apply(&mut doc);
    assert_eq!(doc, json!({ "content": "new", "subject": "s", "extra": 1 }));
  }
}
