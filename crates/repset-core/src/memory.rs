//! In-process store used by concept unit tests.
//!
//! Implements the [`store`](crate::store) traits over a `HashMap` guarded by
//! a mutex, using [`Filter::matches`] and [`Patch::apply`] directly so the
//! tests exercise the reference filter/patch semantics.

use std::{
  collections::HashMap,
  marker::PhantomData,
  sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::store::{
  Collection, Doc, DocStore, Document, Filter, FindOptions, Patch, Sort,
};

#[derive(Debug, Error)]
pub(crate) enum MemError {
  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
struct RawDoc {
  id:         Uuid,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
  json:       Value,
}

type Shared = Arc<Mutex<HashMap<String, Vec<RawDoc>>>>;

#[derive(Default)]
pub(crate) struct MemStore {
  inner: Shared,
}

impl MemStore {
  pub(crate) fn new() -> Self {
    Self::default()
  }
}

pub(crate) struct MemColl<T> {
  name:    String,
  inner:   Shared,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for MemColl<T> {
  fn clone(&self) -> Self {
    Self {
      name:    self.name.clone(),
      inner:   Arc::clone(&self.inner),
      _marker: PhantomData,
    }
  }
}

impl DocStore for MemStore {
  type Coll<T: Document> = MemColl<T>;
  type Error = MemError;

  async fn collection<'a, T: Document>(
    &'a self,
    name: &'a str,
  ) -> Result<MemColl<T>, MemError> {
    let mut inner = lock(&self.inner);
    inner.entry(name.to_owned()).or_default();
    drop(inner);
    Ok(MemColl {
      name:    name.to_owned(),
      inner:   Arc::clone(&self.inner),
      _marker: PhantomData,
    })
  }
}

fn lock(shared: &Shared) -> std::sync::MutexGuard<'_, HashMap<String, Vec<RawDoc>>> {
  shared.lock().unwrap_or_else(|e| e.into_inner())
}

fn decode<T: Document>(raw: &RawDoc) -> Result<Doc<T>, MemError> {
  Ok(Doc {
    id:         raw.id,
    created_at: raw.created_at,
    updated_at: raw.updated_at,
    data:       serde_json::from_value(raw.json.clone())?,
  })
}

impl<T: Document> Collection<T> for MemColl<T> {
  type Error = MemError;

  async fn create_one(&self, data: T) -> Result<Uuid, MemError> {
    let json = serde_json::to_value(&data)?;
    let now = Utc::now();
    let id = Uuid::new_v4();
    let mut inner = lock(&self.inner);
    inner.entry(self.name.clone()).or_default().push(RawDoc {
      id,
      created_at: now,
      updated_at: now,
      json,
    });
    Ok(id)
  }

  async fn read_one(&self, filter: Filter) -> Result<Option<Doc<T>>, MemError> {
    let inner = lock(&self.inner);
    inner
      .get(&self.name)
      .and_then(|docs| docs.iter().find(|d| filter.matches(d.id, &d.json)))
      .map(decode)
      .transpose()
  }

  async fn read_many(
    &self,
    filter: Filter,
    options: FindOptions,
  ) -> Result<Vec<Doc<T>>, MemError> {
    let inner = lock(&self.inner);
    let mut matched: Vec<&RawDoc> = inner
      .get(&self.name)
      .map(|docs| {
        docs.iter().filter(|d| filter.matches(d.id, &d.json)).collect()
      })
      .unwrap_or_default();
    if options.sort == Sort::CreatedDesc {
      matched.reverse();
    }
    if let Some(limit) = options.limit {
      matched.truncate(limit);
    }
    matched.into_iter().map(decode).collect()
  }

  async fn partial_update_one(
    &self,
    filter: Filter,
    patch: Patch,
  ) -> Result<bool, MemError> {
    let mut inner = lock(&self.inner);
    let Some(doc) = inner
      .get_mut(&self.name)
      .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d.id, &d.json)))
    else {
      return Ok(false);
    };
    patch.apply(&mut doc.json);
    doc.updated_at = Utc::now();
    Ok(true)
  }

  async fn delete_one(&self, filter: Filter) -> Result<bool, MemError> {
    let mut inner = lock(&self.inner);
    let Some(docs) = inner.get_mut(&self.name) else {
      return Ok(false);
    };
    match docs.iter().position(|d| filter.matches(d.id, &d.json)) {
      Some(i) => {
        docs.remove(i);
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn count(&self, filter: Filter) -> Result<u64, MemError> {
    let inner = lock(&self.inner);
    Ok(
      inner
        .get(&self.name)
        .map(|docs| {
          docs.iter().filter(|d| filter.matches(d.id, &d.json)).count() as u64
        })
        .unwrap_or(0),
    )
  }

  async fn push_one<'a>(
    &'a self,
    filter: Filter,
    field: &'a str,
    value: Value,
  ) -> Result<bool, MemError> {
    let mut inner = lock(&self.inner);
    let Some(doc) = inner
      .get_mut(&self.name)
      .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d.id, &d.json)))
    else {
      return Ok(false);
    };
    if !doc.json.get(field).is_some_and(Value::is_array) {
      if let Value::Object(map) = &mut doc.json {
        map.insert(field.to_owned(), Value::Array(Vec::new()));
      }
    }
    if let Some(items) = doc.json.get_mut(field).and_then(Value::as_array_mut)
    {
      items.push(value);
    }
    doc.updated_at = Utc::now();
    Ok(true)
  }

  async fn pull_one<'a>(
    &'a self,
    filter: Filter,
    field: &'a str,
    key_field: &'a str,
    key: Value,
  ) -> Result<bool, MemError> {
    let mut inner = lock(&self.inner);
    let Some(doc) = inner
      .get_mut(&self.name)
      .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d.id, &d.json)))
    else {
      return Ok(false);
    };
    if let Some(items) = doc.json.get_mut(field).and_then(Value::as_array_mut) {
      items.retain(|item| item.get(key_field) != Some(&key));
    }
    doc.updated_at = Utc::now();
    Ok(true)
  }
}
