//! Commenting — authored comments on posts.
//!
//! The post id is a weak reference; that it points at a live post is checked
//! by the synchronization layer at creation time only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::{Collection, Doc, DocStore, Filter, FindOptions, Patch},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentOptions {
  #[serde(default)]
  pub is_pinned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDoc {
  pub post:    Uuid,
  /// Immutable after creation.
  pub author:  Uuid,
  pub content: String,
  pub options: Option<CommentOptions>,
}

pub struct Commenting<S: DocStore> {
  comments: S::Coll<CommentDoc>,
}

impl<S: DocStore> Commenting<S> {
  pub async fn new(store: &S) -> Result<Self, S::Error> {
    Ok(Self { comments: store.collection::<CommentDoc>("comments").await? })
  }

  pub async fn create(
    &self,
    post: Uuid,
    author: Uuid,
    content: String,
    options: Option<CommentOptions>,
  ) -> Result<Doc<CommentDoc>> {
    let id = self
      .comments
      .create_one(CommentDoc { post, author, content, options })
      .await
      .map_err(Error::store)?;
    self.get_by_id(id).await
  }

  pub async fn get_for_post(&self, post: Uuid) -> Result<Vec<Doc<CommentDoc>>> {
    self
      .comments
      .read_many(Filter::new().eq("post", post), FindOptions::newest_first())
      .await
      .map_err(Error::store)
  }

  pub async fn get_by_author(
    &self,
    author: Uuid,
  ) -> Result<Vec<Doc<CommentDoc>>> {
    self
      .comments
      .read_many(
        Filter::new().eq("author", author),
        FindOptions::newest_first(),
      )
      .await
      .map_err(Error::store)
  }

  pub async fn get_by_id(&self, id: Uuid) -> Result<Doc<CommentDoc>> {
    self
      .comments
      .read_one(Filter::by_id(id))
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("comment {id} not found")))
  }

  pub async fn update(
    &self,
    id: Uuid,
    content: Option<String>,
    options: Option<CommentOptions>,
  ) -> Result<()> {
    let patch =
      Patch::new().set_if("content", content).set_if("options", options);
    if patch.is_empty() {
      return Ok(());
    }
    let updated = self
      .comments
      .partial_update_one(Filter::by_id(id), patch)
      .await
      .map_err(Error::store)?;
    if !updated {
      return Err(Error::NotFound(format!("comment {id} not found")));
    }
    Ok(())
  }

  pub async fn delete(&self, id: Uuid) -> Result<()> {
    let deleted = self
      .comments
      .delete_one(Filter::by_id(id))
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::NotFound(format!("comment {id} not found")));
    }
    Ok(())
  }

  /// The sole authorization gate for comment mutations.
  pub async fn assert_author_is_user(&self, id: Uuid, user: Uuid) -> Result<()> {
    let comment = self
      .comments
      .read_one(Filter::by_id(id))
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("comment {id} does not exist")))?;
    if comment.data.author != user {
      return Err(Error::NotAllowed(format!(
        "{user} is not the author of comment {id}"
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::MemStore;

  async fn commenting() -> Commenting<MemStore> {
    let store = MemStore::new();
    Commenting::new(&store).await.unwrap()
  }

  #[tokio::test]
  async fn comments_filter_by_post() {
    let c = commenting().await;
    let post_a = Uuid::new_v4();
    let post_b = Uuid::new_v4();
    let author = Uuid::new_v4();

    c.create(post_a, author, "on a".into(), None).await.unwrap();
    c.create(post_b, author, "on b".into(), None).await.unwrap();

    let for_a = c.get_for_post(post_a).await.unwrap();
    assert_eq!(for_a.len(), 1);
    assert_eq!(for_a[0].data.content, "on a");
  }

  #[tokio::test]
  async fn author_mismatch_is_not_allowed() {
    let c = commenting().await;
    let author = Uuid::new_v4();
    let comment =
      c.create(Uuid::new_v4(), author, "mine".into(), None).await.unwrap();

    let err =
      c.assert_author_is_user(comment.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)));
    c.assert_author_is_user(comment.id, author).await.unwrap();
  }

  #[tokio::test]
  async fn update_preserves_pin_when_only_content_changes() {
    let c = commenting().await;
    let comment = c
      .create(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "text".into(),
        Some(CommentOptions { is_pinned: true }),
      )
      .await
      .unwrap();

    c.update(comment.id, Some("edited".into()), None).await.unwrap();

    let fetched = c.get_by_id(comment.id).await.unwrap();
    assert_eq!(fetched.data.content, "edited");
    assert_eq!(fetched.data.options, Some(CommentOptions { is_pinned: true }));
  }
}
