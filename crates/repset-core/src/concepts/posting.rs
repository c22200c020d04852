//! Posting — authored posts with an optional picture and display options.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::{Collection, Doc, DocStore, Filter, FindOptions, Patch},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOptions {
  pub background_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDoc {
  /// Immutable after creation.
  pub author:  Uuid,
  pub content: String,
  pub subject: String,
  pub picture: Option<String>,
  pub options: Option<PostOptions>,
}

pub struct Posting<S: DocStore> {
  posts: S::Coll<PostDoc>,
}

impl<S: DocStore> Posting<S> {
  pub async fn new(store: &S) -> Result<Self, S::Error> {
    Ok(Self { posts: store.collection::<PostDoc>("posts").await? })
  }

  pub async fn create(
    &self,
    author: Uuid,
    content: String,
    subject: String,
    picture: Option<String>,
    options: Option<PostOptions>,
  ) -> Result<Doc<PostDoc>> {
    let picture = picture.as_deref().map(preview_url).transpose()?;
    let id = self
      .posts
      .create_one(PostDoc { author, content, subject, picture, options })
      .await
      .map_err(Error::store)?;
    self.get_by_id(id).await
  }

  /// All posts, newest first. No paging.
  pub async fn get_posts(&self) -> Result<Vec<Doc<PostDoc>>> {
    self
      .posts
      .read_many(Filter::new(), FindOptions::newest_first())
      .await
      .map_err(Error::store)
  }

  pub async fn get_by_author(&self, author: Uuid) -> Result<Vec<Doc<PostDoc>>> {
    self
      .posts
      .read_many(
        Filter::new().eq("author", author),
        FindOptions::newest_first(),
      )
      .await
      .map_err(Error::store)
  }

  pub async fn get_by_id(&self, id: Uuid) -> Result<Doc<PostDoc>> {
    self
      .posts
      .read_one(Filter::by_id(id))
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("post {id} not found")))
  }

  /// Apply only the provided fields; `None` leaves a field untouched.
  pub async fn update(
    &self,
    id: Uuid,
    subject: Option<String>,
    content: Option<String>,
    picture: Option<String>,
    options: Option<PostOptions>,
  ) -> Result<()> {
    let picture = picture.as_deref().map(preview_url).transpose()?;
    let patch = Patch::new()
      .set_if("subject", subject)
      .set_if("content", content)
      .set_if("picture", picture)
      .set_if("options", options);
    if patch.is_empty() {
      return Ok(());
    }
    let updated = self
      .posts
      .partial_update_one(Filter::by_id(id), patch)
      .await
      .map_err(Error::store)?;
    if !updated {
      return Err(Error::NotFound(format!("post {id} not found")));
    }
    Ok(())
  }

  pub async fn delete(&self, id: Uuid) -> Result<()> {
    let deleted = self
      .posts
      .delete_one(Filter::by_id(id))
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::NotFound(format!("post {id} not found")));
    }
    Ok(())
  }

  /// The sole authorization gate for post mutations. Must be called before
  /// every update/delete.
  pub async fn assert_author_is_user(&self, id: Uuid, user: Uuid) -> Result<()> {
    let post = self
      .posts
      .read_one(Filter::by_id(id))
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("post {id} does not exist")))?;
    if post.data.author != user {
      return Err(Error::NotAllowed(format!(
        "{user} is not the author of post {id}"
      )));
    }
    Ok(())
  }
}

/// Normalize a picture URL: truncate to its directory and append the fixed
/// preview suffix. A URL with no path segment is rejected.
fn preview_url(src: &str) -> Result<String> {
  match src.rfind('/') {
    Some(i) => Ok(format!("{}preview", &src[..=i])),
    None => Err(Error::Validation(format!("invalid image URL: {src:?}"))),
  }
}
