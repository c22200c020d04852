//! Upvoting — at most one upvote per (post, upvoter) pair.
//!
//! The uniqueness invariant is enforced by a guarded create: a second upvote
//! by the same user is reported as an explicit [`UpvoteOutcome::AlreadyUpvoted`]
//! rather than a silent no-op, so call sites can tell the two apart.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::{Collection, DocStore, Filter},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpvoteDoc {
  pub post:    Uuid,
  pub upvoter: Uuid,
}

/// The distinguishable results of [`Upvoting::upvote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpvoteOutcome {
  /// The vote was recorded; `count` is the post's total afterwards.
  Added { count: u64 },
  /// The pair already had an upvote; nothing was stored.
  AlreadyUpvoted,
}

pub struct Upvoting<S: DocStore> {
  upvotes: S::Coll<UpvoteDoc>,
}

impl<S: DocStore> Upvoting<S> {
  pub async fn new(store: &S) -> Result<Self, S::Error> {
    Ok(Self { upvotes: store.collection::<UpvoteDoc>("upvotes").await? })
  }

  pub async fn upvote(
    &self,
    post: Uuid,
    upvoter: Uuid,
  ) -> Result<UpvoteOutcome> {
    let existing = self
      .upvotes
      .read_one(pair_filter(post, upvoter))
      .await
      .map_err(Error::store)?;
    if existing.is_some() {
      return Ok(UpvoteOutcome::AlreadyUpvoted);
    }
    self
      .upvotes
      .create_one(UpvoteDoc { post, upvoter })
      .await
      .map_err(Error::store)?;
    Ok(UpvoteOutcome::Added { count: self.get_num_upvotes(post).await? })
  }

  /// Count of distinct upvoters for a post.
  pub async fn get_num_upvotes(&self, post: Uuid) -> Result<u64> {
    self
      .upvotes
      .count(Filter::new().eq("post", post))
      .await
      .map_err(Error::store)
  }

  pub async fn user_upvoted_post(
    &self,
    post: Uuid,
    upvoter: Uuid,
  ) -> Result<bool> {
    Ok(
      self
        .upvotes
        .read_one(pair_filter(post, upvoter))
        .await
        .map_err(Error::store)?
        .is_some(),
    )
  }

  /// Requires a prior [`assert_upvoter_is_user`](Self::assert_upvoter_is_user).
  pub async fn remove_upvote(&self, post: Uuid, upvoter: Uuid) -> Result<()> {
    let deleted = self
      .upvotes
      .delete_one(pair_filter(post, upvoter))
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::NotFound(format!(
        "no upvote by {upvoter} on post {post}"
      )));
    }
    Ok(())
  }

  pub async fn assert_upvoter_is_user(
    &self,
    post: Uuid,
    upvoter: Uuid,
  ) -> Result<()> {
    let existing = self
      .upvotes
      .read_one(pair_filter(post, upvoter))
      .await
      .map_err(Error::store)?;
    if existing.is_none() {
      return Err(Error::NotFound(format!(
        "no upvote by {upvoter} on post {post}"
      )));
    }
    Ok(())
  }
}

fn pair_filter(post: Uuid, upvoter: Uuid) -> Filter {
  Filter::new().eq("post", post).eq("upvoter", upvoter)
}
