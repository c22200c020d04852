//! Pointing — per-user cumulative point ledgers.
//!
//! Ledger entries are created and deleted by the synchronization layer
//! alongside the user's own lifecycle; awards are triggered from there too.
//! This module knows nothing about why points are awarded.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::{Collection, Doc, DocStore, Filter, FindOptions, Patch},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsDoc {
  pub user:           Uuid,
  pub points:         i64,
  /// Posts whose upvotes triggered awards, in award order.
  pub verified_posts: Vec<Uuid>,
}

pub struct Pointing<S: DocStore> {
  ledgers: S::Coll<PointsDoc>,
}

impl<S: DocStore> Pointing<S> {
  pub async fn new(store: &S) -> Result<Self, S::Error> {
    Ok(Self { ledgers: store.collection::<PointsDoc>("points").await? })
  }

  /// Zero-initialized ledger entry; one per user.
  pub async fn create(&self, user: Uuid) -> Result<Doc<PointsDoc>> {
    let existing = self
      .ledgers
      .read_one(user_filter(user))
      .await
      .map_err(Error::store)?;
    if existing.is_some() {
      return Err(Error::Conflict(format!(
        "user {user} already has a points ledger"
      )));
    }
    self
      .ledgers
      .create_one(PointsDoc {
        user,
        points: 0,
        verified_posts: Vec::new(),
      })
      .await
      .map_err(Error::store)?;
    self.get_user_points(user).await
  }

  /// Restore a previously snapshotted entry — the compensating action for a
  /// failed user deletion.
  pub async fn restore(&self, snapshot: PointsDoc) -> Result<()> {
    self.ledgers.create_one(snapshot).await.map_err(Error::store)?;
    Ok(())
  }

  /// Add `amount` to the user's total, optionally recording the triggering
  /// post. Resolves to the new total.
  pub async fn award_points(
    &self,
    user: Uuid,
    amount: i64,
    post: Option<Uuid>,
  ) -> Result<i64> {
    let ledger = self.get_user_points(user).await?;
    let total = ledger.data.points + amount;
    let mut patch = Patch::new().set("points", total);
    if let Some(post) = post {
      let mut posts = ledger.data.verified_posts;
      posts.push(post);
      patch = patch.set("verified_posts", posts);
    }
    self
      .ledgers
      .partial_update_one(user_filter(user), patch)
      .await
      .map_err(Error::store)?;
    Ok(total)
  }

  pub async fn get_user_points(&self, user: Uuid) -> Result<Doc<PointsDoc>> {
    self
      .ledgers
      .read_one(user_filter(user))
      .await
      .map_err(Error::store)?
      .ok_or_else(|| {
        Error::NotFound(format!("no points ledger for user {user}"))
      })
  }

  /// Every ledger entry, highest total first — the leaderboard.
  pub async fn get_points(&self) -> Result<Vec<Doc<PointsDoc>>> {
    let mut ledgers = self
      .ledgers
      .read_many(Filter::new(), FindOptions::newest_first())
      .await
      .map_err(Error::store)?;
    ledgers.sort_by(|a, b| b.data.points.cmp(&a.data.points));
    Ok(ledgers)
  }

  pub async fn delete(&self, user: Uuid) -> Result<()> {
    let deleted = self
      .ledgers
      .delete_one(user_filter(user))
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::NotFound(format!(
        "no points ledger for user {user}"
      )));
    }
    Ok(())
  }
}

fn user_filter(user: Uuid) -> Filter {
  Filter::new().eq("user", user)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::MemStore;

  async fn pointing() -> Pointing<MemStore> {
    let store = MemStore::new();
    Pointing::new(&store).await.unwrap()
  }

  #[tokio::test]
  async fn ledger_starts_at_zero_and_is_unique() {
    let p = pointing().await;
    let user = Uuid::new_v4();

    let ledger = p.create(user).await.unwrap();
    assert_eq!(ledger.data.points, 0);

    let err = p.create(user).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
  }

  #[tokio::test]
  async fn awards_accumulate_and_record_posts() {
    let p = pointing().await;
    let user = Uuid::new_v4();
    let post = Uuid::new_v4();
    p.create(user).await.unwrap();

    assert_eq!(p.award_points(user, 5, Some(post)).await.unwrap(), 5);
    assert_eq!(p.award_points(user, 1, None).await.unwrap(), 6);

    let ledger = p.get_user_points(user).await.unwrap();
    assert_eq!(ledger.data.points, 6);
    assert_eq!(ledger.data.verified_posts, vec![post]);
  }

  #[tokio::test]
  async fn awarding_without_a_ledger_is_not_found() {
    let p = pointing().await;
    let err = p.award_points(Uuid::new_v4(), 5, None).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
  }

  #[tokio::test]
  async fn leaderboard_ranks_by_total() {
    let p = pointing().await;
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    for user in [a, b, c] {
      p.create(user).await.unwrap();
    }
    p.award_points(a, 3, None).await.unwrap();
    p.award_points(b, 10, None).await.unwrap();

    let board = p.get_points().await.unwrap();
    assert_eq!(
      board.iter().map(|l| l.data.user).collect::<Vec<_>>(),
      vec![b, a, c]
    );
  }

  #[tokio::test]
  async fn delete_then_lookup_is_not_found() {
    let p = pointing().await;
    let user = Uuid::new_v4();
    p.create(user).await.unwrap();
    p.delete(user).await.unwrap();

    let err = p.get_user_points(user).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    let err = p.delete(user).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
  }
}
